//! Plan normalization: address parsing, action collapsing, and reference
//! extraction.
//!
//! Dependencies are merged from three sources: explicit `depends_on` lists,
//! `configuration.root_module` expression references, and a fallback scan of
//! `before`/`after` string values. Candidates are resolved against the set
//! of addresses actually present in the plan; anything unresolved is
//! silently dropped, so dangling references never create graph nodes.

use super::{NormalizedPlan, NormalizedResource, ResourceAction};
use crate::errors::Result;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

fn interpolation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("interpolation pattern"))
}

fn bare_reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // module prefix pairs, then `<type>.<name>` where the type carries an
        // underscore (distinguishes provider types from plain words).
        Regex::new(r"^(?:module\.[A-Za-z0-9_-]+\.)*[a-z][a-z0-9]*_[a-z0-9_]+\.[^\s]+$")
            .expect("bare reference pattern")
    })
}

/// Normalize a validated raw plan into the typed resource model.
pub fn normalize_plan(plan: &Value) -> Result<NormalizedPlan> {
    let changes = plan["resource_changes"].as_array().cloned().unwrap_or_default();

    // Address set first: reference resolution needs the full universe.
    let mut addresses = BTreeSet::new();
    for change in &changes {
        if let Some(address) = change["address"].as_str() {
            if !address.is_empty() {
                addresses.insert(address.to_string());
            }
        }
    }

    let expressions_by_address = configuration_expressions(plan);

    let mut resources = Vec::with_capacity(changes.len());
    for change in &changes {
        let address = match change["address"].as_str() {
            Some(address) if !address.is_empty() => address,
            _ => {
                warn!("skipping resource change with no address");
                continue;
            }
        };

        let (id, module, r#type) = parse_address(address);
        let actions: Vec<String> = change["change"]["actions"]
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let action = ResourceAction::from_terraform_actions(&actions);

        let before = change["change"]["before"].clone();
        let after = change["change"]["after"].clone();

        let depends_on = extract_dependencies(
            change,
            address,
            &module,
            expressions_by_address.get(address),
            &addresses,
            &before,
            &after,
        );

        resources.push(NormalizedResource {
            id,
            module,
            r#type,
            address: address.to_string(),
            action,
            depends_on,
            before,
            after,
        });
    }

    debug!(resources = resources.len(), "normalized plan");
    NormalizedPlan::new(resources)
}

/// Split an address on dots that are outside brackets and quotes, so index
/// suffixes like `["a.b"]` stay attached to their segment.
fn split_unquoted_dots(address: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;
    let mut in_quotes = false;

    for ch in address.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '[' if !in_quotes => {
                bracket_depth += 1;
                current.push(ch);
            }
            ']' if !in_quotes => {
                bracket_depth = bracket_depth.saturating_sub(1);
                current.push(ch);
            }
            '.' if !in_quotes && bracket_depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Parse a Terraform address into (id, module path, provider type).
///
/// The id is the address minus its module prefix, bracketed suffixes kept
/// verbatim. `data.` resources keep the `data.` marker in the id but report
/// the provider type without it.
pub fn parse_address(address: &str) -> (String, String, String) {
    let parts = split_unquoted_dots(address);

    let mut module_names = Vec::new();
    let mut rest = 0;
    while rest + 1 < parts.len() && parts[rest] == "module" {
        module_names.push(parts[rest + 1].clone());
        rest += 2;
    }

    let tail = &parts[rest..];
    let id = tail.join(".");
    let type_index = usize::from(tail.first().map(String::as_str) == Some("data"));
    let r#type = tail.get(type_index).cloned().unwrap_or_else(|| id.clone());

    (id, module_names.join("."), r#type)
}

/// Map address -> configuration entry for expression-reference extraction.
/// Child modules are walked recursively; their resource entries already carry
/// fully-qualified addresses.
fn configuration_expressions(plan: &Value) -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    let root = &plan["configuration"]["root_module"];
    if !root.is_null() {
        collect_module_resources(root, &mut map);
    }
    map
}

fn collect_module_resources(module: &Value, map: &mut BTreeMap<String, Value>) {
    if let Some(resources) = module["resources"].as_array() {
        for resource in resources {
            if let Some(address) = resource["address"].as_str() {
                map.insert(address.to_string(), resource["expressions"].clone());
            }
        }
    }
    if let Some(children) = module["child_modules"].as_array() {
        for child in children {
            collect_module_resources(child, map);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn extract_dependencies(
    change: &Value,
    address: &str,
    module: &str,
    expressions: Option<&Value>,
    addresses: &BTreeSet<String>,
    before: &Value,
    after: &Value,
) -> BTreeSet<String> {
    let mut candidates = Vec::new();

    // 1. Explicit depends_on, either on the change entry itself or nested
    // under `change` (both shapes appear in the wild).
    for source in [&change["depends_on"], &change["change"]["depends_on"]] {
        if let Some(list) = source.as_array() {
            candidates.extend(list.iter().filter_map(Value::as_str).map(str::to_string));
        }
    }

    // 2. Configuration expression references.
    if let Some(expressions) = expressions {
        collect_expression_references(expressions, &mut candidates);
    }

    // 3. Fallback: interpolations and bare references in before/after.
    collect_string_candidates(before, &mut candidates);
    collect_string_candidates(after, &mut candidates);

    let mut deps = BTreeSet::new();
    for candidate in candidates {
        if let Some(resolved) = resolve_reference(&candidate, module, addresses) {
            if resolved != address {
                deps.insert(resolved);
            }
        }
    }
    deps
}

/// Recursively collect every string under a `references` key.
fn collect_expression_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(refs)) = map.get("references") {
                out.extend(refs.iter().filter_map(Value::as_str).map(str::to_string));
            }
            for nested in map.values() {
                collect_expression_references(nested, out);
            }
        }
        Value::Array(list) => {
            for nested in list {
                collect_expression_references(nested, out);
            }
        }
        _ => {}
    }
}

/// Collect `${...}` interpolation bodies and full-string bare references
/// from string values.
fn collect_string_candidates(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            for capture in interpolation_pattern().captures_iter(text) {
                out.push(capture[1].to_string());
            }
            if bare_reference_pattern().is_match(text) {
                out.push(text.clone());
            }
        }
        Value::Object(map) => {
            for nested in map.values() {
                collect_string_candidates(nested, out);
            }
        }
        Value::Array(list) => {
            for nested in list {
                collect_string_candidates(nested, out);
            }
        }
        _ => {}
    }
}

/// Resolve a dotted reference candidate against the plan's address set.
///
/// Attribute suffixes are trimmed by taking the longest dotted prefix that is
/// a real address; the referencing resource's module path is also tried so
/// sibling references inside a module resolve. Variable-like namespaces are
/// discarded outright.
fn resolve_reference(
    candidate: &str,
    module: &str,
    addresses: &BTreeSet<String>,
) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let parts = split_unquoted_dots(candidate);
    match parts.first().map(String::as_str) {
        Some("var") | Some("local") | Some("each") | Some("count") | Some("path")
        | Some("terraform") => return None,
        _ => {}
    }

    if let Some(found) = longest_prefix_match(&parts, addresses) {
        return Some(found);
    }

    // Sibling reference inside the same module: retry with the caller's
    // module prefix prepended.
    if !module.is_empty() {
        let prefix: Vec<String> = module
            .split('.')
            .flat_map(|name| ["module".to_string(), name.to_string()])
            .collect();
        let mut prefixed = prefix;
        prefixed.extend(parts.iter().cloned());
        if let Some(found) = longest_prefix_match(&prefixed, addresses) {
            return Some(found);
        }
    }

    // `data.` references resolve with the marker kept (plan addresses keep
    // it too); a stripped retry covers references written without it.
    if parts.first().map(String::as_str) == Some("data") && parts.len() > 2 {
        return longest_prefix_match(&parts[1..], addresses);
    }

    None
}

fn longest_prefix_match(parts: &[String], addresses: &BTreeSet<String>) -> Option<String> {
    for take in (2..=parts.len()).rev() {
        let prefix = parts[..take].join(".");
        if addresses.contains(&prefix) {
            return Some(prefix);
        }
    }
    None
}
