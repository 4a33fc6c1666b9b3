//! Plan ingest: loading, structural validation, and normalization.
//!
//! The normalized model is provider-agnostic: every resource carries a
//! single action verb, its module path, and the set of plan addresses it
//! depends on. Everything downstream of this module works from
//! [`NormalizedPlan`] and never re-reads Terraform-specific shapes except
//! the attribute-level detectors, which get the raw plan alongside it.

pub mod loader;
pub mod normalize;

use crate::errors::{PreApplyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Normalized action verb for one resource change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceAction {
    #[serde(rename = "CREATE")]
    Create,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "READ")]
    Read,
    #[serde(rename = "NO_OP")]
    NoOp,
}

impl ResourceAction {
    /// Collapse Terraform's action list to a single verb. Destructive verbs
    /// take precedence so `["create","delete"]` and `["delete","create"]`
    /// both normalize to Delete.
    pub fn from_terraform_actions(actions: &[String]) -> ResourceAction {
        let has = |verb: &str| actions.iter().any(|a| a.eq_ignore_ascii_case(verb));
        if has("delete") {
            ResourceAction::Delete
        } else if has("update") {
            ResourceAction::Update
        } else if has("create") {
            ResourceAction::Create
        } else if has("read") {
            ResourceAction::Read
        } else {
            ResourceAction::NoOp
        }
    }

    pub fn is_change(self) -> bool {
        matches!(
            self,
            ResourceAction::Create | ResourceAction::Update | ResourceAction::Delete
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceAction::Create => "CREATE",
            ResourceAction::Update => "UPDATE",
            ResourceAction::Delete => "DELETE",
            ResourceAction::Read => "READ",
            ResourceAction::NoOp => "NO_OP",
        }
    }
}

/// One resource change, normalized.
#[derive(Debug, Clone)]
pub struct NormalizedResource {
    /// Address minus the module prefix, e.g. `aws_vpc.main`.
    pub id: String,
    /// Module path joined by `.`, empty for root resources.
    pub module: String,
    /// Provider type, e.g. `aws_vpc`.
    pub r#type: String,
    /// Fully-qualified Terraform address; the graph key.
    pub address: String,
    pub action: ResourceAction,
    pub depends_on: BTreeSet<String>,
    pub before: Value,
    pub after: Value,
}

impl NormalizedResource {
    /// Component label for blast-radius grouping: module path when present,
    /// otherwise the type's leading segment.
    pub fn component(&self) -> &str {
        if !self.module.is_empty() {
            &self.module
        } else {
            self.r#type.split('.').next().unwrap_or(&self.r#type)
        }
    }
}

/// All normalized resources in plan order, with a unique-address index.
#[derive(Debug, Clone, Default)]
pub struct NormalizedPlan {
    pub resources: Vec<NormalizedResource>,
    index: BTreeMap<String, usize>,
}

impl NormalizedPlan {
    pub fn new(resources: Vec<NormalizedResource>) -> Result<NormalizedPlan> {
        let mut index = BTreeMap::new();
        for (position, resource) in resources.iter().enumerate() {
            if index.insert(resource.address.clone(), position).is_some() {
                return Err(PreApplyError::invariant(
                    "unique-addresses",
                    format!("duplicate resource address {}", resource.address),
                ));
            }
        }
        Ok(NormalizedPlan { resources, index })
    }

    pub fn get(&self, address: &str) -> Option<&NormalizedResource> {
        self.index
            .get(address)
            .map(|&position| &self.resources[position])
    }

    pub fn contains(&self, address: &str) -> bool {
        self.index.contains_key(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Resources with a CREATE/UPDATE/DELETE action, in plan order.
    pub fn changed(&self) -> Vec<&NormalizedResource> {
        self.resources
            .iter()
            .filter(|r| r.action.is_change())
            .collect()
    }
}
