//! Declarative policy evaluation.
//!
//! A policy is a YAML list of rules; each rule has an AND-combined `match`
//! block and an action. Every rule always runs (the counts must be complete
//! for reporting); only the presence of a matched `fail` decides the exit
//! code, translated through the enforcement mode.

use crate::contracts::{CoreOutput, RiskLevel};
use crate::errors::{exit, PreApplyError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Fail,
    Warn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforcementMode {
    Auto,
    Manual,
}

impl EnforcementMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementMode::Auto => "auto",
            EnforcementMode::Manual => "manual",
        }
    }
}

/// Scalar-or-list YAML shorthand: `risk_level: HIGH` and
/// `risk_level: [HIGH, CRITICAL]` both parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: PartialEq> OneOrMany<T> {
    fn contains(&self, value: &T) -> bool {
        match self {
            OneOrMany::One(item) => item == value,
            OneOrMany::Many(items) => items.contains(value),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }
}

/// AND-combined match conditions; absent fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<OneOrMany<RiskLevel>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_sensitive_deletions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_security_exposures: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "match")]
    pub match_rule: MatchRule,
    pub action: PolicyAction,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    rules: Vec<PolicyRule>,
    /// Accepted alias from the previous generation of policy files.
    #[serde(default)]
    policies: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyRuleResult {
    pub rule_id: String,
    pub matched: bool,
    pub action: PolicyAction,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyEvaluationResult {
    pub passed: bool,
    pub failure_count: usize,
    pub warning_count: usize,
    pub results: Vec<PolicyRuleResult>,
}

impl PolicyEvaluationResult {
    pub fn exit_code(&self, mode: EnforcementMode) -> i32 {
        if self.passed {
            exit::SUCCESS
        } else {
            match mode {
                EnforcementMode::Auto => exit::POLICY_BLOCK,
                EnforcementMode::Manual => exit::APPROVAL_REQUIRED,
            }
        }
    }
}

/// Load policy rules from a YAML file. Order is preserved.
pub fn load_policy(path: &Path) -> Result<Vec<PolicyRule>> {
    if !path.is_file() {
        return Err(PreApplyError::PolicyLoad(format!(
            "policy file not found: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path).map_err(|err| {
        PreApplyError::PolicyLoad(format!("cannot read {}: {}", path.display(), err))
    })?;
    let file: PolicyFile = serde_yaml::from_str(&text).map_err(|err| {
        PreApplyError::PolicyLoad(format!("invalid policy YAML in {}: {}", path.display(), err))
    })?;

    let rules = if !file.rules.is_empty() {
        file.rules
    } else {
        file.policies
    };
    if rules.is_empty() {
        return Err(PreApplyError::PolicyLoad(format!(
            "no rules found in {}",
            path.display()
        )));
    }
    validate_rules(&rules, path)?;
    info!(count = rules.len(), path = %path.display(), "loaded policy rules");
    Ok(rules)
}

fn validate_rules(rules: &[PolicyRule], path: &Path) -> Result<()> {
    for rule in rules {
        if rule.id.trim().is_empty() {
            return Err(PreApplyError::PolicyLoad(format!(
                "rule with empty id in {}",
                path.display()
            )));
        }
        if let Some(action_types) = &rule.match_rule.action_type {
            for action in action_types.iter() {
                if !matches!(action.as_str(), "CREATE" | "UPDATE" | "DELETE") {
                    return Err(PreApplyError::PolicyLoad(format!(
                        "rule '{}': unknown action_type '{}'",
                        rule.id, action
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Run every rule against the analysis output.
pub fn evaluate(output: &CoreOutput, rules: &[PolicyRule]) -> PolicyEvaluationResult {
    let mut results = Vec::with_capacity(rules.len());
    let mut failure_count = 0;
    let mut warning_count = 0;

    for rule in rules {
        let matched = rule_matches(&rule.match_rule, output);
        if matched {
            match rule.action {
                PolicyAction::Fail => failure_count += 1,
                PolicyAction::Warn => warning_count += 1,
            }
        }
        let explanation = if matched {
            format!("Policy '{}': {}", rule.id, rule.description)
        } else {
            format!("Policy '{}' did not match", rule.id)
        };
        results.push(PolicyRuleResult {
            rule_id: rule.id.clone(),
            matched,
            action: rule.action,
            explanation,
        });
    }

    PolicyEvaluationResult {
        passed: failure_count == 0,
        failure_count,
        warning_count,
        results,
    }
}

fn rule_matches(rule: &MatchRule, output: &CoreOutput) -> bool {
    if let Some(explanation_id) = &rule.explanation_id {
        if output.explanation_id.as_str() != explanation_id {
            return false;
        }
    }
    if let Some(levels) = &rule.risk_level {
        if !levels.contains(&output.risk_level) {
            return false;
        }
    }
    if let Some(action_types) = &rule.action_type {
        let observed = &output.risk_attributes.action_types;
        if !observed.iter().any(|action| action_types.contains(action)) {
            return false;
        }
    }
    if let Some(wanted) = rule.has_sensitive_deletions {
        if output.risk_attributes.sensitive_deletions.is_empty() == wanted {
            return false;
        }
    }
    if let Some(wanted) = rule.has_security_exposures {
        if output.risk_attributes.security_exposures.is_empty() == wanted {
            return false;
        }
    }
    true
}

/// Environment document for CI enforcement (`.preapply-env.yaml` shape).
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub enforcement_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentFile {
    environment: EnvironmentConfig,
}

pub fn load_environment(path: &Path) -> Result<EnvironmentConfig> {
    if !path.is_file() {
        return Err(PreApplyError::ConfigLoad(format!(
            "environment file not found: {}",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path).map_err(|err| {
        PreApplyError::ConfigLoad(format!("cannot read {}: {}", path.display(), err))
    })?;
    let file: EnvironmentFile = serde_yaml::from_str(&text).map_err(|err| {
        PreApplyError::ConfigLoad(format!(
            "invalid environment YAML in {}: {}",
            path.display(),
            err
        ))
    })?;
    Ok(file.environment)
}

/// CLI flag beats the environment file; the default is auto. Unknown mode
/// strings in the file degrade to auto with a warning.
pub fn effective_mode(
    environment: Option<&EnvironmentConfig>,
    flag: Option<EnforcementMode>,
) -> EnforcementMode {
    if let Some(mode) = flag {
        return mode;
    }
    if let Some(environment) = environment {
        match environment.enforcement_mode.as_deref() {
            Some("auto") | None => return EnforcementMode::Auto,
            Some("manual") => return EnforcementMode::Manual,
            Some(other) => {
                warn!(mode = other, "unknown enforcement_mode, defaulting to auto");
                return EnforcementMode::Auto;
            }
        }
    }
    EnforcementMode::Auto
}
