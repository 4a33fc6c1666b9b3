//! Recommendation rules: a fixed-order table of (predicate, text) pairs.
//!
//! The table shape keeps the rule set inspectable and the output order
//! independent of anything but declaration order; duplicates collapse by
//! text.

use crate::contracts::SecurityExposure;
use crate::ingest::{NormalizedPlan, ResourceAction};
use std::collections::BTreeSet;

/// Everything the predicates are allowed to look at.
pub struct RecommendationContext<'a> {
    pub plan: &'a NormalizedPlan,
    pub exposures: &'a [SecurityExposure],
    /// Addresses of changed shared-critical resources.
    pub shared_critical_changed: &'a [String],
    pub affected_count: usize,
}

type Predicate = fn(&RecommendationContext) -> bool;

const RULES: [(&str, Predicate); 5] = [
    ("verify backup before proceeding", deletes_data_store),
    ("restrict ingress to known CIDR ranges", has_public_exposure),
    ("apply in stages to reduce blast radius", modifies_shared_critical),
    (
        "large blast radius, consider phased rollout",
        large_blast_radius,
    ),
    (
        "cross-module change, coordinate with module owners",
        spans_modules,
    ),
];

pub fn generate(context: &RecommendationContext) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut recommendations = Vec::new();
    for (text, predicate) in RULES {
        if predicate(context) && seen.insert(text) {
            recommendations.push(text.to_string());
        }
    }
    recommendations
}

fn deletes_data_store(context: &RecommendationContext) -> bool {
    context.plan.resources.iter().any(|resource| {
        resource.action == ResourceAction::Delete && {
            let t = resource.r#type.as_str();
            t.contains("db_instance")
                || t.contains("rds")
                || t.contains("s3_bucket")
                || t.contains("dynamodb")
        }
    })
}

fn has_public_exposure(context: &RecommendationContext) -> bool {
    !context.exposures.is_empty()
}

fn modifies_shared_critical(context: &RecommendationContext) -> bool {
    !context.shared_critical_changed.is_empty()
}

fn large_blast_radius(context: &RecommendationContext) -> bool {
    context.affected_count > 10
}

fn spans_modules(context: &RecommendationContext) -> bool {
    let modules: BTreeSet<&str> = context
        .plan
        .changed()
        .iter()
        .map(|resource| {
            if resource.module.is_empty() {
                "root"
            } else {
                resource.module.as_str()
            }
        })
        .collect();
    modules.len() >= 2
}
