//! Shared-resource detection: coupling surfaces with two or more dependents.

use crate::config::Config;
use crate::graph::DependencyGraph;
use crate::ingest::NormalizedPlan;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SharedResource {
    pub address: String,
    /// Direct dependents (in-degree).
    pub dependents: usize,
    pub is_critical: bool,
}

/// A resource is shared iff at least two other resources declare a
/// dependency on it. Returned sorted by address (plan iteration order is
/// already address-sorted via the index).
pub fn detect(graph: &DependencyGraph, plan: &NormalizedPlan, config: &Config) -> Vec<SharedResource> {
    let mut shared = Vec::new();
    for address in plan.addresses() {
        let dependents = graph.dependent_count(address);
        if dependents < 2 {
            continue;
        }
        let is_critical = plan
            .get(address)
            .map(|resource| config.critical_types.contains(&resource.r#type))
            .unwrap_or(false);
        debug!(address, dependents, is_critical, "shared resource");
        shared.push(SharedResource {
            address: address.to_string(),
            dependents,
            is_critical,
        });
    }
    shared
}
