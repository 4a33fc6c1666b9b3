//! Blast radius: everything reachable backwards from a changed resource.

use crate::graph::DependencyGraph;
use crate::ingest::NormalizedPlan;
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct BlastRadius {
    /// Changed resources plus all of their transitive dependents.
    pub affected: BTreeSet<String>,
    pub changed_count: usize,
    /// Sorted unique component labels over the affected set.
    pub components: Vec<String>,
}

impl BlastRadius {
    pub fn affected_count(&self) -> usize {
        self.affected.len()
    }
}

pub fn calculate(graph: &DependencyGraph, plan: &NormalizedPlan) -> BlastRadius {
    let changed = plan.changed();
    if changed.is_empty() {
        return BlastRadius::default();
    }

    let mut affected = BTreeSet::new();
    for resource in &changed {
        affected.insert(resource.address.clone());
        affected.extend(graph.downstream(&resource.address));
    }

    let mut components = BTreeSet::new();
    for address in &affected {
        if let Some(resource) = plan.get(address) {
            components.insert(resource.component().to_string());
        }
    }

    let radius = BlastRadius {
        changed_count: changed.len(),
        components: components.into_iter().collect(),
        affected,
    };
    info!(
        affected = radius.affected_count(),
        changed = radius.changed_count,
        components = radius.components.len(),
        "blast radius computed"
    );
    radius
}
