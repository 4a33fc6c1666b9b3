//! Analysis orchestration.
//!
//! Runs the fixed pipeline (normalize → graph → checks → score →
//! recommendations) and assembles the versioned output record. Every array
//! is sorted here, once, so the emitted JSON is byte-identical for identical
//! inputs regardless of plan entry order.

pub mod blast;
pub mod cost;
pub mod recommendations;
pub mod scoring;
pub mod security;
pub mod shared;
pub mod state_destructive;

use crate::config::Config;
use crate::contracts::{
    round_to, BlastRadiusMetrics, CoreOutput, CriticalInfrastructure, DimensionScores,
    RiskAttributes, RiskBreakdown, SensitiveDeletion, SharedDependency, OUTPUT_VERSION,
};
use crate::errors::{PreApplyError, Result};
use crate::explain;
use crate::graph::DependencyGraph;
use crate::ingest::{normalize, NormalizedPlan, ResourceAction};
use recommendations::RecommendationContext;
use scoring::{InfraContributor, ScoreInputs};
use serde_json::Value;
use std::collections::BTreeSet;

/// Analyze a validated raw plan end to end.
pub fn analyze(raw_plan: &Value, config: &Config) -> Result<CoreOutput> {
    let plan = normalize::normalize_plan(raw_plan)?;
    let graph = DependencyGraph::build(&plan)?;

    let radius = blast::calculate(&graph, &plan);
    let shared_resources = shared::detect(&graph, &plan, config);
    let exposures = security::detect(raw_plan, config);
    let destructive = state_destructive::detect(raw_plan);
    let cost_alerts = cost::detect(&plan, config);

    check_addresses_resolve(&plan, &exposures, &destructive, &cost_alerts)?;

    let changed: BTreeSet<&str> = plan
        .changed()
        .iter()
        .map(|resource| resource.address.as_str())
        .collect();
    let shared_set: BTreeSet<&str> = shared_resources
        .iter()
        .map(|s| s.address.as_str())
        .collect();

    let deletions: Vec<String> = plan
        .resources
        .iter()
        .filter(|resource| resource.action == ResourceAction::Delete)
        .map(|resource| resource.address.clone())
        .collect();

    // Infrastructure contributors: a changed shared resource, or any
    // resource one of whose direct dependents changed (S2: a critical VPC
    // under an updated subnet carries infrastructure risk even with a
    // single dependent).
    let mut infra_contributors = Vec::new();
    for resource in &plan.resources {
        let is_changed_shared = changed.contains(resource.address.as_str())
            && shared_set.contains(resource.address.as_str());
        let has_changed_dependent = graph
            .direct_dependents(&resource.address)
            .iter()
            .any(|dependent| changed.contains(dependent.as_str()));
        if is_changed_shared || has_changed_dependent {
            infra_contributors.push(InfraContributor {
                address: resource.address.clone(),
                is_critical: config.critical_types.contains(&resource.r#type),
                action: resource.action,
            });
        }
    }

    let inputs = ScoreInputs {
        deletions,
        state_destructive: destructive,
        exposures,
        infrastructure: infra_contributors,
        cost_alerts,
        affected_count: radius.affected_count(),
    };
    let result = scoring::score(&inputs, config);

    // Shared dependencies reported in the contract are the changed shared
    // resources; critical-but-unshared changes get their own list.
    let mut shared_dependencies = Vec::new();
    let mut shared_critical_changed = Vec::new();
    for entry in &shared_resources {
        if !changed.contains(entry.address.as_str()) {
            continue;
        }
        let resource = match plan.get(&entry.address) {
            Some(resource) => resource,
            None => continue,
        };
        if entry.is_critical {
            shared_critical_changed.push(entry.address.clone());
        }
        shared_dependencies.push(SharedDependency {
            resource_id: entry.address.clone(),
            resource_type: resource.r#type.clone(),
            dependents: entry.dependents,
            is_critical: entry.is_critical,
            multiplier_applied: entry.is_critical.then_some(config.critical_multiplier),
            risk_reason: explain::risk_reason(
                &resource.r#type,
                entry.dependents,
                true,
                entry.is_critical,
            ),
        });
    }
    shared_dependencies.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));

    let mut critical_infrastructure: Vec<CriticalInfrastructure> = plan
        .changed()
        .iter()
        .filter(|resource| {
            config.critical_types.contains(&resource.r#type)
                && !shared_set.contains(resource.address.as_str())
        })
        .map(|resource| CriticalInfrastructure {
            resource_id: resource.address.clone(),
            resource_type: resource.r#type.clone(),
            risk_reason: explain::risk_reason(&resource.r#type, 0, false, true),
        })
        .collect();
    critical_infrastructure.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));

    let mut sensitive_deletions: Vec<SensitiveDeletion> = plan
        .resources
        .iter()
        .filter(|resource| {
            resource.action == ResourceAction::Delete
                && config.sensitive_delete_types.contains(&resource.r#type)
        })
        .map(|resource| SensitiveDeletion {
            resource_id: resource.address.clone(),
            resource_type: resource.r#type.clone(),
        })
        .collect();
    sensitive_deletions.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));

    let action_types: Vec<String> = plan
        .changed()
        .iter()
        .map(|resource| resource.action.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let recommendations = recommendations::generate(&RecommendationContext {
        plan: &plan,
        exposures: &inputs.exposures,
        shared_critical_changed: &shared_critical_changed,
        affected_count: radius.affected_count(),
    });

    let mut sorted_exposures = inputs.exposures;
    sorted_exposures.sort_by(|a, b| {
        a.resource_address
            .cmp(&b.resource_address)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.port.cmp(&b.port))
    });
    let mut sorted_cost_alerts = inputs.cost_alerts;
    sorted_cost_alerts.sort_by(|a, b| {
        a.resource_address
            .cmp(&b.resource_address)
            .then_with(|| a.kind.cmp(&b.kind))
    });

    let deletion_count = plan
        .resources
        .iter()
        .filter(|resource| resource.action == ResourceAction::Delete)
        .count();

    let risk_attributes = RiskAttributes {
        blast_radius: BlastRadiusMetrics {
            affected_resources: radius.affected_count(),
            affected_components: radius.components.len(),
            changed_resources: radius.changed_count,
        },
        shared_dependencies,
        critical_infrastructure,
        sensitive_deletions,
        security_exposures: sorted_exposures,
        cost_alerts: sorted_cost_alerts,
        action_types,
        risk_breakdown: RiskBreakdown {
            primary_dimension: result.primary.as_str().to_string(),
            dimensions: DimensionScores {
                data: round_to(result.dimensions.data, 2),
                security: round_to(result.dimensions.security, 2),
                infrastructure: round_to(result.dimensions.infrastructure, 2),
                cost: round_to(result.dimensions.cost, 2),
            },
            interaction_multiplier: round_to(result.interaction_multiplier, 3),
            blast_contribution: round_to(result.blast_contribution, 2),
        },
    };

    Ok(CoreOutput {
        version: OUTPUT_VERSION.to_string(),
        explanation_id: explain::overall_explanation_id(&risk_attributes),
        risk_level: result.level.project(),
        risk_level_detailed: result.level,
        blast_radius_score: round_to(result.score, 2),
        risk_action: result.level.action().to_string(),
        approval_required: result.level.approval().to_string(),
        affected_count: radius.affected_count(),
        deletion_count,
        affected_components: radius.components,
        risk_attributes,
        recommendations,
    })
}

/// I2: every alert address must name a plan resource. The detectors only
/// read addresses out of the plan, so a miss here is a bug, not bad input.
fn check_addresses_resolve(
    plan: &NormalizedPlan,
    exposures: &[crate::contracts::SecurityExposure],
    destructive: &[crate::contracts::StateDestructiveUpdate],
    cost_alerts: &[crate::contracts::CostAlert],
) -> Result<()> {
    let addresses = exposures
        .iter()
        .map(|e| e.resource_address.as_str())
        .chain(destructive.iter().map(|d| d.resource_address.as_str()))
        .chain(cost_alerts.iter().map(|c| c.resource_address.as_str()));
    for address in addresses {
        if !plan.contains(address) {
            return Err(PreApplyError::invariant(
                "alert-addresses-resolve",
                format!("alert references unknown resource {address}"),
            ));
        }
    }
    Ok(())
}
