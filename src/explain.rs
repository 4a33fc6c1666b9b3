//! Deterministic explanations.
//!
//! Explanation ids name explanation *types*, not instances: a single id
//! covers many plans, which keeps the policy-matching surface finite. Text
//! is assembled from the structured attributes only, never re-derived from
//! the plan, so an explanation of a saved analysis matches the original run.

use crate::contracts::{CoreOutput, CriticalInfrastructure, RiskAttributes, SharedDependency};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExplanationId {
    SharedInfrastructureChange,
    CriticalSharedDependencyModification,
    SharedDependencyModification,
    CriticalInfrastructureModification,
    DeleteOperationDetected,
    SingleResourceLowRisk,
    ResourceCriticalSharedDependency,
    ResourceSharedCritical,
    ResourceSharedNonCritical,
    ResourceCriticalNoDependents,
    ResourceNotFound,
}

impl ExplanationId {
    pub fn as_str(self) -> &'static str {
        match self {
            ExplanationId::SharedInfrastructureChange => "SHARED_INFRASTRUCTURE_CHANGE",
            ExplanationId::CriticalSharedDependencyModification => {
                "CRITICAL_SHARED_DEPENDENCY_MODIFICATION"
            }
            ExplanationId::SharedDependencyModification => "SHARED_DEPENDENCY_MODIFICATION",
            ExplanationId::CriticalInfrastructureModification => {
                "CRITICAL_INFRASTRUCTURE_MODIFICATION"
            }
            ExplanationId::DeleteOperationDetected => "DELETE_OPERATION_DETECTED",
            ExplanationId::SingleResourceLowRisk => "SINGLE_RESOURCE_LOW_RISK",
            ExplanationId::ResourceCriticalSharedDependency => {
                "RESOURCE_CRITICAL_SHARED_DEPENDENCY"
            }
            ExplanationId::ResourceSharedCritical => "RESOURCE_SHARED_CRITICAL",
            ExplanationId::ResourceSharedNonCritical => "RESOURCE_SHARED_NON_CRITICAL",
            ExplanationId::ResourceCriticalNoDependents => "RESOURCE_CRITICAL_NO_DEPENDENTS",
            ExplanationId::ResourceNotFound => "RESOURCE_NOT_FOUND",
        }
    }
}

/// Deterministic per-resource risk wording, keyed off the provider type.
pub fn risk_reason(
    resource_type: &str,
    dependents: usize,
    is_shared: bool,
    is_critical: bool,
) -> String {
    let lower = resource_type.to_ascii_lowercase();

    if lower.contains("vpc") {
        if dependents >= 5 {
            return "Broad blast radius across networking layer".to_string();
        }
        return "Core networking infrastructure".to_string();
    }
    if lower.contains("nat_gateway") || lower.contains("internet_gateway") {
        return "Internet egress for private workloads".to_string();
    }
    if lower.contains("subnet") {
        return "Network segmentation boundary".to_string();
    }
    if ["lb", "alb", "nlb", "elb"].iter().any(|t| lower.contains(t)) {
        if is_shared {
            return "Impacts multiple load-balanced services".to_string();
        }
        return "Traffic routing point".to_string();
    }
    if lower.contains("security_group") || lower.contains("firewall") {
        if is_shared {
            return "Shared security boundary".to_string();
        }
        return "Access control enforcement".to_string();
    }
    if lower.contains("db_instance") || lower.contains("rds") || lower.contains("database") {
        return "Data persistence - deletion causes data loss".to_string();
    }
    if lower.contains("s3_bucket") || lower.contains("dynamodb") {
        return "Object storage - deletion causes data loss".to_string();
    }
    if is_shared && dependents >= 3 {
        return format!("Shared resource with {dependents} dependents");
    }
    if is_critical {
        return "Critical infrastructure component".to_string();
    }
    if is_shared {
        return format!("Shared resource affecting {dependents} dependents");
    }
    "Infrastructure component change".to_string()
}

pub fn overall_explanation_id(attrs: &RiskAttributes) -> ExplanationId {
    if attrs.shared_dependencies.len() > 1 {
        ExplanationId::SharedInfrastructureChange
    } else if let Some(dep) = attrs.shared_dependencies.first() {
        if dep.is_critical {
            ExplanationId::CriticalSharedDependencyModification
        } else {
            ExplanationId::SharedDependencyModification
        }
    } else if !attrs.critical_infrastructure.is_empty() {
        ExplanationId::CriticalInfrastructureModification
    } else if attrs.action_types.iter().any(|a| a == "DELETE") {
        ExplanationId::DeleteOperationDetected
    } else {
        ExplanationId::SingleResourceLowRisk
    }
}

/// Overall risk explanation, template-based.
pub fn explain_overall(output: &CoreOutput) -> String {
    let attrs = &output.risk_attributes;
    let mut factors = Vec::new();

    match attrs.shared_dependencies.len() {
        0 => {}
        1 => {
            let dep = &attrs.shared_dependencies[0];
            factors.push(format!(
                "modification of shared {} ({} dependents)",
                dep.resource_type, dep.dependents
            ));
        }
        n => factors.push(format!("{n} shared dependencies")),
    }
    match attrs.critical_infrastructure.len() {
        0 => {}
        1 => factors.push(format!(
            "modification of critical {}",
            attrs.critical_infrastructure[0].resource_type
        )),
        n => factors.push(format!("{n} critical infrastructure components")),
    }
    if attrs.action_types.iter().any(|a| a == "DELETE") {
        factors.push("delete operations detected".to_string());
    } else if attrs.action_types.iter().any(|a| a == "CREATE") {
        factors.push("new resource creation".to_string());
    }
    if factors.is_empty() {
        factors.push("infrastructure changes".to_string());
    }

    let mut text = format!(
        "This change has {} risk due to {}. The blast radius affects {} downstream resources",
        output.risk_level.as_str(),
        factors.join(", "),
        attrs.blast_radius.affected_resources
    );
    if attrs.blast_radius.affected_components > 1 {
        text.push_str(&format!(
            " across {} component types",
            attrs.blast_radius.affected_components
        ));
    }
    text.push('.');
    if let Some(first) = output.recommendations.first() {
        text.push(' ');
        text.push_str(first);
    }
    text
}

/// Resource-level explanation: looks the id up in the structured attributes.
/// Substring containment is accepted alongside exact ids so a bare resource
/// name resolves against its module-prefixed form.
pub fn explain_resource(output: &CoreOutput, resource_id: &str) -> (String, ExplanationId) {
    let attrs = &output.risk_attributes;

    if let Some(dep) = attrs
        .shared_dependencies
        .iter()
        .find(|dep| dep.resource_id.contains(resource_id))
    {
        return (explain_shared(dep, attrs), shared_resource_id(dep));
    }
    if let Some(crit) = attrs
        .critical_infrastructure
        .iter()
        .find(|crit| crit.resource_id.contains(resource_id))
    {
        return (
            explain_critical(crit, attrs),
            ExplanationId::ResourceCriticalNoDependents,
        );
    }
    (
        format!("Resource '{resource_id}' not found in analysis results."),
        ExplanationId::ResourceNotFound,
    )
}

fn shared_resource_id(dep: &SharedDependency) -> ExplanationId {
    if dep.is_critical {
        if dep.dependents > 5 {
            ExplanationId::ResourceCriticalSharedDependency
        } else {
            ExplanationId::ResourceSharedCritical
        }
    } else {
        ExplanationId::ResourceSharedNonCritical
    }
}

fn explain_shared(dep: &SharedDependency, attrs: &RiskAttributes) -> String {
    let classification = if dep.is_critical {
        "critical and shared"
    } else {
        "shared"
    };
    let mut text = format!(
        "{} is a {} resource because {}",
        dep.resource_id,
        classification,
        dep.risk_reason.to_lowercase()
    );
    if dep.dependents > 0 {
        text.push_str(&format!(
            ". It affects {} downstream resource{}",
            dep.dependents,
            if dep.dependents > 1 { "s" } else { "" }
        ));
    }
    if !attrs.action_types.is_empty() {
        text.push_str(&format!(". Action type: {}", attrs.action_types.join(", ")));
    }
    text
}

fn explain_critical(crit: &CriticalInfrastructure, attrs: &RiskAttributes) -> String {
    let mut text = format!(
        "{} is critical infrastructure because {}",
        crit.resource_id,
        crit.risk_reason.to_lowercase()
    );
    if !attrs.action_types.is_empty() {
        text.push_str(&format!(". Action type: {}", attrs.action_types.join(", ")));
    }
    text
}

/// Short paragraph summary (2-3 sentences).
pub fn summarize(output: &CoreOutput) -> String {
    let attrs = &output.risk_attributes;
    let driver = if let Some(dep) = attrs.shared_dependencies.first() {
        format!("modification of shared {}", dep.resource_type)
    } else if let Some(crit) = attrs.critical_infrastructure.first() {
        format!("modification of critical {}", crit.resource_type)
    } else if attrs.action_types.iter().any(|a| a == "DELETE") {
        "delete operations".to_string()
    } else {
        "infrastructure changes".to_string()
    };

    let mut text = format!(
        "This change has {} risk due to {}. The blast radius affects {} resources",
        output.risk_level.as_str(),
        driver,
        attrs.blast_radius.affected_resources
    );
    if attrs.blast_radius.affected_components > 1 {
        text.push_str(&format!(
            " across {} component types",
            attrs.blast_radius.affected_components
        ));
    }
    text.push('.');
    if let Some(first) = output.recommendations.first() {
        text.push(' ');
        text.push_str(first);
    }
    text
}

/// Resource ids that `explain <input> RESOURCE_ID` can resolve.
pub fn list_resources(output: &CoreOutput) -> Vec<String> {
    let attrs = &output.risk_attributes;
    let mut ids: Vec<String> = attrs
        .shared_dependencies
        .iter()
        .map(|dep| dep.resource_id.clone())
        .chain(
            attrs
                .critical_infrastructure
                .iter()
                .map(|crit| crit.resource_id.clone()),
        )
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{
        BlastRadiusMetrics, DetailedRiskLevel, DimensionScores, RiskBreakdown, RiskLevel,
    };

    fn output_with(attrs: RiskAttributes) -> CoreOutput {
        CoreOutput {
            version: crate::contracts::OUTPUT_VERSION.to_string(),
            explanation_id: overall_explanation_id(&attrs),
            risk_level: RiskLevel::High,
            risk_level_detailed: DetailedRiskLevel::High,
            blast_radius_score: 74.35,
            risk_action: "REQUIRE_APPROVAL".to_string(),
            approval_required: "SENIOR_ENGINEER or TECH_LEAD".to_string(),
            affected_count: 2,
            deletion_count: 0,
            affected_components: vec!["aws_vpc".to_string()],
            risk_attributes: attrs,
            recommendations: vec![],
        }
    }

    fn attrs() -> RiskAttributes {
        RiskAttributes {
            blast_radius: BlastRadiusMetrics {
                affected_resources: 2,
                affected_components: 1,
                changed_resources: 2,
            },
            shared_dependencies: vec![],
            critical_infrastructure: vec![],
            sensitive_deletions: vec![],
            security_exposures: vec![],
            cost_alerts: vec![],
            action_types: vec!["UPDATE".to_string()],
            risk_breakdown: RiskBreakdown {
                primary_dimension: "infrastructure".to_string(),
                dimensions: DimensionScores::default(),
                interaction_multiplier: 1.0,
                blast_contribution: 0.0,
            },
        }
    }

    #[test]
    fn overall_id_ladder() {
        let mut a = attrs();
        assert_eq!(
            overall_explanation_id(&a),
            ExplanationId::SingleResourceLowRisk
        );

        a.action_types = vec!["DELETE".to_string()];
        assert_eq!(
            overall_explanation_id(&a),
            ExplanationId::DeleteOperationDetected
        );

        a.shared_dependencies.push(SharedDependency {
            resource_id: "aws_lb.shared".to_string(),
            resource_type: "aws_lb".to_string(),
            dependents: 3,
            is_critical: true,
            multiplier_applied: Some(1.3),
            risk_reason: "Impacts multiple load-balanced services".to_string(),
        });
        assert_eq!(
            overall_explanation_id(&a),
            ExplanationId::CriticalSharedDependencyModification
        );
    }

    #[test]
    fn resource_explanation_falls_back_to_not_found() {
        let output = output_with(attrs());
        let (text, id) = explain_resource(&output, "aws_vpc.ghost");
        assert_eq!(id, ExplanationId::ResourceNotFound);
        assert!(text.contains("not found"));
    }

    #[test]
    fn shortened_resource_id_resolves_by_containment() {
        let mut a = attrs();
        a.shared_dependencies.push(SharedDependency {
            resource_id: "module.net.aws_lb.shared".to_string(),
            resource_type: "aws_lb".to_string(),
            dependents: 2,
            is_critical: false,
            multiplier_applied: None,
            risk_reason: "Impacts multiple load-balanced services".to_string(),
        });
        let output = output_with(a);

        let (text, id) = explain_resource(&output, "aws_lb.shared");
        assert_eq!(id, ExplanationId::ResourceSharedNonCritical);
        assert!(text.starts_with("module.net.aws_lb.shared is a shared resource"));
    }

    #[test]
    fn risk_reason_wording_is_type_driven() {
        assert_eq!(risk_reason("aws_vpc", 1, false, true), "Core networking infrastructure");
        assert_eq!(
            risk_reason("aws_vpc", 6, true, true),
            "Broad blast radius across networking layer"
        );
        assert_eq!(
            risk_reason("aws_lb", 3, true, true),
            "Impacts multiple load-balanced services"
        );
        assert!(risk_reason("aws_db_instance", 0, false, false).contains("data loss"));
    }

    #[test]
    fn explanation_id_serializes_screaming_snake() {
        let value = serde_json::to_value(ExplanationId::SharedInfrastructureChange).unwrap();
        assert_eq!(value, serde_json::json!("SHARED_INFRASTRUCTURE_CHANGE"));
    }
}
