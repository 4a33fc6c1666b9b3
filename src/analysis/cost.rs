//! Cost alert detection: expensive creations and instance-class scale-ups.

use crate::config::Config;
use crate::contracts::{CostAlert, CostAlertKind};
use crate::ingest::{NormalizedPlan, ResourceAction};
use tracing::info;

/// Types that carry an `instance_type` attribute worth tier-checking.
const INSTANCE_BEARING_TYPES: [&str; 3] =
    ["aws_instance", "aws_db_instance", "aws_launch_template"];

pub fn detect(plan: &NormalizedPlan, config: &Config) -> Vec<CostAlert> {
    let mut alerts = Vec::new();

    for resource in &plan.resources {
        match resource.action {
            ResourceAction::Create => {
                if config.high_cost_types.contains(&resource.r#type) {
                    alerts.push(CostAlert {
                        resource_address: resource.address.clone(),
                        kind: CostAlertKind::HighCostCreate,
                        details: format!("creation of high-cost type {}", resource.r#type),
                    });
                }
                if INSTANCE_BEARING_TYPES.contains(&resource.r#type.as_str()) {
                    let instance_type = resource.after["instance_type"]
                        .as_str()
                        .unwrap_or_default()
                        .trim();
                    if !instance_type.is_empty()
                        && config
                            .high_cost_instance_types
                            .iter()
                            .any(|t| t == instance_type)
                    {
                        alerts.push(CostAlert {
                            resource_address: resource.address.clone(),
                            kind: CostAlertKind::HighCostInstanceCreate,
                            details: format!("creation of high-cost instance type {instance_type}"),
                        });
                    }
                }
            }
            ResourceAction::Update => {
                if !INSTANCE_BEARING_TYPES.contains(&resource.r#type.as_str()) {
                    continue;
                }
                let before_type = resource.before["instance_type"]
                    .as_str()
                    .unwrap_or_default()
                    .trim();
                let after_type = resource.after["instance_type"]
                    .as_str()
                    .unwrap_or_default()
                    .trim();
                if before_type.is_empty() || after_type.is_empty() {
                    continue;
                }
                let scaled_up = match (
                    config.tier_of_instance_type(before_type),
                    config.tier_of_instance_type(after_type),
                ) {
                    (Some(before_tier), Some(after_tier)) => after_tier > before_tier,
                    _ => false,
                };
                if scaled_up {
                    alerts.push(CostAlert {
                        resource_address: resource.address.clone(),
                        kind: CostAlertKind::InstanceScaleUp,
                        details: format!("instance scale-up ({before_type} -> {after_type})"),
                    });
                }
            }
            _ => {}
        }
    }

    if !alerts.is_empty() {
        info!(count = alerts.len(), "cost alerts detected");
    }
    alerts
}
