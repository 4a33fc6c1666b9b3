//! Multi-dimensional risk scoring.
//!
//! Four dimensions are computed independently, the largest one is amplified
//! by the interaction multiplier, and a context-weighted blast term is added
//! on top. Repeated contributions of the same kind decay geometrically so a
//! tenth deletion moves the needle less than the first.

use crate::config::Config;
use crate::contracts::{
    CostAlert, CostAlertKind, DetailedRiskLevel, Dimension, DimensionScores, SecurityExposure,
    StateDestructiveUpdate,
};
use crate::ingest::ResourceAction;
use tracing::info;

/// A resource feeding the infrastructure dimension: shared and changed, or
/// sitting directly beneath a changed dependent.
#[derive(Debug, Clone)]
pub struct InfraContributor {
    pub address: String,
    pub is_critical: bool,
    pub action: ResourceAction,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreInputs {
    /// Addresses of every DELETE resource, any type.
    pub deletions: Vec<String>,
    pub state_destructive: Vec<StateDestructiveUpdate>,
    pub exposures: Vec<SecurityExposure>,
    pub infrastructure: Vec<InfraContributor>,
    pub cost_alerts: Vec<CostAlert>,
    pub affected_count: usize,
}

#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub dimensions: DimensionScores,
    pub primary: Dimension,
    /// 1 + μ.
    pub interaction_multiplier: f64,
    pub blast_contribution: f64,
    pub score: f64,
    pub level: DetailedRiskLevel,
}

pub fn score(inputs: &ScoreInputs, config: &Config) -> ScoreResult {
    let dimensions = DimensionScores {
        data: data_dimension(inputs, config),
        security: security_dimension(&inputs.exposures, config),
        infrastructure: infrastructure_dimension(&inputs.infrastructure, config),
        cost: cost_dimension(&inputs.cost_alerts, config),
    };

    let primary = primary_dimension(&dimensions);
    let interaction_multiplier = 1.0 + interaction_bonus(&dimensions, config);
    let blast_contribution =
        blast_term(inputs.affected_count, config) * blast_weight(primary, config);
    let score = dimensions.get(primary) * interaction_multiplier + blast_contribution;
    let level = tier_for(score, config);

    info!(
        score,
        level = ?level,
        primary = primary.as_str(),
        "risk score calculated"
    );
    ScoreResult {
        dimensions,
        primary,
        interaction_multiplier,
        blast_contribution,
        score,
        level,
    }
}

/// Σ wᵢ·δ^i over contributions ordered by descending weight, ties broken by
/// ascending address so permuting the input plan cannot change the sum.
fn decayed_sum(mut entries: Vec<(f64, String)>, decay: f64) -> f64 {
    entries.sort_by(|(wa, aa), (wb, ab)| {
        wb.partial_cmp(wa)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| aa.cmp(ab))
    });
    entries
        .iter()
        .enumerate()
        .map(|(i, (weight, _))| weight * decay.powi(i as i32))
        .sum()
}

fn data_dimension(inputs: &ScoreInputs, config: &Config) -> f64 {
    let mut entries: Vec<(f64, String)> = inputs
        .deletions
        .iter()
        .map(|address| (config.data_loss_base, address.clone()))
        .collect();
    entries.extend(inputs.state_destructive.iter().map(|update| {
        (
            config.data_loss_base * config.state_destructive_multiplier,
            update.resource_address.clone(),
        )
    }));
    decayed_sum(entries, config.data_loss_decay)
}

fn security_dimension(exposures: &[SecurityExposure], config: &Config) -> f64 {
    let entries = exposures
        .iter()
        .map(|exposure| {
            let penalty = match exposure.port {
                Some(port) if config.sensitive_ports.contains(&port) => {
                    config.sensitive_port_penalty
                }
                _ => 0.0,
            };
            (
                config.security_base + penalty,
                exposure.resource_address.clone(),
            )
        })
        .collect();
    decayed_sum(entries, config.security_decay)
}

/// No decay here: each coupled resource keeps its full weight, because every
/// shared surface is its own failure domain.
fn infrastructure_dimension(contributors: &[InfraContributor], config: &Config) -> f64 {
    contributors
        .iter()
        .map(|contributor| {
            let criticality = if contributor.is_critical {
                config.critical_multiplier
            } else {
                1.0
            };
            let action = match contributor.action {
                ResourceAction::Delete => config.delete_multiplier,
                ResourceAction::Update => config.update_multiplier,
                ResourceAction::Create => config.create_multiplier,
                _ => 1.0,
            };
            config.shared_resource_base * criticality * action
        })
        .sum()
}

fn cost_dimension(alerts: &[CostAlert], config: &Config) -> f64 {
    let entries = alerts
        .iter()
        .map(|alert| {
            let weight = match alert.kind {
                CostAlertKind::HighCostCreate | CostAlertKind::HighCostInstanceCreate => {
                    config.cost_creation_weight
                }
                CostAlertKind::InstanceScaleUp => config.cost_scaling_weight,
            };
            (weight, alert.resource_address.clone())
        })
        .collect();
    decayed_sum(entries, config.cost_decay)
}

/// Largest dimension wins; ties resolve in the fixed order data, security,
/// infrastructure, cost.
fn primary_dimension(dimensions: &DimensionScores) -> Dimension {
    let mut primary = Dimension::Data;
    for dimension in Dimension::ALL {
        if dimensions.get(dimension) > dimensions.get(primary) {
            primary = dimension;
        }
    }
    primary
}

fn interaction_bonus(dimensions: &DimensionScores, config: &Config) -> f64 {
    let ix = &config.interactions;
    let mut bonus = 0.0;

    let pairs = [
        (dimensions.data, dimensions.security, ix.data_security),
        (
            dimensions.infrastructure,
            dimensions.security,
            ix.infrastructure_security,
        ),
        (
            dimensions.data,
            dimensions.infrastructure,
            ix.data_infrastructure,
        ),
        (
            dimensions.cost,
            dimensions.infrastructure,
            ix.cost_infrastructure,
        ),
    ];
    for (first, second, pair) in pairs {
        if first >= pair.thresholds.0 && second >= pair.thresholds.1 {
            bonus += pair.bonus;
        }
    }

    let elevated = Dimension::ALL
        .iter()
        .filter(|&&dimension| dimensions.get(dimension) >= ix.perfect_storm_threshold)
        .count();
    if elevated >= 3 {
        bonus += ix.perfect_storm_bonus;
    } else if elevated == 2 {
        bonus += ix.two_dim_bonus;
    }

    bonus
}

fn blast_term(affected_count: usize, config: &Config) -> f64 {
    if affected_count == 0 {
        return 0.0;
    }
    config.blast_base_multiplier * ((affected_count + 1) as f64).log2()
}

fn blast_weight(primary: Dimension, config: &Config) -> f64 {
    match primary {
        Dimension::Data => config.blast_weights.data,
        Dimension::Security => config.blast_weights.security,
        Dimension::Infrastructure => config.blast_weights.infrastructure,
        Dimension::Cost => config.blast_weights.cost,
    }
}

pub fn tier_for(score: f64, config: &Config) -> DetailedRiskLevel {
    let t = &config.thresholds;
    if score >= t.critical_catastrophic {
        DetailedRiskLevel::CriticalCatastrophic
    } else if score >= t.critical {
        DetailedRiskLevel::Critical
    } else if score >= t.high_severe {
        DetailedRiskLevel::HighSevere
    } else if score >= t.high {
        DetailedRiskLevel::High
    } else if score >= t.medium {
        DetailedRiskLevel::Medium
    } else {
        DetailedRiskLevel::Low
    }
}
