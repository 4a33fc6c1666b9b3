//! Configuration loading and resolution.
//!
//! All tunable behavior lives in one YAML document. The file is read once at
//! startup and resolved into an immutable [`Config`] that every stage
//! receives by reference; there are no other knobs. Precedence for locating
//! the file: `--config` flag, then `PREAPPLY_CONFIG`, then `.preapply.yaml`
//! in the working directory, then built-in defaults.

use crate::errors::{PreApplyError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = ".preapply.yaml";
pub const CONFIG_ENV_VAR: &str = "PREAPPLY_CONFIG";

const DEFAULT_SENSITIVE_PORTS: [u16; 7] = [22, 3389, 1433, 3306, 5432, 5439, 27017];

const DEFAULT_CRITICAL_TYPES: [&str; 9] = [
    "aws_lb",
    "aws_alb",
    "aws_nlb",
    "aws_vpc",
    "aws_subnet",
    "aws_eks_cluster",
    "aws_ecs_cluster",
    "aws_rds_cluster",
    "aws_elasticache_replication_group",
];

const DEFAULT_SENSITIVE_DELETE_TYPES: [&str; 4] = [
    "aws_db_instance",
    "aws_rds_cluster",
    "aws_s3_bucket",
    "aws_dynamodb_table",
];

/// Resolved configuration: every tunable flattened to its effective value.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_loss_base: f64,
    pub data_loss_decay: f64,
    pub state_destructive_multiplier: f64,

    pub security_base: f64,
    pub security_decay: f64,
    pub sensitive_port_penalty: f64,
    pub sensitive_ports: Vec<u16>,

    pub shared_resource_base: f64,
    pub critical_multiplier: f64,
    pub delete_multiplier: f64,
    pub update_multiplier: f64,
    pub create_multiplier: f64,

    pub cost_creation_weight: f64,
    pub cost_scaling_weight: f64,
    pub cost_decay: f64,

    pub interactions: Interactions,
    pub blast_base_multiplier: f64,
    pub blast_weights: BlastWeights,
    pub thresholds: Thresholds,

    pub critical_types: Vec<String>,
    pub sensitive_delete_types: Vec<String>,

    pub high_cost_types: Vec<String>,
    pub high_cost_instance_types: Vec<String>,
    /// Ordered instance-type prefixes; position in the list is the tier.
    pub instance_cost_tiers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Interactions {
    pub data_security: PairBonus,
    pub infrastructure_security: PairBonus,
    pub data_infrastructure: PairBonus,
    pub cost_infrastructure: PairBonus,
    pub perfect_storm_threshold: f64,
    pub perfect_storm_bonus: f64,
    pub two_dim_bonus: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PairBonus {
    pub thresholds: (f64, f64),
    pub bonus: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct BlastWeights {
    pub data: f64,
    pub security: f64,
    pub infrastructure: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub critical_catastrophic: f64,
    pub critical: f64,
    pub high_severe: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_loss_base: 50.0,
            data_loss_decay: 0.85,
            state_destructive_multiplier: 0.6,
            security_base: 40.0,
            security_decay: 0.90,
            sensitive_port_penalty: 20.0,
            sensitive_ports: DEFAULT_SENSITIVE_PORTS.to_vec(),
            shared_resource_base: 30.0,
            critical_multiplier: 1.3,
            delete_multiplier: 2.0,
            update_multiplier: 1.5,
            create_multiplier: 1.0,
            cost_creation_weight: 15.0,
            cost_scaling_weight: 10.0,
            cost_decay: 0.90,
            interactions: Interactions {
                data_security: PairBonus {
                    thresholds: (40.0, 40.0),
                    bonus: 0.35,
                },
                infrastructure_security: PairBonus {
                    thresholds: (60.0, 40.0),
                    bonus: 0.30,
                },
                data_infrastructure: PairBonus {
                    thresholds: (40.0, 60.0),
                    bonus: 0.25,
                },
                cost_infrastructure: PairBonus {
                    thresholds: (30.0, 60.0),
                    bonus: 0.20,
                },
                perfect_storm_threshold: 35.0,
                perfect_storm_bonus: 0.40,
                two_dim_bonus: 0.15,
            },
            blast_base_multiplier: 10.0,
            blast_weights: BlastWeights {
                data: 0.2,
                security: 0.4,
                infrastructure: 1.0,
                cost: 0.5,
            },
            thresholds: Thresholds {
                critical_catastrophic: 200.0,
                critical: 150.0,
                high_severe: 100.0,
                high: 70.0,
                medium: 40.0,
            },
            critical_types: DEFAULT_CRITICAL_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sensitive_delete_types: DEFAULT_SENSITIVE_DELETE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            high_cost_types: Vec::new(),
            high_cost_instance_types: Vec::new(),
            instance_cost_tiers: Vec::new(),
        }
    }
}

impl Config {
    /// Locate and load the configuration. A missing default file is not an
    /// error; a missing explicitly-requested file is.
    pub fn load(flag_path: Option<&Path>) -> Result<Config> {
        let explicit = flag_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        let path = match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(PreApplyError::ConfigLoad(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                path
            }
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    debug!("no config file found, using built-in defaults");
                    return Ok(Config::default());
                }
                default
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|err| {
            PreApplyError::ConfigLoad(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Config> {
        let file: ConfigFile = serde_yaml::from_str(text)
            .map_err(|err| PreApplyError::ConfigLoad(format!("invalid config YAML: {}", err)))?;
        Ok(file.resolve())
    }

    pub fn tier_of_instance_type(&self, instance_type: &str) -> Option<usize> {
        self.instance_cost_tiers
            .iter()
            .position(|prefix| instance_type.starts_with(prefix.as_str()))
    }
}

// File-schema types. Everything is optional; absent keys fall back to the
// compiled defaults so a partial config stays valid.

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    risk_scoring: Option<RiskScoringSection>,
    shared_resources: Option<SharedResourcesSection>,
    cost_alerts: Option<CostAlertsSection>,
    /// Legacy top-level section from pre-`risk_scoring` configs.
    blast_radius: Option<LegacyBlastRadiusSection>,
}

#[derive(Debug, Default, Deserialize)]
struct RiskScoringSection {
    data_loss: Option<DataLossSection>,
    security: Option<SecuritySection>,
    infrastructure: Option<InfrastructureSection>,
    cost: Option<CostSection>,
    interactions: Option<InteractionsSection>,
    blast_radius: Option<BlastRadiusSection>,
    thresholds: Option<ThresholdsSection>,
}

#[derive(Debug, Default, Deserialize)]
struct DataLossSection {
    base_weight: Option<f64>,
    decay_factor: Option<f64>,
    state_destructive_multiplier: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SecuritySection {
    base_weight: Option<f64>,
    decay_factor: Option<f64>,
    sensitive_port_penalty: Option<f64>,
    sensitive_ports: Option<Vec<u16>>,
}

#[derive(Debug, Default, Deserialize)]
struct InfrastructureSection {
    shared_resource_base: Option<f64>,
    critical_multiplier: Option<f64>,
    delete_multiplier: Option<f64>,
    update_multiplier: Option<f64>,
    create_multiplier: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CostSection {
    creation_weight: Option<f64>,
    scaling_weight: Option<f64>,
    decay_factor: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct InteractionsSection {
    data_security: Option<PairSection>,
    infrastructure_security: Option<PairSection>,
    data_infrastructure: Option<PairSection>,
    cost_infrastructure: Option<PairSection>,
    perfect_storm_threshold: Option<f64>,
    perfect_storm_bonus: Option<f64>,
    two_dim_bonus: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PairSection {
    thresholds: Option<[f64; 2]>,
    bonus: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct BlastRadiusSection {
    base_multiplier: Option<f64>,
    weights: Option<BlastWeightsSection>,
}

#[derive(Debug, Default, Deserialize)]
struct BlastWeightsSection {
    data: Option<f64>,
    security: Option<f64>,
    infrastructure: Option<f64>,
    cost: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdsSection {
    critical_catastrophic: Option<f64>,
    critical: Option<f64>,
    high_severe: Option<f64>,
    high: Option<f64>,
    medium: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SharedResourcesSection {
    critical_types: Option<Vec<String>>,
    sensitive_delete_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct CostAlertsSection {
    high_cost_types: Option<Vec<String>>,
    high_cost_instance_types: Option<Vec<String>>,
    instance_cost_tiers: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyBlastRadiusSection {
    shared_resource_weight: Option<f64>,
    critical_infrastructure_multiplier: Option<f64>,
    delete_action_multiplier: Option<f64>,
    update_action_multiplier: Option<f64>,
    create_action_multiplier: Option<f64>,
}

impl ConfigFile {
    fn resolve(self) -> Config {
        let mut config = Config::default();

        // One-shot migration: older configs carried the scoring knobs on a
        // top-level blast_radius section instead of risk_scoring.
        if self.risk_scoring.is_none() {
            if let Some(legacy) = &self.blast_radius {
                debug!("migrating legacy blast_radius config keys into risk_scoring defaults");
                set(&mut config.shared_resource_base, legacy.shared_resource_weight);
                set(
                    &mut config.critical_multiplier,
                    legacy.critical_infrastructure_multiplier,
                );
                set(&mut config.delete_multiplier, legacy.delete_action_multiplier);
                set(&mut config.update_multiplier, legacy.update_action_multiplier);
                set(&mut config.create_multiplier, legacy.create_action_multiplier);
            }
        }

        if let Some(rs) = self.risk_scoring {
            if let Some(s) = rs.data_loss {
                set(&mut config.data_loss_base, s.base_weight);
                set(&mut config.data_loss_decay, s.decay_factor);
                set(
                    &mut config.state_destructive_multiplier,
                    s.state_destructive_multiplier,
                );
            }
            if let Some(s) = rs.security {
                set(&mut config.security_base, s.base_weight);
                set(&mut config.security_decay, s.decay_factor);
                set(&mut config.sensitive_port_penalty, s.sensitive_port_penalty);
                if let Some(ports) = s.sensitive_ports {
                    config.sensitive_ports = ports;
                }
            }
            if let Some(s) = rs.infrastructure {
                set(&mut config.shared_resource_base, s.shared_resource_base);
                set(&mut config.critical_multiplier, s.critical_multiplier);
                set(&mut config.delete_multiplier, s.delete_multiplier);
                set(&mut config.update_multiplier, s.update_multiplier);
                set(&mut config.create_multiplier, s.create_multiplier);
            }
            if let Some(s) = rs.cost {
                set(&mut config.cost_creation_weight, s.creation_weight);
                set(&mut config.cost_scaling_weight, s.scaling_weight);
                set(&mut config.cost_decay, s.decay_factor);
            }
            if let Some(s) = rs.interactions {
                apply_pair(&mut config.interactions.data_security, s.data_security);
                apply_pair(
                    &mut config.interactions.infrastructure_security,
                    s.infrastructure_security,
                );
                apply_pair(
                    &mut config.interactions.data_infrastructure,
                    s.data_infrastructure,
                );
                apply_pair(
                    &mut config.interactions.cost_infrastructure,
                    s.cost_infrastructure,
                );
                set(
                    &mut config.interactions.perfect_storm_threshold,
                    s.perfect_storm_threshold,
                );
                set(
                    &mut config.interactions.perfect_storm_bonus,
                    s.perfect_storm_bonus,
                );
                set(&mut config.interactions.two_dim_bonus, s.two_dim_bonus);
            }
            if let Some(s) = rs.blast_radius {
                set(&mut config.blast_base_multiplier, s.base_multiplier);
                if let Some(w) = s.weights {
                    set(&mut config.blast_weights.data, w.data);
                    set(&mut config.blast_weights.security, w.security);
                    set(&mut config.blast_weights.infrastructure, w.infrastructure);
                    set(&mut config.blast_weights.cost, w.cost);
                }
            }
            if let Some(s) = rs.thresholds {
                set(
                    &mut config.thresholds.critical_catastrophic,
                    s.critical_catastrophic,
                );
                set(&mut config.thresholds.critical, s.critical);
                set(&mut config.thresholds.high_severe, s.high_severe);
                set(&mut config.thresholds.high, s.high);
                set(&mut config.thresholds.medium, s.medium);
            }
        }

        if let Some(s) = self.shared_resources {
            if let Some(types) = s.critical_types {
                config.critical_types = types;
            }
            if let Some(types) = s.sensitive_delete_types {
                config.sensitive_delete_types = types;
            }
        }

        if let Some(s) = self.cost_alerts {
            if let Some(types) = s.high_cost_types {
                config.high_cost_types = types;
            }
            if let Some(types) = s.high_cost_instance_types {
                config.high_cost_instance_types = types;
            }
            if let Some(tiers) = s.instance_cost_tiers {
                config.instance_cost_tiers = tiers;
            }
        }

        config
    }
}

fn set<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn apply_pair(target: &mut PairBonus, section: Option<PairSection>) {
    if let Some(section) = section {
        if let Some([a, b]) = section.thresholds {
            target.thresholds = (a, b);
        }
        set(&mut target.bonus, section.bonus);
    }
}
