//! Output contract: versioned, stable, explicit.
//!
//! [`CoreOutput`] is the only JSON the analyzer emits. Field order is fixed
//! by struct declaration order and every array is sorted before emission, so
//! identical plan and config bytes serialize to identical output bytes.

use crate::explain::ExplanationId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const OUTPUT_VERSION: &str = "1.0.0";

/// 4-tier risk level used for policy matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "CRITICAL")]
    Critical,
}

/// 6-tier detailed risk level produced by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DetailedRiskLevel {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    #[serde(rename = "HIGH-SEVERE")]
    HighSevere,
    #[serde(rename = "CRITICAL")]
    Critical,
    #[serde(rename = "CRITICAL-CATASTROPHIC")]
    CriticalCatastrophic,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl DetailedRiskLevel {
    /// Policy-compatibility projection onto the 4-tier taxonomy.
    pub fn project(self) -> RiskLevel {
        match self {
            DetailedRiskLevel::CriticalCatastrophic | DetailedRiskLevel::Critical => {
                RiskLevel::Critical
            }
            DetailedRiskLevel::HighSevere | DetailedRiskLevel::High => RiskLevel::High,
            DetailedRiskLevel::Medium => RiskLevel::Medium,
            DetailedRiskLevel::Low => RiskLevel::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetailedRiskLevel::Low => "LOW",
            DetailedRiskLevel::Medium => "MEDIUM",
            DetailedRiskLevel::High => "HIGH",
            DetailedRiskLevel::HighSevere => "HIGH-SEVERE",
            DetailedRiskLevel::Critical => "CRITICAL",
            DetailedRiskLevel::CriticalCatastrophic => "CRITICAL-CATASTROPHIC",
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            DetailedRiskLevel::CriticalCatastrophic => "HARD_BLOCK",
            DetailedRiskLevel::Critical => "SOFT_BLOCK",
            DetailedRiskLevel::HighSevere | DetailedRiskLevel::High => "REQUIRE_APPROVAL",
            DetailedRiskLevel::Medium => "REQUIRE_PEER_REVIEW",
            DetailedRiskLevel::Low => "AUTO_APPROVE",
        }
    }

    pub fn approval(self) -> &'static str {
        match self {
            DetailedRiskLevel::CriticalCatastrophic => "VP_ENGINEERING + INCIDENT_REVIEW",
            DetailedRiskLevel::Critical => "VP_ENGINEERING or DIRECTOR",
            DetailedRiskLevel::HighSevere => "SENIOR_ENGINEER + ARCHITECT",
            DetailedRiskLevel::High => "SENIOR_ENGINEER or TECH_LEAD",
            DetailedRiskLevel::Medium => "ANY_ENGINEER",
            DetailedRiskLevel::Low => "NONE",
        }
    }
}

/// The four scoring dimensions, in primary-dimension tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Data,
    Security,
    Infrastructure,
    Cost,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Data,
        Dimension::Security,
        Dimension::Infrastructure,
        Dimension::Cost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Data => "data",
            Dimension::Security => "security",
            Dimension::Infrastructure => "infrastructure",
            Dimension::Cost => "cost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureKind {
    IngressCidr,
    EgressCidr,
    S3PublicAcl,
    S3PublicBlockDisabled,
}

impl ExposureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExposureKind::IngressCidr => "ingress_cidr",
            ExposureKind::EgressCidr => "egress_cidr",
            ExposureKind::S3PublicAcl => "s3_public_acl",
            ExposureKind::S3PublicBlockDisabled => "s3_public_block_disabled",
        }
    }
}

/// A publicly-reachable surface introduced or retained by the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityExposure {
    pub resource_address: String,
    pub kind: ExposureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionAttribute {
    ForceDestroy,
    PreventDestroy,
    DeletionProtection,
    BackupRetentionPeriod,
}

/// An UPDATE that weakens a data-protection attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDestructiveUpdate {
    pub resource_address: String,
    pub attribute: ProtectionAttribute,
    pub before: Value,
    pub after: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostAlertKind {
    HighCostCreate,
    HighCostInstanceCreate,
    InstanceScaleUp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAlert {
    pub resource_address: String,
    pub kind: CostAlertKind,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastRadiusMetrics {
    pub affected_resources: usize,
    pub affected_components: usize,
    pub changed_resources: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDependency {
    pub resource_id: String,
    pub resource_type: String,
    pub dependents: usize,
    pub is_critical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier_applied: Option<f64>,
    pub risk_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalInfrastructure {
    pub resource_id: String,
    pub resource_type: String,
    pub risk_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveDeletion {
    pub resource_id: String,
    pub resource_type: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    pub data: f64,
    pub security: f64,
    pub infrastructure: f64,
    pub cost: f64,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Data => self.data,
            Dimension::Security => self.security,
            Dimension::Infrastructure => self.infrastructure,
            Dimension::Cost => self.cost,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub primary_dimension: String,
    pub dimensions: DimensionScores,
    pub interaction_multiplier: f64,
    pub blast_contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAttributes {
    pub blast_radius: BlastRadiusMetrics,
    pub shared_dependencies: Vec<SharedDependency>,
    pub critical_infrastructure: Vec<CriticalInfrastructure>,
    pub sensitive_deletions: Vec<SensitiveDeletion>,
    pub security_exposures: Vec<SecurityExposure>,
    pub cost_alerts: Vec<CostAlert>,
    pub action_types: Vec<String>,
    pub risk_breakdown: RiskBreakdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreOutput {
    pub version: String,
    pub explanation_id: ExplanationId,
    pub risk_level: RiskLevel,
    pub risk_level_detailed: DetailedRiskLevel,
    pub blast_radius_score: f64,
    pub risk_action: String,
    pub approval_required: String,
    pub affected_count: usize,
    pub deletion_count: usize,
    pub affected_components: Vec<String>,
    pub risk_attributes: RiskAttributes,
    pub recommendations: Vec<String>,
}

impl CoreOutput {
    /// Shape check used by `explain` to tell a saved analysis apart from a
    /// Terraform plan (plans carry `format_version`, analyses do not).
    pub fn looks_like_core_output(value: &Value) -> bool {
        value.is_object()
            && value.get("version").is_some()
            && value.get("risk_level").is_some()
            && value.get("blast_radius_score").is_some()
            && value.get("format_version").is_none()
    }
}

/// Round to a fixed number of decimals for emission. Scores stay f64
/// internally; rounding once at the contract boundary keeps output bytes
/// identical across platforms.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
