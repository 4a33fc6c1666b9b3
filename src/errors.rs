//! Error taxonomy for the analysis pipeline.
//!
//! Every failure surfaced to the CLI carries a stable tag so CI logs can be
//! grepped across versions. All variants map to exit code 1; policy blocks
//! use dedicated exit codes and are not errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreApplyError {
    #[error("PlanLoadError: {0}")]
    PlanLoad(String),

    #[error("PlanStructureError: {0}")]
    PlanStructure(String),

    #[error("ConfigLoadError: {0}")]
    ConfigLoad(String),

    #[error("PolicyLoadError: {0}")]
    PolicyLoad(String),

    #[error("InternalInvariantError: invariant {invariant} violated: {details}")]
    InternalInvariant { invariant: String, details: String },
}

impl PreApplyError {
    pub fn invariant(name: &str, details: impl Into<String>) -> Self {
        Self::InternalInvariant {
            invariant: name.to_string(),
            details: details.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PreApplyError>;

/// Process exit codes fixed by the CI contract.
pub mod exit {
    /// Analysis or check completed and nothing blocked.
    pub const SUCCESS: i32 = 0;
    /// Bad input, I/O failure, or schema violation.
    pub const RUNTIME_ERROR: i32 = 1;
    /// Policy failure under `auto` enforcement.
    pub const POLICY_BLOCK: i32 = 2;
    /// Policy failure under `manual` enforcement.
    pub const APPROVAL_REQUIRED: i32 = 3;
}
