//! Plan file loading and structural validation.

use crate::errors::{PreApplyError, Result};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Format versions the analyzer has been exercised against. Newer versions
/// load with a warning; the fields we read have been stable across them.
const KNOWN_FORMAT_VERSIONS: [&str; 6] = ["1.0", "1.1", "1.2", "1.3", "1.4", "1.5"];

/// Load a Terraform plan JSON file and validate its top-level shape.
///
/// The decoded document is returned unchanged; normalization happens later
/// and never mutates this value.
pub fn load_plan(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(PreApplyError::PlanLoad(format!(
            "plan file not found: {} (generate one with: terraform show -json plan.tfplan > plan.json)",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(PreApplyError::PlanLoad(format!(
            "not a file: {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path).map_err(|err| {
        PreApplyError::PlanLoad(format!("cannot read {}: {}", path.display(), err))
    })?;
    let plan: Value = serde_json::from_slice(&bytes).map_err(|err| {
        PreApplyError::PlanLoad(format!("invalid JSON in {}: {}", path.display(), err))
    })?;

    validate_structure(&plan)?;

    let count = plan["resource_changes"].as_array().map_or(0, Vec::len);
    info!(path = %path.display(), resources = count, "loaded plan");
    Ok(plan)
}

/// Check the top-level keys the analyzer relies on.
pub fn validate_structure(plan: &Value) -> Result<()> {
    let object = plan.as_object().ok_or_else(|| {
        PreApplyError::PlanLoad("plan JSON must be an object".to_string())
    })?;

    match object.get("format_version") {
        Some(Value::String(version)) => {
            let major_minor = version.split('.').take(2).collect::<Vec<_>>().join(".");
            if !KNOWN_FORMAT_VERSIONS.contains(&major_minor.as_str()) {
                warn!(format_version = %version, "unrecognized plan format version");
            }
        }
        Some(_) => {
            return Err(PreApplyError::PlanStructure(
                "'format_version' must be a string".to_string(),
            ))
        }
        None => {
            return Err(PreApplyError::PlanStructure(
                "missing 'format_version' (not a Terraform plan JSON?)".to_string(),
            ))
        }
    }

    match object.get("resource_changes") {
        Some(Value::Array(_)) => {}
        Some(_) => {
            return Err(PreApplyError::PlanStructure(
                "'resource_changes' must be an array".to_string(),
            ))
        }
        None => {
            return Err(PreApplyError::PlanStructure(
                "missing 'resource_changes'".to_string(),
            ))
        }
    }

    debug!("plan structure validation passed");
    Ok(())
}
