//! Report generation from a saved analysis.
//!
//! Both outputs are read-only consumers of a CoreOutput: nothing here
//! re-runs analysis or touches the plan. The artifact bundle is what a CI
//! job archives; the markdown report is what lands in a review thread.
//! Every byte except the metadata timestamp is deterministic.

use crate::contracts::CoreOutput;
use crate::errors::{PreApplyError, Result};
use crate::explain;
use serde::Serialize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

const EXPLANATION_PREVIEW_CHARS: usize = 200;

#[derive(Serialize)]
struct ArtifactSummary<'a> {
    risk_level: &'a str,
    blast_radius_score: f64,
    affected_count: usize,
    affected_components_count: usize,
    explanation_id: &'a str,
    explanation_preview: String,
}

#[derive(Serialize)]
struct ArtifactMetadata<'a> {
    preapply_version: &'a str,
    core_output_version: &'a str,
    generated_at_epoch_ms: u128,
    generator: &'a str,
}

/// Write the four-file CI artifact bundle into `output_dir` (created if
/// missing): `core_output.json`, `summary.json`, `risk_attributes.json`,
/// `metadata.json`. Only the metadata timestamp varies between runs.
pub fn write_artifacts(output: &CoreOutput, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir).map_err(|err| {
        PreApplyError::PlanLoad(format!(
            "cannot create {}: {}",
            output_dir.display(),
            err
        ))
    })?;

    write_json_file(&output_dir.join("core_output.json"), output)?;

    let explanation = explain::explain_overall(output);
    let summary = ArtifactSummary {
        risk_level: output.risk_level.as_str(),
        blast_radius_score: output.blast_radius_score,
        affected_count: output.affected_count,
        affected_components_count: output.affected_components.len(),
        explanation_id: output.explanation_id.as_str(),
        explanation_preview: truncate_chars(&explanation, EXPLANATION_PREVIEW_CHARS),
    };
    write_json_file(&output_dir.join("summary.json"), &summary)?;

    write_json_file(
        &output_dir.join("risk_attributes.json"),
        &output.risk_attributes,
    )?;

    let generated_at_epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0);
    let metadata = ArtifactMetadata {
        preapply_version: env!("CARGO_PKG_VERSION"),
        core_output_version: &output.version,
        generated_at_epoch_ms,
        generator: "preapply report artifact",
    };
    write_json_file(&output_dir.join("metadata.json"), &metadata)?;

    info!(dir = %output_dir.display(), "generated artifact bundle");
    Ok(())
}

/// Render the fixed-structure markdown report.
pub fn render_markdown(output: &CoreOutput) -> String {
    let attrs = &output.risk_attributes;
    let mut lines: Vec<String> = Vec::new();

    lines.push("# PreApply Risk Assessment Report".to_string());
    lines.push(String::new());
    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push(format!("- **Risk Level:** {}", output.risk_level.as_str()));
    lines.push(format!(
        "- **Blast Radius Score:** {}",
        output.blast_radius_score
    ));
    lines.push(format!("- **Affected Resources:** {}", output.affected_count));
    lines.push(format!(
        "- **Affected Components:** {}",
        output.affected_components.len()
    ));
    lines.push(String::new());

    lines.push("## Risk Attributes".to_string());
    lines.push(String::new());

    lines.push("### Blast Radius Metrics".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- **Affected Resources:** {}",
        attrs.blast_radius.affected_resources
    ));
    lines.push(format!(
        "- **Affected Components:** {}",
        attrs.blast_radius.affected_components
    ));
    lines.push(format!(
        "- **Changed Resources:** {}",
        attrs.blast_radius.changed_resources
    ));
    lines.push(String::new());

    lines.push("### Shared Dependencies".to_string());
    lines.push(String::new());
    if attrs.shared_dependencies.is_empty() {
        lines.push("None detected.".to_string());
        lines.push(String::new());
    } else {
        for dep in &attrs.shared_dependencies {
            lines.push(format!(
                "- **{}** (`{}`)",
                dep.resource_type, dep.resource_id
            ));
            lines.push(format!("  - Dependents: {}", dep.dependents));
            lines.push(format!("  - Critical: {}", dep.is_critical));
            if let Some(multiplier) = dep.multiplier_applied {
                lines.push(format!("  - Multiplier Applied: {multiplier}"));
            }
            lines.push(format!("  - Risk Reason: {}", dep.risk_reason));
            lines.push(String::new());
        }
    }

    lines.push("### Critical Infrastructure".to_string());
    lines.push(String::new());
    if attrs.critical_infrastructure.is_empty() {
        lines.push("None detected.".to_string());
        lines.push(String::new());
    } else {
        for crit in &attrs.critical_infrastructure {
            lines.push(format!(
                "- **{}** (`{}`)",
                crit.resource_type, crit.resource_id
            ));
            lines.push(format!("  - Risk Reason: {}", crit.risk_reason));
            lines.push(String::new());
        }
    }

    lines.push("### Sensitive Deletions".to_string());
    lines.push(String::new());
    if attrs.sensitive_deletions.is_empty() {
        lines.push("None detected.".to_string());
    } else {
        for deletion in &attrs.sensitive_deletions {
            lines.push(format!(
                "- **{}** (`{}`)",
                deletion.resource_type, deletion.resource_id
            ));
        }
    }
    lines.push(String::new());

    lines.push("### Security Exposures".to_string());
    lines.push(String::new());
    if attrs.security_exposures.is_empty() {
        lines.push("None detected.".to_string());
    } else {
        for exposure in &attrs.security_exposures {
            let mut line = format!(
                "- `{}`: {} ({})",
                exposure.resource_address,
                exposure.kind.as_str(),
                exposure.severity.as_str()
            );
            if let Some(port) = exposure.port {
                line.push_str(&format!(", port {port}"));
            }
            lines.push(line);
        }
    }
    lines.push(String::new());

    lines.push("### Cost Alerts".to_string());
    lines.push(String::new());
    if attrs.cost_alerts.is_empty() {
        lines.push("None detected.".to_string());
    } else {
        for alert in &attrs.cost_alerts {
            lines.push(format!("- `{}`: {}", alert.resource_address, alert.details));
        }
    }
    lines.push(String::new());

    lines.push("### Action Types".to_string());
    lines.push(String::new());
    if attrs.action_types.is_empty() {
        lines.push("None detected.".to_string());
    } else {
        for action_type in &attrs.action_types {
            lines.push(format!("- `{action_type}`"));
        }
    }
    lines.push(String::new());

    lines.push("## Deterministic Explanation".to_string());
    lines.push(String::new());
    lines.push(format!(
        "**Explanation ID:** `{}`",
        output.explanation_id.as_str()
    ));
    lines.push(String::new());
    lines.push(explain::explain_overall(output));
    lines.push(String::new());

    if !output.recommendations.is_empty() {
        lines.push("## Recommendations".to_string());
        lines.push(String::new());
        for recommendation in &output.recommendations {
            lines.push(format!("- {recommendation}"));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

pub fn write_markdown(output: &CoreOutput, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| {
                PreApplyError::PlanLoad(format!("cannot create {}: {}", parent.display(), err))
            })?;
        }
    }
    std::fs::write(output_path, render_markdown(output)).map_err(|err| {
        PreApplyError::PlanLoad(format!("cannot write {}: {}", output_path.display(), err))
    })?;
    info!(path = %output_path.display(), "generated markdown report");
    Ok(())
}

fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| PreApplyError::invariant("serializable-output", err.to_string()))?;
    std::fs::write(path, json).map_err(|err| {
        PreApplyError::PlanLoad(format!("cannot write {}: {}", path.display(), err))
    })?;
    debug!(path = %path.display(), "wrote artifact");
    Ok(())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
