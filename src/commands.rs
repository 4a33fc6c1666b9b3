//! Command runners: each takes parsed arguments and returns the process
//! exit code. Report bytes go to stdout (or `--output`); progress and
//! errors go to stderr so piped output stays clean.

use crate::analysis;
use crate::cli::{
    AnalyzeArgs, ExplainArgs, PolicyCheckArgs, ReportArtifactArgs, ReportMarkdownArgs,
    SummaryArgs,
};
use crate::config::Config;
use crate::contracts::CoreOutput;
use crate::errors::{exit, PreApplyError, Result};
use crate::explain;
use crate::ingest::loader;
use crate::policy;
use crate::report;
use serde_json::json;
use std::path::Path;

pub fn run_analyze(args: AnalyzeArgs) -> Result<i32> {
    let config = Config::load(args.config.as_deref())?;
    if !args.quiet {
        eprintln!("Loading and validating plan: {}", args.plan.display());
    }
    let plan = loader::load_plan(&args.plan)?;
    let output = analysis::analyze(&plan, &config)?;
    if !args.quiet {
        eprintln!("Analysis complete.");
    }

    let text = if args.json {
        to_pretty_json(&output)?
    } else {
        render_assessment(&output)
    };
    write_report(&text, args.output.as_deref(), args.quiet)?;
    Ok(exit::SUCCESS)
}

pub fn run_explain(args: ExplainArgs) -> Result<i32> {
    let output = load_analysis_or_plan(&args.input, args.config.as_deref(), args.quiet)?;

    if args.list_resources {
        let resources = explain::list_resources(&output);
        if resources.is_empty() {
            println!("No resources found in analysis.");
        } else {
            println!("Available resources for explanation:");
            for resource in resources {
                println!("  - {resource}");
            }
        }
        return Ok(exit::SUCCESS);
    }

    let (explanation, explanation_id) = match &args.resource_id {
        Some(resource_id) => {
            let (text, id) = explain::explain_resource(&output, resource_id);
            if id == explain::ExplanationId::ResourceNotFound {
                eprintln!("error: {text}");
                return Ok(exit::RUNTIME_ERROR);
            }
            (text, id)
        }
        None => {
            let text = explain::explain_overall(&output);
            (text, output.explanation_id)
        }
    };

    if args.json {
        let payload = json!({
            "explanation": explanation,
            "explanation_id": explanation_id.as_str(),
            "resource_id": args.resource_id,
            "risk_level": output.risk_level,
            "blast_radius_score": output.blast_radius_score,
        });
        println!("{}", serde_json::to_string_pretty(&payload).map_err(internal_json)?);
    } else {
        println!("{explanation}");
    }
    Ok(exit::SUCCESS)
}

pub fn run_summary(args: SummaryArgs) -> Result<i32> {
    let config = Config::load(args.config.as_deref())?;
    if !args.quiet {
        eprintln!("Analyzing plan: {}", args.plan.display());
    }
    let plan = loader::load_plan(&args.plan)?;
    let output = analysis::analyze(&plan, &config)?;
    let summary = explain::summarize(&output);

    if args.json {
        let payload = json!({
            "summary": summary,
            "explanation_id": output.explanation_id.as_str(),
            "risk_level": output.risk_level,
            "blast_radius_score": output.blast_radius_score,
        });
        println!("{}", serde_json::to_string_pretty(&payload).map_err(internal_json)?);
    } else {
        println!("{summary}");
    }
    Ok(exit::SUCCESS)
}

pub fn run_policy_check(args: PolicyCheckArgs) -> Result<i32> {
    let config = Config::load(args.config.as_deref())?;
    let environment = match &args.environment {
        Some(path) => Some(policy::load_environment(path)?),
        None => None,
    };
    let mode = policy::effective_mode(environment.as_ref(), args.enforcement_mode.map(Into::into));

    if !args.quiet {
        if let Some(environment) = &environment {
            eprintln!(
                "Environment: {} (enforcement: {})",
                environment.name,
                mode.as_str()
            );
        }
        eprintln!("Analyzing plan: {}", args.plan.display());
    }
    let plan = loader::load_plan(&args.plan)?;
    let output = analysis::analyze(&plan, &config)?;

    if !args.quiet {
        eprintln!("Checking policies from: {}", args.policy_file.display());
    }
    let rules = policy::load_policy(&args.policy_file)?;
    let result = policy::evaluate(&output, &rules);

    if args.json {
        println!("{}", to_pretty_json(&result)?);
    } else {
        for rule_result in result.results.iter().filter(|r| r.matched) {
            let marker = match rule_result.action {
                policy::PolicyAction::Fail => "[FAIL]",
                policy::PolicyAction::Warn => "[WARN]",
            };
            println!("{marker} {}", rule_result.explanation);
        }
        if result.passed {
            println!("Policy check PASSED");
            if result.warning_count > 0 {
                println!("  {} warning(s)", result.warning_count);
            }
        } else {
            println!("Policy check FAILED");
            println!("  {} policy violation(s) found", result.failure_count);
        }
    }

    Ok(result.exit_code(mode))
}

pub fn run_report_markdown(args: ReportMarkdownArgs) -> Result<i32> {
    let output = load_core_output(&args.core_output)?;
    report::write_markdown(&output, &args.output)?;
    if !args.quiet {
        eprintln!("Generated markdown report: {}", args.output.display());
    }
    Ok(exit::SUCCESS)
}

pub fn run_report_artifact(args: ReportArtifactArgs) -> Result<i32> {
    let output = load_core_output(&args.core_output)?;
    report::write_artifacts(&output, &args.output)?;
    if !args.quiet {
        eprintln!("Generated artifacts in: {}", args.output.display());
    }
    Ok(exit::SUCCESS)
}

/// The report commands are strict about their input: only a saved analysis
/// is accepted, never a raw plan.
fn load_core_output(path: &Path) -> Result<CoreOutput> {
    if !path.is_file() {
        return Err(PreApplyError::PlanLoad(format!(
            "file not found: {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(path).map_err(|err| {
        PreApplyError::PlanLoad(format!("cannot read {}: {}", path.display(), err))
    })?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|err| {
        PreApplyError::PlanLoad(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    if !CoreOutput::looks_like_core_output(&value) {
        return Err(PreApplyError::PlanLoad(format!(
            "{} is not a saved analysis (expected CoreOutput JSON)",
            path.display()
        )));
    }
    serde_json::from_value(value).map_err(|err| {
        PreApplyError::PlanLoad(format!(
            "invalid analysis JSON in {}: {}",
            path.display(),
            err
        ))
    })
}

/// `explain` accepts either a saved analysis or a raw plan; saved analyses
/// are recognized by shape so old reports keep working without a flag.
fn load_analysis_or_plan(input: &Path, config: Option<&Path>, quiet: bool) -> Result<CoreOutput> {
    if !input.is_file() {
        return Err(PreApplyError::PlanLoad(format!(
            "file not found: {}",
            input.display()
        )));
    }
    let bytes = std::fs::read(input).map_err(|err| {
        PreApplyError::PlanLoad(format!("cannot read {}: {}", input.display(), err))
    })?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|err| {
        PreApplyError::PlanLoad(format!("invalid JSON in {}: {}", input.display(), err))
    })?;

    if CoreOutput::looks_like_core_output(&value) {
        if !quiet {
            eprintln!("Loaded analysis from: {}", input.display());
        }
        serde_json::from_value(value).map_err(|err| {
            PreApplyError::PlanLoad(format!(
                "invalid analysis JSON in {}: {}",
                input.display(),
                err
            ))
        })
    } else {
        if !quiet {
            eprintln!("Analyzing Terraform plan: {}", input.display());
        }
        loader::validate_structure(&value)?;
        let config = Config::load(config)?;
        analysis::analyze(&value, &config)
    }
}

fn render_assessment(output: &CoreOutput) -> String {
    let mut text = String::new();
    text.push_str("PreApply Risk Assessment\n");
    text.push_str("------------------------\n");
    text.push_str(&format!(
        "Risk level: {} ({}), score {}\n",
        output.risk_level.as_str(),
        output.risk_level_detailed.as_str(),
        output.blast_radius_score
    ));
    text.push_str(&format!(
        "Action: {} (approval: {})\n",
        output.risk_action, output.approval_required
    ));
    text.push_str(&format!(
        "Affected resources: {} ({} changed, {} deleted)\n",
        output.affected_count,
        output.risk_attributes.blast_radius.changed_resources,
        output.deletion_count
    ));
    if !output.affected_components.is_empty() {
        text.push_str(&format!(
            "Components: {}\n",
            output.affected_components.join(", ")
        ));
    }

    let attrs = &output.risk_attributes;
    if !attrs.shared_dependencies.is_empty() {
        text.push_str("Shared dependencies:\n");
        for dep in &attrs.shared_dependencies {
            text.push_str(&format!(
                "  - {} ({} dependents{})\n",
                dep.resource_id,
                dep.dependents,
                if dep.is_critical { ", critical" } else { "" }
            ));
        }
    }
    if !attrs.sensitive_deletions.is_empty() {
        text.push_str("Sensitive deletions:\n");
        for deletion in &attrs.sensitive_deletions {
            text.push_str(&format!(
                "  - {} ({})\n",
                deletion.resource_id, deletion.resource_type
            ));
        }
    }
    if !attrs.security_exposures.is_empty() {
        text.push_str("Security exposures:\n");
        for exposure in &attrs.security_exposures {
            text.push_str(&format!(
                "  - {} ({}, {})\n",
                exposure.resource_address,
                exposure.kind.as_str(),
                exposure.severity.as_str()
            ));
        }
    }
    if !attrs.cost_alerts.is_empty() {
        text.push_str("Cost alerts:\n");
        for alert in &attrs.cost_alerts {
            text.push_str(&format!("  - {}: {}\n", alert.resource_address, alert.details));
        }
    }
    if !output.recommendations.is_empty() {
        text.push_str("Recommendations:\n");
        for recommendation in &output.recommendations {
            text.push_str(&format!("  - {recommendation}\n"));
        }
    }
    text
}

fn write_report(text: &str, output: Option<&Path>, quiet: bool) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        PreApplyError::PlanLoad(format!(
                            "cannot create {}: {}",
                            parent.display(),
                            err
                        ))
                    })?;
                }
            }
            std::fs::write(path, text).map_err(|err| {
                PreApplyError::PlanLoad(format!("cannot write {}: {}", path.display(), err))
            })?;
            if !quiet {
                eprintln!("Output saved to: {}", path.display());
            }
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(internal_json)
}

fn internal_json(err: serde_json::Error) -> PreApplyError {
    PreApplyError::invariant("serializable-output", err.to_string())
}
