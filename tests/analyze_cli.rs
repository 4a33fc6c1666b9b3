//! End-to-end analysis scenarios driven through the binary.

mod common;

use assert_cmd::Command;
use common::{
    db_delete_with_open_ssh_plan, multi_failure_plan, read_json, single_bucket_create_plan,
    vpc_update_plan, write_json,
};
use predicates::str::contains;
use tempfile::TempDir;

fn preapply(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("preapply").unwrap();
    // Keep the working directory away from any real .preapply.yaml.
    cmd.current_dir(dir.path());
    cmd.env_remove("PREAPPLY_CONFIG");
    cmd
}

#[test]
fn quiet_bucket_create_is_low_risk() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &single_bucket_create_plan());

    let output = preapply(&dir)
        .args(["analyze", "--json", "--quiet"])
        .arg(&plan)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["risk_level"], "LOW");
    assert_eq!(report["risk_level_detailed"], "LOW");
    assert_eq!(report["blast_radius_score"], 0.0);
    assert_eq!(report["risk_action"], "AUTO_APPROVE");
    assert_eq!(report["approval_required"], "NONE");
    assert_eq!(report["affected_count"], 1);
    assert_eq!(report["deletion_count"], 0);
    assert_eq!(report["recommendations"], serde_json::json!([]));
    assert_eq!(report["version"], "1.0.0");
}

#[test]
fn critical_vpc_update_crosses_into_high() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &vpc_update_plan());

    let output = preapply(&dir)
        .args(["analyze", "--json", "--quiet"])
        .arg(&plan)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let breakdown = &report["risk_attributes"]["risk_breakdown"];
    assert_eq!(breakdown["dimensions"]["infrastructure"], 58.5);
    assert_eq!(breakdown["dimensions"]["data"], 0.0);
    assert_eq!(breakdown["primary_dimension"], "infrastructure");
    assert_eq!(breakdown["interaction_multiplier"], 1.0);
    assert_eq!(report["affected_count"], 2);
    assert_eq!(report["blast_radius_score"], 74.35);
    assert_eq!(report["risk_level_detailed"], "HIGH");
    assert_eq!(report["risk_action"], "REQUIRE_APPROVAL");
}

#[test]
fn database_delete_with_open_ssh_requires_approval() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &db_delete_with_open_ssh_plan());

    let output = preapply(&dir)
        .args(["analyze", "--json", "--quiet"])
        .arg(&plan)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let breakdown = &report["risk_attributes"]["risk_breakdown"];
    assert_eq!(breakdown["dimensions"]["data"], 50.0);
    assert_eq!(breakdown["dimensions"]["security"], 60.0);
    assert_eq!(breakdown["primary_dimension"], "security");
    assert_eq!(breakdown["interaction_multiplier"], 1.5);
    assert_eq!(breakdown["blast_contribution"], 4.0);
    assert_eq!(report["blast_radius_score"], 94.0);
    assert_eq!(report["risk_level"], "HIGH");
    assert_eq!(report["risk_level_detailed"], "HIGH");
    assert_eq!(report["risk_action"], "REQUIRE_APPROVAL");

    let exposures = report["risk_attributes"]["security_exposures"].as_array().unwrap();
    assert_eq!(exposures.len(), 1);
    assert_eq!(exposures[0]["kind"], "ingress_cidr");
    assert_eq!(exposures[0]["port"], 22);
    assert_eq!(exposures[0]["severity"], "HIGH");

    let deletions = report["risk_attributes"]["sensitive_deletions"].as_array().unwrap();
    assert_eq!(deletions[0]["resource_id"], "aws_db_instance.production");
    assert_eq!(
        report["recommendations"],
        serde_json::json!([
            "verify backup before proceeding",
            "restrict ingress to known CIDR ranges"
        ])
    );
}

#[test]
fn stacked_failures_project_to_critical() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &multi_failure_plan());

    let output = preapply(&dir)
        .args(["analyze", "--json", "--quiet"])
        .arg(&plan)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let breakdown = &report["risk_attributes"]["risk_breakdown"];
    // Two deletions plus the weakened bucket: 50 + 42.5 + 21.675.
    let data = breakdown["dimensions"]["data"].as_f64().unwrap();
    assert!((data - 114.175).abs() < 0.01, "data dimension was {data}");
    assert_eq!(breakdown["dimensions"]["security"], 60.0);
    assert_eq!(breakdown["dimensions"]["infrastructure"], 58.5);
    // Perfect storm (three elevated) stacked with data+security.
    assert_eq!(breakdown["interaction_multiplier"], 1.75);
    assert_eq!(breakdown["primary_dimension"], "data");

    assert_eq!(report["risk_level"], "CRITICAL");
    assert_eq!(report["risk_level_detailed"], "CRITICAL-CATASTROPHIC");
    assert!(report["blast_radius_score"].as_f64().unwrap() >= 150.0);
    assert_eq!(report["affected_count"], 7);
    assert_eq!(report["deletion_count"], 2);

    let shared = report["risk_attributes"]["shared_dependencies"].as_array().unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0]["resource_id"], "aws_lb.shared");
    assert_eq!(shared[0]["dependents"], 3);
    assert_eq!(shared[0]["is_critical"], true);

    assert!(report["recommendations"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("apply in stages to reduce blast radius")));
}

#[test]
fn analysis_output_is_byte_identical_across_runs() {
    // P1: determinism of the emitted bytes, not just the numbers.
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &multi_failure_plan());

    let run = || {
        preapply(&dir)
            .args(["analyze", "--json", "--quiet"])
            .arg(&plan)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    assert_eq!(run(), run());
}

#[test]
fn output_flag_writes_the_report_to_a_file() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &single_bucket_create_plan());
    let out = dir.path().join("analysis.json");

    preapply(&dir)
        .args(["analyze", "--json", "--quiet", "--output"])
        .arg(&out)
        .arg(&plan)
        .assert()
        .success();

    let report = read_json(&out);
    assert_eq!(report["risk_level"], "LOW");
}

#[test]
fn summary_command_emits_one_paragraph() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &vpc_update_plan());

    preapply(&dir)
        .args(["summary", "--quiet"])
        .arg(&plan)
        .assert()
        .success()
        .stdout(contains("This change has HIGH risk"));
}

#[test]
fn explain_resolves_saved_analysis_and_resources() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &multi_failure_plan());
    let saved = dir.path().join("analysis.json");

    preapply(&dir)
        .args(["analyze", "--json", "--quiet", "--output"])
        .arg(&saved)
        .arg(&plan)
        .assert()
        .success();

    preapply(&dir)
        .args(["explain", "--quiet", "--list-resources"])
        .arg(&saved)
        .assert()
        .success()
        .stdout(contains("aws_lb.shared"));

    preapply(&dir)
        .args(["explain", "--quiet"])
        .arg(&saved)
        .arg("aws_lb.shared")
        .assert()
        .success()
        .stdout(contains("aws_lb.shared is a critical and shared resource"));

    // Unknown resource ids are a runtime error.
    preapply(&dir)
        .args(["explain", "--quiet"])
        .arg(&saved)
        .arg("aws_vpc.ghost")
        .assert()
        .code(1);
}

#[test]
fn bad_inputs_exit_one() {
    let dir = TempDir::new().unwrap();

    preapply(&dir)
        .args(["analyze", "missing-plan.json"])
        .assert()
        .code(1)
        .stderr(contains("PlanLoadError"));

    let invalid = common::write_text(&dir, "invalid.json", "{not json");
    preapply(&dir)
        .arg("analyze")
        .arg(&invalid)
        .assert()
        .code(1)
        .stderr(contains("PlanLoadError"));

    let no_changes = common::write_text(&dir, "partial.json", r#"{"format_version": "1.2"}"#);
    preapply(&dir)
        .arg("analyze")
        .arg(&no_changes)
        .assert()
        .code(1)
        .stderr(contains("PlanStructureError"));

    let plan = write_json(&dir, "plan.json", &single_bucket_create_plan());
    preapply(&dir)
        .args(["analyze", "--no-such-flag"])
        .arg(&plan)
        .assert()
        .code(1);
}

#[test]
fn config_file_overrides_thresholds() {
    // Lowering the HIGH threshold reclassifies the VPC scenario.
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &vpc_update_plan());
    let config = common::write_text(
        &dir,
        "strict.yaml",
        "risk_scoring:\n  thresholds:\n    high_severe: 74\n",
    );

    let output = preapply(&dir)
        .args(["analyze", "--json", "--quiet", "--config"])
        .arg(&config)
        .arg(&plan)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["risk_level_detailed"], "HIGH-SEVERE");

    // PREAPPLY_CONFIG carries the same weight when the flag is absent.
    let output = preapply(&dir)
        .env("PREAPPLY_CONFIG", &config)
        .args(["analyze", "--json", "--quiet"])
        .arg(&plan)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["risk_level_detailed"], "HIGH-SEVERE");

    // The flag wins over the environment variable.
    let default_config = common::write_text(&dir, "defaults.yaml", "risk_scoring: {}\n");
    let output = preapply(&dir)
        .env("PREAPPLY_CONFIG", &config)
        .args(["analyze", "--json", "--quiet", "--config"])
        .arg(&default_config)
        .arg(&plan)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["risk_level_detailed"], "HIGH");

    // A config path that does not exist is a runtime error.
    preapply(&dir)
        .args(["analyze", "--json", "--quiet", "--config", "ghost.yaml"])
        .arg(&plan)
        .assert()
        .code(1)
        .stderr(contains("ConfigLoadError"));
}
