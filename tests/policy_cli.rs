//! Policy gate scenarios: exit-code translation under both enforcement
//! modes.

mod common;

use assert_cmd::Command;
use common::{db_delete_with_open_ssh_plan, single_bucket_create_plan, write_json, write_text};
use predicates::str::contains;
use tempfile::TempDir;

fn preapply(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("preapply").unwrap();
    cmd.current_dir(dir.path());
    cmd.env_remove("PREAPPLY_CONFIG");
    cmd
}

const BLOCK_RISKY_POLICY: &str = "\
rules:
  - id: block-risky-exposed
    description: block high-risk changes with security exposures
    match:
      risk_level: [HIGH, CRITICAL]
      has_security_exposures: true
    action: fail
";

const WARN_POLICY: &str = "\
rules:
  - id: note-risky-exposed
    description: note high-risk changes with security exposures
    match:
      risk_level: [HIGH, CRITICAL]
      has_security_exposures: true
    action: warn
";

#[test]
fn failing_rule_blocks_in_auto_mode() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &db_delete_with_open_ssh_plan());
    let policy = write_text(&dir, "policy.yaml", BLOCK_RISKY_POLICY);

    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&policy)
        .args(["--enforcement-mode", "auto"])
        .assert()
        .code(2)
        .stdout(contains("[FAIL] Policy 'block-risky-exposed'"))
        .stdout(contains("Policy check FAILED"))
        .stdout(contains("1 policy violation(s) found"));
}

#[test]
fn failing_rule_pauses_in_manual_mode() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &db_delete_with_open_ssh_plan());
    let policy = write_text(&dir, "policy.yaml", BLOCK_RISKY_POLICY);

    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&policy)
        .args(["--enforcement-mode", "manual"])
        .assert()
        .code(3);
}

#[test]
fn warn_rule_passes_with_warning_count() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &db_delete_with_open_ssh_plan());
    let policy = write_text(&dir, "policy.yaml", WARN_POLICY);

    let output = preapply(&dir)
        .args(["policy", "check", "--quiet", "--json"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&policy)
        .args(["--enforcement-mode", "auto"])
        .assert()
        .code(0)
        .get_output()
        .stdout
        .clone();

    let result: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(result["passed"], true);
    assert_eq!(result["failure_count"], 0);
    assert_eq!(result["warning_count"], 1);
    assert_eq!(result["results"][0]["matched"], true);
    assert_eq!(result["results"][0]["action"], "warn");
}

#[test]
fn non_matching_rules_pass_clean() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &single_bucket_create_plan());
    let policy = write_text(&dir, "policy.yaml", BLOCK_RISKY_POLICY);

    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&policy)
        .assert()
        .code(0)
        .stdout(contains("Policy check PASSED"));
}

#[test]
fn environment_file_sets_manual_mode() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &db_delete_with_open_ssh_plan());
    let policy = write_text(&dir, "policy.yaml", BLOCK_RISKY_POLICY);
    let environment = write_text(
        &dir,
        "env.yaml",
        "environment:\n  name: production\n  enforcement_mode: manual\n",
    );

    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&policy)
        .args(["--environment"])
        .arg(&environment)
        .assert()
        .code(3);

    // The flag beats the file.
    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&policy)
        .args(["--environment"])
        .arg(&environment)
        .args(["--enforcement-mode", "auto"])
        .assert()
        .code(2);
}

#[test]
fn legacy_policies_key_still_loads() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &db_delete_with_open_ssh_plan());
    let policy = write_text(
        &dir,
        "policy.yaml",
        "policies:\n  - id: legacy-block\n    match:\n      action_type: DELETE\n    action: fail\n",
    );

    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&policy)
        .args(["--enforcement-mode", "auto"])
        .assert()
        .code(2);
}

#[test]
fn broken_policy_files_exit_one() {
    let dir = TempDir::new().unwrap();
    let plan = write_json(&dir, "plan.json", &single_bucket_create_plan());

    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file", "ghost.yaml"])
        .assert()
        .code(1)
        .stderr(contains("PolicyLoadError"));

    let malformed = write_text(&dir, "broken.yaml", "rules: [not: closed");
    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&malformed)
        .assert()
        .code(1)
        .stderr(contains("PolicyLoadError"));

    let empty = write_text(&dir, "empty.yaml", "rules: []\n");
    preapply(&dir)
        .args(["policy", "check", "--quiet"])
        .arg(&plan)
        .args(["--policy-file"])
        .arg(&empty)
        .assert()
        .code(1)
        .stderr(contains("PolicyLoadError"));
}
