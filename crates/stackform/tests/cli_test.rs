#![allow(deprecated)] // cargo_bin is deprecated in recent assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const TEMPLATE: &str = r#"
Parameters:
  StackName:
    Type: String
    Default: WebStack

Resources:
  PublicIp:
    Type: FloatingIP
    DropletID: MyDroplet
  Web:
    Type: Droplet
    Name: MyDroplet
    Region: nyc3
    Size: s-1vcpu-1gb
    Image:
      Slug: ubuntu-22-04-x64
"#;

/// Command isolated from the caller's environment and config files
fn stackform(dir: &TempDir) -> Command {
    let config = dir.path().join("settings.yaml");
    fs::write(&config, "").unwrap();

    let mut cmd = Command::cargo_bin("stackform").unwrap();
    cmd.current_dir(dir.path())
        .env("STACKFORM_CONFIG_PATH", &config)
        .env_remove("DIGITALOCEAN_TOKEN")
        .env_remove("STACKFORM_API_URL")
        .env_remove("STACKFORM_ORDERING")
        .env_remove("STACKFORM_TIMEOUT_SECS")
        .env_remove("RUST_LOG");
    cmd
}

fn write_template(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("stack.yaml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_cli_help() {
    let dir = tempfile::tempdir().unwrap();
    stackform(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("plan"));
}

#[test]
fn test_cli_version() {
    let dir = tempfile::tempdir().unwrap();
    stackform(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stackform"));
}

#[test]
fn test_create_requires_name() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(&dir, TEMPLATE);
    stackform(&dir).arg("create").arg(&template).assert().failure();
}

#[test]
fn test_validate_valid_template() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(&dir, TEMPLATE);
    stackform(&dir)
        .arg("validate")
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains("Template is valid"));
}

#[test]
fn test_validate_reports_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(
        &dir,
        "Resources:\n  Bucket:\n    Type: Bucket\n    Region: nyc3\n",
    );
    stackform(&dir)
        .arg("validate")
        .arg(&template)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bucket"));
}

#[test]
fn test_validate_json() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(&dir, TEMPLATE);
    let output = stackform(&dir)
        .args(["validate", "--json", "--name", "TestStack"])
        .arg(&template)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["stack"], "TestStack");
    assert_eq!(report["valid"], true);
    assert_eq!(report["resources"][0]["name"], "Web");
    assert_eq!(report["resources"][0]["request"]["tags"][0], "TestStack");
}

#[test]
fn test_plan_orders_by_priority() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(&dir, TEMPLATE);
    let output = stackform(&dir)
        .args(["plan", "--json"])
        .arg(&template)
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["ordering"], "priority");
    assert_eq!(plan["steps"][0]["name"], "Web");
    assert_eq!(plan["steps"][1]["name"], "PublicIp");
    assert_eq!(plan["steps"][1]["references"][0], "Web");
}

#[test]
fn test_plan_rejects_malformed_template() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(&dir, "Resources: [");
    stackform(&dir)
        .arg("plan")
        .arg(&template)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse"));
}

#[test]
fn test_create_without_token() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(&dir, TEMPLATE);
    stackform(&dir)
        .args(["create", "--name", "TestStack"])
        .arg(&template)
        .assert()
        .failure()
        .stderr(predicate::str::contains("DIGITALOCEAN_TOKEN"));
}

#[test]
fn test_create_unreachable_provider_fails_every_resource() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(&dir, TEMPLATE);
    let output = stackform(&dir)
        .env("DIGITALOCEAN_TOKEN", "test-token")
        .env("STACKFORM_API_URL", "http://127.0.0.1:9/v2")
        .env("STACKFORM_TIMEOUT_SECS", "5")
        .args(["create", "--json", "--name", "TestStack"])
        .arg(&template)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["status"], "failed");
    assert_eq!(response["outcomes"].as_array().unwrap().len(), 2);
    assert_eq!(response["outcomes"][1]["outcome"], "failed");
}

#[test]
fn test_plan_and_validate_empty_template_without_token() {
    let dir = tempfile::tempdir().unwrap();
    let template = write_template(&dir, "# nothing declared yet\n");
    stackform(&dir)
        .arg("plan")
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains("Build order"));
    stackform(&dir)
        .arg("validate")
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 resources"));
}

#[test]
fn test_validate_names_substituted_reference() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        "{}  Worker:\n    Type: Droplet\n    Name: worker\n    Priority: 5\n    Image: debian-12-x64\n    Tags: [MyDroplet]\n",
        TEMPLATE
    );
    let template = write_template(&dir, &body);
    stackform(&dir)
        .arg("validate")
        .arg(&template)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Tags[0]"))
        .stderr(predicate::str::contains("MyDroplet"));
}
