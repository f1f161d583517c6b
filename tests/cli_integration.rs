//! Integration tests for the formbridge binary
//!
//! Each test runs the compiled binary against its own FORMBRIDGE_DIR:
//! - Integration discovery and listing
//! - Form and global settings management
//! - Submission dispatch and the submission log

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Helper to get the formbridge binary path
fn formbridge_binary() -> PathBuf {
    // When running tests, the binary is in target/debug/formbridge
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps
    path.push("formbridge");
    path
}

/// A fresh formbridge directory with a config file, so no user config leaks in
fn setup() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("formbridge.yaml"), "log_level: info\n").unwrap();
    temp
}

fn run(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(formbridge_binary())
        .env("FORMBRIDGE_DIR", dir)
        .env_remove("FORMBRIDGE_CONFIG")
        .stdin(Stdio::null())
        .args(args)
        .output()
        .expect("Failed to execute formbridge")
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let output = run(dir, args);
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn write_manifest(dir: &Path, folder: &str, content: &str) {
    let folder_dir = dir.join("integrations").join(folder);
    fs::create_dir_all(&folder_dir).unwrap();
    fs::write(folder_dir.join("integration.yaml"), content).unwrap();
}

#[test]
fn test_submit_without_form_settings_invokes_nothing() {
    let dir = setup();

    let report = run_json(
        dir.path(),
        &["submit", "-o", "json", r#"{"form_id": "contact", "email": "jane@example.com"}"#],
    );

    assert_eq!(report["form_id"], "contact");
    assert_eq!(report["outcomes"].as_array().unwrap().len(), 0);

    let log = run_json(dir.path(), &["log", "list", "-o", "json"]);
    assert_eq!(log.as_array().unwrap().len(), 0);
}

#[test]
fn test_submit_without_form_id_fails() {
    let dir = setup();

    let output = run(dir.path(), &["submit", "-o", "json", r#"{"email": "jane@example.com"}"#]);
    assert!(!output.status.success());

    let output = run(dir.path(), &["submit", "-o", "json", "not json"]);
    assert!(!output.status.success());
}

#[test]
fn test_builtin_integrations_listed_without_credentials() {
    let dir = setup();

    let output = run(dir.path(), &["settings", "set", "mailchimp", "api_key", "0123456789abcdef-us6"]);
    assert!(output.status.success());

    let list = run_json(dir.path(), &["integration", "list", "-o", "json"]);
    let ids: Vec<&String> = list.as_object().unwrap().keys().collect();
    assert_eq!(ids, vec!["mailchimp", "hubspot"]);
    assert_eq!(list["mailchimp"]["configured"], true);
    assert_eq!(list["hubspot"]["configured"], false);
    assert!(!list.to_string().contains("0123456789abcdef"));

    let configured = run_json(dir.path(), &["integration", "list", "-o", "json", "--configured"]);
    assert_eq!(configured.as_object().unwrap().len(), 1);

    let shown = run_json(dir.path(), &["settings", "show", "mailchimp", "-o", "json"]);
    assert_eq!(shown["api_key"], "****-us6");
}

#[test]
fn test_folder_without_manifest_does_not_stop_discovery() {
    let dir = setup();
    fs::create_dir_all(dir.path().join("integrations").join("aaa-broken")).unwrap();
    write_manifest(dir.path(), "hubspot", "");

    let list = run_json(dir.path(), &["integration", "list", "-o", "json"]);
    let ids: Vec<&String> = list.as_object().unwrap().keys().collect();
    assert_eq!(ids, vec!["hubspot"]);

    let status = run_json(dir.path(), &["status", "-o", "json"]);
    assert_eq!(status["skipped"][0]["folder"], "aaa-broken");
}

#[test]
fn test_form_enable_and_disable() {
    let dir = setup();

    let output = run(
        dir.path(),
        &["form", "enable", "contact", "mailchimp", "--set", "audience_id=abc123", "--set", "double_optin=true"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("forms").join("contact.yaml").exists());

    let form = run_json(dir.path(), &["form", "show", "contact", "-o", "json"]);
    assert_eq!(form["mailchimp"]["enabled"], true);
    assert_eq!(form["mailchimp"]["audience_id"], "abc123");
    assert_eq!(form["mailchimp"]["double_optin"], true);

    let output = run(dir.path(), &["form", "disable", "contact", "mailchimp"]);
    assert!(output.status.success());

    let form = run_json(dir.path(), &["form", "show", "contact", "-o", "json"]);
    assert_eq!(form["mailchimp"]["enabled"], false);
    assert_eq!(form["mailchimp"]["audience_id"], "abc123");
}

#[test]
fn test_form_id_is_checked() {
    let dir = setup();
    let output = run(dir.path(), &["form", "enable", "../escape", "mailchimp"]);
    assert!(!output.status.success());
}

#[test]
fn test_failing_integration_is_logged_and_isolated() {
    let dir = setup();

    // Enabled for the form, but no credentials: each reports a failure
    assert!(run(dir.path(), &["form", "enable", "contact", "mailchimp"]).status.success());
    assert!(run(dir.path(), &["form", "enable", "contact", "hubspot"]).status.success());
    assert!(run(dir.path(), &["form", "enable", "contact", "unknown"]).status.success());

    let report = run_json(
        dir.path(),
        &[
            "submit",
            "-o",
            "json",
            "--submission-id",
            "s-1",
            r#"{"form_data": {"form_id": "contact", "email": "jane@example.com"}}"#,
        ],
    );

    let outcomes = report["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0]["integration_id"], "mailchimp");
    assert_eq!(outcomes[0]["status"], "failed");
    assert_eq!(outcomes[1]["integration_id"], "hubspot");
    assert_eq!(outcomes[1]["status"], "failed");
    assert_eq!(outcomes[2]["status"], "skipped");

    let errors = run_json(dir.path(), &["log", "list", "-o", "json", "--status", "error"]);
    let errors = errors.as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e["submission_id"] == "s-1"));

    let hubspot = run_json(dir.path(), &["log", "list", "-o", "json", "--integration", "hubspot"]);
    assert_eq!(hubspot.as_array().unwrap().len(), 1);
}

#[test]
fn test_validate_reports_missing_settings() {
    let dir = setup();
    assert!(run(dir.path(), &["form", "enable", "contact", "mailchimp"]).status.success());

    let output = run(dir.path(), &["integration", "validate", "mailchimp", "--form", "contact"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("audience_id"));

    assert!(run(dir.path(), &["form", "enable", "contact", "mailchimp", "--set", "audience_id=abc123"]).status.success());
    let output = run(dir.path(), &["integration", "validate", "mailchimp", "--form", "contact"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));
}

#[test]
fn test_integration_info() {
    let dir = setup();

    let info = run_json(dir.path(), &["integration", "info", "hubspot", "-o", "json"]);
    assert_eq!(info["id"], "hubspot");
    assert_eq!(info["actions"][0]["id"], "create_contact");
    assert!(info["auth_fields"].as_array().unwrap().iter().any(|f| f["secret"] == true));

    let output = run(dir.path(), &["integration", "info", "salesforce"]);
    assert!(!output.status.success());
}

#[test]
fn test_init_then_config_get() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("fb");

    let output = run(temp.path(), &["init", "--path", base.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(base.join("integrations").join("mailchimp").join("integration.yaml").exists());

    let output = run(&base, &["config", "get", "paths.forms"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).trim().ends_with("forms"));

    let output = run(&base, &["config", "get", "no.such.key"]);
    assert!(!output.status.success());
}

#[test]
fn test_numeric_audience_id_is_used_at_dispatch() {
    let dir = setup();

    assert!(run(dir.path(), &["settings", "set", "mailchimp", "api_key", "0123456789abcdef-us6"]).status.success());
    let output = run(
        dir.path(),
        &[
            "form",
            "enable",
            "contact",
            "mailchimp",
            "--set",
            "audience_id=4567891230",
            "--set",
            "api_base=http://127.0.0.1:1/3.0",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = run(dir.path(), &["integration", "validate", "mailchimp", "--form", "contact"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));

    let report = run_json(
        dir.path(),
        &["submit", "-o", "json", r#"{"form_id": "contact", "email": "jane@example.com"}"#],
    );
    let outcome = &report["outcomes"][0];
    assert_eq!(outcome["status"], "failed");
    // Transport failure on the audience URL, not a missing audience
    assert!(outcome["message"].as_str().unwrap().contains("/lists/4567891230/members"));
}

#[test]
fn test_form_show_masks_credentials() {
    let dir = setup();

    let output = run(
        dir.path(),
        &["form", "enable", "contact", "mailchimp", "--set", "api_key=0123456789abcdef-us6", "--set", "audience_id=abc123"],
    );
    assert!(output.status.success());

    let form = run_json(dir.path(), &["form", "show", "contact", "-o", "json"]);
    assert_eq!(form["mailchimp"]["api_key"], "****-us6");
    assert_eq!(form["mailchimp"]["audience_id"], "abc123");

    let output = run(dir.path(), &["form", "show", "contact", "-o", "text"]);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("0123456789abcdef"));
}

#[test]
fn test_status_counts_configured_integrations() {
    let dir = setup();
    assert!(run(dir.path(), &["settings", "set", "hubspot", "access_token", "pat-na1-0000"]).status.success());

    let status = run_json(dir.path(), &["status", "-o", "json"]);
    assert_eq!(status["integrations"].as_array().unwrap().len(), 2);
    assert_eq!(status["configured"], 1);

    let configured = run_json(dir.path(), &["integration", "list", "-o", "json", "--configured"]);
    let ids: Vec<&String> = configured.as_object().unwrap().keys().collect();
    assert_eq!(ids, vec!["hubspot"]);
}

#[test]
fn test_console_events_keep_stdout_clean() {
    let dir = setup();
    fs::write(
        dir.path().join("formbridge.yaml"),
        "observability:\n  enabled: true\n  sinks: [stdout]\n",
    )
    .unwrap();

    let output = run(
        dir.path(),
        &["submit", "-o", "json", r#"{"form_id": "contact", "email": "jane@example.com"}"#],
    );
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["form_id"], "contact");
    assert!(String::from_utf8_lossy(&output.stderr).contains("IntegrationsLoaded"));
}

#[test]
fn test_integrations_path_that_is_a_file_is_not_fatal() {
    let dir = setup();
    fs::write(dir.path().join("integrations"), "not a directory").unwrap();

    let list = run_json(dir.path(), &["integration", "list", "-o", "json"]);
    let ids: Vec<&String> = list.as_object().unwrap().keys().collect();
    assert_eq!(ids, vec!["mailchimp", "hubspot"]);

    let report = run_json(
        dir.path(),
        &["submit", "-o", "json", r#"{"form_id": "contact", "email": "jane@example.com"}"#],
    );
    assert_eq!(report["form_id"], "contact");
}
