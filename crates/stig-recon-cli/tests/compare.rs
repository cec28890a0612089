use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../stig-recon-core/tests/fixtures")
        .join(name)
}

fn stig_recon() -> Command {
    let mut cmd = Command::cargo_bin("stig-recon").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn compare_writes_reconciled_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("reconciled.csv");

    stig_recon()
        .arg("compare")
        .arg("--audit-file")
        .arg(fixture("sample.audit"))
        .arg("--manual-file")
        .arg(fixture("manual_checklist.xml"))
        .arg("--output-file")
        .arg(&output)
        .assert()
        .success()
        .stdout(contains("created successfully"))
        .stdout(contains("reconciled.csv"));

    let report = fs::read_to_string(&output).unwrap();
    assert!(report.starts_with(
        "Group ID,Group Title,Rule ID,Severity,Version (Stig-ID),Rule Title,CAT,800-53,Status\r\n"
    ));
    assert!(report.contains(",RHEL-09-211015,"));
    assert!(report.contains("N/A,N/A,N/A,N/A,RHEL-09-255000,N/A,II,AC-17(2),Only in Audit\r\n"));
    assert_eq!(report.matches("Found in both").count(), 2);
}

#[test]
fn underscore_flags_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    stig_recon()
        .arg("compare")
        .arg("--audit_file")
        .arg(fixture("sample.audit"))
        .arg("--manual_file")
        .arg(fixture("manual_checklist.xml"))
        .arg("--output_file")
        .arg(&output)
        .assert()
        .success();
    assert!(output.exists());
}

#[test]
fn format_from_environment_selects_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.json");

    stig_recon()
        .env("STIG_RECON_FORMAT", "json")
        .arg("compare")
        .arg("--audit-file")
        .arg(fixture("sample.audit"))
        .arg("--manual-file")
        .arg(fixture("manual_checklist.xml"))
        .arg("--output-file")
        .arg(&output)
        .assert()
        .success();

    let report = fs::read_to_string(&output).unwrap();
    assert!(report.trim_start().starts_with('['));
    assert!(report.contains("\"Status\": \"Only in Manual\""));
}

#[test]
fn missing_required_flag_is_a_usage_error() {
    stig_recon()
        .arg("compare")
        .arg("--audit-file")
        .arg(fixture("sample.audit"))
        .assert()
        .failure()
        .stderr(contains("--manual-file"));
}

#[test]
fn malformed_checklist_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let manual = dir.path().join("broken.xml");
    fs::write(&manual, "<Benchmark><Group id=\"V-1\">").unwrap();
    let output = dir.path().join("out.csv");

    stig_recon()
        .arg("compare")
        .arg("--audit-file")
        .arg(fixture("sample.audit"))
        .arg("--manual-file")
        .arg(&manual)
        .arg("--output-file")
        .arg(&output)
        .assert()
        .code(1)
        .stderr(contains("broken.xml"));
    assert!(!output.exists());
}

#[test]
fn unreadable_audit_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    stig_recon()
        .arg("compare")
        .arg("--audit-file")
        .arg(dir.path().join("missing.audit"))
        .arg("--manual-file")
        .arg(fixture("manual_checklist.xml"))
        .arg("--output-file")
        .arg(dir.path().join("out.csv"))
        .assert()
        .code(1)
        .stderr(contains("missing.audit"));
}
