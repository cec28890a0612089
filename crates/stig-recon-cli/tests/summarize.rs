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
fn summarize_writes_both_reports() {
    let dir = tempfile::tempdir().unwrap();
    let summary = dir.path().join("summary.csv");
    let checklist = dir.path().join("checklist.csv");

    stig_recon()
        .arg("summarize")
        .arg("--input")
        .arg(fixture("scan_results.nessus"))
        .arg("--summary")
        .arg(&summary)
        .arg("--checklist")
        .arg(&checklist)
        .assert()
        .success()
        .stdout(contains("summary.csv"))
        .stdout(contains("checklist.csv"));

    let summary = fs::read_to_string(&summary).unwrap();
    assert!(summary.starts_with("NIST Compliance ID,Result,Affected Hosts,Stig IDs\r\n"));
    assert!(summary.contains("AC-8a.,Failed,web01,RHEL-09-211020\r\n"));
    assert!(summary.contains("CM-6b.,Passed,,RHEL-09-211010\r\n"));

    let checklist = fs::read_to_string(&checklist).unwrap();
    assert_eq!(checklist.lines().count(), 5);
    assert!(checklist.contains("db01,SI-2c.,Error,RHEL-09-211015,"));
}

#[test]
fn config_file_supplies_paths_and_format() {
    let dir = tempfile::tempdir().unwrap();
    let summary = dir.path().join("from-config-summary.json");
    let checklist = dir.path().join("from-config-checklist.json");
    let config = dir.path().join("stig-recon.toml");
    fs::write(
        &config,
        format!(
            "format = \"json\"\nsummary_file = {:?}\nchecklist_file = {:?}\n",
            summary.display().to_string(),
            checklist.display().to_string()
        ),
    )
    .unwrap();

    stig_recon()
        .arg("--config")
        .arg(&config)
        .arg("summarize")
        .arg("--input")
        .arg(fixture("scan_results.nessus"))
        .assert()
        .success();

    let summary = fs::read_to_string(&summary).unwrap();
    assert!(summary.contains("\"Result\": \"Warning\""));
    assert!(fs::read_to_string(&checklist).unwrap().contains("\"Host\": \"db01\""));
}

#[test]
fn format_flag_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("stig-recon.toml");
    fs::write(&config, "format = \"json\"\n").unwrap();
    let summary = dir.path().join("summary.csv");

    stig_recon()
        .arg("--config")
        .arg(&config)
        .arg("--format")
        .arg("csv")
        .arg("summarize")
        .arg("--input")
        .arg(fixture("scan_results.nessus"))
        .arg("--summary")
        .arg(&summary)
        .arg("--checklist")
        .arg(dir.path().join("checklist.csv"))
        .assert()
        .success();

    assert!(fs::read_to_string(&summary)
        .unwrap()
        .starts_with("NIST Compliance ID,"));
}

#[test]
fn report_without_container_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.nessus");
    fs::write(&input, "<NessusClientData_v2><Policy/></NessusClientData_v2>").unwrap();

    stig_recon()
        .arg("summarize")
        .arg("--input")
        .arg(&input)
        .arg("--summary")
        .arg(dir.path().join("summary.csv"))
        .arg("--checklist")
        .arg(dir.path().join("checklist.csv"))
        .assert()
        .code(1)
        .stderr(contains("<Report>"));
    assert!(!dir.path().join("summary.csv").exists());
}

#[test]
fn checklist_is_written_even_if_summary_fails() {
    let dir = tempfile::tempdir().unwrap();
    let summary = dir.path().join("no-such-dir").join("summary.csv");
    let checklist = dir.path().join("checklist.csv");

    stig_recon()
        .arg("summarize")
        .arg("--input")
        .arg(fixture("scan_results.nessus"))
        .arg("--summary")
        .arg(&summary)
        .arg("--checklist")
        .arg(&checklist)
        .assert()
        .code(1)
        .stderr(contains("no-such-dir"));

    assert!(!summary.exists());
    assert!(fs::read_to_string(&checklist)
        .unwrap()
        .contains("db01,SI-2c.,Error,RHEL-09-211015,"));
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();

    stig_recon()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("summarize")
        .arg("--input")
        .arg(fixture("scan_results.nessus"))
        .assert()
        .code(1)
        .stderr(contains("absent.toml"));
}
