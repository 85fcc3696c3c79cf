//! Binary-level checks: exit codes and artifacts with no reachable database.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const DB_VARS: &[&str] = &[
    "POSTGRES_HOST",
    "DB_HOST",
    "POSTGRES_PORT",
    "DB_PORT",
    "POSTGRES_DB",
    "DB_NAME",
    "POSTGRES_USER",
    "DB_USER",
    "POSTGRES_PASSWORD",
    "DB_PASSWORD",
    "SOFIA_DB_CONNECT_TIMEOUT_SECS",
];

fn audit_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sofia_audit"))
}

fn run_audit_bin(root: &Path, envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(audit_bin());
    cmd.current_dir(root);
    for key in DB_VARS {
        cmd.env_remove(key);
    }
    cmd.env_remove("RUST_LOG");
    cmd.env("SOFIA_AUDIT_ROOT", root);
    cmd.env("SOFIA_AUDIT_HOME", root.join(".home"));
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().expect("failed to execute sofia_audit")
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("scripts/configs")).unwrap();
    fs::create_dir_all(root.join("scripts/collectors")).unwrap();
    fs::create_dir_all(root.join("analytics")).unwrap();
    fs::write(
        root.join("scripts/configs/collectors.ts"),
        "'github': { schedule: '0 * * * *' },\n",
    )
    .unwrap();
    fs::write(
        root.join("scripts/collectors/collect-github.ts"),
        "await db.query('INSERT INTO sofia.github_trending VALUES ($1)');\n",
    )
    .unwrap();
    fs::write(
        root.join("analytics/mega-analysis.py"),
        "q = 'SELECT * FROM sofia.github_trending'\n",
    )
    .unwrap();
    dir
}

const UNREACHABLE: &[(&str, &str)] = &[
    ("POSTGRES_HOST", "127.0.0.1"),
    ("POSTGRES_PORT", "1"),
    ("SOFIA_DB_CONNECT_TIMEOUT_SECS", "1"),
];

#[test]
fn test_unreachable_database_exits_one_with_reports() {
    let dir = fixture();
    let output = run_audit_bin(dir.path(), UNREACHABLE);

    assert_eq!(
        output.status.code(),
        Some(1),
        "stdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let json_path = dir.path().join("output/audit/collector-audit.json");
    let md_path = dir.path().join("output/audit/COLLECTOR-AUDIT.md");
    assert!(json_path.is_file());
    assert!(md_path.is_file());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(report["database_available"], false);
    assert_eq!(report["summary"]["core_health"]["passed"], false);
    let failures = report["summary"]["core_health"]["failures"]
        .as_array()
        .unwrap();
    assert!(failures
        .iter()
        .any(|f| f.as_str().unwrap().contains("database unavailable")));

    let github = &report["collectors"][0];
    assert_eq!(github["identity"], "github");
    assert_eq!(github["db_status"].as_array().unwrap().len(), 0);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Core health gate: FAILED"));
}

#[test]
fn test_invalid_port_is_fatal_without_reports() {
    let dir = fixture();
    let output = run_audit_bin(dir.path(), &[("POSTGRES_PORT", "not-a-port")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("output/audit").exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid database configuration"), "stderr:\n{}", stderr);
}

#[test]
fn test_logs_land_under_audit_home() {
    let dir = fixture();
    let _ = run_audit_bin(dir.path(), UNREACHABLE);
    assert!(dir.path().join(".home/logs").is_dir());
}
