use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "questline-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_questline-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("full-journey"));
}

#[test]
fn cli_runs_all_scenarios_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_questline-tester");
    let output_path = temp_path("run");
    let store_dir = temp_path("store");
    let output = Command::new(exe)
        .args([
            "--scenarios",
            "all",
            "--seeds",
            "1,42",
            "--iterations",
            "2",
            "--report",
            "json",
            "--store-dir",
        ])
        .arg(&store_dir)
        .arg("--output")
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let content = std::fs::read_to_string(output_path).expect("read output");
    let results: serde_json::Value = serde_json::from_str(&content).expect("json report");
    let results = results.as_array().expect("array");
    assert_eq!(results.len(), 14);
    assert!(results.iter().all(|r| r["passed"] == true));
    assert!(store_dir.join("seed-1").exists());
    let _ = std::fs::remove_dir_all(store_dir);
}

#[test]
fn cli_rejects_invalid_config() {
    let exe = env!("CARGO_BIN_EXE_questline-tester");
    let config_path = temp_path("bad-config.json");
    std::fs::write(&config_path, r#"{"award_history_window": 0}"#).expect("write config");
    let output = Command::new(exe)
        .args(["--scenarios", "smoke", "--iterations", "1", "--config"])
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"));
}
