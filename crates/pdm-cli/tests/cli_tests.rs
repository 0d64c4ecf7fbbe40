//! CLI integration tests

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const HEADER: &str = "UDI,Product ID,Type,Air temperature [K],Process temperature [K],\
Rotational speed [rpm],Torque [Nm],Tool wear [min],Target,Failure Type";

/// Write a small telemetry CSV where every tenth machine fails under load
fn write_dataset(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("predictive_maintenance.csv");
    let mut file = std::fs::File::create(&path).expect("Failed to create dataset");
    writeln!(file, "{}", HEADER).unwrap();
    for i in 0..200u32 {
        let failed = i % 10 == 3;
        let air = 298.0 + (i % 7) as f64 * 0.3;
        let torque = if failed { 68.0 + (i % 5) as f64 } else { 35.0 + (i % 13) as f64 };
        let wear = if failed { 215 + i % 9 } else { (i * 7) % 190 };
        let torque_cell = if i == 17 { String::new() } else { format!("{:.1}", torque) };
        writeln!(
            file,
            "{},L{},L,{:.1},{:.1},{},{},{},{},{}",
            i + 1,
            47181 + i,
            air,
            air + 10.2,
            1400 + (i * 37) % 300,
            torque_cell,
            wear,
            u8::from(failed),
            if failed { "Overstrain Failure" } else { "No Failure" }
        )
        .unwrap();
    }
    path
}

fn pdm(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pdm"))
        .args(args)
        .env("HOME", dir)
        .env("PDM_N_TREES", "10")
        .env_remove("PDM_DATASET_PATH")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = pdm(dir.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Predictive Maintenance Classifier"),
        "Should show app name"
    );
    for command in ["about", "dataset", "rank", "predict", "evaluate"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    let output = pdm(dir.path(), &["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("pdm"), "Should show binary name");
}

#[test]
fn test_about_needs_no_dataset() {
    let dir = TempDir::new().unwrap();
    let output = pdm(dir.path(), &["about"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("random forest"));
}

#[test]
fn test_missing_dataset_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.csv");
    let output = pdm(dir.path(), &["dataset", "--dataset", missing.to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Failed to load dataset"));
}

#[test]
fn test_dataset_json_summary() {
    let dir = TempDir::new().unwrap();
    let csv = write_dataset(dir.path());
    let output = pdm(
        dir.path(),
        &["dataset", "--dataset", csv.to_str().unwrap(), "--format", "json", "--rows", "3"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["head"].as_array().unwrap().len(), 3);
    assert_eq!(json["summary"]["n_rows"], 200);
    assert_eq!(json["summary"]["n_features"], 6);
    assert_eq!(json["feature_names"][0], "UDI");
}

#[test]
fn test_predict_substitutes_invalid_value() {
    let dir = TempDir::new().unwrap();
    let csv = write_dataset(dir.path());
    let output = pdm(
        dir.path(),
        &[
            "predict",
            "--dataset",
            csv.to_str().unwrap(),
            "--set",
            "Torque [Nm]=abc",
            "--set",
            "Tool wear [min]=20",
            "--skip-evaluation",
            "--format",
            "json",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let substitutions = json["substitutions"].as_array().unwrap();
    assert_eq!(substitutions.len(), 1);
    assert_eq!(substitutions[0]["feature"], "Torque [Nm]");
    let probability = json["prediction"]["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
    assert!(json.get("evaluation").is_none());
}

#[test]
fn test_predict_rejects_malformed_assignment() {
    let dir = TempDir::new().unwrap();
    let output = pdm(dir.path(), &["predict", "--set", "Torque"]);
    assert!(!output.status.success());
}

#[test]
fn test_evaluate_table_output() {
    let dir = TempDir::new().unwrap();
    let csv = write_dataset(dir.path());
    let output = pdm(dir.path(), &["evaluate", "--dataset", csv.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("precision"));
    assert!(stdout.contains("Confusion matrix"));
    assert!(stdout.contains("ROC AUC"));
}

#[test]
fn test_rank_json_respects_top() {
    let dir = TempDir::new().unwrap();
    let csv = write_dataset(dir.path());
    let output = pdm(
        dir.path(),
        &["rank", "--dataset", csv.to_str().unwrap(), "--top", "2", "--format", "json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
}
