use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;

fn demo_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/parameters.json")
}

#[test]
fn demo_run_writes_reports() {
    let dir = tempdir().unwrap();
    assert_cmd::cargo::cargo_bin_cmd!("chitwan-abm")
        .arg("--config")
        .arg(demo_config())
        .arg("--output-dir")
        .arg(dir.path())
        .arg("--random-seed")
        .arg("3")
        .arg("--no-progress")
        .assert()
        .success();

    for file in ["time.csv", "run_results.csv", "person_events.csv", "psns_time_END.csv"] {
        assert!(dir.path().join(file).exists(), "{file} missing");
    }
    let time = fs::read_to_string(dir.path().join("time.csv")).unwrap();
    assert!(time.starts_with("timestep,year,month,time_float"));
}

#[test]
fn existing_reports_need_force_overwrite() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("time.csv"), "old").unwrap();
    let run = || {
        let mut command = assert_cmd::cargo::cargo_bin_cmd!("chitwan-abm");
        command
            .arg("-c")
            .arg(demo_config())
            .arg("-o")
            .arg(dir.path())
            .arg("--no-progress");
        command
    };
    run().assert().failure();
    run().arg("--force-overwrite").assert().success();
}

#[test]
fn missing_config_fails() {
    assert_cmd::cargo::cargo_bin_cmd!("chitwan-abm")
        .arg("--config")
        .arg("no/such/parameters.json")
        .arg("--no-progress")
        .assert()
        .failure();
}
