use std::env;
use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn simcanvas() -> Command {
    let bin = env!("CARGO_BIN_EXE_simcanvas");
    let mut cmd = Command::new(bin);
    cmd.env("SIMCANVAS_HEADLESS_FRAMES", "6")
        .env_remove("SIMCANVAS_HEADLESS_REPORT")
        .env_remove("SIMCANVAS_CONFIG")
        .env("TERM", "xterm-256color")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn terminal_headless_smoke() {
    let status = simcanvas()
        .args(["--headless", "--model", "boids", "--seed", "3"])
        .status()
        .expect("failed to run simcanvas binary");
    assert!(status.success(), "terminal headless run failed");
}

#[test]
fn sugarscape_runs_with_trade_disabled_from_config() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("sugarscape.json");
    fs::write(
        &config,
        r#"{ "model": "sugarscape", "params": { "enable_trade": false, "initial_population": 60 } }"#,
    )
    .expect("write config");

    let status = simcanvas()
        .args(["--headless", "--seed", "9", "--config"])
        .arg(&config)
        .status()
        .expect("failed to run simcanvas binary");
    assert!(status.success(), "sugarscape headless run failed");
}

#[test]
fn headless_env_and_config_file_drive_the_run() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("virus.json");
    let report = dir.path().join("out").join("report.json");
    fs::write(
        &config,
        r#"{ "model": "virus", "canvas": { "rendering_step": 2 }, "params": { "num_nodes": 30, "seed": 5 } }"#,
    )
    .expect("write config");

    let status = simcanvas()
        .env("SIMCANVAS_HEADLESS", "1")
        .env("SIMCANVAS_HEADLESS_REPORT", &report)
        .arg("--config")
        .arg(&config)
        .status()
        .expect("failed to run simcanvas binary");
    assert!(status.success(), "config-driven headless run failed");

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report written"))
            .expect("report is json");
    assert_eq!(written["summary"]["frame_count"], 6);
    assert_eq!(written["summary"]["rendering_step"], 2);
}

#[test]
fn invalid_settings_fail_before_launch() {
    let output = simcanvas()
        .args(["--headless", "--target-fps", "0"])
        .output()
        .expect("failed to run simcanvas binary");
    assert!(!output.status.success(), "zero fps should be rejected");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("target_fps"), "unexpected stderr: {stderr}");
}
