use std::fmt::Write as _;
use std::path::Path;
use std::process::Command;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

fn maestro(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_maestro"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

/// 25 steadily rising bars, one every `minutes`.
fn write_rising(dir: &Path, file: &str, minutes: i64) {
    let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    let mut csv = String::from("timestamp,open,high,low,close,volume\n");
    for i in 0..25i64 {
        let timestamp = start + Duration::minutes(i * minutes);
        let close = 100 + i;
        writeln!(
            csv,
            "{},{}.5,{}.5,{},{},100",
            timestamp.to_rfc3339(),
            close - 1,
            close,
            close - 1,
            close
        )
        .unwrap();
    }
    std::fs::write(dir.join(file), csv).unwrap();
}

#[test]
fn size_from_flags() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().to_str().unwrap();

    let (ok, stdout, stderr) = maestro(&[
        "size", "--config-dir", config_dir, "--balance", "10000", "--risk-pct", "1", "--stop", "2",
    ]);

    assert!(ok, "{stderr}");
    assert!(stdout.contains("Risk amount:           100.00"), "{stdout}");
    assert!(stdout.contains("Units:                 50.0000"), "{stdout}");
    assert!(!stdout.contains("Lots"));
}

#[test]
fn size_in_lots_with_pip_spec() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().to_str().unwrap();

    let (ok, stdout, stderr) = maestro(&[
        "size", "--config-dir", config_dir, "--balance", "10000", "--risk-pct", "1",
        "--stop", "0.5", "--pip-size", "0.01", "--pip-value", "10",
    ]);

    assert!(ok, "{stderr}");
    // 100 / (50 pips * 10)
    assert!(stdout.contains("Lots:                  0.20"), "{stdout}");
}

#[test]
fn scan_from_csv_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("Config.toml"),
        "[[instruments]]\nsymbol = \"GC=F\"\nlabel = \"Gold\"\n",
    )
    .unwrap();
    write_rising(dir.path(), "GC=F_5m.csv", 5);
    write_rising(dir.path(), "GC=F_15m.csv", 15);
    write_rising(dir.path(), "GC=F_1h.csv", 60);

    let path = dir.path().to_str().unwrap();
    let (ok, stdout, stderr) = maestro(&["scan", "--config-dir", path, "--csv-dir", path]);

    assert!(ok, "{stderr}");
    assert!(stdout.starts_with("Gold (GC=F)"), "{stdout}");
    assert!(stdout.contains("STRONG BUY"), "{stdout}");
    // 25 hourly bars is too short for the models
    assert!(stdout.contains("Price forecast:        unavailable"), "{stdout}");
}

#[test]
fn scan_with_unknown_symbol_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_str().unwrap();

    let (ok, _, stderr) = maestro(&["scan", "--config-dir", path, "--csv-dir", path, "--symbol", "NOPE"]);

    assert!(!ok);
    assert!(stderr.contains("No configured instrument matches NOPE"), "{stderr}");
}
