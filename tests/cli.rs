use std::io::Write;
use std::process::Command;

#[cfg(feature = "mqtt")]
#[test]
fn test_relay_logs_stay_off_stdout() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:\n  kind: mqtt\n  host: 127.0.0.1\n  port: 1\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_vitals-relay"))
        .arg("--config")
        .arg(file.path())
        .arg("--json-lines")
        .env("RUST_LOG", "vitals_relay=info")
        .output()
        .unwrap();

    // Nothing listens on port 1, so connect fails and the relay exits
    assert!(!output.status.success());
    assert!(output.stdout.is_empty(), "stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert!(String::from_utf8_lossy(&output.stderr).contains("starting"));
}

#[cfg(feature = "http")]
#[test]
fn test_publisher_survives_failed_sends() {
    let output = Command::new(env!("CARGO_BIN_EXE_vitals-publisher"))
        .args([
            "--transport",
            "http",
            "--url",
            "http://127.0.0.1:1/add-medical",
            "--count",
            "3",
            "--interval-ms",
            "10",
        ])
        .env("RUST_LOG", "vitals_publisher=info,vitals_relay=info")
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {}", stderr);
    assert!(stderr.contains("Published 0 readings, 3 failed"), "stderr: {}", stderr);
}
