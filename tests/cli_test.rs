use std::process::Command;

use tempfile::TempDir;

fn tftpc(dir: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tftpc"))
        .args(args)
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

#[test]
fn test_failed_transfer_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let output = tftpc(&dir, &["put", "127.0.0.1", "missing.bin"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no file found: missing.bin"), "{stderr}");
}

#[test]
fn test_genconfig_writes_config_file() {
    let dir = TempDir::new().unwrap();
    let output = tftpc(&dir, &["genconfig"]);

    assert!(output.status.success());
    assert!(dir.path().join(".tftpc.toml").exists());
}
