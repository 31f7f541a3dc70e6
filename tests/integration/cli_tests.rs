//! Integration tests for the CLI binary.
//!
//! Verifies that the `signify` binary responds to basic flags and runs the
//! commands that need no agent.
//!
//! This test is registered as a [[test]] in the signify-cli crate so that
//! CARGO_BIN_EXE_signify is available.

use std::process::Command;

/// Get a Command pointing to the `signify` binary.
fn signify_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_signify"));
    cmd.env_remove("SIGNIFY_PASSCODE")
        .env_remove("SIGNIFY_URL")
        .env_remove("SIGNIFY_TIER");
    cmd
}

#[test]
fn cli_responds_to_help() {
    let output = signify_binary()
        .arg("--help")
        .output()
        .expect("failed to execute signify --help");

    assert!(
        output.status.success(),
        "signify --help should exit with success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Usage"),
        "signify --help output should contain usage information, got: {stdout}"
    );
}

#[test]
fn cli_responds_to_version() {
    let output = signify_binary()
        .arg("--version")
        .output()
        .expect("failed to execute signify --version");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("signify"),
        "signify --version should contain the binary name, got: {stdout}"
    );
}

#[test]
fn cli_exits_with_error_on_unknown_flag() {
    let output = signify_binary()
        .arg("--nonexistent-flag")
        .output()
        .expect("failed to execute signify");

    assert!(
        !output.status.success(),
        "signify with unknown flag should exit with error"
    );
}

#[test]
fn cli_generates_passcode() {
    let output = signify_binary()
        .arg("passcode")
        .output()
        .expect("failed to execute signify passcode");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let passcode = stdout.trim();
    assert_eq!(passcode.len(), 21, "unexpected passcode {passcode:?}");
    assert!(passcode
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn cli_aid_is_deterministic() {
    let run = || {
        signify_binary()
            .args(["aid", "--passcode", "0123456789abcdefghijk"])
            .output()
            .expect("failed to execute signify aid")
    };
    let first = run();
    let second = run();

    assert!(
        first.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&first.stderr)
    );
    assert_eq!(first.stdout, second.stdout);
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.starts_with("Controller E"), "got: {stdout}");
}

#[test]
fn cli_aid_requires_passcode() {
    let output = signify_binary()
        .arg("aid")
        .output()
        .expect("failed to execute signify aid");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("passcode"), "got: {stderr}");
}

#[test]
fn cli_rejects_short_passcode() {
    let output = signify_binary()
        .args(["aid", "--passcode", "tooshort"])
        .output()
        .expect("failed to execute signify aid");

    assert!(!output.status.success());
}
