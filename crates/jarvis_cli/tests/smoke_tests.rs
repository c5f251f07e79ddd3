//! CLI smoke tests: verify basic binary behavior.

use std::io::Write;
use std::process::{Command, Stdio};

fn cli_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_jarvis"))
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "Expected usage info in --help output");
    assert!(stdout.contains("--memory-only"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("jarvis"), "Expected binary name in --version output");
}

#[test]
fn test_repl_session_in_memory() {
    // A missing config file falls back to defaults.
    let mut child = cli_bin()
        .arg("--memory-only")
        .arg("--config")
        .arg("/tmp/nonexistent_jarvis_config_12345.toml")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to run");

    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"open chrome\nstats\nquit\n")
        .expect("write stdin");

    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Jarvis online"));
    assert!(stdout.contains("Opening chrome."));
    assert!(stdout.contains("\"commands\": 1"));
    assert!(stdout.contains("Goodbye."));
}

#[test]
fn test_prosody_tagged_line_is_handled() {
    let mut child = cli_bin()
        .arg("--memory-only")
        .arg("--config")
        .arg("/tmp/nonexistent_jarvis_config_12345.toml")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to run");

    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"[pitch=150 speed=120 volume=0.5] open chrome\nquit\n")
        .expect("write stdin");

    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Opening chrome."));
    assert!(!stdout.contains("[Error]"));
}
