#![cfg(target_os = "linux")]

use regex::Regex;
use serial_test::serial;
use std::process::{Command, Output};
use std::sync::LazyLock;

static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Return address|Old stack pointer): 0x([0-9a-f]{16})$").unwrap()
});

const HEADER: &str = "=== Stack trace from fp chain ===\n";
const FOOTER: &str = "=== End ===\n\n";

fn stack_print(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stack_print"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to run stack_print")
}

/// (return address, old stack pointer) of every frame block.
fn parse_frames(stdout: &str) -> Vec<(u64, u64)> {
    let mut frames = Vec::new();
    let mut pending: Option<u64> = None;
    for line in stdout.lines() {
        if line.starts_with("Return address") || line.starts_with("Old stack pointer") {
            let caps = FIELD.captures(line).expect("malformed field line");
            let value = u64::from_str_radix(&caps[2], 16).unwrap();
            match pending.take() {
                None => pending = Some(value),
                Some(ra) => frames.push((ra, value)),
            }
        }
    }
    assert!(pending.is_none(), "return address without old stack pointer");
    frames
}

#[test]
#[serial]
fn no_arguments_prints_at_least_one_frame() {
    let out = stack_print(&[]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with(HEADER));
    let frames = parse_frames(&stdout);
    assert!(!frames.is_empty());
    // the first frame is run() returning into main
    assert_ne!(frames[0].0, 0);
    // a chain leaving mapped memory kills the process before the footer
    if out.status.success() {
        assert!(stdout.ends_with(FOOTER));
    }
}

#[test]
#[serial]
fn hardened_prints_complete_trace() {
    let out = stack_print(&["--hardened"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with(HEADER));
    assert!(stdout.ends_with(FOOTER));
    let frames = parse_frames(&stdout);
    assert!(!frames.is_empty());
    // every followed link went to a higher address
    let followed: Vec<u64> = frames[..frames.len() - 1].iter().map(|f| f.1).collect();
    assert!(followed.windows(2).all(|w| w[0] < w[1]));
}

#[test]
#[serial]
fn max_frames_limits_output() {
    let out = stack_print(&["--max-frames", "1"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(parse_frames(&stdout).len(), 1);
    assert!(stdout.ends_with(FOOTER));
}

#[test]
#[serial]
fn low_ceiling_prints_no_frames() {
    let out = stack_print(&["--ceiling", "0x1000"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), format!("{HEADER}{FOOTER}"));
}

#[test]
#[serial]
fn unknown_argument_fails() {
    let out = stack_print(&["--frobnicate"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage: stack_print"));
}

#[test]
#[serial]
fn help_prints_usage() {
    let out = stack_print(&["--help"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("Usage: stack_print"));
}
