//! CLI smoke tests: the process parses its flags correctly without
//! actually opening a CDP connection.
use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_describes_the_bridge() {
    let mut cmd = Command::cargo_bin("dap-cdp-bridge").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("DAP-to-CDP debug adapter bridge"));
}

#[test]
fn version_flag_succeeds() {
    let mut cmd = Command::cargo_bin("dap-cdp-bridge").unwrap();
    cmd.arg("--version").assert().success();
}

#[test]
fn unknown_flag_fails() {
    let mut cmd = Command::cargo_bin("dap-cdp-bridge").unwrap();
    cmd.arg("--not-a-real-flag").assert().failure();
}
