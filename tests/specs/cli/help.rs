//! Help and usage specs

use crate::prelude::*;

#[test]
fn help_lists_every_command() {
    Workspace::empty()
        .agent()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("wal")
        .stdout_has("check");
}

#[test]
fn unknown_command_fails() {
    Workspace::empty()
        .agent()
        .args(&["collect"])
        .fails()
        .stderr_has("unrecognized subcommand");
}

#[test]
fn wal_commands_require_a_directory() {
    Workspace::empty()
        .agent()
        .args(&["wal", "status"])
        .fails()
        .stderr_has("--dir");
}
