//! `relay-agent wal` specs
//!
//! Maintenance commands only move files between state directories, so the
//! files here need valid names but not valid contents.

use crate::prelude::*;

const FILE_A: &str = "agent.0000000001000.00000001.wal";
const FILE_B: &str = "agent.0000000002000.00000002.wal";

#[test]
fn status_of_a_new_directory_creates_every_state() {
    let ws = Workspace::empty();
    ws.agent()
        .args(&["wal", "status", "--dir", "wal"])
        .passes()
        .stdout_has("writing 0")
        .stdout_has("logged 0")
        .stdout_has("error 0");
    for state in STATES {
        assert!(ws.path().join("wal").join(state).is_dir(), "{state}");
    }
}

#[test]
fn status_counts_files_per_state() {
    let ws = Workspace::empty();
    ws.file(&format!("wal/logged/{FILE_A}"), "")
        .file(&format!("wal/logged/{FILE_B}"), "")
        .file(&format!("wal/error/{FILE_A}"), "");
    let out = ws
        .agent()
        .args(&["wal", "status", "--dir", "wal", "--format", "json"])
        .passes()
        .stdout();
    assert!(out.contains("\"logged\": 2"), "{out}");
    assert!(out.contains("\"error\": 1"), "{out}");
}

#[test]
fn recover_returns_in_flight_files_to_logged() {
    let ws = Workspace::empty();
    ws.file(&format!("wal/writing/{FILE_A}"), "")
        .file(&format!("wal/sending/{FILE_B}"), "");

    ws.agent()
        .args(&["wal", "recover", "--dir", "wal"])
        .passes()
        .stdout_has(FILE_A)
        .stdout_has(FILE_B);

    assert_eq!(ws.list("wal/logged"), vec![FILE_A, FILE_B]);
    assert!(ws.list("wal/writing").is_empty());
    assert!(ws.list("wal/sending").is_empty());

    // nothing left to move
    ws.agent()
        .args(&["wal", "recover", "--dir", "wal"])
        .passes()
        .stdout_lacks(".wal");
}

#[test]
fn retry_requeues_quarantined_files() {
    let ws = Workspace::empty();
    ws.file(&format!("wal/error/{FILE_A}"), "");

    ws.agent()
        .args(&["wal", "retry", "--dir", "wal"])
        .passes()
        .stdout_has(FILE_A);
    assert_eq!(ws.list("wal/logged"), vec![FILE_A]);
    assert!(ws.list("wal/error").is_empty());
}
