//! `relay-agent check` specs
//!
//! A specification is built with the built-in stages and its metrics tree
//! printed; nothing is opened.

use crate::prelude::*;

#[test]
fn valid_chain_prints_its_stages() {
    Workspace::empty()
        .agent()
        .args(&["check", "insistentAppend => batch(10, 100) => null"])
        .passes()
        .stdout_has("InsistentAppend")
        .stdout_has("appendRequests = 0")
        .stdout_has("Batch")
        .stdout_has("Null");
}

#[test]
fn json_format_is_machine_readable() {
    let out = Workspace::empty()
        .agent()
        .args(&["check", "--format", "json", "counter(\"hits\")"])
        .passes()
        .stdout_has("\"hits\": 0")
        .stdout();
    assert!(out.trim_start().starts_with('{'));
}

#[test]
fn nested_roll_spec_is_validated() {
    Workspace::empty()
        .agent()
        .args(&["check", "roll(\"stubbornAppend => null\", 1000)"])
        .passes()
        .stdout_has("rollspec = stubbornAppend => null");

    Workspace::empty()
        .agent()
        .args(&["check", "roll(\"nowhere\", 1000)"])
        .fails()
        .stderr_has("unknown stage: nowhere");
}

#[test]
fn malformed_specs_are_rejected() {
    let ws = Workspace::empty();
    ws.agent()
        .args(&["check", "gzip"])
        .fails()
        .stderr_has("'gzip' cannot terminate a pipeline");
    ws.agent()
        .args(&["check", "null => null"])
        .fails()
        .stderr_has("'null' cannot decorate another stage");
    ws.agent()
        .args(&["check", "batch(0) => null"])
        .fails()
        .stderr_has("batch size must be positive");
    ws.agent()
        .args(&["check", "intervalFlakey => null"])
        .fails()
        .stderr_has("usage: intervalFlakey(interval)");
    ws.agent()
        .args(&["check", "null("])
        .fails()
        .stderr_has("parse error");
}

#[test]
fn wal_is_only_known_to_a_running_agent() {
    Workspace::empty()
        .agent()
        .args(&["check", "wal"])
        .fails()
        .stderr_has("unknown stage: wal");
}
