//! `relay-agent run` configuration specs

use crate::prelude::*;

#[test]
fn missing_config_runs_with_defaults() {
    let ws = Workspace::empty();
    ws.agent()
        .args(&["run"])
        .stdin("a\nb\n")
        .passes()
        .stdout_has("ingested 2 events, forwarded 2 events");
    // default wal directory sits next to the (absent) relay.toml
    assert_eq!(ws.list("wal/sent").len(), 1);
}

#[test]
fn malformed_config_is_rejected() {
    let ws = Workspace::empty();
    ws.file("relay.toml", "[wal]\nroll-period = \"whenever\"\n");
    ws.agent()
        .args(&["run", "--config", "relay.toml"])
        .stdin("")
        .fails()
        .stderr_has("invalid config");
}

#[test]
fn unknown_pipeline_stage_is_rejected() {
    let ws = Workspace::empty();
    ws.file("relay.toml", "[pipeline]\nsink = \"teleport\"\n");
    ws.agent()
        .args(&["run", "--config", "relay.toml"])
        .stdin("lost?\n")
        .fails()
        .stderr_has("unknown stage: teleport");
}

#[test]
fn log_file_receives_agent_logs() {
    let ws = Workspace::empty();
    ws.file(
        "conf/relay.toml",
        "[agent]\nlog-file = \"logs/agent.log\"\nlog-level = \"info\"\n",
    );
    ws.agent()
        .args(&["run", "--config", "conf/relay.toml"])
        .stdin("x\n")
        .passes();
    let log = ws.read("conf/logs/agent.log");
    assert!(log.contains("agent running"), "{log}");
    assert!(log.contains("agent stopped"), "{log}");
    // relative paths resolve against the config file
    assert!(ws.path().join("conf/wal/sent").is_dir());
}
