//! `relay-agent run` delivery specs
//!
//! Every accepted line reaches the configured sink, or stays in the WAL
//! for the next run.

use crate::prelude::*;

fn config(sink: &str) -> String {
    format!(
        "[wal]\nroll-period = \"1m\"\n\n[pipeline]\nsink = '{sink}'\n\n[defaults]\nwal-poll-interval = \"20ms\"\n"
    )
}

#[test]
fn lines_reach_the_file_sink_in_order() {
    let ws = Workspace::empty();
    ws.file("relay.toml", &config(r#"stubbornAppend => file("out")"#));
    ws.agent()
        .args(&["run"])
        .stdin("first\nsecond\nthird\n")
        .passes()
        .stdout_has("forwarded 3 events");

    let files = ws.list("out");
    assert_eq!(files.len(), 1, "{files:?}");
    let text = ws.read(&format!("out/{}", files[0]));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    let body = |s: &str| {
        s.bytes().map(|b| b.to_string()).collect::<Vec<_>>().join(",")
    };
    assert!(lines[0].contains(&body("first")));
    assert!(lines[2].contains(&body("third")));
}

#[test]
fn batched_gzipped_chain_delivers_every_event() {
    let ws = Workspace::empty();
    ws.file(
        "relay.toml",
        &config(r#"batch(2) => gzip => gunzip => unbatch => counter("seen")"#),
    );
    ws.agent()
        .args(&["run", "--report", "json"])
        .stdin("1\n2\n3\n4\n5\n")
        .passes()
        .stdout_has("forwarded 5 events")
        .stdout_has("\"seen\": 5")
        .stdout_has("\"filledBatches\": 2");
}

#[test]
fn failed_delivery_is_kept_for_the_next_run() {
    let ws = Workspace::empty();
    ws.file("relay.toml", &config("intervalFlakey(1) => null"));
    ws.agent()
        .args(&["run"])
        .stdin("keep me\n")
        .fails()
        .stderr_has("flakey append");

    ws.agent()
        .args(&["wal", "status", "--dir", "wal"])
        .passes()
        .stdout_has("logged 1")
        .stdout_has("sending 0");

    ws.file("relay.toml", &config(r#"counter("seen")"#));
    ws.agent()
        .args(&["run", "--report", "text"])
        .stdin("")
        .passes()
        .stdout_has("ingested 0 events, forwarded 1 events")
        .stdout_has("seen = 1");
}
