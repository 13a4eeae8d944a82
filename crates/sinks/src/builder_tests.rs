// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use relay_core::{Event, PipelineDefaults, SinkError};
use yare::parameterized;

fn stage(name: &str, args: &[&str]) -> StageSpec {
    StageSpec {
        name: name.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}

#[test]
fn parses_chain_with_quoted_and_bare_args() {
    let stages =
        parse_chain(r#"insistentAppend(100, 10) => roll("batch(5) => counter(\"n\")", 1000) => null"#)
            .unwrap();
    assert_eq!(
        stages,
        vec![
            stage("insistentAppend", &["100", "10"]),
            stage("roll", &[r#"batch(5) => counter("n")"#, "1000"]),
            stage("null", &[]),
        ]
    );
}

#[test]
fn empty_parens_mean_no_args() {
    assert_eq!(parse_chain("null()").unwrap(), vec![stage("null", &[])]);
}

#[test]
fn bare_tokens_keep_paths_intact() {
    assert_eq!(
        parse_chain("file(/var/log/relay-out)").unwrap(),
        vec![stage("file", &["/var/log/relay-out"])]
    );
}

#[parameterized(
    blank = { "   " },
    empty = { "" },
)]
fn empty_specs_are_rejected(spec: &str) {
    assert_eq!(parse_chain(spec).unwrap_err(), SpecError::Empty);
}

#[parameterized(
    dangling_arrow = { "gzip =>", 7 },
    missing_arrow = { "gzip null", 5 },
    unclosed_args = { "batch(5", 7 },
    unterminated_quote = { "counter(\"abc", 12 },
    leading_digit = { "9lives", 0 },
    missing_comma = { "batch(5 6)", 8 },
)]
fn parse_errors_carry_offsets(spec: &str, offset: usize) {
    match parse_chain(spec).unwrap_err() {
        SpecError::Parse { offset: at, .. } => assert_eq!(at, offset, "{spec}"),
        other => panic!("expected parse error for {spec}, got {other:?}"),
    }
}

#[parameterized(
    null_with_arg = { "null(1)" },
    counter_without_name = { "counter" },
    file_with_two_dirs = { "file(a, b)" },
    roll_without_period = { "roll(null)" },
    batch_without_size = { "batch => null" },
    batch_three_args = { "batch(1, 2, 3) => null" },
    insistent_four_args = { "insistentAppend(1, 2, 3, 4) => null" },
    stubborn_with_arg = { "stubbornAppend(1) => null" },
    gzip_with_arg = { "gzip(9) => null" },
    flakey_without_interval = { "intervalFlakey => null" },
)]
fn wrong_argument_counts_are_usage_errors(spec: &str) {
    let err = Registry::with_defaults()
        .build(&Context::new(), spec)
        .err()
        .unwrap();
    assert!(matches!(err, SpecError::Usage(_)), "{spec}: {err:?}");
}

#[parameterized(
    batch_zero = { "batch(0) => null" },
    batch_word = { "batch(many) => null" },
    flakey_zero = { "intervalFlakey(0) => null" },
    roll_negative = { "roll(null, -5)" },
    insistent_word = { "insistentAppend(soon) => null" },
)]
fn bad_argument_values_are_rejected(spec: &str) {
    let err = Registry::with_defaults()
        .build(&Context::new(), spec)
        .err()
        .unwrap();
    assert!(
        matches!(err, SpecError::InvalidArgument { .. }),
        "{spec}: {err:?}"
    );
}

#[test]
fn unknown_and_misplaced_stages() {
    let reg = Registry::with_defaults();
    let ctx = Context::new();
    assert_eq!(
        reg.build(&ctx, "bogus").err(),
        Some(SpecError::UnknownStage("bogus".to_string()))
    );
    assert_eq!(
        reg.build(&ctx, "gzip").err(),
        Some(SpecError::NotASink("gzip".to_string()))
    );
    assert_eq!(
        reg.build(&ctx, "null => null").err(),
        Some(SpecError::NotADecorator("null".to_string()))
    );
}

#[test]
fn roll_spec_is_validated_when_built() {
    let err = Registry::with_defaults()
        .build(&Context::new(), r#"roll("nope => null", 1000)"#)
        .err()
        .unwrap();
    assert_eq!(err, SpecError::UnknownStage("nope".to_string()));
}

#[tokio::test]
async fn built_chain_reports_nested_stages() {
    let reg = Registry::with_defaults();
    let mut sink = reg
        .build(&Context::new(), "stubbornAppend => gzip => counter(seen)")
        .unwrap();
    sink.open().await.unwrap();
    sink.append(Event::new("a")).await.unwrap();
    sink.append(Event::new("b")).await.unwrap();
    sink.close().await.unwrap();

    let flat = sink.report().await.flatten();
    assert_eq!(flat.long("appendSuccess"), Some(2));
    assert_eq!(flat.long("Gzip.eventsCount"), Some(2));
    assert_eq!(flat.long("Gzip.seen.seen"), Some(2));
}

#[tokio::test]
async fn roll_builds_nested_chain_through_registry() {
    let reg = Registry::with_defaults();
    let mut sink = reg
        .build(&Context::new(), r#"roll("batch(2) => counter(inner)", 60000)"#)
        .unwrap();
    sink.open().await.unwrap();
    for body in ["a", "b"] {
        sink.append(Event::new(body)).await.unwrap();
    }
    let report = sink.report().await;
    assert_eq!(report.string("rollspec"), Some("batch(2) => counter(inner)"));
    let batch = report.child("Batch").unwrap();
    assert_eq!(batch.long("filledBatches"), Some(1));
    sink.close().await.unwrap();
}

#[tokio::test]
async fn insistent_without_args_uses_context_defaults() {
    let defaults = PipelineDefaults {
        max_cumulative_backoff: Some(Duration::ZERO),
        ..PipelineDefaults::default()
    };
    let ctx = Context::new().with_defaults(defaults);
    let mut sink = Registry::with_defaults()
        .build(&ctx, "insistentAppend => intervalFlakey(1) => null")
        .unwrap();
    sink.open().await.unwrap();

    let err = sink.append(Event::new("x")).await.unwrap_err();
    assert!(matches!(err, SinkError::Exhausted(ref h) if h.len() == 1));
    let report = sink.report().await;
    assert!(report
        .child("backoffPolicy.CumulativeCappedExpBackoff")
        .is_some());
}

#[tokio::test]
async fn extra_registrations_are_buildable() {
    let mut reg = Registry::with_defaults();
    reg.register_sink("blackhole", |_, _| Ok(Box::new(NullSink::new())));
    assert!(reg.names().contains(&"blackhole"));
    let mut sink = reg.build(&Context::new(), "gzip => blackhole").unwrap();
    sink.open().await.unwrap();
    sink.append(Event::new("x")).await.unwrap();
}
