// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::testing::FakeSink;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn bodies(events: &[Event]) -> Vec<Vec<u8>> {
    events.iter().map(|e| e.body.clone()).collect()
}

#[test]
fn batch_attributes_use_big_endian_framing() {
    let events = vec![Event::new("one"), Event::new("two")];
    let batch = encode_batch(&events).unwrap();

    assert!(batch.body.is_empty());
    assert_eq!(batch.get(BATCH_SIZE), Some(&[0u8, 0, 0, 2][..]));
    let data = batch.get(BATCH_DATA).unwrap();
    let first_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let first = Event::from_bytes(&data[4..4 + first_len]).unwrap();
    assert_eq!(first.body, b"one");

    let decoded = decode_batch(&batch).unwrap();
    assert_eq!(bodies(&decoded), vec![b"one".to_vec(), b"two".to_vec()]);
}

#[test]
fn count_mismatch_is_rejected() {
    let mut batch = encode_batch(&[Event::new("one")]).unwrap();
    batch.set(BATCH_SIZE, 3u32.to_be_bytes().to_vec());
    assert!(decode_batch(&batch).is_err());
}

#[test]
fn truncated_payload_is_rejected() {
    let mut batch = encode_batch(&[Event::new("one")]).unwrap();
    let data = batch.get(BATCH_DATA).unwrap().to_vec();
    batch.set(BATCH_DATA, data[..data.len() - 2].to_vec());
    assert!(decode_batch(&batch).is_err());
}

#[tokio::test]
async fn reaching_max_size_emits_one_filled_batch() {
    let sink = FakeSink::new();
    let mut deco = Batching::new(sink.clone(), 3, Duration::ZERO);
    deco.open().await.unwrap();

    for body in ["a", "b", "c"] {
        deco.append(Event::new(body)).await.unwrap();
    }

    let emitted = sink.events();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].get(BATCH_SIZE), Some(&3u32.to_be_bytes()[..]));
    let members = decode_batch(&emitted[0]).unwrap();
    assert_eq!(
        bodies(&members),
        vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
    );

    let report = deco.report().await;
    assert_eq!(report.long("filledBatches"), Some(1));
    assert_eq!(report.long("triggeredBatches"), Some(1));
    assert_eq!(report.long("timeoutBatches"), Some(0));
}

#[tokio::test]
async fn close_flushes_remainder_before_closing_child() {
    let sink = FakeSink::new();
    let mut deco = Batching::new(sink.clone(), 5, Duration::ZERO);
    deco.open().await.unwrap();
    deco.append(Event::new("a")).await.unwrap();
    deco.append(Event::new("b")).await.unwrap();
    assert!(sink.events().is_empty());

    deco.close().await.unwrap();

    let emitted = sink.events();
    assert_eq!(emitted.len(), 1);
    assert_eq!(decode_batch(&emitted[0]).unwrap().len(), 2);
    assert_eq!(sink.close_count(), 1);
    assert!(!sink.is_open());

    let report = deco.report().await;
    assert_eq!(report.long("filledBatches"), Some(0));
    assert_eq!(report.long("triggeredBatches"), Some(1));
}

#[tokio::test(start_paused = true)]
async fn idle_timer_records_empty_timeout_flush() {
    let sink = FakeSink::new();
    let mut deco = Batching::new(sink.clone(), 1000, ms(100));
    deco.open().await.unwrap();

    tokio::time::sleep(ms(150)).await;

    let report = deco.report().await;
    assert_eq!(report.long("emptyBatches"), Some(1));
    assert_eq!(report.long("triggeredBatches"), Some(1));
    assert_eq!(report.long("timeoutBatches"), Some(1));
    assert_eq!(report.long("filledBatches"), Some(0));
    assert_eq!(sink.append_count(), 0);
    deco.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn timer_flushes_partial_batch() {
    let sink = FakeSink::new();
    let mut deco = Batching::new(sink.clone(), 1000, ms(100));
    deco.open().await.unwrap();
    for body in ["a", "b", "c"] {
        deco.append(Event::new(body)).await.unwrap();
    }

    tokio::time::sleep(ms(150)).await;

    let emitted = sink.events();
    assert_eq!(emitted.len(), 1);
    assert_eq!(decode_batch(&emitted[0]).unwrap().len(), 3);
    assert_eq!(deco.report().await.long("timeoutBatches"), Some(1));
    assert_eq!(deco.pending().await, 0);
    deco.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn filled_flush_rearms_the_timer() {
    let sink = FakeSink::new();
    let mut deco = Batching::new(sink.clone(), 2, ms(100));
    deco.open().await.unwrap();

    tokio::time::sleep(ms(80)).await;
    deco.append(Event::new("a")).await.unwrap();
    deco.append(Event::new("b")).await.unwrap();
    // 40ms after the filled flush, well inside the next window
    tokio::time::sleep(ms(40)).await;

    let report = deco.report().await;
    assert_eq!(report.long("filledBatches"), Some(1));
    assert_eq!(report.long("emptyBatches"), Some(0));
    deco.close().await.unwrap();
}

#[tokio::test]
async fn refused_batch_stays_buffered() {
    let sink = FakeSink::new();
    sink.fail_next_appends(1);
    let mut deco = Batching::new(sink.clone(), 2, Duration::ZERO);
    deco.open().await.unwrap();

    deco.append(Event::new("a")).await.unwrap();
    assert!(deco.append(Event::new("b")).await.is_err());
    assert_eq!(deco.pending().await, 2);

    deco.append(Event::new("c")).await.unwrap();
    let emitted = sink.events();
    assert_eq!(emitted.len(), 1);
    assert_eq!(decode_batch(&emitted[0]).unwrap().len(), 3);
}

#[tokio::test]
async fn append_before_open_is_rejected() {
    let mut deco = Batching::new(FakeSink::new(), 2, Duration::ZERO);
    let err = deco.append(Event::new("a")).await.unwrap_err();
    assert!(matches!(err, SinkError::NotOpen(_)));
    assert_eq!(deco.pending().await, 0);
}

#[tokio::test(start_paused = true)]
async fn double_close_is_a_noop() {
    let sink = FakeSink::new();
    let mut deco = Batching::new(sink.clone(), 10, ms(50));
    deco.open().await.unwrap();
    deco.close().await.unwrap();
    deco.close().await.unwrap();
    assert_eq!(sink.close_count(), 1);
}

#[tokio::test]
async fn unbatch_restores_members_in_order() {
    let sink = FakeSink::new();
    let mut deco = Unbatching::new(sink.clone());
    deco.open().await.unwrap();

    let batch = encode_batch(&[Event::new("x"), Event::new("y")]).unwrap();
    deco.append(batch).await.unwrap();
    deco.append(Event::new("plain")).await.unwrap();

    assert_eq!(
        bodies(&sink.events()),
        vec![b"x".to_vec(), b"y".to_vec(), b"plain".to_vec()]
    );
    assert_eq!(deco.report().await.long("batches"), Some(1));
}

#[tokio::test]
async fn batch_then_unbatch_is_transparent() {
    let sink = FakeSink::new();
    let mut chain = Batching::new(Unbatching::new(sink.clone()), 2, Duration::ZERO);
    chain.open().await.unwrap();
    for body in ["1", "2", "3"] {
        chain.append(Event::new(body)).await.unwrap();
    }
    chain.close().await.unwrap();

    assert_eq!(
        bodies(&sink.events()),
        vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]
    );
}
