// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::wal::manager::file_name;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

fn setup() -> (TempDir, Arc<WalManager>) {
    let dir = TempDir::new().unwrap();
    let manager = Arc::new(WalManager::open(dir.path().join("wal")).unwrap());
    (dir, manager)
}

fn source(manager: &Arc<WalManager>) -> WalSource {
    WalSource::new(&Context::new(), Arc::clone(manager)).with_poll_interval(Duration::from_millis(10))
}

fn logged_file(manager: &WalManager, millis: i64, bodies: &[&str]) -> String {
    let mut writer = manager.new_writer_at("agent", millis).unwrap();
    for body in bodies {
        writer.append(&Event::new(*body)).unwrap();
    }
    manager.commit(writer).unwrap()
}

/// Cut a logged file inside record `keep` (zero-based)
fn truncate_logged(manager: &WalManager, name: &str, keep: usize) {
    let path = manager.path(WalState::Logged, name);
    let text = std::fs::read_to_string(&path).unwrap();
    let offset: usize = text.split_inclusive('\n').take(keep + 1).map(str::len).sum();
    std::fs::write(&path, &text.as_bytes()[..offset + 7]).unwrap();
}

async fn next_body(source: &mut WalSource) -> String {
    let event = tokio::time::timeout(WAIT, source.next())
        .await
        .expect("next timed out")
        .unwrap()
        .expect("stream ended early");
    String::from_utf8(event.body).unwrap()
}

/// Drain everything currently logged
async fn drain(source: &mut WalSource) -> Vec<String> {
    source.stop_handle().cancel();
    let mut out = Vec::new();
    while let Some(event) = tokio::time::timeout(WAIT, source.next()).await.unwrap().unwrap() {
        out.push(String::from_utf8(event.body).unwrap());
    }
    out
}

#[tokio::test]
async fn empty_file_next_to_good_file_does_not_block_delivery() {
    let (_dir, manager) = setup();
    std::fs::write(manager.path(WalState::Logged, &file_name("agent", 1000, 900)), "").unwrap();
    logged_file(&manager, 2000, &["a", "b", "c", "d", "e"]);
    manager.recover().unwrap();

    let mut source = source(&manager);
    source.open().await.unwrap();
    let mut bodies = Vec::new();
    for _ in 0..5 {
        bodies.push(next_body(&mut source).await);
    }
    assert_eq!(bodies, vec!["a", "b", "c", "d", "e"]);

    let report = source.report().await;
    assert_eq!(report.long("filesFailed"), Some(1));
    assert_eq!(report.long("entries"), Some(5));
    assert_eq!(manager.state_counts().unwrap().error, 1);
}

#[tokio::test]
async fn truncated_file_delivers_prefix_then_moves_on() {
    let (_dir, manager) = setup();
    let broken = logged_file(&manager, 1000, &["1", "2", "3", "4", "5"]);
    truncate_logged(&manager, &broken, 3);
    logged_file(&manager, 2000, &["next"]);

    let mut source = source(&manager);
    source.open().await.unwrap();
    assert_eq!(drain(&mut source).await, vec!["1", "2", "3", "next"]);

    let report = source.report().await;
    assert_eq!(report.long("filesCorrupt"), Some(1));
    assert_eq!(report.long("filesSent"), Some(1));
    let counts = manager.state_counts().unwrap();
    assert_eq!((counts.error, counts.sent, counts.logged), (1, 1, 0));
}

#[tokio::test]
async fn files_are_read_oldest_first() {
    let (_dir, manager) = setup();
    logged_file(&manager, 3000, &["third"]);
    logged_file(&manager, 1000, &["first"]);
    logged_file(&manager, 2000, &["second"]);

    let mut source = source(&manager);
    source.open().await.unwrap();
    assert_eq!(drain(&mut source).await, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn open_survives_unreadable_directory() {
    let (_dir, manager) = setup();
    std::fs::remove_dir_all(manager.base()).unwrap();

    let mut source = source(&manager);
    source.open().await.unwrap();
    assert!(source.try_next().unwrap().is_none());
    assert!(drain(&mut source).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn next_waits_for_files_to_appear() {
    let (_dir, manager) = setup();
    let mut source = source(&manager);
    source.open().await.unwrap();

    let writer_side = Arc::clone(&manager);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        logged_file(&writer_side, 1000, &["late"]);
    });

    assert_eq!(next_body(&mut source).await, "late");
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_waiting_next() {
    let (_dir, manager) = setup();
    let ctx = Context::new();
    let mut source = WalSource::new(&ctx, Arc::clone(&manager));
    source.open().await.unwrap();

    let token = ctx.cancel_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        token.cancel();
    });
    assert!(matches!(source.next().await, Err(SourceError::Interrupted)));
}

#[tokio::test(start_paused = true)]
async fn stop_while_waiting_still_delivers_last_commit() {
    let (_dir, manager) = setup();
    let mut source = WalSource::new(&Context::new(), Arc::clone(&manager))
        .with_poll_interval(Duration::from_secs(3600));
    source.open().await.unwrap();
    let stop = source.stop_handle();

    let waiting = tokio::spawn(async move {
        let first = source.next().await.unwrap();
        (source, first)
    });
    tokio::time::sleep(Duration::from_millis(3)).await;
    logged_file(&manager, 1000, &["last"]);
    stop.cancel();

    let (mut source, first) = tokio::time::timeout(WAIT, waiting).await.unwrap().unwrap();
    assert_eq!(first.map(|e| e.body), Some(b"last".to_vec()));
    assert!(source.next().await.unwrap().is_none());
    assert_eq!(manager.state_counts().unwrap().sent, 1);
}

#[tokio::test]
async fn next_before_open_is_refused() {
    let (_dir, manager) = setup();
    let mut source = source(&manager);
    assert!(matches!(source.next().await, Err(SourceError::NotOpen(_))));

    source.open().await.unwrap();
    source.close().await.unwrap();
    assert!(source.next().await.unwrap().is_none());
}

#[tokio::test]
async fn close_gives_partly_read_file_back() {
    let (_dir, manager) = setup();
    logged_file(&manager, 1000, &["a", "b"]);

    let mut source = source(&manager);
    source.open().await.unwrap();
    assert_eq!(next_body(&mut source).await, "a");
    source.close().await.unwrap();
    source.close().await.unwrap();
    assert!(source.next().await.unwrap().is_none());

    assert_eq!(manager.state_counts().unwrap().logged, 1);
    let mut again = self::source(&manager);
    again.open().await.unwrap();
    assert_eq!(drain(&mut again).await, vec!["a", "b"]);
}

#[tokio::test]
async fn crash_while_sending_is_redelivered_after_recover() {
    let (_dir, manager) = setup();
    logged_file(&manager, 1000, &["a", "b"]);
    {
        let mut source = source(&manager);
        source.open().await.unwrap();
        next_body(&mut source).await;
        // dropped without close, as in a crash
    }
    assert_eq!(manager.state_counts().unwrap().sending, 1);

    manager.recover().unwrap();
    let mut source = source(&manager);
    source.open().await.unwrap();
    assert_eq!(drain(&mut source).await, vec!["a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn logged_events_reach_a_flaky_downstream_in_order() {
    use crate::wal::WalSink;
    use relay_core::EventSink;
    use relay_sinks::testing::FakeSink;
    use relay_sinks::InsistentAppend;

    let (_dir, manager) = setup();
    let mut wal = WalSink::new(Arc::clone(&manager), "agent");
    wal.open().await.unwrap();
    for body in ["a", "b", "c"] {
        wal.append(Event::new(body)).await.unwrap();
    }
    wal.close().await.unwrap();

    let ctx = Context::new();
    let fake = FakeSink::new();
    fake.fail_next_appends(2);
    let mut downstream = InsistentAppend::capped(
        &ctx,
        fake.clone(),
        Duration::from_millis(10),
        Duration::from_millis(1),
    );
    downstream.open().await.unwrap();

    let mut source = source(&manager);
    source.open().await.unwrap();
    source.stop_handle().cancel();
    while let Some(event) = source.next().await.unwrap() {
        downstream.append(event).await.unwrap();
    }
    downstream.close().await.unwrap();

    let bodies: Vec<_> = fake.events().into_iter().map(|e| e.body).collect();
    assert_eq!(bodies, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    assert_eq!(manager.state_counts().unwrap().sent, 1);
}
