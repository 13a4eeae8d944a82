// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batching and unbatching decorators
//!
//! A batch is one synthetic event with an empty body. `batchSize` holds the
//! event count as a 4-byte big-endian integer and `batchData` holds each
//! serialized event prefixed by its 4-byte big-endian length.
//!
//! Every flush counts once in `triggeredBatches` and once more by cause:
//! `filledBatches` for a full buffer, `timeoutBatches` for the timer, nothing
//! extra for close. `emptyBatches` counts flushes that found nothing
//! buffered, whatever the cause; those emit no event.

use async_trait::async_trait;
use relay_core::{Event, EventSink, Report, SinkError, Wrapped};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub const BATCH_SIZE: &str = "batchSize";
pub const BATCH_DATA: &str = "batchData";

const NAME: &str = "Batch";

/// Whether an event is a batch produced by [`Batching`]
pub fn is_batch(event: &Event) -> bool {
    event.get(BATCH_SIZE).is_some() && event.get(BATCH_DATA).is_some()
}

/// Pack events into one batch event
pub fn encode_batch(events: &[Event]) -> Result<Event, SinkError> {
    let mut data = Vec::new();
    for event in events {
        let bytes = event.to_bytes()?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| SinkError::Failed("event too large to batch".to_string()))?;
        data.extend_from_slice(&len.to_be_bytes());
        data.extend_from_slice(&bytes);
    }
    let count = u32::try_from(events.len())
        .map_err(|_| SinkError::Failed("too many events in batch".to_string()))?;
    let mut batch = Event::new(Vec::new());
    batch.set(BATCH_SIZE, count.to_be_bytes().to_vec());
    batch.set(BATCH_DATA, data);
    Ok(batch)
}

/// Unpack a batch event, checking the count against the payload
pub fn decode_batch(batch: &Event) -> Result<Vec<Event>, SinkError> {
    let malformed = |reason: &str| SinkError::Failed(format!("malformed batch: {reason}"));
    let size = batch.get(BATCH_SIZE).ok_or_else(|| malformed("no size"))?;
    let data = batch.get(BATCH_DATA).ok_or_else(|| malformed("no data"))?;
    let count = read_u32(size).ok_or_else(|| malformed("bad size"))? as usize;

    let mut events = Vec::with_capacity(count);
    let mut rest = data;
    while !rest.is_empty() {
        let len = read_u32(rest).ok_or_else(|| malformed("truncated length"))? as usize;
        rest = &rest[4..];
        if rest.len() < len {
            return Err(malformed("truncated event"));
        }
        events.push(Event::from_bytes(&rest[..len])?);
        rest = &rest[len..];
    }
    if events.len() != count {
        return Err(malformed("count mismatch"));
    }
    Ok(events)
}

fn read_u32(bytes: &[u8]) -> Option<u32> {
    let head: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(head))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flush {
    Filled,
    Timeout,
    Close,
}

#[derive(Debug, Default, Clone, Copy)]
struct BatchCounters {
    timeouts: u64,
    filled: u64,
    triggered: u64,
    empty: u64,
}

struct BatchState<S> {
    inner: Wrapped<S>,
    events: Vec<Event>,
    last_batch: Instant,
    counters: BatchCounters,
}

impl<S: EventSink> BatchState<S> {
    /// Emit buffered events as one batch. The buffer is kept if the child
    /// refuses the batch.
    async fn end_batch(&mut self, cause: Flush) -> Result<(), SinkError> {
        self.last_batch = Instant::now();
        if self.events.is_empty() {
            self.counters.empty += 1;
            self.count_flush(cause);
            return Ok(());
        }
        let batch = encode_batch(&self.events)?;
        let count = self.events.len();
        self.inner.append(batch).await?;
        self.events.clear();
        self.count_flush(cause);
        debug!(events = count, cause = ?cause, "batch flushed");
        Ok(())
    }

    fn count_flush(&mut self, cause: Flush) {
        self.counters.triggered += 1;
        match cause {
            Flush::Filled => self.counters.filled += 1,
            Flush::Timeout => self.counters.timeouts += 1,
            Flush::Close => {}
        }
    }
}

/// Coalesces events into batches of `max_size`, or whatever has arrived
/// after `max_latency`. A zero latency disables the timer.
pub struct Batching<S> {
    state: Arc<Mutex<BatchState<S>>>,
    max_size: usize,
    max_latency: Duration,
    timer: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<S: EventSink + 'static> Batching<S> {
    pub fn new(sink: S, max_size: usize, max_latency: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BatchState {
                inner: Wrapped::new(NAME, sink),
                events: Vec::new(),
                last_batch: Instant::now(),
                counters: BatchCounters::default(),
            })),
            max_size: max_size.max(1),
            max_latency,
            timer: None,
        }
    }

    /// Events waiting for the next flush
    pub async fn pending(&self) -> usize {
        self.state.lock().await.events.len()
    }
}

async fn run_timer<S: EventSink>(
    state: Arc<Mutex<BatchState<S>>>,
    max_latency: Duration,
    stop: CancellationToken,
) {
    loop {
        let deadline = state.lock().await.last_batch + max_latency;
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = sleep_until(deadline) => {}
        }
        let mut st = state.lock().await;
        // a size-triggered flush moved the baseline while we slept
        if Instant::now() < st.last_batch + max_latency {
            continue;
        }
        if let Err(e) = st.end_batch(Flush::Timeout).await {
            error!(error = %e, "timed batch flush failed");
        }
    }
    debug!("batch timer stopped");
}

#[async_trait]
impl<S: EventSink + 'static> EventSink for Batching<S> {
    fn name(&self) -> &str {
        NAME
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        {
            let mut st = self.state.lock().await;
            st.inner.open().await?;
            st.last_batch = Instant::now();
        }
        if !self.max_latency.is_zero() {
            let stop = CancellationToken::new();
            let handle = tokio::spawn(run_timer(
                Arc::clone(&self.state),
                self.max_latency,
                stop.clone(),
            ));
            self.timer = Some((stop, handle));
        }
        Ok(())
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        let mut st = self.state.lock().await;
        if !st.inner.is_open() {
            return Err(SinkError::NotOpen(NAME.to_string()));
        }
        st.events.push(event);
        if st.events.len() >= self.max_size {
            st.end_batch(Flush::Filled).await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        let flushed = {
            let mut st = self.state.lock().await;
            if !st.inner.is_open() {
                return st.inner.close().await;
            }
            st.end_batch(Flush::Close).await
        };

        if let Some((stop, handle)) = self.timer.take() {
            stop.cancel();
            let bound = self.max_latency * 2;
            match tokio::time::timeout(bound, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "batch timer task failed"),
                Err(_) => warn!(bound_ms = bound.as_millis() as u64, "batch timer did not stop in time"),
            }
        }

        let closed = self.state.lock().await.inner.close().await;
        flushed.and(closed)
    }

    async fn report(&self) -> Report {
        let st = self.state.lock().await;
        let c = st.counters;
        let mut report = Report::new(NAME);
        report
            .set_long("timeoutBatches", c.timeouts as i64)
            .set_long("filledBatches", c.filled as i64)
            .set_long("triggeredBatches", c.triggered as i64)
            .set_long("emptyBatches", c.empty as i64);
        st.inner.report_into(report).await
    }
}

const UNBATCH: &str = "Unbatch";

/// Expands batch events back into their members; other events pass through
pub struct Unbatching<S> {
    inner: Wrapped<S>,
    batches: u64,
}

impl<S: EventSink> Unbatching<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Wrapped::new(UNBATCH, sink),
            batches: 0,
        }
    }
}

#[async_trait]
impl<S: EventSink> EventSink for Unbatching<S> {
    fn name(&self) -> &str {
        UNBATCH
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        self.inner.open().await
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        if !is_batch(&event) {
            return self.inner.append(event).await;
        }
        for member in decode_batch(&event)? {
            self.inner.append(member).await?;
        }
        self.batches += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.inner.close().await
    }

    async fn report(&self) -> Report {
        let report = Report::new(UNBATCH).with_long("batches", self.batches as i64);
        self.inner.report_into(report).await
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
