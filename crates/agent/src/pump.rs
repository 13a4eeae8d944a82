// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event pumps: input lines into a sink, a source into a sink

use relay_core::{Event, EventSink, EventSource, SinkError, SourceError};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("reading: {0}")]
    Source(#[from] SourceError),
    #[error("writing: {0}")]
    Sink(#[from] SinkError),
}

/// Append each line of `input` as one event, until end of input or `cancel`.
/// Returns the number of events appended.
pub async fn ingest<R, S>(input: R, sink: &mut S, cancel: &CancellationToken) -> Result<u64, PumpError>
where
    R: AsyncBufRead + Unpin,
    S: EventSink + ?Sized,
{
    let mut lines = input.lines();
    let mut ingested = 0;
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.map_err(SinkError::from)?,
        };
        let Some(line) = line else {
            debug!(ingested, "end of input");
            break;
        };
        sink.append(Event::new(line)).await?;
        ingested += 1;
    }
    Ok(ingested)
}

/// Forward until the source ends. Cancellation observed on either side ends
/// the pump without error. Returns the number of events delivered.
pub async fn forward<Src, Snk>(source: &mut Src, sink: &mut Snk) -> Result<u64, PumpError>
where
    Src: EventSource + ?Sized,
    Snk: EventSink + ?Sized,
{
    let mut forwarded = 0;
    loop {
        let event = match source.next().await {
            Ok(Some(event)) => event,
            Ok(None) | Err(SourceError::Interrupted) => break,
            Err(e) => return Err(e.into()),
        };
        match sink.append(event).await {
            Ok(()) => forwarded += 1,
            Err(e) if e.is_interrupted() => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(forwarded)
}

#[cfg(test)]
#[path = "pump_tests.rs"]
mod tests;
