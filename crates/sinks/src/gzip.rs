// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gzip and gunzip decorators
//!
//! Gzip replaces each event with an empty-bodied event whose `gzipDoc`
//! attribute holds the compressed serialized original. Gunzip reverses it
//! and passes anything else through untouched.

use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use relay_core::{Event, EventSink, Report, SinkError, Wrapped};
use std::io::{Read, Write};

pub const GZIP_DOC: &str = "gzipDoc";

const GZIP: &str = "Gzip";
const GUNZIP: &str = "Gunzip";

/// Compress one event into a carrier event
pub fn gzip_event(event: &Event) -> Result<(Event, usize), SinkError> {
    let raw = event.to_bytes()?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    let compressed = encoder.finish()?;
    let mut carrier = Event::new(Vec::new());
    carrier.set(GZIP_DOC, compressed);
    Ok((carrier, raw.len()))
}

/// Restore the event carried by a gzip carrier, if it is one
pub fn gunzip_event(event: &Event) -> Result<Option<Event>, SinkError> {
    let Some(compressed) = event.get(GZIP_DOC) else {
        return Ok(None);
    };
    let mut raw = Vec::new();
    GzDecoder::new(compressed).read_to_end(&mut raw)?;
    Ok(Some(Event::from_bytes(&raw)?))
}

pub struct Gzip<S> {
    inner: Wrapped<S>,
    events: u64,
    events_size: u64,
    gzipped_size: u64,
}

impl<S: EventSink> Gzip<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Wrapped::new(GZIP, sink),
            events: 0,
            events_size: 0,
            gzipped_size: 0,
        }
    }
}

#[async_trait]
impl<S: EventSink> EventSink for Gzip<S> {
    fn name(&self) -> &str {
        GZIP
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        self.inner.open().await
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        let (carrier, raw_len) = gzip_event(&event)?;
        let packed_len = carrier.get(GZIP_DOC).map_or(0, <[u8]>::len);
        self.inner.append(carrier).await?;
        self.events += 1;
        self.events_size += raw_len as u64;
        self.gzipped_size += packed_len as u64;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.inner.close().await
    }

    async fn report(&self) -> Report {
        let mut report = Report::new(GZIP);
        report
            .set_long("eventsCount", self.events as i64)
            .set_long("eventsSize", self.events_size as i64)
            .set_long("gzippedSize", self.gzipped_size as i64);
        self.inner.report_into(report).await
    }
}

pub struct Gunzip<S> {
    inner: Wrapped<S>,
    unzipped: u64,
    passed: u64,
}

impl<S: EventSink> Gunzip<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Wrapped::new(GUNZIP, sink),
            unzipped: 0,
            passed: 0,
        }
    }
}

#[async_trait]
impl<S: EventSink> EventSink for Gunzip<S> {
    fn name(&self) -> &str {
        GUNZIP
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        self.inner.open().await
    }

    async fn append(&mut self, event: Event) -> Result<(), SinkError> {
        match gunzip_event(&event)? {
            Some(original) => {
                self.inner.append(original).await?;
                self.unzipped += 1;
            }
            None => {
                self.inner.append(event).await?;
                self.passed += 1;
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.inner.close().await
    }

    async fn report(&self) -> Report {
        let mut report = Report::new(GUNZIP);
        report
            .set_long("gunzipped", self.unzipped as i64)
            .set_long("passedThrough", self.passed as i64);
        self.inner.report_into(report).await
    }
}

#[cfg(test)]
#[path = "gzip_tests.rs"]
mod tests;
