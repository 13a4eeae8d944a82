// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Roll sink: a stable facade over a downstream graph rebuilt every epoch
//!
//! The downstream graph is built from a stored specification. Rotation is
//! driven by the trigger, checked both by a background poller and before
//! every append; the two share one lock, held for the whole
//! close-build-open sequence.

pub mod tagger;
pub mod trigger;

pub use tagger::{ProcessTagger, Tagger};
pub use trigger::{AnyTrigger, RollTrigger, SizeTrigger, TimeTrigger};

use async_trait::async_trait;
use relay_core::{Context, Event, EventSink, Report, SinkError, SpecError, SystemClock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Attribute carrying the epoch tag on every forwarded event
pub const ROLL_TAG: &str = "rolltag";

const NAME: &str = "Roll";
const MIN_CHECK_PERIOD: Duration = Duration::from_millis(1);

struct RollState {
    current: Option<Box<dyn EventSink>>,
    trigger: Box<dyn RollTrigger>,
    open: bool,
    rolls: u64,
    rollfails: u64,
}

/// Builds downstream graphs; shared with the poller task
struct Roller {
    ctx: Context,
    spec: String,
}

impl Roller {
    async fn build_open(&self) -> Result<Box<dyn EventSink>, SinkError> {
        let mut sink = self.ctx.build_sink(&self.spec)?;
        sink.open().await?;
        Ok(sink)
    }

    /// Close the current graph and swap in a fresh one. Failures are counted
    /// and logged; a failed build leaves no current graph.
    async fn rotate(&self, st: &mut RollState) -> bool {
        st.rolls += 1;
        let mut ok = true;
        if let Some(mut old) = st.current.take() {
            if let Err(e) = old.close().await {
                error!(spec = %self.spec, error = %e, "closing rolled sink failed");
                ok = false;
            }
        }
        match self.build_open().await {
            Ok(sink) => {
                st.current = Some(sink);
                debug!(tag = st.trigger.tag(), rolls = st.rolls, "rolled");
            }
            Err(e) => {
                error!(spec = %self.spec, error = %e, "roll could not open new sink");
                ok = false;
            }
        }
        if !ok {
            st.rollfails += 1;
        }
        ok
    }

    /// Rebuild after an earlier failed roll
    async fn ensure_current(&self, st: &mut RollState) -> Result<(), SinkError> {
        if st.current.is_some() {
            return Ok(());
        }
        match self.build_open().await {
            Ok(sink) => {
                st.current = Some(sink);
                info!(spec = %self.spec, "roll sink rebuilt");
                Ok(())
            }
            Err(e) => {
                st.rollfails += 1;
                Err(e)
            }
        }
    }
}

pub struct RollSink {
    roller: Arc<Roller>,
    state: Arc<Mutex<RollState>>,
    check_period: Duration,
    poller: Option<(CancellationToken, JoinHandle<()>)>,
}

impl fmt::Debug for RollSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollSink")
            .field("spec", &self.roller.spec)
            .field("check_period", &self.check_period)
            .field("polling", &self.poller.is_some())
            .finish()
    }
}

impl RollSink {
    /// The specification is built once here so a malformed one fails now
    /// rather than at the first roll.
    pub fn new(
        ctx: &Context,
        spec: impl Into<String>,
        trigger: Box<dyn RollTrigger>,
        check_period: Duration,
    ) -> Result<Self, SpecError> {
        let spec = spec.into();
        ctx.build_sink(&spec)?;
        Ok(Self {
            roller: Arc::new(Roller {
                ctx: ctx.clone(),
                spec,
            }),
            state: Arc::new(Mutex::new(RollState {
                current: None,
                trigger,
                open: false,
                rolls: 0,
                rollfails: 0,
            })),
            check_period: check_period.max(MIN_CHECK_PERIOD),
            poller: None,
        })
    }

    /// Roll every `period` of wall time, tagging epochs by process and time
    pub fn periodic(
        ctx: &Context,
        spec: impl Into<String>,
        period: Duration,
        check_period: Duration,
    ) -> Result<Self, SpecError> {
        let trigger = TimeTrigger::new(Box::new(ProcessTagger::system()), period, SystemClock);
        Self::new(ctx, spec, Box::new(trigger), check_period)
    }

    pub fn spec(&self) -> &str {
        &self.roller.spec
    }

    /// Force a rotation now
    pub async fn rotate(&self) -> bool {
        let mut st = self.state.lock().await;
        if !st.open {
            error!("rotate on a closed roll sink");
            return false;
        }
        st.trigger.reset();
        self.roller.rotate(&mut st).await
    }

    pub async fn current_tag(&self) -> String {
        self.state.lock().await.trigger.tag().to_string()
    }
}

async fn poll_trigger(
    roller: Arc<Roller>,
    state: Arc<Mutex<RollState>>,
    check_period: Duration,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(check_period) => {}
        }
        let mut st = state.lock().await;
        if !st.open {
            break;
        }
        if st.trigger.is_triggered() {
            st.trigger.reset();
            debug!(tag = st.trigger.tag(), "rotation started by poller");
            roller.rotate(&mut st).await;
        } else if let Err(e) = roller.ensure_current(&mut st).await {
            warn!(error = %e, "roll sink still without a downstream");
        }
    }
    debug!("roll poller stopped");
}

#[async_trait]
impl EventSink for RollSink {
    fn name(&self) -> &str {
        NAME
    }

    async fn open(&mut self) -> Result<(), SinkError> {
        {
            let mut st = self.state.lock().await;
            if st.open {
                return Err(SinkError::AlreadyOpen(NAME.to_string()));
            }
            st.trigger.reset();
            st.open = true;
            match self.roller.build_open().await {
                Ok(sink) => st.current = Some(sink),
                Err(e) => warn!(spec = %self.roller.spec, error = %e, "initial roll sink failed to open"),
            }
        }

        let stop = self.roller.ctx.cancel_token().child_token();
        let handle = tokio::spawn(poll_trigger(
            Arc::clone(&self.roller),
            Arc::clone(&self.state),
            self.check_period,
            stop.clone(),
        ));
        self.poller = Some((stop, handle));
        Ok(())
    }

    async fn append(&mut self, mut event: Event) -> Result<(), SinkError> {
        let mut st = self.state.lock().await;
        if !st.open {
            return Err(SinkError::NotOpen(NAME.to_string()));
        }
        if st.trigger.is_triggered() {
            st.trigger.reset();
            debug!(tag = st.trigger.tag(), "rotation started by append");
            self.roller.rotate(&mut st).await;
        }
        event.set(ROLL_TAG, st.trigger.tag().as_bytes().to_vec());
        self.roller.ensure_current(&mut st).await?;

        let RollState {
            current, trigger, ..
        } = &mut *st;
        trigger.append(&event);
        match current.as_mut() {
            Some(sink) => sink.append(event).await,
            None => Err(SinkError::NotOpen(NAME.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if let Some((stop, handle)) = self.poller.take() {
            stop.cancel();
            let bound = self.roller.ctx.defaults().shutdown_timeout;
            match tokio::time::timeout(bound, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "roll poller task failed"),
                Err(_) => warn!(bound_ms = bound.as_millis() as u64, "roll poller did not stop in time"),
            }
        }

        let mut st = self.state.lock().await;
        if !st.open {
            info!(stage = NAME, "double close");
            return Ok(());
        }
        st.open = false;
        match st.current.take() {
            Some(mut sink) => sink.close().await,
            None => Ok(()),
        }
    }

    async fn report(&self) -> Report {
        let st = self.state.lock().await;
        let mut report = Report::new(NAME);
        report
            .set_long("rolls", st.rolls as i64)
            .set_long("rollfails", st.rollfails as i64)
            .set_string("rollspec", self.roller.spec.clone());
        if let Some(sink) = &st.current {
            report.add_child(sink.name().to_string(), sink.report().await);
        }
        report
    }
}

#[cfg(test)]
#[path = "roll_tests.rs"]
mod tests;
