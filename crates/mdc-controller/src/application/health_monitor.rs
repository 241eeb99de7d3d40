//! Periodic fleet health monitoring.
//!
//! A [`HealthMonitor`] checks every display concurrently once per interval
//! and feeds the results to the [`AlertEngine`].  One display failing, even
//! by panicking, never affects the records of the others: its slot in the
//! cycle is filled with a degraded [`HealthRecord`].
//!
//! ```text
//! start() ──► run_cycle() ──► sleep(interval) ──► run_cycle() ──► ...
//!                 │                 ▲
//!                 │                 └── stop() wakes the sleeper
//!                 ├─ JoinSet: one check task per display
//!                 └─ AlertEngine::process_cycle(records)
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mdc_core::{DisplayId, HealthRecord};
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;
use tracing::{info, info_span, warn, Instrument, Span};

use crate::application::alerts::{AlertEngine, Clock, SystemClock};
use crate::application::display_control::ControlError;

/// Default time between the end of one cycle and the start of the next.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Something that can report the health of one display.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn display_id(&self) -> DisplayId;

    /// `host:port`, used to label degraded records.
    fn address(&self) -> String;

    async fn check(&self) -> Result<HealthRecord, ControlError>;
}

/// Runs health checks over a fixed set of displays.
pub struct HealthMonitor {
    probes: Vec<Arc<dyn HealthProbe>>,
    engine: Arc<AlertEngine>,
    interval: Duration,
    clock: Arc<dyn Clock>,
    active: AtomicBool,
    wake: Notify,
    span: Span,
}

impl HealthMonitor {
    pub fn new(
        probes: Vec<Arc<dyn HealthProbe>>,
        engine: Arc<AlertEngine>,
        interval: Duration,
    ) -> Self {
        Self {
            probes,
            engine,
            interval,
            clock: Arc::new(SystemClock),
            active: AtomicBool::new(false),
            wake: Notify::new(),
            span: info_span!("monitor"),
        }
    }

    /// Clock used to timestamp degraded records.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn engine(&self) -> &Arc<AlertEngine> {
        &self.engine
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Runs cycles until [`stop`](Self::stop) is called.
    ///
    /// A cycle that is in flight when `stop` is called runs to completion;
    /// the interval sleep is cut short.  Returns at once if a loop is
    /// already running on this monitor.
    pub async fn start(&self) {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(parent: &self.span, "monitoring already running");
            return;
        }
        info!(parent: &self.span, displays = self.probes.len(), interval = ?self.interval, "monitoring started");

        while self.is_active() {
            self.run_cycle().await;

            // Register for the wake-up before re-checking the flag so a
            // concurrent stop() cannot slip between the two.
            let wake = self.wake.notified();
            tokio::pin!(wake);
            wake.as_mut().enable();
            if !self.is_active() {
                break;
            }
            tokio::select! {
                _ = time::sleep(self.interval) => {}
                _ = &mut wake => {}
            }
        }

        info!(parent: &self.span, "monitoring stopped");
    }

    /// Clears the active flag and wakes a sleeping [`start`](Self::start).
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    /// Runs [`start`](Self::start) on a new Tokio task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.start().await })
    }

    /// Checks every display once, concurrently.
    ///
    /// Returns one record per display, sorted by display id, after handing
    /// them to the alert engine.
    pub async fn run_cycle(&self) -> Vec<HealthRecord> {
        let mut tasks = JoinSet::new();
        let mut owners = HashMap::with_capacity(self.probes.len());

        for probe in &self.probes {
            let owner = (probe.display_id(), probe.address());
            let probe = Arc::clone(probe);
            let handle = tasks.spawn(
                async move { probe.check().await }
                    .instrument(info_span!(parent: &self.span, "check", display = owner.0)),
            );
            owners.insert(handle.id(), owner);
        }

        let mut records = Vec::with_capacity(owners.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let (task_id, error) = match joined {
                Ok((_, Ok(record))) => {
                    records.push(record);
                    continue;
                }
                Ok((task_id, Err(e))) => (task_id, e.to_string()),
                Err(e) => (e.id(), ControlError::TaskFailed(e.to_string()).to_string()),
            };
            if let Some((display_id, address)) = owners.get(&task_id) {
                warn!(parent: &self.span, display = display_id, %error, "health check failed");
                records.push(HealthRecord::degraded(
                    *display_id,
                    address.clone(),
                    error,
                    self.clock.now(),
                ));
            }
        }

        records.sort_by_key(|r| r.display_id);
        self.engine.process_cycle(&records);

        info!(
            parent: &self.span,
            displays = records.len(),
            connected = records.iter().filter(|r| r.connected).count(),
            responsive = records.iter().filter(|r| r.responsive).count(),
            "health cycle complete"
        );
        records
    }

    /// Records of the last completed cycle.
    pub fn latest_records(&self) -> Vec<HealthRecord> {
        self.engine.last_cycle()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
