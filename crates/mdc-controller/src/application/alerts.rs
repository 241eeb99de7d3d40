//! Alert engine: threshold rules, deduplication, and fleet status.
//!
//! Every completed monitoring cycle is fed to [`AlertEngine::process_cycle`].
//! Each record is checked against [`AlertThresholds`]; a rule that fires
//! stores an [`Alert`] unless an alert with the identical message was stored
//! within the last [`DEDUP_WINDOW`].  The store keeps at most [`MAX_ALERTS`]
//! entries and drops the oldest first.
//!
//! Time comes from an injected [`Clock`] so the windows are testable without
//! sleeping.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use mdc_core::{Alert, AlertId, AlertLevel, FleetStatus, HealthRecord};
use tracing::{info_span, warn, Span};

/// Identical messages inside this window are stored once.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(300);

/// Alerts newer than this count as "recent" in [`FleetStatus`].
pub const RECENT_WINDOW: Duration = Duration::from_secs(3600);

/// Capacity of the alert store.
pub const MAX_ALERTS: usize = 100;

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// [`Clock`] backed by [`SystemTime::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually advanced [`Clock`] for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: SystemTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Thresholds ────────────────────────────────────────────────────────────────

/// Limits the alert rules compare health records against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertThresholds {
    /// °C at or above which a Warning is raised.
    pub temperature_warning: u8,
    /// °C at or above which a Critical alert is raised instead.
    pub temperature_critical: u8,
    /// Maximum age of the last response before a Warning.
    pub response_timeout: Duration,
    /// Error count at or above which a Warning is raised.
    pub error_count_warning: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            temperature_warning: 70,
            temperature_critical: 80,
            response_timeout: Duration::from_secs(10),
            error_count_warning: 3,
        }
    }
}

// ── AlertEngine ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct AlertStore {
    alerts: VecDeque<Alert>,
    next_id: u64,
    last_cycle: Vec<HealthRecord>,
}

/// Stores alerts and derives the fleet status.
pub struct AlertEngine {
    thresholds: AlertThresholds,
    clock: Arc<dyn Clock>,
    store: Mutex<AlertStore>,
    span: Span,
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds, clock: Arc<dyn Clock>) -> Self {
        Self {
            thresholds,
            clock,
            store: Mutex::new(AlertStore::default()),
            span: info_span!("alerts"),
        }
    }

    /// Replaces the span alerts are logged under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Stores an alert unless the same message was stored within
    /// [`DEDUP_WINDOW`].
    ///
    /// Returns the id of the stored alert, or `None` if it was suppressed.
    pub fn add_alert(&self, level: AlertLevel, message: impl Into<String>) -> Option<AlertId> {
        let message = message.into();
        let now = self.clock.now();
        let mut store = self.store();

        let duplicate = store
            .alerts
            .iter()
            .any(|a| a.message == message && within(now, a.timestamp, DEDUP_WINDOW));
        if duplicate {
            return None;
        }

        store.next_id += 1;
        let id = AlertId(store.next_id);
        warn!(parent: &self.span, alert = %id, %level, "{message}");
        store.alerts.push_back(Alert {
            id,
            level,
            message,
            timestamp: now,
        });
        while store.alerts.len() > MAX_ALERTS {
            store.alerts.pop_front();
        }
        Some(id)
    }

    /// Applies every threshold rule to one health record.
    pub fn evaluate(&self, record: &HealthRecord) {
        let id = record.display_id;
        let t = &self.thresholds;

        if let Some(temp) = record.temperature {
            if temp >= t.temperature_critical {
                self.add_alert(
                    AlertLevel::Critical,
                    format!("Display {id} temperature critical: {temp}°C"),
                );
            } else if temp >= t.temperature_warning {
                self.add_alert(
                    AlertLevel::Warning,
                    format!("Display {id} temperature high: {temp}°C"),
                );
            }
        }

        if !record.connected {
            self.add_alert(AlertLevel::Error, format!("Display {id} not connected"));
        } else if !record.responsive {
            self.add_alert(AlertLevel::Warning, format!("Display {id} not responding"));
        }

        if let Some(last) = record.last_response {
            let age = self
                .clock
                .now()
                .duration_since(last)
                .unwrap_or(Duration::ZERO);
            if age > t.response_timeout {
                self.add_alert(
                    AlertLevel::Warning,
                    format!("Display {id} last response {:.1}s ago", age.as_secs_f64()),
                );
            }
        }

        if record.error_count >= t.error_count_warning {
            self.add_alert(
                AlertLevel::Warning,
                format!("Display {id} has {} errors", record.error_count),
            );
        }
    }

    /// Evaluates a completed cycle and keeps it as the latest one.
    pub fn process_cycle(&self, records: &[HealthRecord]) {
        for record in records {
            self.evaluate(record);
        }
        self.store().last_cycle = records.to_vec();
    }

    /// Copy of the stored alerts, oldest first, optionally of one level only.
    pub fn alerts(&self, level: Option<AlertLevel>) -> Vec<Alert> {
        self.store()
            .alerts
            .iter()
            .filter(|a| level.map_or(true, |l| a.level == l))
            .cloned()
            .collect()
    }

    /// Records of the last completed cycle.
    pub fn last_cycle(&self) -> Vec<HealthRecord> {
        self.store().last_cycle.clone()
    }

    /// Fleet counters from the last completed cycle and alerts from the last
    /// [`RECENT_WINDOW`].
    pub fn system_status(&self) -> FleetStatus {
        let now = self.clock.now();
        let store = self.store();
        let recent: Vec<Alert> = store
            .alerts
            .iter()
            .filter(|a| within(now, a.timestamp, RECENT_WINDOW))
            .cloned()
            .collect();
        FleetStatus::from_cycle(&store.last_cycle, &recent)
    }

    fn store(&self) -> MutexGuard<'_, AlertStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `true` if `at` lies less than `window` before `now`.  Timestamps ahead of
/// `now` count as inside the window.
fn within(now: SystemTime, at: SystemTime, window: Duration) -> bool {
    now.duration_since(at).map_or(true, |age| age < window)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use mdc_core::SystemHealth;

    use super::*;

    fn start() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
    }

    fn engine() -> (AlertEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        (AlertEngine::new(AlertThresholds::default(), clock.clone()), clock)
    }

    fn healthy(id: u8, at: SystemTime) -> HealthRecord {
        HealthRecord {
            display_id: id,
            address: format!("10.0.0.{id}:1515"),
            connected: true,
            responsive: true,
            temperature: Some(40),
            model: Some("LH55BECH".into()),
            serial_number: None,
            software_version: None,
            error_count: 0,
            last_response: Some(at),
            timestamp: at,
            error: None,
        }
    }

    // ── Deduplication ─────────────────────────────────────────────────────────

    #[test]
    fn test_same_message_within_window_is_stored_once() {
        // Arrange
        let (engine, clock) = engine();

        // Act
        let first = engine.add_alert(AlertLevel::Error, "Display 1 not connected");
        clock.advance(Duration::from_secs(299));
        let second = engine.add_alert(AlertLevel::Error, "Display 1 not connected");

        // Assert
        assert_eq!(first, Some(AlertId(1)));
        assert_eq!(second, None);
        assert_eq!(engine.alerts(None).len(), 1);
    }

    #[test]
    fn test_same_message_after_window_is_stored_again() {
        let (engine, clock) = engine();

        engine.add_alert(AlertLevel::Error, "Display 1 not connected");
        clock.advance(Duration::from_secs(301));
        let again = engine.add_alert(AlertLevel::Error, "Display 1 not connected");

        assert_eq!(again, Some(AlertId(2)));
        assert_eq!(engine.alerts(None).len(), 2);
    }

    #[test]
    fn test_different_messages_are_not_deduplicated() {
        let (engine, _clock) = engine();

        engine.add_alert(AlertLevel::Warning, "Display 1 not responding");
        engine.add_alert(AlertLevel::Warning, "Display 2 not responding");

        assert_eq!(engine.alerts(None).len(), 2);
    }

    #[test]
    fn test_store_keeps_only_newest_hundred() {
        // Arrange
        let (engine, _clock) = engine();

        // Act
        for i in 0..150 {
            engine.add_alert(AlertLevel::Warning, format!("alert {i}"));
        }

        // Assert
        let alerts = engine.alerts(None);
        assert_eq!(alerts.len(), MAX_ALERTS);
        assert_eq!(alerts[0].message, "alert 50");
        assert_eq!(alerts[99].message, "alert 149");
        assert_eq!(alerts[99].id, AlertId(150));
    }

    #[test]
    fn test_alert_ids_are_monotonic() {
        let (engine, _clock) = engine();
        let ids: Vec<AlertId> = (0..5)
            .filter_map(|i| engine.add_alert(AlertLevel::Warning, format!("m{i}")))
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    // ── Rules ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_temperature_at_critical_threshold_raises_critical_only() {
        let (engine, _clock) = engine();
        let mut record = healthy(3, start());
        record.temperature = Some(80);

        engine.evaluate(&record);

        let alerts = engine.alerts(None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Critical);
        assert_eq!(alerts[0].message, "Display 3 temperature critical: 80°C");
    }

    #[test]
    fn test_temperature_at_warning_threshold_raises_warning() {
        let (engine, _clock) = engine();
        let mut record = healthy(3, start());
        record.temperature = Some(70);

        engine.evaluate(&record);

        assert_eq!(engine.alerts(Some(AlertLevel::Warning)).len(), 1);
        assert!(engine.alerts(Some(AlertLevel::Critical)).is_empty());
    }

    #[test]
    fn test_healthy_record_raises_nothing() {
        let (engine, _clock) = engine();
        engine.evaluate(&healthy(1, start()));
        assert!(engine.alerts(None).is_empty());
    }

    #[test]
    fn test_disconnected_raises_error_but_not_unresponsive_warning() {
        let (engine, _clock) = engine();
        let record = HealthRecord::degraded(4, "10.0.0.4:1515", "boom", start());

        engine.evaluate(&record);

        let alerts = engine.alerts(None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].level, AlertLevel::Error);
        assert_eq!(alerts[0].message, "Display 4 not connected");
    }

    #[test]
    fn test_connected_but_unresponsive_raises_warning() {
        let (engine, _clock) = engine();
        let mut record = healthy(2, start());
        record.responsive = false;
        record.temperature = None;

        engine.evaluate(&record);

        let alerts = engine.alerts(None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "Display 2 not responding");
    }

    #[test]
    fn test_stale_last_response_raises_warning() {
        // Arrange
        let (engine, clock) = engine();
        let record = healthy(5, start());
        clock.advance(Duration::from_secs(12));

        // Act
        engine.evaluate(&record);

        // Assert
        let alerts = engine.alerts(None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "Display 5 last response 12.0s ago");
    }

    #[test]
    fn test_error_count_at_threshold_raises_warning() {
        let (engine, _clock) = engine();
        let mut record = healthy(6, start());
        record.error_count = 3;

        engine.evaluate(&record);

        assert_eq!(engine.alerts(None)[0].message, "Display 6 has 3 errors");
    }

    // ── System status ─────────────────────────────────────────────────────────

    #[test]
    fn test_system_status_counts_come_from_last_cycle() {
        // Arrange
        let (engine, _clock) = engine();
        let mut unresponsive = healthy(2, start());
        unresponsive.responsive = false;
        unresponsive.temperature = None;
        let records = vec![
            healthy(1, start()),
            unresponsive,
            HealthRecord::degraded(3, "10.0.0.3:1515", "timeout", start()),
        ];

        // Act
        engine.process_cycle(&records);
        let status = engine.system_status();

        // Assert
        assert_eq!(status.total_displays, 3);
        assert_eq!(status.connected_displays, 2);
        assert_eq!(status.responsive_displays, 1);
        assert_eq!(status.warning_alerts, 1);
        assert_eq!(status.system_health, SystemHealth::Warning);
        assert_eq!(engine.last_cycle(), records);
    }

    #[test]
    fn test_system_status_is_healthy_once_alerts_age_out() {
        let (engine, clock) = engine();
        engine.add_alert(AlertLevel::Critical, "Display 1 temperature critical: 85°C");
        assert_eq!(engine.system_status().system_health, SystemHealth::Critical);

        clock.advance(RECENT_WINDOW);

        let status = engine.system_status();
        assert_eq!(status.recent_alerts, 0);
        assert_eq!(status.system_health, SystemHealth::Healthy);
        // Aged-out alerts remain in the store.
        assert_eq!(engine.alerts(None).len(), 1);
    }
}
