//! Health records, alerts, and fleet status.
//!
//! These are plain data: the controller crate produces [`HealthRecord`]s
//! once per monitoring cycle and derives [`Alert`]s and a [`FleetStatus`]
//! from them.  Nothing here is persisted.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::domain::layout::DisplayId;

/// Snapshot of one display's health, produced by one health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub display_id: DisplayId,
    /// `host:port` the display was checked at.
    pub address: String,
    /// A TCP session could be established.
    pub connected: bool,
    /// The display answered the temperature probe.
    pub responsive: bool,
    /// Panel temperature in °C, when reported.
    pub temperature: Option<u8>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub software_version: Option<String>,
    /// I/O errors since the last successful connect.
    pub error_count: u32,
    /// Time of the last decoded response from the display.
    pub last_response: Option<SystemTime>,
    /// When this record was produced.
    pub timestamp: SystemTime,
    /// Why the check itself failed; `None` for a completed check.
    pub error: Option<String>,
}

impl HealthRecord {
    /// A record for a display whose check could not complete at all.
    pub fn degraded(
        display_id: DisplayId,
        address: impl Into<String>,
        error: impl Into<String>,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            display_id,
            address: address.into(),
            connected: false,
            responsive: false,
            temperature: None,
            model: None,
            serial_number: None,
            software_version: None,
            error_count: 0,
            last_response: None,
            timestamp,
            error: Some(error.into()),
        }
    }

    /// `true` if the record came from a failed check rather than a completed one.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

// ── Alerts ────────────────────────────────────────────────────────────────────

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Error,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
            AlertLevel::Critical => "critical",
        })
    }
}

/// Monotonically increasing alert identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub u64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}

/// A stored alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub level: AlertLevel,
    pub message: String,
    pub timestamp: SystemTime,
}

// ── Fleet status ──────────────────────────────────────────────────────────────

/// Overall verdict derived from the last hour of alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Healthy,
    Warning,
    Critical,
}

/// Aggregate view of the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetStatus {
    pub total_displays: usize,
    pub connected_displays: usize,
    pub responsive_displays: usize,
    /// `connected / total`, `0.0` for an empty fleet.
    pub connection_rate: f64,
    /// Mean of the reported temperatures, if any display reported one.
    pub average_temperature: Option<f64>,
    pub recent_alerts: usize,
    pub critical_alerts: usize,
    pub warning_alerts: usize,
    pub system_health: SystemHealth,
}

impl FleetStatus {
    /// Builds the display counters from the records of one monitoring cycle
    /// and the alert counters from `recent_alerts`.
    pub fn from_cycle(records: &[HealthRecord], recent_alerts: &[Alert]) -> Self {
        let total_displays = records.len();
        let connected_displays = records.iter().filter(|r| r.connected).count();
        let responsive_displays = records.iter().filter(|r| r.responsive).count();
        let temperatures: Vec<f64> = records
            .iter()
            .filter_map(|r| r.temperature.map(f64::from))
            .collect();
        let average_temperature = if temperatures.is_empty() {
            None
        } else {
            Some(temperatures.iter().sum::<f64>() / temperatures.len() as f64)
        };

        let count_level = |level| recent_alerts.iter().filter(|a| a.level == level).count();
        let critical_alerts = count_level(AlertLevel::Critical);
        let warning_alerts = count_level(AlertLevel::Warning);

        let system_health = if recent_alerts.is_empty() {
            SystemHealth::Healthy
        } else if critical_alerts > 0 {
            SystemHealth::Critical
        } else {
            SystemHealth::Warning
        };

        Self {
            total_displays,
            connected_displays,
            responsive_displays,
            connection_rate: if total_displays > 0 {
                connected_displays as f64 / total_displays as f64
            } else {
                0.0
            },
            average_temperature,
            recent_alerts: recent_alerts.len(),
            critical_alerts,
            warning_alerts,
            system_health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(id: DisplayId, connected: bool, responsive: bool, temp: Option<u8>) -> HealthRecord {
        HealthRecord {
            connected,
            responsive,
            temperature: temp,
            error: None,
            ..HealthRecord::degraded(id, "10.0.0.1:1515", "", SystemTime::UNIX_EPOCH)
        }
    }

    fn alert(id: u64, level: AlertLevel) -> Alert {
        Alert {
            id: AlertId(id),
            level,
            message: format!("alert {id}"),
            timestamp: SystemTime::UNIX_EPOCH + Duration::from_secs(id),
        }
    }

    #[test]
    fn test_degraded_record_is_disconnected_and_flagged() {
        let r = HealthRecord::degraded(4, "10.0.0.4:1515", "task panicked", SystemTime::now());
        assert!(!r.connected);
        assert!(!r.responsive);
        assert!(r.is_degraded());
        assert_eq!(r.error.as_deref(), Some("task panicked"));
    }

    #[test]
    fn test_status_for_empty_fleet_is_healthy() {
        let status = FleetStatus::from_cycle(&[], &[]);
        assert_eq!(status.total_displays, 0);
        assert_eq!(status.connection_rate, 0.0);
        assert_eq!(status.average_temperature, None);
        assert_eq!(status.system_health, SystemHealth::Healthy);
    }

    #[test]
    fn test_status_counts_come_from_records() {
        let records = vec![
            record(1, true, true, Some(40)),
            record(2, true, false, None),
            record(3, false, false, None),
            record(4, true, true, Some(50)),
        ];
        let status = FleetStatus::from_cycle(&records, &[]);
        assert_eq!(status.total_displays, 4);
        assert_eq!(status.connected_displays, 3);
        assert_eq!(status.responsive_displays, 2);
        assert_eq!(status.connection_rate, 0.75);
        assert_eq!(status.average_temperature, Some(45.0));
    }

    #[test]
    fn test_any_critical_alert_makes_fleet_critical() {
        let alerts = vec![alert(1, AlertLevel::Warning), alert(2, AlertLevel::Critical)];
        let status = FleetStatus::from_cycle(&[], &alerts);
        assert_eq!(status.system_health, SystemHealth::Critical);
        assert_eq!(status.critical_alerts, 1);
        assert_eq!(status.warning_alerts, 1);
        assert_eq!(status.recent_alerts, 2);
    }

    #[test]
    fn test_error_alerts_without_critical_make_fleet_warning() {
        let alerts = vec![alert(1, AlertLevel::Error)];
        let status = FleetStatus::from_cycle(&[], &alerts);
        assert_eq!(status.system_health, SystemHealth::Warning);
        assert_eq!(status.warning_alerts, 0);
    }

    #[test]
    fn test_alert_level_display_is_lowercase() {
        assert_eq!(AlertLevel::Critical.to_string(), "critical");
        assert_eq!(AlertId(7).to_string(), "alert-7");
    }
}
