use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::MonitorSettings;

/// Thresholds and cadence for the expiry monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Rentals with `0 < remaining <= inclusion_threshold` seconds left are
    /// surfaced as expiring.
    pub inclusion_threshold: i64,
    /// Rentals additionally within this many seconds trigger a notification.
    pub notification_threshold: i64,
    pub poll_interval: Duration,
}

impl MonitorConfig {
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            inclusion_threshold: settings.inclusion_threshold_secs,
            notification_threshold: settings.notification_threshold_secs,
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            inclusion_threshold: 600,
            notification_threshold: 600,
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// A rental close enough to expiry to surface to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiringRental {
    pub token_id: u64,
    pub renter: String,
    pub renter_contact: Option<String>,
    /// Seconds left at the time of the scan.
    pub remaining_time: i64,
}

/// A notification that was confirmed sent during a scan.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub token_id: u64,
    pub contact: String,
    pub renter: String,
    pub remaining_time: i64,
}

/// Result of one `check_expirations` round.
#[derive(Debug, Clone, Default)]
pub struct RoundOutcome {
    /// Token ids scanned (`last_token_id` at round start).
    pub scanned: u64,
    pub expiring: Vec<ExpiringRental>,
    pub sent: Vec<SentNotification>,
    /// Tokens skipped this round because their record could not be read.
    pub read_failures: u64,
}

/// Read-only view of the monitor for callers such as a UI or the CLI.
#[derive(Debug, Clone, Default)]
pub struct MonitorSnapshot {
    pub expiring: Vec<ExpiringRental>,
    pub is_loading: bool,
    /// Set only on round-level failure (scan range unavailable); the
    /// expiring list keeps its last consistent value.
    pub error: Option<String>,
}
