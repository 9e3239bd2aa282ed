pub mod expiry;
pub mod types;

pub use expiry::{ExpiryMonitor, MonitorHandle};
pub use types::{ExpiringRental, MonitorConfig, MonitorSnapshot, RoundOutcome, SentNotification};
