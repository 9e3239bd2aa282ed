use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successfully delivered expiry notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub token_id: u64,
    pub contact: String,
    pub renter: String,
    /// Seconds the rental had left when the notice went out.
    pub remaining_secs: i64,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub unique_tokens: u64,
    pub last_sent_at: Option<DateTime<Utc>>,
}
