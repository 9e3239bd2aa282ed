pub mod email;

use async_trait::async_trait;

use crate::error::Result;

/// Outbound notification channel for expiring rentals.
///
/// `Ok(false)` means the send was skipped or rejected without a transport
/// failure; either way the caller must not mark the rental as notified.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        contact: &str,
        token_id: u64,
        remaining_time: i64,
        renter: &str,
    ) -> Result<bool>;
}
