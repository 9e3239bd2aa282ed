use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    chain::{ChainReader, ChainWriter},
    error::Result,
};

/// Outcome of one sweep over the token range.
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    pub scanned: u64,
    pub batches: u64,
    pub failed_batches: u64,
}

/// Drives the contract's batch expiry check over the whole token range.
///
/// The contract itself decides which rentals are actually expired; this just
/// walks `1..=last_token_id` in chunks so a single transaction never touches
/// too many tokens.
pub struct ExpirySweeper {
    reader: Arc<dyn ChainReader>,
    writer: Arc<dyn ChainWriter>,
    batch_size: u64,
    dry_run: bool,
}

impl ExpirySweeper {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        writer: Arc<dyn ChainWriter>,
        batch_size: u64,
        dry_run: bool,
    ) -> Self {
        Self {
            reader,
            writer,
            batch_size: batch_size.max(1),
            dry_run,
        }
    }

    /// Submit one expiry-check transaction per batch. A failed batch is
    /// logged and the sweep moves on to the next one.
    pub async fn sweep(&self) -> Result<SweepSummary> {
        let max = self.reader.last_token_id().await?;
        let mut summary = SweepSummary {
            scanned: max,
            ..Default::default()
        };

        if max == 0 {
            info!("No tokens minted yet, nothing to sweep");
            return Ok(summary);
        }

        let mut start = 1u64;
        while start <= max {
            let end = (start + self.batch_size - 1).min(max);
            summary.batches += 1;

            if self.dry_run {
                info!(start, end, "DRY RUN: would check batch for expiry");
            } else {
                match self.writer.expire_batch(start, end).await {
                    Ok(()) => info!(start, end, "Checked batch for expired rentals"),
                    Err(e) => {
                        warn!(start, end, "Batch expiry check failed: {}", e);
                        summary.failed_batches += 1;
                    }
                }
            }

            start = end + 1;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::chain::{MockChainReader, MockChainWriter};
    use crate::error::WatchError;

    #[tokio::test]
    async fn covers_range_in_batches_without_gaps() {
        let mut reader = MockChainReader::new();
        reader.expect_last_token_id().returning(|| Ok(25));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_writer = Arc::clone(&seen);
        let mut writer = MockChainWriter::new();
        writer.expect_expire_batch().returning(move |start, end| {
            seen_by_writer.lock().unwrap().push((start, end));
            Ok(())
        });

        let sweeper = ExpirySweeper::new(Arc::new(reader), Arc::new(writer), 10, false);
        let summary = sweeper.sweep().await.unwrap();

        assert_eq!(summary.scanned, 25);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.failed_batches, 0);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 10), (11, 20), (21, 25)]);
    }

    #[tokio::test]
    async fn failed_batch_does_not_stop_the_sweep() {
        let mut reader = MockChainReader::new();
        reader.expect_last_token_id().returning(|| Ok(20));

        let mut writer = MockChainWriter::new();
        writer.expect_expire_batch().times(2).returning(|start, _| {
            if start == 1 {
                Err(WatchError::Chain("reverted".to_string()))
            } else {
                Ok(())
            }
        });

        let sweeper = ExpirySweeper::new(Arc::new(reader), Arc::new(writer), 10, false);
        let summary = sweeper.sweep().await.unwrap();

        assert_eq!(summary.batches, 2);
        assert_eq!(summary.failed_batches, 1);
    }

    #[tokio::test]
    async fn dry_run_submits_nothing() {
        let mut reader = MockChainReader::new();
        reader.expect_last_token_id().returning(|| Ok(5));

        let mut writer = MockChainWriter::new();
        writer.expect_expire_batch().times(0);

        let sweeper = ExpirySweeper::new(Arc::new(reader), Arc::new(writer), 10, true);
        let summary = sweeper.sweep().await.unwrap();

        assert_eq!(summary.batches, 1);
    }
}
