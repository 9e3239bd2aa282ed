use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

use futures::future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    chain::{types::RentalRecord, ChainReader},
    error::Result,
    monitor::types::{
        ExpiringRental, MonitorConfig, MonitorSnapshot, RoundOutcome, SentNotification,
    },
    notify::Notifier,
    storage::Database,
};

fn wall_clock() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Watches active rentals and notifies renters once per expiry episode.
///
/// Each scan fans out one read per token id, waits for all of them to
/// settle, then publishes the expiring set wholesale so callers never see a
/// half-built round.
pub struct ExpiryMonitor {
    reader: Arc<dyn ChainReader>,
    notifier: Option<Arc<dyn Notifier>>,
    config: MonitorConfig,
    /// Rental instances already notified this episode, keyed by
    /// `(token_id, start_time)` so a re-rental of the same token gets a
    /// fresh episode.
    notified: Mutex<HashSet<(u64, i64)>>,
    snapshot: RwLock<MonitorSnapshot>,
    /// Optional notification log.
    store: Option<Mutex<Database>>,
    clock: fn() -> i64,
}

impl ExpiryMonitor {
    pub fn new(
        reader: Arc<dyn ChainReader>,
        notifier: Option<Arc<dyn Notifier>>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            reader,
            notifier,
            config,
            notified: Mutex::new(HashSet::new()),
            snapshot: RwLock::new(MonitorSnapshot::default()),
            store: None,
            clock: wall_clock,
        }
    }

    /// Record successful notifications to the given database.
    pub fn with_store(mut self, store: Database) -> Self {
        self.store = Some(Mutex::new(store));
        self
    }

    /// Current expiring set, loading flag and round-level error.
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshot.read().unwrap().clone()
    }

    /// Scan all tokens once and publish the resulting expiring set.
    ///
    /// Per-token read failures are logged and skipped; only an unreadable
    /// scan range fails the round, in which case the previously published
    /// set is left untouched.
    pub async fn check_expirations(&self) -> Result<RoundOutcome> {
        self.snapshot.write().unwrap().is_loading = true;

        match self.run_round().await {
            Ok(outcome) => {
                self.record_sent(&outcome);
                let mut snap = self.snapshot.write().unwrap();
                snap.expiring = outcome.expiring.clone();
                snap.is_loading = false;
                snap.error = None;
                Ok(outcome)
            }
            Err(e) => {
                error!("Expiry check failed: {}", e);
                let mut snap = self.snapshot.write().unwrap();
                snap.is_loading = false;
                snap.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn run_round(&self) -> Result<RoundOutcome> {
        let max = self.reader.last_token_id().await?;
        let now = (self.clock)();

        let mut outcome = RoundOutcome {
            scanned: max,
            ..Default::default()
        };
        if max == 0 {
            debug!("No tokens minted yet, nothing to scan");
            return Ok(outcome);
        }

        let reads = (1..=max).map(|token_id| {
            let reader = Arc::clone(&self.reader);
            async move { (token_id, reader.rental_record(token_id).await) }
        });
        let settled = future::join_all(reads).await;

        // Confirmed (start_time, is_rented) per token, for flag pruning.
        let mut observed: HashMap<u64, (i64, bool)> = HashMap::new();

        for (token_id, result) in settled {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!(token_id, "Skipping token, read failed: {}", e);
                    outcome.read_failures += 1;
                    continue;
                }
            };
            observed.insert(token_id, (record.start_time, record.is_rented));

            if !record.is_rented {
                continue;
            }

            let remaining = record.remaining_time(now);
            if remaining <= 0 || remaining > self.config.inclusion_threshold {
                continue;
            }

            outcome.expiring.push(ExpiringRental {
                token_id,
                renter: record.renter.clone(),
                renter_contact: record.renter_contact.clone(),
                remaining_time: remaining,
            });

            if remaining <= self.config.notification_threshold && record.has_contact() {
                self.maybe_notify(&record, remaining, &mut outcome).await;
            }
        }

        self.prune_notified(&observed);
        Ok(outcome)
    }

    async fn maybe_notify(
        &self,
        record: &RentalRecord,
        remaining: i64,
        outcome: &mut RoundOutcome,
    ) {
        let notifier = match &self.notifier {
            Some(n) => n,
            None => return,
        };

        let key = (record.token_id, record.start_time);
        if self.notified.lock().unwrap().contains(&key) {
            return;
        }

        let contact = record.renter_contact.as_deref().unwrap_or_default();
        match notifier
            .send(contact, record.token_id, remaining, &record.renter)
            .await
        {
            Ok(true) => {
                info!(
                    token_id = record.token_id,
                    contact, remaining, "Expiry notification sent"
                );
                self.notified.lock().unwrap().insert(key);
                outcome.sent.push(SentNotification {
                    token_id: record.token_id,
                    contact: contact.to_string(),
                    renter: record.renter.clone(),
                    remaining_time: remaining,
                });
            }
            Ok(false) => {
                warn!(
                    token_id = record.token_id,
                    "Notification not sent, will retry next round"
                );
            }
            Err(e) => {
                warn!(
                    token_id = record.token_id,
                    "Notification failed, will retry next round: {}", e
                );
            }
        }
    }

    /// Drop notified flags for rental instances confirmed ended or replaced.
    /// Tokens whose read failed this round keep their flag.
    fn prune_notified(&self, observed: &HashMap<u64, (i64, bool)>) {
        let mut notified = self.notified.lock().unwrap();
        notified.retain(|(token_id, start_time)| match observed.get(token_id) {
            Some((current_start, is_rented)) => *is_rented && current_start == start_time,
            None => true,
        });
    }

    fn record_sent(&self, outcome: &RoundOutcome) {
        let store = match &self.store {
            Some(s) => s,
            None => return,
        };
        let store = store.lock().unwrap();
        for sent in &outcome.sent {
            if let Err(e) = store.save_notification(sent) {
                warn!(token_id = sent.token_id, "Failed to record notification: {}", e);
            }
        }
    }

    /// Poll until cancelled: an immediate first scan, then one per
    /// `poll_interval`. A scan in flight when the token fires is dropped
    /// before its results are published.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            inclusion_threshold = self.config.inclusion_threshold,
            "Expiry monitor started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.check_expirations() => {
                    if let Ok(outcome) = result {
                        info!(
                            scanned = outcome.scanned,
                            expiring = outcome.expiring.len(),
                            sent = outcome.sent.len(),
                            read_failures = outcome.read_failures,
                            "Expiry check complete"
                        );
                    }
                }
            }
        }

        // A round dropped mid-flight has already set the loading flag.
        self.snapshot.write().unwrap().is_loading = false;
        info!("Expiry monitor stopped");
    }

    /// Spawn the polling loop on the current runtime.
    pub fn spawn(self: Arc<Self>) -> MonitorHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move { self.run(token).await });
        MonitorHandle { cancel, task }
    }
}

/// Owned handle to a running monitor; tearing it down cancels the timer and
/// any scan in flight.
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
