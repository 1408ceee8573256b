//! The submission queue manager.
//!
//! [`QueueManager`] owns one record kind's queue and decides, per completed
//! record, whether it was delivered, queued for later, or dropped as a
//! duplicate. No path returns an error: transport failures queue the record,
//! storage failures are logged, and overlapping calls report [`SubmitOutcome::Busy`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::dedupe::DuplicateDetector;
use crate::delivery::DeliveryChannel;
use crate::queue::SubmissionQueue;
use crate::record::{Record, RecordKind};
use crate::storage::KeyValueStore;

/// What happened to a submitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Delivered; the draft can be reset.
    Sent,
    /// Delivery failed; the record was appended to the offline queue.
    Queued,
    /// Delivery failed and an equivalent record was already queued.
    Duplicate,
    /// Another submission or retry was in flight; nothing happened.
    Busy,
    /// Demo deployment; nothing was sent or queued.
    Disabled,
}

impl fmt::Display for SubmitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Sent => "submitted successfully",
            Self::Queued => "offline, saved to queue",
            Self::Duplicate => "already queued, not saved again",
            Self::Busy => "a submission is already in progress",
            Self::Disabled => "demo mode, submission disabled",
        };
        f.write_str(text)
    }
}

/// Tally of one pass over the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    /// Records delivered and removed.
    pub sent: usize,
    /// Records still queued.
    pub remaining: usize,
}

/// Result of [`QueueManager::retry_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The queue was walked.
    Completed(RetryReport),
    /// Another submission or retry was in flight.
    Busy,
    /// Demo deployment.
    Disabled,
}

/// Holds the in-flight flag until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends records for one [`RecordKind`], queueing what cannot be delivered.
#[derive(Debug)]
pub struct QueueManager<C, S> {
    channel: C,
    queue: Mutex<SubmissionQueue<S>>,
    detector: DuplicateDetector,
    kind: RecordKind,
    in_flight: AtomicBool,
    demo: bool,
}

impl<C: DeliveryChannel, S: KeyValueStore> QueueManager<C, S> {
    /// Create a manager over an already loaded queue.
    pub fn new(channel: C, queue: SubmissionQueue<S>, kind: RecordKind) -> Self {
        Self {
            channel,
            queue: Mutex::new(queue),
            detector: DuplicateDetector::for_kind(kind),
            kind,
            in_flight: AtomicBool::new(false),
            demo: false,
        }
    }

    /// Enable or disable demo mode.
    #[must_use]
    pub fn with_demo(mut self, demo: bool) -> Self {
        self.demo = demo;
        self
    }

    /// Record kind this manager handles.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// The delivery channel.
    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// The duplicate detector in use.
    #[must_use]
    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    /// Whether a submission or retry is currently running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Deliver `record`, or queue it if delivery fails.
    pub async fn submit(&self, record: Record) -> SubmitOutcome {
        if self.demo {
            info!("Demo mode, not submitting {}", record.summary());
            return SubmitOutcome::Disabled;
        }

        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            info!("Submission already in progress, ignoring {}", record.summary());
            return SubmitOutcome::Busy;
        };

        match self.channel.send(&record).await {
            Ok(()) => {
                info!("Sent {}", record.summary());
                SubmitOutcome::Sent
            }
            Err(e) => {
                warn!("Delivery failed for {}: {}", record.summary(), e);
                let mut queue = self.queue.lock().await;
                if self.detector.is_duplicate(&record, queue.records()) {
                    info!(
                        "Equivalent record {} already queued, discarding",
                        &self.detector.fingerprint(&record)[..12]
                    );
                    return SubmitOutcome::Duplicate;
                }
                debug!(
                    "Queueing {} as {}",
                    record.summary(),
                    &self.detector.fingerprint(&record)[..12]
                );
                queue.push(record);
                info!("{} {} record(s) queued", queue.len(), self.kind);
                SubmitOutcome::Queued
            }
        }
    }

    /// Try every queued record once, in order. Failures stay queued in order.
    pub async fn retry_all(&self) -> RetryOutcome {
        if self.demo {
            info!("Demo mode, not retrying");
            return RetryOutcome::Disabled;
        }

        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            info!("Submission already in progress, skipping retry");
            return RetryOutcome::Busy;
        };

        let mut queue = self.queue.lock().await;
        let pending = queue.records().to_vec();
        if pending.is_empty() {
            return RetryOutcome::Completed(RetryReport::default());
        }

        info!("Retrying {} queued {} record(s)", pending.len(), self.kind);
        let mut failed = Vec::new();
        let mut sent = 0;
        for record in pending {
            match self.channel.send(&record).await {
                Ok(()) => {
                    debug!("Retry sent {}", record.summary());
                    sent += 1;
                }
                Err(e) => {
                    debug!("Retry failed for {}: {}", record.summary(), e);
                    failed.push(record);
                }
            }
        }

        let remaining = failed.len();
        queue.replace(failed);
        info!("Retry sent {}, {} still queued", sent, remaining);
        RetryOutcome::Completed(RetryReport { sent, remaining })
    }

    /// Snapshot of the queued records in retry order.
    pub async fn queued(&self) -> Vec<Record> {
        self.queue.lock().await.records().to_vec()
    }

    /// Number of queued records.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Check if nothing is queued.
    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Drop the queued record at `index`.
    pub async fn discard(&self, index: usize) -> Option<Record> {
        let removed = self.queue.lock().await.remove(index);
        if let Some(record) = &removed {
            info!("Discarded queued {}", record.summary());
        }
        removed
    }

    /// Drop every queued record. Returns how many were dropped.
    pub async fn clear(&self) -> usize {
        let dropped = self.queue.lock().await.clear();
        info!("Cleared {} queued {} record(s)", dropped, self.kind);
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::tests::FakeChannel;
    use crate::delivery::{self, DeliveryError, OfflineChannel};
    use crate::queue::tests::FullStore;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    /// Channel that holds every send until the gate opens.
    #[derive(Debug, Default)]
    struct GatedChannel {
        gate: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DeliveryChannel for GatedChannel {
        async fn send(&self, _record: &Record) -> delivery::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(())
        }
    }

    /// Channel that always fails.
    #[derive(Debug)]
    struct DeadChannel;

    #[async_trait]
    impl DeliveryChannel for DeadChannel {
        async fn send(&self, _record: &Record) -> delivery::Result<()> {
            Err(DeliveryError::Transport("connection refused".to_string()))
        }
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(fields) => Record::from_fields(fields),
            _ => panic!("not an object"),
        }
    }

    fn match_record(match_number: u32, comments: &str) -> Record {
        record(json!({
            "studentName": "Ada",
            "scoutTeam": "1792",
            "matchNumber": match_number,
            "teamNumber": 2056,
            "alliance": "red",
            "autoFuelPoints": 40.0,
            "teleopFuelPoints": 125.0,
            "robotStatus": "OK",
            "comments": comments,
        }))
    }

    fn manager<C: DeliveryChannel>(
        channel: C,
        store: &MemoryStore,
    ) -> QueueManager<C, &MemoryStore> {
        QueueManager::new(
            channel,
            SubmissionQueue::load(store, "scoutQueue_default_match"),
            RecordKind::Match,
        )
    }

    #[tokio::test]
    async fn test_sent_record_never_enters_queue() {
        let store = MemoryStore::new();
        let manager = manager(FakeChannel::online(), &store);

        let outcome = manager.submit(match_record(1, "")).await;

        assert_eq!(outcome, SubmitOutcome::Sent);
        assert!(manager.is_empty().await);
        assert_eq!(manager.channel().sent().len(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_offline_resubmit_is_idempotent() {
        let store = MemoryStore::new();
        let manager = manager(FakeChannel::offline(), &store);
        let r = match_record(1, "");

        assert_eq!(manager.submit(r.clone()).await, SubmitOutcome::Queued);
        assert_eq!(manager.submit(r.clone()).await, SubmitOutcome::Duplicate);
        assert_eq!(manager.submit(r).await, SubmitOutcome::Duplicate);
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_records_both_queue() {
        let store = MemoryStore::new();
        let manager = manager(DeadChannel, &store);

        assert_eq!(manager.submit(match_record(1, "")).await, SubmitOutcome::Queued);
        assert_eq!(manager.submit(match_record(2, "")).await, SubmitOutcome::Queued);
        assert_eq!(manager.len().await, 2);
    }

    #[tokio::test]
    async fn test_retry_preserves_order_of_failures() {
        let store = MemoryStore::new();
        let manager = manager(FakeChannel::offline(), &store);
        let (r1, r2, r3) = (match_record(1, ""), match_record(2, ""), match_record(3, ""));
        for r in [&r1, &r2, &r3] {
            assert_eq!(manager.submit(r.clone()).await, SubmitOutcome::Queued);
        }

        manager.channel().set_online(true);
        manager.channel().reject(&r2);
        let outcome = manager.retry_all().await;

        assert_eq!(
            outcome,
            RetryOutcome::Completed(RetryReport { sent: 2, remaining: 1 })
        );
        assert_eq!(manager.queued().await, vec![r2]);
        assert_eq!(manager.channel().sent(), vec![r1, r3]);
    }

    #[tokio::test]
    async fn test_retry_keeps_relative_order_of_several_failures() {
        let store = MemoryStore::new();
        let manager = manager(FakeChannel::offline(), &store);
        let records: Vec<Record> = (1..=4).map(|n| match_record(n, "")).collect();
        for r in &records {
            manager.submit(r.clone()).await;
        }

        manager.channel().set_online(true);
        manager.channel().reject(&records[0]);
        manager.channel().reject(&records[2]);
        manager.retry_all().await;

        assert_eq!(
            manager.queued().await,
            vec![records[0].clone(), records[2].clone()]
        );
        // Survives a reload.
        let reloaded = SubmissionQueue::load(&store, "scoutQueue_default_match");
        assert_eq!(reloaded.records(), &[records[0].clone(), records[2].clone()]);
    }

    #[tokio::test]
    async fn test_retry_empty_queue() {
        let store = MemoryStore::new();
        let manager = manager(FakeChannel::online(), &store);
        assert_eq!(
            manager.retry_all().await,
            RetryOutcome::Completed(RetryReport::default())
        );
        assert!(manager.channel().sent().is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_busy() {
        let store = MemoryStore::new();
        let manager = manager(GatedChannel::default(), &store);

        let (first, second, ()) = tokio::join!(
            manager.submit(match_record(1, "")),
            manager.submit(match_record(2, "")),
            async {
                tokio::task::yield_now().await;
                manager.channel().gate.notify_one();
            }
        );

        assert_eq!(first, SubmitOutcome::Sent);
        assert_eq!(second, SubmitOutcome::Busy);
        assert_eq!(manager.channel().calls.load(Ordering::SeqCst), 1);
        assert!(manager.is_empty().await);
        assert!(!manager.is_busy());

        // The guard is released once the first attempt settles.
        manager.channel().gate.notify_one();
        assert_eq!(manager.submit(match_record(3, "")).await, SubmitOutcome::Sent);
    }

    #[tokio::test]
    async fn test_retry_while_in_flight_is_busy() {
        let store = MemoryStore::new();
        let manager = manager(GatedChannel::default(), &store);

        let (first, retry, ()) = tokio::join!(
            manager.submit(match_record(1, "")),
            manager.retry_all(),
            async {
                tokio::task::yield_now().await;
                manager.channel().gate.notify_one();
            }
        );

        assert_eq!(first, SubmitOutcome::Sent);
        assert_eq!(retry, RetryOutcome::Busy);
    }

    #[tokio::test]
    async fn test_duplicate_then_recovery_scenario() {
        let store = MemoryStore::new();
        let manager = manager(FakeChannel::offline(), &store);
        let a = match_record(7, "strong auto");
        let a_prime = match_record(7, "strong auto, tipped once");

        assert_eq!(manager.submit(a.clone()).await, SubmitOutcome::Queued);
        assert_eq!(manager.queued().await, vec![a.clone()]);

        assert_eq!(manager.submit(a_prime).await, SubmitOutcome::Duplicate);
        assert_eq!(manager.queued().await, vec![a.clone()]);

        manager.channel().set_online(true);
        assert_eq!(
            manager.retry_all().await,
            RetryOutcome::Completed(RetryReport { sent: 1, remaining: 0 })
        );
        assert!(manager.queued().await.is_empty());
        assert_eq!(manager.channel().sent(), vec![a]);
    }

    #[tokio::test]
    async fn test_storage_failure_is_best_effort() {
        crate::logging::init_test_logging();
        let store = FullStore::default();
        let manager = QueueManager::new(
            DeadChannel,
            SubmissionQueue::load(&store, "q"),
            RecordKind::Match,
        );

        assert_eq!(manager.submit(match_record(1, "")).await, SubmitOutcome::Queued);
        assert_eq!(manager.len().await, 1);
        assert!(SubmissionQueue::load(&store, "q").is_empty());
    }

    #[tokio::test]
    async fn test_demo_mode_touches_nothing() {
        let store = MemoryStore::new();
        let manager = manager(FakeChannel::online(), &store).with_demo(true);

        assert_eq!(manager.submit(match_record(1, "")).await, SubmitOutcome::Disabled);
        assert_eq!(manager.retry_all().await, RetryOutcome::Disabled);
        assert!(manager.channel().sent().is_empty());
        assert!(manager.is_empty().await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_demo_mode_checked_before_busy_flag() {
        let store = MemoryStore::new();
        let manager = manager(FakeChannel::online(), &store).with_demo(true);
        manager.in_flight.store(true, Ordering::SeqCst);

        assert_eq!(manager.submit(match_record(1, "")).await, SubmitOutcome::Disabled);
        assert_eq!(manager.retry_all().await, RetryOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_fractional_fuel_total_deduplicates_after_reload() {
        use crate::record::{fuel_points, Cycle};

        let cycles = [
            Cycle { hopper_fill: 5, accuracy: 33 },
            Cycle { hopper_fill: 10, accuracy: 67 },
            Cycle { hopper_fill: 5, accuracy: 91 },
        ];
        let points = fuel_points(&cycles);
        assert!((points - 12.9).abs() < 1e-9);

        let build = || {
            record(json!({
                "studentName": "Ada",
                "matchNumber": 31,
                "teamNumber": 2056,
                "alliance": "blue",
                "autoFuelPoints": points,
                "teleopFuelPoints": points,
                "robotStatus": "OK",
            }))
        };

        let store = MemoryStore::new();
        {
            let manager = manager(OfflineChannel, &store);
            assert_eq!(manager.submit(build()).await, SubmitOutcome::Queued);
        }

        let restarted = manager(OfflineChannel, &store);
        assert_eq!(restarted.submit(build()).await, SubmitOutcome::Duplicate);
        assert_eq!(restarted.len().await, 1);
    }

    #[tokio::test]
    async fn test_queue_survives_restart() {
        let store = MemoryStore::new();
        {
            let manager = manager(DeadChannel, &store);
            manager.submit(match_record(1, "")).await;
        }

        let restarted = manager(DeadChannel, &store);
        assert_eq!(restarted.len().await, 1);
        assert_eq!(
            restarted.submit(match_record(1, "again")).await,
            SubmitOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn test_discard_and_clear() {
        let store = MemoryStore::new();
        let manager = manager(DeadChannel, &store);
        for n in 1..=3 {
            manager.submit(match_record(n, "")).await;
        }

        let removed = manager.discard(0).await.unwrap();
        assert_eq!(removed.get("matchNumber"), Some(&json!(1)));
        assert!(manager.discard(10).await.is_none());

        let reloaded = SubmissionQueue::load(&store, "scoutQueue_default_match");
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.records()[0].get("matchNumber"), Some(&json!(2)));

        assert_eq!(manager.clear().await, 2);
        assert!(SubmissionQueue::load(&store, "scoutQueue_default_match").is_empty());
    }

    #[test]
    fn test_outcome_display() {
        assert!(SubmitOutcome::Queued.to_string().contains("queue"));
        assert!(SubmitOutcome::Busy.to_string().contains("in progress"));
        assert!(SubmitOutcome::Disabled.to_string().contains("demo"));
    }
}
