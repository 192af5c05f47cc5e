//! Processing queue lifecycle integration tests.
//!
//! These tests run the real background consumer against a file-backed track
//! store: enqueue -> drain -> persisted events -> batch finished.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use parcelwatch_core::{
    testing::{
        fixtures, MockScrapeClient, MockSession, MockSessionFactory, RecordingAggregator,
        RecordingEventSink,
    },
    ProcessingQueue, ProgressEvent, QueueConfig, QueuedTrack, ScrapeError, SessionPool,
    SqliteTrackStore, TrackSource,
};

/// Test helper wiring a queue to mocks and a temporary database.
struct TestHarness {
    queue: ProcessingQueue<MockSession>,
    pool: Arc<SessionPool<MockSession>>,
    factory: MockSessionFactory,
    client: MockScrapeClient,
    store: Arc<SqliteTrackStore>,
    sink: RecordingEventSink,
    aggregator: RecordingAggregator,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new(config: QueueConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteTrackStore::new(&temp_dir.path().join("test.db"))
                .expect("Failed to create track store"),
        );
        let factory = MockSessionFactory::new();
        let pool = Arc::new(
            SessionPool::new(&factory, 2)
                .await
                .expect("Failed to create pool"),
        );
        let client = MockScrapeClient::new();
        let sink = RecordingEventSink::new();
        let aggregator = RecordingAggregator::new();

        let queue = ProcessingQueue::new(
            config,
            Arc::clone(&pool),
            Arc::new(client.clone()),
            store.clone(),
            Arc::new(sink.clone()),
            Arc::new(aggregator.clone()),
        );

        Self {
            queue,
            pool,
            factory,
            client,
            store,
            sink,
            aggregator,
            _temp_dir: temp_dir,
        }
    }

    fn fast_config() -> QueueConfig {
        QueueConfig {
            tick_interval_ms: 5,
            ..Default::default()
        }
    }

    /// Wait until the aggregator has seen `count` completed jobs.
    async fn wait_for_pings(&self, count: usize) -> bool {
        for _ in 0..400 {
            if self.aggregator.pings().await.len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

#[tokio::test]
async fn test_background_consumer_drains_batches_in_order() {
    let h = TestHarness::new(TestHarness::fast_config()).await;
    h.client.set_result("EMPTY", Ok(Vec::new())).await;

    h.queue
        .enqueue_all(vec![
            QueuedTrack::new("A1", 7, 1, 100, TrackSource::Excel),
            QueuedTrack::new("B1", 8, 2, 200, TrackSource::Api),
            QueuedTrack::new("EMPTY", 7, 1, 100, TrackSource::Excel),
        ])
        .unwrap();

    h.queue.start().await;
    assert!(h.wait_for_pings(3).await, "consumer did not drain the queue");
    h.queue.stop().await;

    assert_eq!(h.client.scraped_numbers().await, vec!["A1", "B1", "EMPTY"]);
    assert_eq!(h.aggregator.pings().await, vec![100, 200, 100]);

    // Only non-empty results are persisted.
    assert_eq!(h.store.count().unwrap(), 2);
    let saved = h.store.get("A1").unwrap().unwrap();
    assert_eq!(saved.store_id, 7);
    assert_eq!(saved.last_status, "Delivered");
    assert!(h.store.get("EMPTY").unwrap().is_none());

    let user_one = h.sink.events_for(1).await;
    assert!(user_one.iter().any(|e| matches!(
        e,
        ProgressEvent::BatchFinished {
            batch_id: 100,
            processed: 2,
            success: 1,
            failed: 1,
            ..
        }
    )));
    let user_two = h.sink.events_for(2).await;
    assert_eq!(
        user_two.first(),
        Some(&ProgressEvent::BatchStarted {
            batch_id: 200,
            total: 1
        })
    );

    assert!(h.queue.get_progress(100).is_none());
    assert!(h.queue.get_progress(200).is_none());
    assert_eq!(h.pool.status().idle, 2);
}

#[tokio::test]
async fn test_carrier_fault_holds_remaining_jobs() {
    let h = TestHarness::new(TestHarness::fast_config()).await;
    h.client
        .set_result("BAD", Err(ScrapeError::PageLoad { attempts: 3 }))
        .await;

    h.queue.enqueue(fixtures::queued_track("OK1", 1, 10)).unwrap();
    h.queue.enqueue(fixtures::queued_track("BAD", 1, 10)).unwrap();
    h.queue.enqueue(fixtures::queued_track("OK2", 1, 10)).unwrap();

    h.queue.start().await;
    assert!(h.wait_for_pings(2).await);
    // A few more ticks happen while paused.
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.queue.stop().await;

    assert!(h.queue.is_paused());
    assert_eq!(h.queue.queue_len(), 1);
    assert_eq!(h.client.call_count().await, 2);

    let progress = h.queue.get_progress(10).unwrap();
    assert_eq!(progress.total, 3);
    assert_eq!(progress.processed, 2);
    assert_eq!(progress.success, 1);
    assert_eq!(progress.failed, 1);

    let status = h.queue.status();
    assert!(status.paused);
    assert!(!status.running);
    assert_eq!(status.active_batches, 1);
    assert_eq!(
        h.queue.estimate_wait_for_batch(10),
        Some(Duration::from_secs(10))
    );

    let notifications: Vec<_> = h
        .sink
        .events_for(1)
        .await
        .into_iter()
        .filter(|e| matches!(e, ProgressEvent::CarrierUnavailable { .. }))
        .collect();
    assert_eq!(notifications.len(), 1);
}

#[tokio::test]
async fn test_pool_shutdown_after_queue_stop_closes_every_session() {
    let h = TestHarness::new(TestHarness::fast_config()).await;
    h.queue.enqueue(fixtures::queued_track("T1", 1, 1)).unwrap();

    h.queue.start().await;
    assert!(h.wait_for_pings(1).await);
    h.queue.stop().await;
    h.pool.shutdown().await;

    let mut closed = h.factory.closed_sessions().await;
    closed.sort();
    assert_eq!(closed, vec!["mock-session-1", "mock-session-2"]);
    assert!(h.pool.status().closed);
}

#[tokio::test]
async fn test_manual_ticks_when_consumer_disabled() {
    let config = QueueConfig {
        enabled: false,
        ..Default::default()
    };
    let h = TestHarness::new(config).await;
    h.queue.enqueue(fixtures::queued_track("T1", 3, 30)).unwrap();

    h.queue.start().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.queue.queue_len(), 1);

    h.queue.tick().await;

    assert_eq!(h.queue.queue_len(), 0);
    assert_eq!(h.store.events_for("T1").unwrap().len(), 1);
}
