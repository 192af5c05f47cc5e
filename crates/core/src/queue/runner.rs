//! Processing queue and its single consumer.
//!
//! Jobs are drained one per tick, strictly in arrival order. Ticks never
//! overlap: the background loop sleeps for the configured interval only after
//! the previous tick has returned, and `tick()` refuses to run concurrently
//! with itself. A transient carrier fault closes a process-wide pause window
//! during which no job is dequeued.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::carrier::{CarrierScrapeClient, ScrapeError, TrackEvent};
use crate::events::{ProgressAggregator, ProgressEvent, ProgressEventSink, NO_DATA_STATUS};
use crate::metrics;
use crate::progress::{BatchProgress, ProgressTracker};
use crate::session::{Session, SessionPool};
use crate::track_store::TrackProcessingService;

use super::config::QueueConfig;
use super::pause::PauseGate;
use super::types::{
    BatchId, JobOutcome, QueueError, QueueStatus, QueuedTrack, TickOutcome,
};

/// State shared between the queue handle and the consumer task.
struct QueueInner<S: Session> {
    config: QueueConfig,
    jobs: Mutex<VecDeque<QueuedTrack>>,
    progress: ProgressTracker,
    pause: PauseGate,
    pool: Arc<SessionPool<S>>,
    client: Arc<dyn CarrierScrapeClient<S>>,
    track_service: Arc<dyn TrackProcessingService>,
    sink: Arc<dyn ProgressEventSink>,
    aggregator: Arc<dyn ProgressAggregator>,
    tick_guard: tokio::sync::Mutex<()>,
    /// Job popped by the current tick and not yet counted.
    in_flight: Mutex<Option<QueuedTrack>>,
    processed_total: AtomicU64,
}

/// FIFO of tracking-number jobs with a fixed-delay consumer.
pub struct ProcessingQueue<S: Session> {
    inner: Arc<QueueInner<S>>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Session> ProcessingQueue<S> {
    /// Create a new queue. The consumer is not started.
    pub fn new(
        config: QueueConfig,
        pool: Arc<SessionPool<S>>,
        client: Arc<dyn CarrierScrapeClient<S>>,
        track_service: Arc<dyn TrackProcessingService>,
        sink: Arc<dyn ProgressEventSink>,
        aggregator: Arc<dyn ProgressAggregator>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            inner: Arc::new(QueueInner {
                config,
                jobs: Mutex::new(VecDeque::new()),
                progress: ProgressTracker::new(),
                pause: PauseGate::new(),
                pool,
                client,
                track_service,
                sink,
                aggregator,
                tick_guard: tokio::sync::Mutex::new(()),
                in_flight: Mutex::new(None),
                processed_total: AtomicU64::new(0),
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            consumer: Mutex::new(None),
        }
    }

    /// Append one job. Returns the queue length after the append.
    pub fn enqueue(&self, job: QueuedTrack) -> Result<usize, QueueError> {
        validate_job(&job)?;

        // Total first, so a concurrent tick can never see processed > total.
        self.inner.progress.register_jobs(job.batch_id, 1);
        metrics::JOBS_ENQUEUED
            .with_label_values(&[job.source.as_str()])
            .inc();
        debug!(
            "Enqueued {} for user {} (batch {})",
            job.track_number, job.user_id, job.batch_id
        );

        let mut jobs = self.inner.lock_jobs();
        jobs.push_back(job);
        Ok(jobs.len())
    }

    /// Append many jobs, all or nothing. An empty list is a no-op.
    pub fn enqueue_all(&self, batch: Vec<QueuedTrack>) -> Result<usize, QueueError> {
        if batch.is_empty() {
            return Ok(self.queue_len());
        }
        for job in &batch {
            validate_job(job)?;
        }

        let mut per_batch: HashMap<BatchId, u64> = HashMap::new();
        for job in &batch {
            *per_batch.entry(job.batch_id).or_default() += 1;
            metrics::JOBS_ENQUEUED
                .with_label_values(&[job.source.as_str()])
                .inc();
        }
        for (batch_id, count) in per_batch {
            self.inner.progress.register_jobs(batch_id, count);
        }

        let added = batch.len();
        let mut jobs = self.inner.lock_jobs();
        jobs.extend(batch);
        info!("Enqueued {} jobs, queue length {}", added, jobs.len());
        Ok(jobs.len())
    }

    /// Progress of a batch that still has unprocessed jobs.
    pub fn get_progress(&self, batch_id: BatchId) -> Option<BatchProgress> {
        self.inner.progress.get(batch_id)
    }

    /// Estimated wait for a job at `position` (1-based) in the queue.
    pub fn estimate_wait_time(&self, position: usize) -> Duration {
        let position = u64::try_from(position).unwrap_or(u64::MAX);
        Duration::from_secs(
            self.inner
                .config
                .estimated_job_secs
                .saturating_mul(position),
        )
    }

    /// Estimated wait until the last queued job of a batch has been
    /// processed, or `None` when none of its jobs are queued.
    pub fn estimate_wait_for_batch(&self, batch_id: BatchId) -> Option<Duration> {
        let jobs = self.inner.lock_jobs();
        let last = jobs.iter().rposition(|job| job.batch_id == batch_id)?;
        drop(jobs);
        Some(self.estimate_wait_time(last + 1))
    }

    pub fn queue_len(&self) -> usize {
        self.inner.lock_jobs().len()
    }

    pub fn pause_until(&self) -> Option<chrono::DateTime<Utc>> {
        self.inner.pause.pause_until()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.pause.is_paused()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> QueueStatus {
        let queue_len = self.queue_len();
        QueueStatus {
            running: self.is_running(),
            queue_len,
            paused: self.is_paused(),
            pause_until: self.pause_until(),
            active_batches: self.inner.progress.active_batches(),
            processed_total: self.inner.processed_total.load(Ordering::Relaxed),
            estimated_drain_secs: self.estimate_wait_time(queue_len).as_secs(),
        }
    }

    /// Run one consumer step by hand.
    pub async fn tick(&self) -> TickOutcome {
        self.inner.tick().await
    }

    /// Start the background consumer.
    pub async fn start(&self) {
        if !self.inner.config.enabled {
            info!("Processing queue consumer disabled by configuration");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Processing queue already running");
            return;
        }

        let inner = Arc::clone(&self.inner);
        let running = Arc::clone(&self.running);
        let interval = self.inner.config.tick_interval();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("Queue consumer started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Queue consumer received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        let outcome = inner.tick().await;
                        trace!("Tick finished: {:?}", outcome);
                    }
                }
            }
            info!("Queue consumer stopped");
        });

        *self.lock_consumer() = Some(handle);
    }

    /// Stop the background consumer, letting an in-flight tick finish.
    ///
    /// A tick still running after the shutdown timeout is aborted and its job
    /// is counted as failed, so its batch can still finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Processing queue not running");
            return;
        }

        info!("Stopping processing queue");
        let _ = self.shutdown_tx.send(());

        let handle = self.lock_consumer().take();
        if let Some(mut handle) = handle {
            let timeout = self.inner.config.shutdown_timeout();
            if tokio::time::timeout(timeout, &mut handle).await.is_err() {
                warn!(
                    "Queue consumer did not stop within {:?}, aborting",
                    timeout
                );
                handle.abort();
                if let Err(e) = handle.await {
                    debug!("Queue consumer ended: {}", e);
                }
                self.inner.abandon_in_flight().await;
            }
        }

        info!(
            "Processing queue stopped with {} jobs left",
            self.queue_len()
        );
    }

    fn lock_consumer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.consumer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Session> QueueInner<S> {
    fn lock_jobs(&self) -> MutexGuard<'_, VecDeque<QueuedTrack>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<QueuedTrack>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn tick(&self) -> TickOutcome {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            debug!("Tick skipped, previous tick still running");
            return TickOutcome::Busy;
        };

        if let Some(until) = self.pause.paused_at(Utc::now()) {
            trace!("Queue paused until {}", until);
            return TickOutcome::Paused { until };
        }

        let Some(job) = self.lock_jobs().pop_front() else {
            return TickOutcome::Idle;
        };

        let counters = self.progress.get_or_create(job.batch_id);
        let first_job = counters.begin_job() == 0;
        *self.lock_in_flight() = Some(job.clone());
        if first_job {
            info!(
                "Batch {} started ({} jobs)",
                job.batch_id,
                counters.total()
            );
            self.sink
                .send(
                    job.user_id,
                    ProgressEvent::BatchStarted {
                        batch_id: job.batch_id,
                        total: counters.total(),
                    },
                )
                .await;
        }

        let (outcome, events) = self.process(&job).await;

        if outcome.is_success() {
            counters.record_success();
        } else {
            counters.record_failure();
        }
        self.lock_in_flight().take();
        self.processed_total.fetch_add(1, Ordering::Relaxed);
        metrics::JOBS_PROCESSED
            .with_label_values(&[outcome.as_str()])
            .inc();

        let status = events
            .first()
            .map(|e| e.description.clone())
            .unwrap_or_else(|| NO_DATA_STATUS.to_string());
        self.sink
            .send(
                job.user_id,
                ProgressEvent::TrackProcessed {
                    batch_id: job.batch_id,
                    track_number: job.track_number.clone(),
                    status,
                    processed: counters.processed(),
                    total: counters.total(),
                },
            )
            .await;

        self.aggregator.track_processed(job.batch_id).await;

        let batch_finished = self.finish_batch(&job).await;

        TickOutcome::Processed {
            track_number: job.track_number,
            batch_id: job.batch_id,
            outcome,
            batch_finished,
        }
    }

    /// Sends `BatchFinished` and forgets the batch once every job is done.
    async fn finish_batch(&self, job: &QueuedTrack) -> bool {
        let Some(progress) = self.progress.finish_if_complete(job.batch_id) else {
            return false;
        };
        info!(
            "Batch {} finished: {} processed, {} ok, {} failed in {}",
            progress.batch_id,
            progress.processed,
            progress.success,
            progress.failed,
            progress.elapsed_label
        );
        metrics::BATCHES_FINISHED.inc();
        self.sink
            .send(
                job.user_id,
                ProgressEvent::BatchFinished {
                    batch_id: progress.batch_id,
                    processed: progress.processed,
                    success: progress.success,
                    failed: progress.failed,
                    elapsed: progress.elapsed_label,
                },
            )
            .await;
        true
    }

    /// Counts the job of an aborted tick as failed.
    async fn abandon_in_flight(&self) {
        let Some(job) = self.lock_in_flight().take() else {
            return;
        };
        warn!(
            "Job {} aborted during shutdown, counting it as failed",
            job.track_number
        );
        if let Some(counters) = self.progress.counters(job.batch_id) {
            counters.record_failure();
        }
        self.processed_total.fetch_add(1, Ordering::Relaxed);
        metrics::JOBS_PROCESSED
            .with_label_values(&[JobOutcome::UnexpectedFault.as_str()])
            .inc();
        self.finish_batch(&job).await;
    }

    /// Scrapes one job and classifies the result. Never fails and never
    /// lets a panic from the scrape client escape.
    async fn process(&self, job: &QueuedTrack) -> (JobOutcome, Vec<TrackEvent>) {
        let mut session = match self.pool.acquire().await {
            Ok(session) => session,
            Err(e) => {
                error!("No session for {}: {}", job.track_number, e);
                return (JobOutcome::UnexpectedFault, Vec::new());
            }
        };

        let started = Instant::now();
        let result = AssertUnwindSafe(
            self.client
                .parse_single_track(&mut *session, &job.track_number),
        )
        .catch_unwind()
        .await;
        drop(session);

        let (outcome, events) = match result {
            Ok(Ok(events)) if events.is_empty() => {
                debug!("No data yet for {}", job.track_number);
                (JobOutcome::EmptyResult, events)
            }
            Ok(Ok(events)) => self.save(job, events),
            Ok(Err(e)) if e.is_transient() => {
                self.trip_pause(job, &e).await;
                (JobOutcome::TransientFault, Vec::new())
            }
            Ok(Err(e)) => {
                error!("Unexpected scrape error for {}: {}", job.track_number, e);
                (JobOutcome::UnexpectedFault, Vec::new())
            }
            Err(panic) => {
                error!(
                    "Scrape client panicked on {}: {}",
                    job.track_number,
                    panic_message(panic.as_ref())
                );
                (JobOutcome::UnexpectedFault, Vec::new())
            }
        };

        metrics::SCRAPE_DURATION
            .with_label_values(&[outcome.as_str()])
            .observe(started.elapsed().as_secs_f64());

        (outcome, events)
    }

    fn save(&self, job: &QueuedTrack, events: Vec<TrackEvent>) -> (JobOutcome, Vec<TrackEvent>) {
        match self
            .track_service
            .save(&job.track_number, &events, job.store_id, job.user_id)
        {
            Ok(()) => {
                debug!("Saved {} events for {}", events.len(), job.track_number);
                (JobOutcome::Success, events)
            }
            Err(e) => {
                error!("Failed to save events for {}: {}", job.track_number, e);
                (JobOutcome::UnexpectedFault, events)
            }
        }
    }

    async fn trip_pause(&self, job: &QueuedTrack, cause: &ScrapeError) {
        let cooldown = self.config.pause_cooldown();
        let until = self.pause.trip(Utc::now(), cooldown);
        metrics::PAUSE_TRIPS.inc();
        warn!(
            "Carrier fault on {} ({}), pausing queue until {}",
            job.track_number, cause, until
        );

        self.sink
            .send(
                job.user_id,
                ProgressEvent::CarrierUnavailable {
                    track_number: job.track_number.clone(),
                    retry_after_secs: cooldown.as_secs(),
                },
            )
            .await;
    }
}

fn validate_job(job: &QueuedTrack) -> Result<(), QueueError> {
    if job.track_number.trim().is_empty() {
        return Err(QueueError::InvalidTrackNumber(job.track_number.clone()));
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
