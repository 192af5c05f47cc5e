use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parcelwatch_core::{
    BatchId, Config, HttpSession, ProcessingQueue, SanitizedConfig, SessionPool, SqliteTrackStore,
};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    queue: Arc<ProcessingQueue<HttpSession>>,
    pool: Arc<SessionPool<HttpSession>>,
    track_store: Arc<SqliteTrackStore>,
    ws_broadcaster: WsBroadcaster,
    next_batch_id: AtomicI64,
}

impl AppState {
    pub fn new(
        config: Config,
        queue: Arc<ProcessingQueue<HttpSession>>,
        pool: Arc<SessionPool<HttpSession>>,
        track_store: Arc<SqliteTrackStore>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            queue,
            pool,
            track_store,
            ws_broadcaster,
            next_batch_id: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn queue(&self) -> &ProcessingQueue<HttpSession> {
        self.queue.as_ref()
    }

    pub fn pool(&self) -> &SessionPool<HttpSession> {
        self.pool.as_ref()
    }

    pub fn track_store(&self) -> &SqliteTrackStore {
        self.track_store.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }

    /// Id for a submission that did not name its batch.
    pub fn next_batch_id(&self) -> BatchId {
        self.next_batch_id.fetch_add(1, Ordering::SeqCst)
    }
}
