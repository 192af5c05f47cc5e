pub mod carrier;
pub mod config;
pub mod events;
pub mod metrics;
pub mod progress;
pub mod queue;
pub mod session;
pub mod testing;
pub mod track_store;

pub use carrier::{
    CarrierConfig, CarrierScrapeClient, HttpPageScraper, PageScraper, PageState, RetryPolicy,
    RetryingScrapeClient, ScrapeError, TrackEvent,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    SanitizedConfig, ServerConfig, SessionPoolConfig,
};
pub use events::{ProgressAggregator, ProgressEvent, ProgressEventSink, NO_DATA_STATUS};
pub use progress::{BatchProgress, ProgressTracker};
pub use queue::{
    BatchId, JobOutcome, ProcessingQueue, QueueConfig, QueueError, QueueStatus, QueuedTrack,
    StoreId, TickOutcome, TrackSource, UserId,
};
pub use session::{
    HttpSession, HttpSessionFactory, PoolError, PoolStatus, PooledSession, Session,
    SessionError, SessionFactory, SessionPool,
};
pub use track_store::{SqliteTrackStore, TrackProcessingService, TrackRecord, TrackStoreError};
