//! Common test utilities for API testing with mocks.
//!
//! The fixture builds the real router over a real session pool and track
//! store, with the carrier scrape replaced by [`MockScrapeClient`]. The
//! queue consumer is left disabled so tests drive processing with
//! [`TestFixture::tick`].

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use parcelwatch_core::testing::MockScrapeClient;
use parcelwatch_core::{
    Config, DatabaseConfig, HttpSession, HttpSessionFactory, ProcessingQueue, QueueConfig,
    ServerConfig, SessionPool, SqliteTrackStore, TickOutcome,
};
use parcelwatch_server::api::WsBroadcaster;

/// Re-export fixtures for test convenience
pub use parcelwatch_core::testing::fixtures;

/// Test fixture for API testing with a mock carrier.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock carrier client - configure scrape results
    pub scraper: MockScrapeClient,
    /// The queue behind the router, for manual ticks
    pub queue: Arc<ProcessingQueue<HttpSession>>,
    /// Broadcaster the queue reports progress through
    pub ws_broadcaster: WsBroadcaster,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            queue: QueueConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };

        let track_store =
            Arc::new(SqliteTrackStore::new(&db_path).expect("Failed to create track store"));

        let factory = HttpSessionFactory::new(&config.session_pool);
        let pool = Arc::new(
            SessionPool::new(&factory, config.session_pool.size)
                .await
                .expect("Failed to create session pool"),
        );

        let scraper = MockScrapeClient::new();
        let ws_broadcaster = WsBroadcaster::default();

        let queue = Arc::new(ProcessingQueue::new(
            config.queue.clone(),
            Arc::clone(&pool),
            Arc::new(scraper.clone()),
            track_store.clone(),
            Arc::new(ws_broadcaster.clone()),
            Arc::new(ws_broadcaster.clone()),
        ));

        let state = Arc::new(parcelwatch_server::state::AppState::new(
            config,
            Arc::clone(&queue),
            pool,
            track_store,
            ws_broadcaster.clone(),
        ));

        let router = parcelwatch_server::api::create_router(state);

        Self {
            router,
            scraper,
            queue,
            ws_broadcaster,
            temp_dir,
        }
    }

    /// Run one consumer step.
    pub async fn tick(&self) -> TickOutcome {
        self.queue.tick().await
    }

    /// Tick until the queue is empty.
    pub async fn drain(&self) {
        while self.queue.queue_len() > 0 {
            self.tick().await;
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await.0
    }

    /// Send a GET request and return the body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (response, bytes) = self.send(request).await;
        (response.status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await.0
    }

    async fn send(&self, request: Request<Body>) -> (TestResponse, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (TestResponse { status, body }, body_bytes)
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
