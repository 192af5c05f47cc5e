//! Session handle backed by a cookie-keeping HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::SessionPoolConfig;

use super::error::SessionError;
use super::traits::{Session, SessionFactory};

/// A carrier browsing session: one HTTP client with its own cookie jar.
#[derive(Debug)]
pub struct HttpSession {
    id: String,
    client: reqwest::Client,
    closed: bool,
}

impl HttpSession {
    /// The underlying HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Whether `close` has already been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl Session for HttpSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Close {
                id: self.id.clone(),
                reason: "already closed".to_string(),
            });
        }
        self.closed = true;
        debug!("HTTP session {} closed", self.id);
        Ok(())
    }
}

/// Builds [`HttpSession`]s from the session pool configuration.
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    user_agent: String,
    request_timeout: Duration,
}

impl HttpSessionFactory {
    /// Create a factory from the pool configuration.
    pub fn new(config: &SessionPoolConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    async fn create(&self) -> Result<HttpSession, SessionError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(&self.user_agent)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| SessionError::Create(e.to_string()))?;

        Ok(HttpSession {
            id: format!("http-{}", uuid::Uuid::new_v4()),
            client,
            closed: false,
        })
    }
}
