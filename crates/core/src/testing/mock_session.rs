//! Mock sessions and session factory.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::session::{Session, SessionError, SessionFactory};

/// In-memory session that records when it is closed.
#[derive(Debug)]
pub struct MockSession {
    id: String,
    closed: bool,
    fail_close: bool,
    close_log: Arc<RwLock<Vec<String>>>,
}

impl MockSession {
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take over another session's id, to hand the pool a look-alike.
    pub fn rename(&mut self, id: &str) {
        self.id = id.to_string();
    }
}

#[async_trait]
impl Session for MockSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.fail_close {
            return Err(SessionError::Close {
                id: self.id.clone(),
                reason: "mock close failure".to_string(),
            });
        }
        self.closed = true;
        self.close_log.write().await.push(self.id.clone());
        Ok(())
    }
}

/// Factory handing out `mock-session-1`, `mock-session-2`, ...
///
/// # Example
///
/// ```rust,ignore
/// let factory = MockSessionFactory::new().with_failure_at(2);
/// let result = SessionPool::new(&factory, 4).await;
/// assert!(result.is_err());
/// assert_eq!(factory.closed_sessions().await.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockSessionFactory {
    attempts: AtomicUsize,
    created: AtomicUsize,
    /// Zero-based `create` call that fails.
    fail_at: Option<usize>,
    /// Session ids whose `close` fails.
    close_failures: HashSet<String>,
    close_log: Arc<RwLock<Vec<String>>>,
}

impl MockSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `index`-th `create` call (zero-based) fail.
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Makes closing the session with this id fail.
    pub fn with_close_failure(mut self, id: impl Into<String>) -> Self {
        self.close_failures.insert(id.into());
        self
    }

    /// Number of sessions successfully created.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Ids of sessions closed so far, in close order.
    pub async fn closed_sessions(&self) -> Vec<String> {
        self.close_log.read().await.clone()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    async fn create(&self) -> Result<MockSession, SessionError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(attempt) {
            return Err(SessionError::Create(format!(
                "mock failure on attempt {}",
                attempt
            )));
        }
        self.created.fetch_add(1, Ordering::SeqCst);

        let id = format!("mock-session-{}", attempt + 1);
        Ok(MockSession {
            fail_close: self.close_failures.contains(&id),
            id,
            closed: false,
            close_log: Arc::clone(&self.close_log),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sessions_are_numbered_from_one() {
        let factory = MockSessionFactory::new();
        let a = factory.create().await.unwrap();
        let b = factory.create().await.unwrap();
        assert_eq!(a.id(), "mock-session-1");
        assert_eq!(b.id(), "mock-session-2");
        assert_eq!(factory.created_count(), 2);
    }

    #[tokio::test]
    async fn test_close_is_recorded() {
        let factory = MockSessionFactory::new().with_close_failure("mock-session-2");
        let mut a = factory.create().await.unwrap();
        let mut b = factory.create().await.unwrap();

        a.close().await.unwrap();
        assert!(b.close().await.is_err());

        assert!(a.is_closed());
        assert!(!b.is_closed());
        assert_eq!(factory.closed_sessions().await, vec!["mock-session-1"]);
    }
}
