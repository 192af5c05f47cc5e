//! Trait definitions for automation sessions.

use async_trait::async_trait;

use super::error::SessionError;

/// An exclusively-owned automation session handle.
///
/// Implementations are not expected to be safe for concurrent driving; the
/// pool guarantees that a session has at most one borrower at a time.
#[async_trait]
pub trait Session: Send + 'static {
    /// Stable identifier used in logs.
    fn id(&self) -> &str;

    /// Tears the session down. Called once, at pool shutdown or when a
    /// session is handed back to a pool that is already closed.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Creates new automation sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// The session type this factory produces.
    type Session: Session;

    /// Create one fresh session.
    async fn create(&self) -> Result<Self::Session, SessionError>;
}
