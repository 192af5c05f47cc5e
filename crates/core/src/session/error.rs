//! Error types for sessions and the session pool.

use thiserror::Error;

/// Errors raised by an individual automation session.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The session could not be started.
    #[error("failed to create session: {0}")]
    Create(String),

    /// The session could not be shut down cleanly.
    #[error("failed to close session {id}: {reason}")]
    Close { id: String, reason: String },
}

/// Errors raised by the session pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// A pool must own at least one session.
    #[error("session pool size must be at least 1")]
    InvalidSize,

    /// The factory failed while the pool was being filled.
    #[error("session {index} of {size} could not be created: {source}")]
    Factory {
        index: usize,
        size: usize,
        #[source]
        source: SessionError,
    },

    /// The pool has been shut down.
    #[error("session pool is shut down")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoolError::Factory {
            index: 1,
            size: 3,
            source: SessionError::Create("driver missing".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "session 1 of 3 could not be created: failed to create session: driver missing"
        );

        let err = SessionError::Close {
            id: "s-1".to_string(),
            reason: "already gone".to_string(),
        };
        assert_eq!(err.to_string(), "failed to close session s-1: already gone");
    }
}
