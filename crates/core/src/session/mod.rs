//! Automation session handles and the bounded pool that lends them out.
//!
//! A session is expensive to create and must never be driven by two callers
//! at once. The [`SessionPool`] creates a fixed number of them up front and
//! hands each one to exactly one borrower at a time.

mod error;
mod http;
mod pool;
mod traits;

pub use error::{PoolError, SessionError};
pub use http::{HttpSession, HttpSessionFactory};
pub use pool::{PoolStatus, PooledSession, SessionPool};
pub use traits::{Session, SessionFactory};
