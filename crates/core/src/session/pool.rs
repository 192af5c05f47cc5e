//! Fixed-size pool of automation sessions with blocking checkout.

use std::ops::{Deref, DerefMut};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::error::PoolError;
use super::traits::{Session, SessionFactory};

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Number of sessions the pool was built with.
    pub size: usize,
    /// Sessions waiting in the idle set.
    pub idle: usize,
    /// Sessions currently lent out.
    pub in_use: usize,
    /// Whether `shutdown` has been called.
    pub closed: bool,
}

/// A bounded pool of pre-created sessions.
///
/// Sessions live either in the idle set or with exactly one borrower. The
/// semaphore carries one permit per idle session, so `acquire` parks until a
/// session is handed back. Only sessions lent out by this pool are taken back.
pub struct SessionPool<S: Session> {
    idle: Mutex<Vec<S>>,
    available: Semaphore,
    size: usize,
    /// Ids of the sessions currently lent out.
    lent: Mutex<HashSet<String>>,
    closed: AtomicBool,
}

impl<S: Session> SessionPool<S> {
    /// Creates `size` sessions through `factory`.
    ///
    /// Fails fast: if any session cannot be created, the ones already built
    /// are closed and no pool is returned.
    pub async fn new<F>(factory: &F, size: usize) -> Result<Self, PoolError>
    where
        F: SessionFactory<Session = S>,
    {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }

        let mut sessions = Vec::with_capacity(size);
        for index in 0..size {
            match factory.create().await {
                Ok(session) => {
                    debug!("Created session {} ({}/{})", session.id(), index + 1, size);
                    sessions.push(session);
                }
                Err(source) => {
                    error!(
                        "Session factory failed on session {} of {}: {}",
                        index + 1,
                        size,
                        source
                    );
                    close_all(sessions).await;
                    return Err(PoolError::Factory {
                        index,
                        size,
                        source,
                    });
                }
            }
        }

        info!("Session pool ready with {} sessions", size);

        Ok(Self {
            idle: Mutex::new(sessions),
            available: Semaphore::new(size),
            size,
            lent: Mutex::new(HashSet::with_capacity(size)),
            closed: AtomicBool::new(false),
        })
    }

    /// Borrows an idle session, waiting until one is released if necessary.
    ///
    /// The returned guard hands the session back when dropped.
    pub async fn acquire(&self) -> Result<PooledSession<'_, S>, PoolError> {
        let permit = self
            .available
            .acquire()
            .await
            .map_err(|_| PoolError::Closed)?;
        permit.forget();

        // Shutdown may have drained the idle set after the permit was granted.
        let session = self.lock_idle().pop().ok_or(PoolError::Closed)?;
        self.lock_lent().insert(session.id().to_string());

        Ok(PooledSession {
            pool: self,
            session: Some(session),
        })
    }

    /// Returns a session to the idle set. `None` is ignored.
    ///
    /// After shutdown, returned sessions are closed instead of pooled.
    pub fn release(&self, session: Option<S>) {
        let Some(session) = session else {
            return;
        };

        let mut lent = self.lock_lent();
        if !lent.remove(session.id()) {
            drop(lent);
            warn!(
                "Session {} was not lent out by this pool, closing it",
                session.id()
            );
            close_detached(session);
            return;
        }

        let mut idle = self.lock_idle();
        drop(lent);
        if self.closed.load(Ordering::SeqCst) {
            drop(idle);
            debug!("Session {} returned after shutdown, closing", session.id());
            close_detached(session);
            return;
        }
        idle.push(session);
        drop(idle);

        self.available.add_permits(1);
    }

    /// Closes every idle session and refuses further checkouts.
    ///
    /// Idempotent. A failure to close one session is logged and does not stop
    /// the others from being closed. Sessions still lent out are closed when
    /// their borrower hands them back.
    pub async fn shutdown(&self) {
        let sessions = {
            let mut idle = self.lock_idle();
            if self.closed.swap(true, Ordering::SeqCst) {
                debug!("Session pool already shut down");
                return;
            }
            std::mem::take(&mut *idle)
        };
        self.available.close();

        let in_use = self.lock_lent().len();
        info!(
            "Shutting down session pool: closing {} idle sessions ({} in use)",
            sessions.len(),
            in_use
        );
        close_all(sessions).await;
    }

    /// Returns a snapshot of the pool counters.
    pub fn status(&self) -> PoolStatus {
        let idle = self.lock_idle().len();
        PoolStatus {
            size: self.size,
            idle,
            in_use: self.lock_lent().len(),
            closed: self.closed.load(Ordering::SeqCst),
        }
    }

    fn lock_idle(&self) -> MutexGuard<'_, Vec<S>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_lent(&self) -> MutexGuard<'_, HashSet<String>> {
        self.lent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A session borrowed from a [`SessionPool`].
///
/// Dereferences to the session and returns it to the pool on drop, including
/// when the borrowing future panics or is cancelled.
pub struct PooledSession<'a, S: Session> {
    pool: &'a SessionPool<S>,
    session: Option<S>,
}

impl<S: Session> PooledSession<'_, S> {
    /// Detaches the session from the guard. The caller becomes responsible
    /// for handing it back with [`SessionPool::release`].
    pub fn into_inner(mut self) -> S {
        self.session.take().expect("pooled session already taken")
    }
}

impl<S: Session> Deref for PooledSession<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session.as_ref().expect("pooled session already taken")
    }
}

impl<S: Session> DerefMut for PooledSession<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().expect("pooled session already taken")
    }
}

impl<S: Session> Drop for PooledSession<'_, S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.release(Some(session));
        }
    }
}

async fn close_one<S: Session>(session: &mut S) {
    match session.close().await {
        Ok(()) => debug!("Closed session {}", session.id()),
        Err(e) => warn!("Failed to close session {}: {}", session.id(), e),
    }
}

async fn close_all<S: Session>(sessions: Vec<S>) {
    for mut session in sessions {
        close_one(&mut session).await;
    }
}

fn close_detached<S: Session>(mut session: S) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move {
                close_one(&mut session).await;
            });
        }
        Err(_) => warn!(
            "No async runtime available, dropping session {} without closing",
            session.id()
        ),
    }
}
