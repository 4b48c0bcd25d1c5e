//! Shared, lock-protected access to the [`Session`].

use std::sync::Arc;
use std::time::Duration;

use gatelink_protocol::User;
use parking_lot::Mutex;

use crate::{ConnectionState, Session};

/// A cloneable handle to one [`Session`].
///
/// The runner's frame path, its idle tick and any application handle
/// all hold clones of the same store. Every access goes through
/// [`SessionStore::with`], which runs one short critical section.
///
/// # Concurrency note
///
/// The closure passed to `with` must not await or call back into
/// application code: the lock is a `parking_lot::Mutex`, and holding it
/// across a suspension point would block every other reader.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Session>>,
}

impl SessionStore {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Runs `f` with exclusive access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state()
    }

    pub fn ping(&self) -> Option<Duration> {
        self.inner.lock().ping()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.lock().session_id().map(str::to_owned)
    }

    pub fn sequence(&self) -> Option<u64> {
        self.inner.lock().sequence()
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.lock().current_user().cloned()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.lock().fmt(f)
    }
}
