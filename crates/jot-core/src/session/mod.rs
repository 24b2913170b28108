//! Process-wide session reflection and the launch gate built on it.
//!
//! The backend owns the session; the client only mirrors it. The mirror is
//! a single observable value with this contract:
//!
//! * [`SessionReflection::publish`] replaces the current value first, then
//!   emits a [`SessionChange`].
//! * Every subscriber receives every change, in publish order. Nothing is
//!   coalesced or debounced.
//! * A subscriber that falls more than the buffer behind is resynced with a
//!   single [`SessionEvent::Resynced`] change carrying the current value.

mod gate;
mod service;

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::auth::AuthSession;

pub use gate::{Route, SessionGate};
pub use service::AuthService;

const CHANGE_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    /// Emitted to a lagging subscriber in place of the changes it missed.
    Resynced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub event: SessionEvent,
    pub session: Option<AuthSession>,
}

/// Shared read-only reflection of the backend session.
#[derive(Clone)]
pub struct SessionReflection {
    current: Arc<watch::Sender<Option<AuthSession>>>,
    changes: broadcast::Sender<SessionChange>,
}

impl Default for SessionReflection {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionReflection {
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            current: Arc::new(current),
            changes,
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn current(&self) -> Option<AuthSession> {
        self.current.borrow().clone()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Receiver for the latest value only; intermediate values may be skipped.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<AuthSession>> {
        self.current.subscribe()
    }

    /// Subscribe to every subsequent change.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            changes: self.changes.subscribe(),
            current: self.current.subscribe(),
        }
    }

    pub fn publish(&self, event: SessionEvent, session: Option<AuthSession>) {
        self.current.send_replace(session.clone());
        tracing::info!(
            "Session change: {:?} (signed_in={})",
            event,
            session.is_some()
        );
        // No subscribers is fine; the current value is still updated.
        let _ = self.changes.send(SessionChange { event, session });
    }

    /// Replace the current value without emitting a change.
    ///
    /// Used for the launch-time fetch, whose result the gate routes on
    /// directly.
    pub(crate) fn seed(&self, session: Option<AuthSession>) {
        self.current.send_replace(session);
    }
}

/// One subscriber's ordered view of session changes.
pub struct SessionSubscription {
    changes: broadcast::Receiver<SessionChange>,
    current: watch::Receiver<Option<AuthSession>>,
}

impl SessionSubscription {
    /// Wait for the next change. `None` once every reflection handle is gone.
    pub async fn recv(&mut self) -> Option<SessionChange> {
        match self.changes.recv().await {
            Ok(change) => Some(change),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Session subscriber lagged by {} changes; resyncing", skipped);
                Some(SessionChange {
                    event: SessionEvent::Resynced,
                    session: self.current.borrow().clone(),
                })
            }
        }
    }
}
