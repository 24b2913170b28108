use crate::auth::AuthSession;
use crate::remote::AuthBackend;
use crate::session::{AuthService, SessionChange, SessionSubscription};

/// Which surface the client should be showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Loading,
    Notes,
    SignIn,
    /// The launch-time session fetch failed; `retry` can recover.
    Failed { message: String },
}

impl Route {
    #[must_use]
    pub fn for_session(session: Option<&AuthSession>) -> Self {
        if session.is_some() {
            Self::Notes
        } else {
            Self::SignIn
        }
    }
}

/// Launch routing plus push-driven re-routing on every session change.
pub struct SessionGate<B: ?Sized + AuthBackend> {
    auth: AuthService<B>,
    changes: SessionSubscription,
    route: Route,
}

impl<B: ?Sized + AuthBackend> SessionGate<B> {
    /// Subscribes immediately so no change published after construction is
    /// missed.
    pub fn new(auth: AuthService<B>) -> Self {
        let changes = auth.sessions().subscribe();
        Self {
            auth,
            changes,
            route: Route::Loading,
        }
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService<B> {
        &self.auth
    }

    /// Resolve the launch route from the backend's current session.
    pub async fn start(&mut self) -> Route {
        self.route = match self.auth.get_session().await {
            Ok(session) => Route::for_session(session.as_ref()),
            Err(error) => {
                tracing::warn!("Session lookup failed: {}", error);
                Route::Failed {
                    message: error.to_string(),
                }
            }
        };
        tracing::debug!("Launch route: {:?}", self.route);
        self.route.clone()
    }

    /// Re-run the launch fetch. Only acts from `Failed`.
    pub async fn retry(&mut self) -> Route {
        if matches!(self.route, Route::Failed { .. }) {
            self.start().await
        } else {
            self.route.clone()
        }
    }

    /// Wait for the next session change and route on it.
    ///
    /// `None` once the change stream has closed.
    pub async fn next_route(&mut self) -> Option<Route> {
        let SessionChange { event, session } = self.changes.recv().await?;
        self.route = Route::for_session(session.as_ref());
        tracing::debug!("{:?} -> {:?}", event, self.route);
        Some(self.route.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::remote::{MemoryBackend, Operation};
    use crate::session::{SessionEvent, SessionReflection};
    use pretty_assertions::assert_eq;

    fn gate() -> (Arc<MemoryBackend>, SessionGate<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("me@example.com", "secret");
        let auth = AuthService::new(Arc::clone(&backend), SessionReflection::new());
        (backend, SessionGate::new(auth))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn starts_loading_then_routes_to_sign_in_without_session() {
        let (_backend, mut gate) = gate();
        assert_eq!(gate.route(), &Route::Loading);
        assert_eq!(gate.start().await, Route::SignIn);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn existing_session_routes_to_notes() {
        let (backend, mut gate) = gate();
        backend
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();

        assert_eq!(gate.start().await, Route::Notes);
        assert!(gate.auth().sessions().is_signed_in());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_lookup_recovers_through_retry() {
        let (backend, mut gate) = gate();
        backend
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();
        backend.fail_next(Operation::GetSession, "network unreachable");

        assert_eq!(
            gate.start().await,
            Route::Failed {
                message: "network unreachable".to_string()
            }
        );
        assert_eq!(gate.retry().await, Route::Notes);
        assert_eq!(backend.calls(Operation::GetSession), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn retry_outside_failed_is_a_no_op() {
        let (backend, mut gate) = gate();
        gate.start().await;

        assert_eq!(gate.retry().await, Route::SignIn);
        assert_eq!(backend.calls(Operation::GetSession), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn every_change_reroutes_independently() {
        let (_backend, mut gate) = gate();
        gate.start().await;
        let auth = gate.auth().clone();

        auth.sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();
        auth.refresh_session().await.unwrap();
        auth.sign_out().await.unwrap();
        auth.sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();

        let mut routes = Vec::new();
        for _ in 0..4 {
            routes.push(gate.next_route().await.unwrap());
        }
        assert_eq!(
            routes,
            vec![Route::Notes, Route::Notes, Route::SignIn, Route::Notes]
        );
        assert_eq!(gate.route(), &Route::Notes);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn externally_published_sign_out_reroutes() {
        let (_backend, mut gate) = gate();
        let sessions = gate.auth().sessions().clone();

        sessions.publish(SessionEvent::SignedOut, None);

        assert_eq!(gate.next_route().await, Some(Route::SignIn));
    }
}
