use std::sync::Arc;

use crate::auth::{AuthError, AuthResult, AuthSession, SignUpOutcome};
use crate::remote::AuthBackend;
use crate::session::{SessionEvent, SessionReflection};

/// Auth operations that keep the session reflection in step with the backend.
pub struct AuthService<B: ?Sized + AuthBackend> {
    backend: Arc<B>,
    sessions: SessionReflection,
}

impl<B: ?Sized + AuthBackend> Clone for AuthService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            sessions: self.sessions.clone(),
        }
    }
}

impl<B: ?Sized + AuthBackend> AuthService<B> {
    pub fn new(backend: Arc<B>, sessions: SessionReflection) -> Self {
        Self { backend, sessions }
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionReflection {
        &self.sessions
    }

    #[must_use]
    pub fn current(&self) -> Option<AuthSession> {
        self.sessions.current()
    }

    /// Ask the backend for its current session and mirror it silently.
    pub async fn get_session(&self) -> AuthResult<Option<AuthSession>> {
        let session = self.backend.get_session().await?;
        self.sessions.seed(session.clone());
        Ok(session)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let session = self
            .backend
            .sign_in_with_password(email.trim(), password)
            .await?;
        self.sessions
            .publish(SessionEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        let outcome = self.backend.sign_up(email.trim(), password).await?;
        match &outcome {
            SignUpOutcome::SignedIn(session) => self
                .sessions
                .publish(SessionEvent::SignedIn, Some(session.clone())),
            SignUpOutcome::ConfirmationRequired => {
                tracing::info!("Sign-up accepted; email confirmation pending");
            }
        }
        Ok(outcome)
    }

    /// Sign out the current session. Without one this is a no-op.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let Some(session) = self.sessions.current() else {
            return Ok(());
        };
        self.backend.sign_out(&session).await?;
        self.sessions.publish(SessionEvent::SignedOut, None);
        Ok(())
    }

    pub async fn refresh_session(&self) -> AuthResult<AuthSession> {
        let current = self
            .sessions
            .current()
            .ok_or(AuthError::InvalidConfiguration("No session to refresh"))?;
        let refreshed = self.backend.refresh_session(&current.refresh_token).await?;
        self.sessions
            .publish(SessionEvent::TokenRefreshed, Some(refreshed.clone()));
        Ok(refreshed)
    }

    /// Refresh the current session if it is about to expire.
    ///
    /// A refresh the backend rejects ends the session.
    pub async fn ensure_fresh(&self) -> AuthResult<Option<AuthSession>> {
        let Some(current) = self.sessions.current() else {
            return Ok(None);
        };
        if !current.is_expired() {
            return Ok(Some(current));
        }

        match self.refresh_session().await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(AuthError::Api(message)) => {
                tracing::warn!("Session refresh rejected: {}", message);
                self.sessions.publish(SessionEvent::SignedOut, None);
                Err(AuthError::Api(message))
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryBackend, Operation};
    use pretty_assertions::assert_eq;

    fn service() -> (Arc<MemoryBackend>, AuthService<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        backend.register("me@example.com", "secret");
        let service = AuthService::new(Arc::clone(&backend), SessionReflection::new());
        (backend, service)
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_in_publishes_signed_in() {
        let (_backend, service) = service();
        let mut changes = service.sessions().subscribe();

        let session = service
            .sign_in_with_password(" me@example.com ", "secret")
            .await
            .unwrap();

        let change = changes.recv().await.unwrap();
        assert_eq!(change.event, SessionEvent::SignedIn);
        assert_eq!(change.session, Some(session.clone()));
        assert_eq!(service.current(), Some(session));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_sign_in_leaves_reflection_untouched() {
        let (_backend, service) = service();

        let error = service
            .sign_in_with_password("me@example.com", "wrong")
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Invalid login credentials (400)");
        assert!(!service.sessions().is_signed_in());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_out_publishes_signed_out() {
        let (backend, service) = service();
        service
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();
        let mut changes = service.sessions().subscribe();

        service.sign_out().await.unwrap();

        assert_eq!(changes.recv().await.unwrap().event, SessionEvent::SignedOut);
        assert!(service.current().is_none());
        assert_eq!(backend.calls(Operation::SignOut), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_out_without_session_skips_backend() {
        let (backend, service) = service();
        service.sign_out().await.unwrap();
        assert_eq!(backend.calls(Operation::SignOut), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn confirmation_required_sign_up_publishes_nothing() {
        let (backend, service) = service();
        backend.require_email_confirmation(true);
        let sessions = service.sessions().clone();

        let outcome = service.sign_up("new@example.com", "pw").await.unwrap();

        assert_eq!(outcome, SignUpOutcome::ConfirmationRequired);
        assert!(!sessions.is_signed_in());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn refresh_publishes_token_refreshed() {
        let (_backend, service) = service();
        let original = service
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();
        let mut changes = service.sessions().subscribe();

        let refreshed = service.refresh_session().await.unwrap();

        assert_ne!(refreshed.access_token, original.access_token);
        let change = changes.recv().await.unwrap();
        assert_eq!(change.event, SessionEvent::TokenRefreshed);
        assert_eq!(change.session, Some(refreshed));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn get_session_seeds_without_event() {
        let (backend, service) = service();
        backend
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();

        let session = service.get_session().await.unwrap();

        assert!(session.is_some());
        assert_eq!(service.current(), session);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ensure_fresh_signs_out_when_refresh_is_rejected() {
        let (backend, service) = service();
        let mut session = service
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();
        session.expires_at = 0;
        service
            .sessions()
            .publish(SessionEvent::TokenRefreshed, Some(session));
        backend.fail_next(Operation::Refresh, "Invalid Refresh Token (400)");
        let mut changes = service.sessions().subscribe();

        assert!(service.ensure_fresh().await.is_err());
        assert_eq!(changes.recv().await.unwrap().event, SessionEvent::SignedOut);
        assert!(service.current().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn ensure_fresh_keeps_valid_session() {
        let (backend, service) = service();
        let session = service
            .sign_in_with_password("me@example.com", "secret")
            .await
            .unwrap();

        assert_eq!(service.ensure_fresh().await.unwrap(), Some(session));
        assert_eq!(backend.calls(Operation::Refresh), 0);
    }
}
