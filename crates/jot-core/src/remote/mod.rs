//! Contract with the hosted backend.
//!
//! `AuthBackend` and `NotesBackend` are the only seams through which the
//! client touches durable state. `SupabaseAuthClient` and
//! [`SupabaseNotesClient`] talk to a real project; [`MemoryBackend`] keeps
//! rows in process for the standalone variant and for tests.

mod memory;
mod postgrest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthResult, AuthSession, SignUpOutcome};
use crate::models::{Note, NoteId};

pub use memory::{MemoryBackend, Operation};
pub use postgrest::{ilike_any_filter, SupabaseNotesClient};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Not signed in.")]
    Unauthenticated,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote API error: {message}")]
    Api { status: u16, message: String },
    #[error("Unexpected response payload: {0}")]
    Decode(String),
    #[error("Note not found: {0}")]
    NotFound(String),
    #[error("Injected failure: {0}")]
    Injected(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Insert payload; the backend assigns id, owner and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNote {
    pub title: String,
    pub content: String,
}

/// Full-field update payload. There is no partial patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteUpdate {
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Current session, if one exists. Suspends until the backend answers.
    async fn get_session(&self) -> AuthResult<Option<AuthSession>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome>;

    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()>;

    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession>;
}

#[async_trait]
pub trait NotesBackend: Send + Sync {
    /// Every note owned by the signed-in user, `updated_at` descending.
    async fn list(&self) -> RemoteResult<Vec<Note>>;

    /// Insert a row and return it as stored.
    async fn insert(&self, note: NewNote) -> RemoteResult<Note>;

    /// Overwrite title/content/updated_at and return the stored row.
    async fn update(&self, id: &NoteId, update: NoteUpdate) -> RemoteResult<Note>;

    async fn delete(&self, id: &NoteId) -> RemoteResult<()>;

    /// Case-insensitive substring match on title OR content,
    /// `updated_at` descending. `pattern` is already trimmed and non-empty.
    async fn search(&self, pattern: &str) -> RemoteResult<Vec<Note>>;
}
