//! In-process backend: the standalone variant of the remote service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::{validate_credentials, AuthError, AuthResult, AuthSession, AuthUser, SignUpOutcome};
use crate::models::{Note, NoteId};
use crate::remote::{AuthBackend, NewNote, NoteUpdate, NotesBackend, RemoteError, RemoteResult};
use crate::search::filter_notes;
use crate::util::unix_timestamp_now;

const SESSION_LIFETIME_SECONDS: i64 = 3600;

/// Backend operations, for call accounting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetSession,
    SignIn,
    SignUp,
    SignOut,
    Refresh,
    List,
    Insert,
    Update,
    Delete,
    Search,
}

/// Rows, accounts and the server-side session kept in memory.
///
/// Rows are visible to their owner; rows seeded without an owner are
/// visible to everyone. Stored timestamps are strictly increasing so the
/// `updated_at` ordering is total.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    session: Option<AuthSession>,
    rows: Vec<Row>,
    calls: HashMap<Operation, usize>,
    failures: HashMap<Operation, Vec<String>>,
    last_stamp: Option<DateTime<Utc>>,
    issued_tokens: u64,
    require_confirmation: bool,
}

struct Account {
    user_id: String,
    password: String,
}

struct Row {
    owner: Option<String>,
    note: Note,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fixed list of notes visible to every user.
    #[must_use]
    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state();
            for note in notes {
                state.last_stamp = Some(
                    state
                        .last_stamp
                        .map_or(note.updated_at, |last| last.max(note.updated_at)),
                );
                state.rows.push(Row { owner: None, note });
            }
        }
        backend
    }

    /// Create an account without signing in.
    pub fn register(&self, email: &str, password: &str) -> String {
        let mut state = self.state();
        let user_id = NoteId::generate().to_string();
        state.accounts.insert(
            email.trim().to_lowercase(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        user_id
    }

    /// Make the next call of `operation` fail with `message`.
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push(message.into());
    }

    /// Number of times `operation` reached the backend.
    pub fn calls(&self, operation: Operation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// When set, sign-up returns `ConfirmationRequired` instead of a session.
    pub fn require_email_confirmation(&self, required: bool) {
        self.state().require_confirmation = required;
    }

    /// Replace the server-side session, e.g. to simulate a persisted login.
    pub fn set_session(&self, session: Option<AuthSession>) {
        self.state().session = session;
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryState {
    /// Count the call and pop an injected failure, if any.
    fn begin(&mut self, operation: Operation) -> Option<String> {
        *self.calls.entry(operation).or_insert(0) += 1;
        let queue = self.failures.get_mut(&operation)?;
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }

    fn begin_remote(&mut self, operation: Operation) -> RemoteResult<()> {
        match self.begin(operation) {
            Some(message) => Err(RemoteError::Injected(message)),
            None => Ok(()),
        }
    }

    fn begin_auth(&mut self, operation: Operation) -> AuthResult<()> {
        match self.begin(operation) {
            Some(message) => Err(AuthError::Api(message)),
            None => Ok(()),
        }
    }

    fn stamp(&mut self, requested: DateTime<Utc>) -> DateTime<Utc> {
        let stamp = self.last_stamp.map_or(requested, |last| {
            requested.max(last + chrono::Duration::microseconds(1))
        });
        self.last_stamp = Some(stamp);
        stamp
    }

    fn owner(&self) -> Option<String> {
        self.session.as_ref().map(|session| session.user.id.clone())
    }

    fn is_visible(&self, row: &Row) -> bool {
        row.owner.is_none() || row.owner == self.owner()
    }

    fn visible_sorted(&self) -> Vec<Note> {
        let mut notes = self
            .rows
            .iter()
            .filter(|row| self.is_visible(row))
            .map(|row| row.note.clone())
            .collect::<Vec<_>>();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }

    fn visible_row_mut(&mut self, id: &NoteId) -> Option<&mut Row> {
        let owner = self.owner();
        self.rows
            .iter_mut()
            .find(|row| row.note.id == *id && (row.owner.is_none() || row.owner == owner))
    }

    fn issue_session(&mut self, user_id: &str, email: &str) -> AuthSession {
        self.issued_tokens += 1;
        let session = AuthSession {
            access_token: format!("memory-access-{}", self.issued_tokens),
            refresh_token: format!("memory-refresh-{}", self.issued_tokens),
            expires_at: unix_timestamp_now() + SESSION_LIFETIME_SECONDS,
            user: AuthUser {
                id: user_id.to_string(),
                email: Some(email.to_string()),
            },
        };
        self.session = Some(session.clone());
        session
    }
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn get_session(&self) -> AuthResult<Option<AuthSession>> {
        let mut state = self.state();
        state.begin_auth(Operation::GetSession)?;
        Ok(state.session.clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let mut state = self.state();
        state.begin_auth(Operation::SignIn)?;
        validate_credentials(email, password)?;

        let key = email.trim().to_lowercase();
        let user_id = match state.accounts.get(&key) {
            Some(account) if account.password == password => account.user_id.clone(),
            _ => return Err(AuthError::Api("Invalid login credentials (400)".to_string())),
        };
        Ok(state.issue_session(&user_id, email.trim()))
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        let mut state = self.state();
        state.begin_auth(Operation::SignUp)?;
        validate_credentials(email, password)?;

        let key = email.trim().to_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(AuthError::Api("User already registered (422)".to_string()));
        }
        let user_id = NoteId::generate().to_string();
        state.accounts.insert(
            key,
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );

        if state.require_confirmation {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        Ok(SignUpOutcome::SignedIn(
            state.issue_session(&user_id, email.trim()),
        ))
    }

    async fn sign_out(&self, _session: &AuthSession) -> AuthResult<()> {
        let mut state = self.state();
        state.begin_auth(Operation::SignOut)?;
        state.session = None;
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        let mut state = self.state();
        state.begin_auth(Operation::Refresh)?;

        let Some(current) = state.session.clone() else {
            return Err(AuthError::Api("Invalid Refresh Token (400)".to_string()));
        };
        if current.refresh_token != refresh_token {
            return Err(AuthError::Api("Invalid Refresh Token (400)".to_string()));
        }
        let email = current.user.email.clone().unwrap_or_default();
        Ok(state.issue_session(&current.user.id, &email))
    }
}

#[async_trait]
impl NotesBackend for MemoryBackend {
    async fn list(&self) -> RemoteResult<Vec<Note>> {
        let mut state = self.state();
        state.begin_remote(Operation::List)?;
        Ok(state.visible_sorted())
    }

    async fn insert(&self, note: NewNote) -> RemoteResult<Note> {
        let mut state = self.state();
        state.begin_remote(Operation::Insert)?;

        let now = state.stamp(Utc::now());
        let stored = Note {
            id: NoteId::generate(),
            title: note.title,
            content: note.content,
            created_at: now,
            updated_at: now,
        };
        let owner = state.owner();
        state.rows.push(Row {
            owner,
            note: stored.clone(),
        });
        Ok(stored)
    }

    async fn update(&self, id: &NoteId, update: NoteUpdate) -> RemoteResult<Note> {
        let mut state = self.state();
        state.begin_remote(Operation::Update)?;

        let stamp = state.stamp(update.updated_at);
        let row = state
            .visible_row_mut(id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        row.note.title = update.title;
        row.note.content = update.content;
        row.note.updated_at = stamp;
        Ok(row.note.clone())
    }

    async fn delete(&self, id: &NoteId) -> RemoteResult<()> {
        let mut state = self.state();
        state.begin_remote(Operation::Delete)?;

        let owner = state.owner();
        let before = state.rows.len();
        state.rows.retain(|row| {
            !(row.note.id == *id && (row.owner.is_none() || row.owner == owner))
        });
        if state.rows.len() == before {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn search(&self, pattern: &str) -> RemoteResult<Vec<Note>> {
        let mut state = self.state();
        state.begin_remote(Operation::Search)?;
        Ok(filter_notes(&state.visible_sorted(), pattern))
    }
}
