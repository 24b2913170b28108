//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Notify;

use crate::models::{Note, NoteId};
use crate::remote::{MemoryBackend, NewNote, NoteUpdate, NotesBackend, Operation, RemoteResult};

/// A note last touched `minutes_ago`.
pub fn note_at(title: &str, content: &str, minutes_ago: i64) -> Note {
    let stamp = Utc::now() - Duration::minutes(minutes_ago);
    Note {
        id: NoteId::generate(),
        title: title.to_string(),
        content: content.to_string(),
        created_at: stamp,
        updated_at: stamp,
    }
}

/// Wraps [`MemoryBackend`] and can hold one call open until released.
///
/// The gated call computes its result up front, then parks. That lets a
/// test interleave a second call between the backend answering and the
/// caller seeing the answer.
#[derive(Clone)]
pub struct GatedBackend {
    inner: MemoryBackend,
    armed: Arc<Mutex<Option<Operation>>>,
    entered: Arc<Notify>,
    released: Arc<Notify>,
}

impl GatedBackend {
    pub fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            armed: Arc::new(Mutex::new(None)),
            entered: Arc::new(Notify::new()),
            released: Arc::new(Notify::new()),
        }
    }

    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    /// Hold the next call of `operation`.
    pub fn gate_next(&self, operation: Operation) {
        *self.armed.lock().unwrap_or_else(PoisonError::into_inner) = Some(operation);
    }

    /// Resolves once the gated call is parked.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    async fn pass<T>(&self, operation: Operation, result: T) -> T {
        let hold = {
            let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
            if *armed == Some(operation) {
                *armed = None;
                true
            } else {
                false
            }
        };
        if hold {
            self.entered.notify_one();
            self.released.notified().await;
        }
        result
    }
}

#[async_trait]
impl NotesBackend for GatedBackend {
    async fn list(&self) -> RemoteResult<Vec<Note>> {
        let result = self.inner.list().await;
        self.pass(Operation::List, result).await
    }

    async fn insert(&self, note: NewNote) -> RemoteResult<Note> {
        let result = self.inner.insert(note).await;
        self.pass(Operation::Insert, result).await
    }

    async fn update(&self, id: &NoteId, update: NoteUpdate) -> RemoteResult<Note> {
        let result = self.inner.update(id, update).await;
        self.pass(Operation::Update, result).await
    }

    async fn delete(&self, id: &NoteId) -> RemoteResult<()> {
        let result = self.inner.delete(id).await;
        self.pass(Operation::Delete, result).await
    }

    async fn search(&self, pattern: &str) -> RemoteResult<Vec<Note>> {
        let result = self.inner.search(pattern).await;
        self.pass(Operation::Search, result).await
    }
}
