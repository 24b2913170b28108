//! Note list and CRUD on top of a [`NotesBackend`].
//!
//! The repository keeps a transient cache of the signed-in user's notes,
//! newest `updated_at` first. The backend stays the source of truth: the
//! cache is only ever replaced by a fetched list or patched with rows the
//! backend has just returned.

mod inflight;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::alert::{ConfirmPrompt, Confirmation};
use crate::error::{Error, Result};
use crate::models::{Note, NoteDraft, NoteId};
use crate::remote::{NewNote, NoteUpdate, NotesBackend, RemoteError};
use crate::util::log_excerpt;

pub use inflight::{InflightGuard, InflightKey, InflightRegistry};

/// How the cache catches up after a successful write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Re-fetch the full list; patch locally only if that fetch fails.
    #[default]
    Refetch,
    /// Patch the cache with the returned row, no extra round trip.
    ApplyLocal,
}

/// A delete waiting on the user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub note_id: NoteId,
    pub prompt: ConfirmPrompt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted(NoteId),
}

enum CacheChange {
    Upsert(Note),
    Remove(NoteId),
}

#[derive(Default)]
struct CacheState {
    notes: Vec<Note>,
    /// Last list ticket handed out.
    issued: u64,
    /// Ticket whose result the cache currently reflects.
    applied: u64,
}

impl CacheState {
    fn apply(&mut self, change: CacheChange) {
        match change {
            CacheChange::Upsert(note) => {
                self.notes.retain(|existing| existing.id != note.id);
                self.notes.push(note);
                self.notes
                    .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            }
            CacheChange::Remove(id) => self.notes.retain(|note| note.id != id),
        }
        // Any list still in flight predates this write.
        self.applied = self.issued;
    }
}

/// Shared handle over the note cache. Clones see the same cache.
pub struct NoteRepository<B: ?Sized + NotesBackend> {
    backend: Arc<B>,
    policy: CachePolicy,
    cache: Arc<Mutex<CacheState>>,
    inflight: InflightRegistry,
}

impl<B: ?Sized + NotesBackend> Clone for NoteRepository<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            policy: self.policy,
            cache: Arc::clone(&self.cache),
            inflight: self.inflight.clone(),
        }
    }
}

impl<B: ?Sized + NotesBackend> NoteRepository<B> {
    pub fn new(backend: Arc<B>, policy: CachePolicy) -> Self {
        Self {
            backend,
            policy,
            cache: Arc::new(Mutex::new(CacheState::default())),
            inflight: InflightRegistry::default(),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> CachePolicy {
        self.policy
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Snapshot of the cached list, newest first.
    #[must_use]
    pub fn notes(&self) -> Vec<Note> {
        self.cache().notes.clone()
    }

    /// Cached note by id.
    #[must_use]
    pub fn get(&self, id: &NoteId) -> Option<Note> {
        self.cache().notes.iter().find(|note| note.id == *id).cloned()
    }

    #[must_use]
    pub fn is_saving(&self, key: InflightKey) -> bool {
        self.inflight.is_inflight(key)
    }

    /// Fetch every note and replace the cache.
    ///
    /// When refreshes overlap, the most recently issued one wins; an older
    /// response resolving later is discarded. On failure the cache keeps its
    /// previous contents.
    pub async fn list(&self) -> Result<Vec<Note>> {
        let ticket = {
            let mut cache = self.cache();
            cache.issued += 1;
            cache.issued
        };

        let fetched = self
            .backend
            .list()
            .await
            .map_err(|error| remote_failure("fetch notes", error))?;

        let mut cache = self.cache();
        if ticket > cache.applied {
            cache.notes = fetched;
            cache.applied = ticket;
        } else {
            tracing::debug!(
                "Discarding stale note list (ticket {}, applied {})",
                ticket,
                cache.applied
            );
        }
        Ok(cache.notes.clone())
    }

    /// Insert a new note from `draft`.
    pub async fn create(&self, draft: &NoteDraft) -> Result<Note> {
        draft.validate()?;
        let guard = self.inflight.acquire(InflightKey::Create)?;

        let created = self
            .backend
            .insert(NewNote {
                title: draft.title.clone(),
                content: draft.content.clone(),
            })
            .await
            .map_err(|error| remote_failure("save note", error))?;
        drop(guard);

        tracing::debug!("Created note {}", created.id);
        self.settle(CacheChange::Upsert(created.clone())).await;
        Ok(created)
    }

    /// Overwrite title and content of `id`, stamping `updated_at` now.
    pub async fn update(&self, id: &NoteId, draft: &NoteDraft) -> Result<Note> {
        draft.validate()?;
        let guard = self.inflight.acquire(InflightKey::Note(*id))?;

        let updated = self
            .backend
            .update(
                id,
                NoteUpdate {
                    title: draft.title.clone(),
                    content: draft.content.clone(),
                    updated_at: Utc::now(),
                },
            )
            .await
            .map_err(|error| remote_failure("save note", error))?;
        drop(guard);

        tracing::debug!("Updated note {}", updated.id);
        self.settle(CacheChange::Upsert(updated.clone())).await;
        Ok(updated)
    }

    /// First half of a delete: the confirmation the user must answer.
    #[must_use]
    pub const fn request_delete(&self, id: NoteId) -> DeleteRequest {
        DeleteRequest {
            note_id: id,
            prompt: ConfirmPrompt::DELETE_NOTE,
        }
    }

    /// Second half of a delete. Cancelling makes no remote call.
    pub async fn resolve_delete(
        &self,
        request: DeleteRequest,
        choice: Confirmation,
    ) -> Result<DeleteOutcome> {
        if choice == Confirmation::Cancel {
            return Ok(DeleteOutcome::Cancelled);
        }

        let id = request.note_id;
        let guard = self.inflight.acquire(InflightKey::Note(id))?;
        self.backend
            .delete(&id)
            .await
            .map_err(|error| remote_failure("delete note", error))?;
        drop(guard);

        tracing::debug!("Deleted note {}", id);
        self.settle(CacheChange::Remove(id)).await;
        Ok(DeleteOutcome::Deleted(id))
    }

    async fn settle(&self, change: CacheChange) {
        match self.policy {
            CachePolicy::ApplyLocal => self.cache().apply(change),
            CachePolicy::Refetch => {
                if let Err(error) = self.list().await {
                    tracing::warn!("Refetch after write failed, patching cache: {}", error);
                    self.cache().apply(change);
                }
            }
        }
    }

    fn cache(&self) -> MutexGuard<'_, CacheState> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn remote_failure(action: &str, error: RemoteError) -> Error {
    tracing::warn!("Failed to {}: {}", action, log_excerpt(&error.to_string()));
    error.into()
}
