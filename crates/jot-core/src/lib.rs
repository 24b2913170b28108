//! jot-core - Core library for Jot
//!
//! This crate contains the note models, the Supabase auth and row clients,
//! and the client-side state machines (session gate, note repository, search,
//! editor) shared by every Jot interface.

pub mod alert;
pub mod auth;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod models;
pub mod notes;
pub mod remote;
pub mod search;
pub mod session;
pub mod util;

#[cfg(test)]
mod testing;

pub use alert::{Action, Alert, ConfirmPrompt, Confirmation};
pub use error::{Error, Result};
pub use models::{Note, NoteDraft, NoteId};
pub use notes::{CachePolicy, NoteRepository};
pub use remote::{AuthBackend, NotesBackend, RemoteError};
pub use search::{SearchSession, SearchState};
pub use session::{AuthService, Route, SessionGate, SessionReflection};
pub use editor::{Editor, EditorState};
