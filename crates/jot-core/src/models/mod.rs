//! Data models for Jot

mod draft;
mod note;

pub use draft::NoteDraft;
pub use note::{Note, NoteId};
