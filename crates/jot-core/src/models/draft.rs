//! Editor draft model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Note;

/// Message shown when a save is attempted without a title.
pub const EMPTY_TITLE_MESSAGE: &str = "Please enter a title for your note";

/// Unsaved title/content pair held by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Seed a draft from an existing note.
    #[must_use]
    pub fn from_note(note: &Note) -> Self {
        Self::new(note.title.clone(), note.content.clone())
    }

    /// Reject drafts whose title is empty or whitespace-only.
    ///
    /// The title is submitted as typed; only the emptiness check trims.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation(EMPTY_TITLE_MESSAGE.to_string()));
        }
        Ok(())
    }
}
