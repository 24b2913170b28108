//! Note editor state machine.
//!
//! ```text
//! Browsing --new_note/edit--> Editing --save ok/cancel--> Browsing
//!                              |  ^
//!                              +--+ save rejected or failed
//! ```

use crate::error::{Error, Result};
use crate::models::{Note, NoteDraft, NoteId};
use crate::notes::NoteRepository;
use crate::remote::NotesBackend;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EditorState {
    #[default]
    Browsing,
    Editing {
        draft: NoteDraft,
        /// `None` while composing a new note.
        editing: Option<NoteId>,
    },
}

#[derive(Debug, Default)]
pub struct Editor {
    state: EditorState,
}

impl Editor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &EditorState {
        &self.state
    }

    #[must_use]
    pub const fn is_editing(&self) -> bool {
        matches!(self.state, EditorState::Editing { .. })
    }

    /// Heading for the open editor.
    #[must_use]
    pub const fn heading(&self) -> Option<&'static str> {
        match &self.state {
            EditorState::Browsing => None,
            EditorState::Editing { editing: None, .. } => Some("New Note"),
            EditorState::Editing { editing: Some(_), .. } => Some("Edit Note"),
        }
    }

    /// Open an empty draft.
    pub fn new_note(&mut self) {
        self.state = EditorState::Editing {
            draft: NoteDraft::default(),
            editing: None,
        };
    }

    /// Open `note` for editing.
    pub fn edit(&mut self, note: &Note) {
        self.state = EditorState::Editing {
            draft: NoteDraft::from_note(note),
            editing: Some(note.id),
        };
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if let EditorState::Editing { draft, .. } = &mut self.state {
            draft.title = title.into();
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        if let EditorState::Editing { draft, .. } = &mut self.state {
            draft.content = content.into();
        }
    }

    /// Close without saving.
    pub fn cancel(&mut self) {
        self.state = EditorState::Browsing;
    }

    /// Save the draft through `repository`.
    ///
    /// Only a successful save closes the editor; on any error the draft is
    /// kept as typed.
    pub async fn save<B>(&mut self, repository: &NoteRepository<B>) -> Result<Note>
    where
        B: ?Sized + NotesBackend,
    {
        let EditorState::Editing { draft, editing } = &self.state else {
            return Err(Error::InvalidState("save requires an open editor"));
        };

        let saved = match editing {
            Some(id) => repository.update(id, draft).await?,
            None => repository.create(draft).await?,
        };
        self.state = EditorState::Browsing;
        Ok(saved)
    }
}
