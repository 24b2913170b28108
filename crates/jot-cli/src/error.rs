use std::io;

use jot_core::{Action, Alert};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// A core operation failed; rendered as the alert a user would see.
    #[error("{}", Alert::for_failure(*action, source))]
    Failed {
        action: Action,
        #[source]
        source: jot_core::Error,
    },
    #[error(transparent)]
    Core(#[from] jot_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Note ID prefix must be at least {0} characters")]
    NoteIdTooShort(usize),
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Nothing to change; pass --title and/or --content")]
    NothingToEdit,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Profile '{0}' is not signed in. Run `jot auth login --profile {0}` first.")]
    NotSignedIn(String),
    #[error("{0} requires confirmation; pass --yes to run non-interactively")]
    ConfirmationRequired(&'static str),
}

impl CliError {
    pub fn failed(action: Action) -> impl Fn(jot_core::Error) -> Self {
        move |source| Self::Failed { action, source }
    }
}
