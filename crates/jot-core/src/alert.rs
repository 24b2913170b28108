//! User-facing alerts and confirmation prompts.
//!
//! Every failure path ends in a blocking alert; destructive actions are
//! preceded by a two-choice prompt. Both are plain data so any front end
//! can render them.

use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// The user action a failure is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    FetchNotes,
    SaveNote,
    DeleteNote,
    SearchNotes,
    SignIn,
    SignUp,
    SignOut,
}

impl Action {
    const fn failure_message(self) -> &'static str {
        match self {
            Self::FetchNotes => "Failed to fetch notes.",
            Self::SaveNote => "Failed to save note.",
            Self::DeleteNote => "Failed to delete note.",
            Self::SearchNotes => "Failed to search notes.",
            Self::SignIn => "Failed to sign in.",
            Self::SignUp => "Failed to sign up.",
            Self::SignOut => "Failed to sign out.",
        }
    }
}

/// Blocking message shown after a failed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Map a failure to the alert the user sees.
    ///
    /// Validation and auth failures carry their own message verbatim; remote
    /// failures get the generic per-action message.
    #[must_use]
    pub fn for_failure(action: Action, error: &Error) -> Self {
        match error {
            Error::Validation(message) => Self::new("Error", message.clone()),
            Error::Auth(auth_error) => Self::new("Error", auth_error.to_string()),
            Error::Busy(_) => Self::new("Please wait", "A previous request is still running."),
            _ => Self::new("Error", action.failure_message()),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// The user's answer to a [`ConfirmPrompt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Cancel,
    Confirm,
}

/// Two-choice prompt guarding a destructive action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmPrompt {
    pub title: &'static str,
    pub message: &'static str,
    pub cancel_label: &'static str,
    /// Label of the destructive choice.
    pub confirm_label: &'static str,
}

impl ConfirmPrompt {
    pub const DELETE_NOTE: Self = Self {
        title: "Delete Note",
        message: "Are you sure you want to delete this note?",
        cancel_label: "Cancel",
        confirm_label: "Delete",
    };

    pub const SIGN_OUT: Self = Self {
        title: "Sign Out",
        message: "Are you sure you want to sign out?",
        cancel_label: "Cancel",
        confirm_label: "Sign Out",
    };
}
