//! Note search: the match predicate and the search screen state machine.
//!
//! The remote `ilike` filter built by [`crate::remote::ilike_any_filter`]
//! and [`note_matches`] agree: a note matches when the trimmed query is a
//! case-insensitive substring of its title or its content.

mod session;

use crate::models::Note;

pub use session::{SearchSession, SearchState, SuggestionGroup, SUGGESTIONS};

/// Trim a raw query. Whitespace-only input is no query at all.
#[must_use]
pub fn normalize_query(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Whether `query` (already normalized) occurs in the note's title or content,
/// ignoring case.
#[must_use]
pub fn note_matches(note: &Note, query: &str) -> bool {
    let needle = query.to_lowercase();
    note.title.to_lowercase().contains(&needle) || note.content.to_lowercase().contains(&needle)
}

/// Filter `notes` in order. A whitespace-only query keeps every note.
#[must_use]
pub fn filter_notes(notes: &[Note], raw_query: &str) -> Vec<Note> {
    let Some(query) = normalize_query(raw_query) else {
        return notes.to_vec();
    };
    notes
        .iter()
        .filter(|note| note_matches(note, &query))
        .cloned()
        .collect()
}
