use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::models::Note;
use crate::remote::NotesBackend;
use crate::search::normalize_query;

pub const NO_RESULTS_TITLE: &str = "No results found";
pub const NO_RESULTS_MESSAGE: &str = "Try searching with different keywords";

/// A labelled row of tappable query chips shown while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionGroup {
    pub label: &'static str,
    pub chips: &'static [&'static str],
}

pub const SUGGESTIONS: [SuggestionGroup; 2] = [
    SuggestionGroup {
        label: "Recent",
        chips: &["example"],
    },
    SuggestionGroup {
        label: "Trending",
        chips: &["ideas"],
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SearchState {
    /// No query. Carries no data; [`SearchState::suggestions`] yields the
    /// static suggestion groups for this state.
    #[default]
    Idle,
    Searching {
        query: String,
    },
    Results {
        query: String,
        notes: Vec<Note>,
    },
}

impl SearchState {
    /// Suggestion groups to render. Empty unless idle.
    #[must_use]
    pub fn suggestions(&self) -> &'static [SuggestionGroup] {
        match self {
            Self::Idle => &SUGGESTIONS,
            _ => &[],
        }
    }

    /// `"3 results for \"egg\""`, once results are in.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        let Self::Results { query, notes } = self else {
            return None;
        };
        let plural = if notes.len() == 1 { "" } else { "s" };
        Some(format!("{} result{plural} for \"{query}\"", notes.len()))
    }

    /// Title and message for the empty-results view.
    #[must_use]
    pub fn empty_message(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Results { notes, .. } if notes.is_empty() => {
                Some((NO_RESULTS_TITLE, NO_RESULTS_MESSAGE))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Searching { query } | Self::Results { query, .. } => Some(query),
        }
    }
}

#[derive(Default)]
struct SearchInner {
    state: SearchState,
    /// Bumped by every query change; a response carrying an older value
    /// has been superseded.
    generation: u64,
}

/// Search screen state driven by remote queries.
pub struct SearchSession<B: ?Sized + NotesBackend> {
    backend: Arc<B>,
    inner: Arc<Mutex<SearchInner>>,
}

impl<B: ?Sized + NotesBackend> Clone for SearchSession<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ?Sized + NotesBackend> SearchSession<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            inner: Arc::new(Mutex::new(SearchInner::default())),
        }
    }

    #[must_use]
    pub fn state(&self) -> SearchState {
        self.inner().state.clone()
    }

    /// Run `raw` as the current query.
    ///
    /// Whitespace-only input returns to idle without a remote call. If a
    /// newer query or a clear lands while this one is outstanding, its
    /// response is dropped and the newer state is returned unchanged.
    pub async fn set_query(&self, raw: &str) -> Result<SearchState> {
        let Some(query) = normalize_query(raw) else {
            self.clear();
            return Ok(SearchState::Idle);
        };

        let generation = {
            let mut inner = self.inner();
            inner.generation += 1;
            inner.state = SearchState::Searching {
                query: query.clone(),
            };
            inner.generation
        };

        let response = self.backend.search(&query).await;

        let mut inner = self.inner();
        if inner.generation != generation {
            tracing::debug!("Dropping superseded search response for {:?}", query);
            return Ok(inner.state.clone());
        }
        match response {
            Ok(notes) => {
                inner.state = SearchState::Results { query, notes };
                Ok(inner.state.clone())
            }
            Err(error) => {
                tracing::warn!("Failed to search notes: {}", error);
                inner.state = SearchState::Results {
                    query,
                    notes: Vec::new(),
                };
                Err(Error::from(error))
            }
        }
    }

    /// Tapping a suggestion chip is the same as typing it.
    pub async fn apply_suggestion(&self, chip: &str) -> Result<SearchState> {
        self.set_query(chip).await
    }

    pub fn clear(&self) {
        let mut inner = self.inner();
        inner.generation += 1;
        inner.state = SearchState::Idle;
    }

    fn inner(&self) -> MutexGuard<'_, SearchInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
