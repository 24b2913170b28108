use std::sync::Arc;

use jot_core::{Action, Note, NotesBackend, SearchSession, SearchState};

use super::common::{normalize_search_query, open_notes, render_notes};
use crate::error::CliError;

pub async fn run_search(
    profile: Option<&str>,
    query: &[String],
    json: bool,
) -> Result<(), CliError> {
    let query = normalize_search_query(query)?;
    let repository = open_notes(profile).await?;
    let state = search_notes(Arc::clone(repository.backend()), &query).await?;

    let notes: &[Note] = match &state {
        SearchState::Results { notes, .. } => notes.as_slice(),
        _ => &[],
    };
    if json {
        println!("{}", render_notes(notes, true)?);
        return Ok(());
    }

    if let Some((title, message)) = state.empty_message() {
        println!("{title}. {message}");
        return Ok(());
    }
    if let Some(summary) = state.summary() {
        println!("{summary}");
    }
    println!("{}", render_notes(notes, false)?);
    Ok(())
}

/// One-shot search session over `backend`.
pub async fn search_notes<B>(backend: Arc<B>, query: &str) -> Result<SearchState, CliError>
where
    B: ?Sized + NotesBackend,
{
    let search = SearchSession::new(backend);
    let state = search
        .set_query(query)
        .await
        .map_err(CliError::failed(Action::SearchNotes))?;
    if let SearchState::Results { notes, .. } = &state {
        tracing::debug!("Search matched {} notes", notes.len());
    }
    Ok(state)
}
