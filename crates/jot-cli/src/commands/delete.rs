use jot_core::notes::DeleteOutcome;
use jot_core::{Action, Confirmation, NoteRepository, NotesBackend};

use super::common::{confirm, open_notes, resolve_note};
use crate::error::CliError;

pub async fn run_delete(profile: Option<&str>, note_query: &str, yes: bool) -> Result<(), CliError> {
    let repository = open_notes(profile).await?;
    let outcome = delete_note(&repository, note_query, |prompt| {
        confirm(prompt, yes)
    })
    .await?;

    match outcome {
        DeleteOutcome::Deleted(id) => println!("Deleted note {id}"),
        DeleteOutcome::Cancelled => println!("Cancelled."),
    }
    Ok(())
}

/// Resolve the note, ask `answer` to confirm, then delete.
pub async fn delete_note<B, F>(
    repository: &NoteRepository<B>,
    note_query: &str,
    answer: F,
) -> Result<DeleteOutcome, CliError>
where
    B: ?Sized + NotesBackend,
    F: FnOnce(&jot_core::ConfirmPrompt) -> Result<Confirmation, CliError>,
{
    let notes = repository
        .list()
        .await
        .map_err(CliError::failed(Action::FetchNotes))?;
    let note_id = resolve_note(&notes, note_query)?.id;

    let request = repository.request_delete(note_id);
    let choice = answer(&request.prompt)?;
    repository
        .resolve_delete(request, choice)
        .await
        .map_err(CliError::failed(Action::DeleteNote))
}
