use jot_core::{Action, Editor, Note, NoteRepository, NotesBackend};

use super::common::{open_notes, resolve_note};
use crate::error::CliError;

pub async fn run_edit(
    profile: Option<&str>,
    note_query: &str,
    title: Option<String>,
    content: Option<String>,
) -> Result<(), CliError> {
    let repository = open_notes(profile).await?;
    let note = edit_note(&repository, note_query, title, content).await?;
    println!("Updated note {}", note.id);
    Ok(())
}

/// Open the matching note in an editor, apply the given fields and save.
/// Omitted fields keep their stored value.
pub async fn edit_note<B>(
    repository: &NoteRepository<B>,
    note_query: &str,
    title: Option<String>,
    content: Option<String>,
) -> Result<Note, CliError>
where
    B: ?Sized + NotesBackend,
{
    if title.is_none() && content.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let notes = repository
        .list()
        .await
        .map_err(CliError::failed(Action::FetchNotes))?;
    let note = resolve_note(&notes, note_query)?;

    let mut editor = Editor::new();
    editor.edit(note);
    if let Some(title) = title {
        editor.set_title(title);
    }
    if let Some(content) = content {
        editor.set_content(content);
    }
    editor
        .save(repository)
        .await
        .map_err(CliError::failed(Action::SaveNote))
}
