use jot_core::{Action, Editor, Note, NoteRepository, NotesBackend};

use super::common::{open_notes, resolve_note_content};
use crate::error::CliError;

pub async fn run_add(
    profile: Option<&str>,
    title: String,
    content: Option<String>,
) -> Result<(), CliError> {
    let content = resolve_note_content(content)?;
    let repository = open_notes(profile).await?;
    let note = add_note(&repository, title, content).await?;
    println!("Created note {}", note.id);
    Ok(())
}

/// Save a new note through a fresh editor.
pub async fn add_note<B>(
    repository: &NoteRepository<B>,
    title: String,
    content: String,
) -> Result<Note, CliError>
where
    B: ?Sized + NotesBackend,
{
    let mut editor = Editor::new();
    editor.new_note();
    editor.set_title(title);
    editor.set_content(content);
    editor
        .save(repository)
        .await
        .map_err(CliError::failed(Action::SaveNote))
}
