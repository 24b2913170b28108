use std::path::Path;

use jot_core::export::render_notes_export;
use jot_core::{Action, NoteRepository, NotesBackend};

use super::common::open_notes;
use crate::cli::ExportFormat;
use crate::error::CliError;

pub async fn run_export(
    profile: Option<&str>,
    format: ExportFormat,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let repository = open_notes(profile).await?;
    let rendered = export_notes(&repository, format).await?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

pub async fn export_notes<B>(
    repository: &NoteRepository<B>,
    format: ExportFormat,
) -> Result<String, CliError>
where
    B: ?Sized + NotesBackend,
{
    let notes = repository
        .list()
        .await
        .map_err(CliError::failed(Action::FetchNotes))?;
    Ok(render_notes_export(&notes, format.into())?)
}
