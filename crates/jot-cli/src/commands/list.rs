use jot_core::Action;

use super::common::{open_notes, render_notes};
use crate::error::CliError;

pub async fn run_list(profile: Option<&str>, json: bool) -> Result<(), CliError> {
    let repository = open_notes(profile).await?;
    let notes = repository
        .list()
        .await
        .map_err(CliError::failed(Action::FetchNotes))?;

    if notes.is_empty() && !json {
        println!("No notes yet.");
        return Ok(());
    }
    println!("{}", render_notes(&notes, json)?);
    Ok(())
}
