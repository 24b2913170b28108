//! Note export as JSON or Markdown.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// One exported note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNote {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[must_use]
pub fn note_to_export_item(note: &Note) -> ExportNote {
    ExportNote {
        id: note.id.to_string(),
        title: note.title.clone(),
        content: note.content.clone(),
        created_at: note.created_at,
        updated_at: note.updated_at,
    }
}

pub fn render_json_export(notes: &[Note]) -> serde_json::Result<String> {
    let items = notes.iter().map(note_to_export_item).collect::<Vec<_>>();
    serde_json::to_string_pretty(&items)
}

/// Front matter with id and timestamps, then a `# title` heading and the body.
#[must_use]
pub fn render_markdown_export(notes: &[Note]) -> String {
    let mut output = String::new();

    for (index, note) in notes.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        let _ = writeln!(output, "---");
        let _ = writeln!(output, "id: {}", note.id);
        let _ = writeln!(output, "created_at: {}", note.created_at.to_rfc3339());
        let _ = writeln!(output, "updated_at: {}", note.updated_at.to_rfc3339());
        let _ = writeln!(output, "---");
        let _ = writeln!(output);
        let _ = writeln!(output, "# {}", note.title.trim());
        if !note.content.is_empty() {
            let _ = writeln!(output);
            output.push_str(&note.content);
            if !note.content.ends_with('\n') {
                output.push('\n');
            }
        }
    }

    output
}

pub fn render_notes_export(notes: &[Note], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(notes),
        ExportFormat::Markdown => Ok(render_markdown_export(notes)),
    }
}

#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("jot-export-{timestamp_ms}.{}", format.extension())
}
