use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jot_core::config::ClientConfig;
use jot_core::remote::SupabaseNotesClient;
use jot_core::util::truncate_chars;
use jot_core::{
    AuthBackend, AuthService, ConfirmPrompt, Confirmation, Note, NoteId, NoteRepository, Route,
    SessionGate, SessionReflection,
};
use serde::Serialize;

use crate::auth::{auth_client, ProfileAuthClient};
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Shortest id prefix accepted in place of a full note id.
pub const MIN_ID_PREFIX: usize = 4;

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub date: String,
    pub relative_time: String,
}

/// Profile name plus the client config it resolves to.
pub struct ProfileContext {
    pub profile_name: String,
    pub config: ClientConfig,
}

impl ProfileContext {
    pub fn load(global_profile: Option<&str>) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = profiles.resolve_profile_name(global_profile);
        let config = resolve_client_config(&profiles, &profile_name)?;
        Ok(Self {
            profile_name,
            config,
        })
    }

    /// Auth service over this profile's keychain-persisted session.
    pub fn auth_service(&self) -> Result<AuthService<ProfileAuthClient>, CliError> {
        let client = auth_client(&self.profile_name, &self.config)
            .map_err(|error| CliError::Auth(error.to_string()))?;
        Ok(AuthService::new(Arc::new(client), SessionReflection::new()))
    }
}

/// Profile settings win; `SUPABASE_URL` / `SUPABASE_ANON_KEY` fill in for
/// profiles that were never initialised.
pub fn resolve_client_config(
    profiles: &CliProfilesConfig,
    profile_name: &str,
) -> Result<ClientConfig, CliError> {
    if let Some(profile) = profiles.profile(profile_name) {
        if let Some(config) = profile.client_config()? {
            return Ok(config);
        }
    }
    if let Some(config) = ClientConfig::from_env()? {
        tracing::debug!("Using Supabase config from environment");
        return Ok(config);
    }
    Err(CliError::Config(format!(
        "Profile '{profile_name}' is not configured. Run `jot config init --profile {profile_name} --supabase-url <URL> --supabase-anon-key <KEY>` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )))
}

/// Resolve the profile, pass the session gate and build the note repository.
pub async fn open_notes(
    global_profile: Option<&str>,
) -> Result<NoteRepository<SupabaseNotesClient>, CliError> {
    let context = ProfileContext::load(global_profile)?;
    let auth = context.auth_service()?;

    let mut gate = SessionGate::new(auth.clone());
    pass_gate(&mut gate, &context.profile_name).await?;

    let client = SupabaseNotesClient::from_config(&context.config, auth.sessions().clone())
        .map_err(jot_core::Error::from)?;
    Ok(NoteRepository::new(
        Arc::new(client),
        context.config.cache_policy,
    ))
}

/// Run the launch gate, retrying once from `Failed`.
pub async fn pass_gate<B>(gate: &mut SessionGate<B>, profile_name: &str) -> Result<(), CliError>
where
    B: ?Sized + AuthBackend,
{
    let mut route = gate.start().await;
    if matches!(route, Route::Failed { .. }) {
        tracing::info!("Session lookup failed; retrying once");
        route = gate.retry().await;
    }

    match route {
        Route::Notes => Ok(()),
        Route::SignIn | Route::Loading => Err(CliError::NotSignedIn(profile_name.to_string())),
        Route::Failed { message } => Err(CliError::Auth(message)),
    }
}

/// Find a note by full id or by a unique id prefix.
pub fn resolve_note<'a>(notes: &'a [Note], note_query: &str) -> Result<&'a Note, CliError> {
    let note_query = normalize_note_identifier(note_query)?;

    if let Ok(note_id) = note_query.parse::<NoteId>() {
        return notes
            .iter()
            .find(|note| note.id == note_id)
            .ok_or(CliError::NoteNotFound(note_query));
    }

    if note_query.chars().count() < MIN_ID_PREFIX {
        return Err(CliError::NoteIdTooShort(MIN_ID_PREFIX));
    }

    let prefix = note_query.to_lowercase();
    let matching = notes
        .iter()
        .filter(|note| note.id.to_string().starts_with(&prefix))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::NoteNotFound(note_query)),
        [note] => Ok(note),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|note| short_id(&note.id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_search_query(parts: &[String]) -> Result<String, CliError> {
    jot_core::search::normalize_query(&parts.join(" ")).ok_or(CliError::EmptySearchQuery)
}

pub fn short_id(id: &NoteId) -> String {
    id.to_string().chars().take(13).collect()
}

pub fn format_note_lines(notes: &[Note], now: DateTime<Utc>) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(&note.id);
            let title = truncate_chars(note.title.trim(), 24);
            let preview = note.content_preview(40);
            let relative_time = format_relative_time(note.updated_at, now);
            format!("{short_id:<13}  {title:<24}  {preview:<40}  {relative_time}")
        })
        .collect()
}

pub fn note_to_list_item(note: &Note, now: DateTime<Utc>) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: note.content_preview(80),
        content: note.content.clone(),
        created_at: note.created_at,
        updated_at: note.updated_at,
        date: note.display_date(),
        relative_time: format_relative_time(note.updated_at, now),
    }
}

/// Render notes as text lines or pretty JSON.
pub fn render_notes(notes: &[Note], as_json: bool) -> Result<String, CliError> {
    let now = Utc::now();
    if as_json {
        let items = notes
            .iter()
            .map(|note| note_to_list_item(note, now))
            .collect::<Vec<_>>();
        Ok(serde_json::to_string_pretty(&items)?)
    } else {
        Ok(format_note_lines(notes, now).join("\n"))
    }
}

pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - then).num_seconds().max(0);
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Explicit content, else piped stdin, else empty.
pub fn resolve_note_content(content: Option<String>) -> Result<String, CliError> {
    if let Some(content) = content {
        return Ok(content);
    }
    Ok(read_piped_stdin()?.unwrap_or_default())
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim_end();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Ask `prompt` on the terminal. `--yes` answers for the user; without a
/// terminal and without `--yes` the action is refused.
pub fn confirm(prompt: &ConfirmPrompt, assume_yes: bool) -> Result<Confirmation, CliError> {
    if assume_yes {
        return Ok(Confirmation::Confirm);
    }

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(CliError::ConfirmationRequired(prompt.title));
    }

    let mut stderr = io::stderr();
    write!(
        stderr,
        "{}: {} [{}/{}] (y/N) ",
        prompt.title, prompt.message, prompt.confirm_label, prompt.cancel_label
    )?;
    stderr.flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(parse_confirmation(&answer, prompt))
}

pub fn parse_confirmation(answer: &str, prompt: &ConfirmPrompt) -> Confirmation {
    let answer = answer.trim().to_lowercase();
    if answer == "y" || answer == "yes" || answer == prompt.confirm_label.to_lowercase() {
        Confirmation::Confirm
    } else {
        Confirmation::Cancel
    }
}
