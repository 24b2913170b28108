//! Supabase row access over PostgREST.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::models::{Note, NoteId};
use crate::remote::{NewNote, NoteUpdate, NotesBackend, RemoteError, RemoteResult};
use crate::session::SessionReflection;
use crate::util::log_excerpt;

const SELECT_COLUMNS: &str = "id,title,content,created_at,updated_at";
const ORDER_NEWEST_FIRST: &str = "updated_at.desc";

/// Row client for the notes table.
///
/// Requests are authorised with the access token of whatever session the
/// reflection currently holds; row-level security on the backend scopes
/// every query to that user.
#[derive(Clone)]
pub struct SupabaseNotesClient {
    rows_url: String,
    anon_key: String,
    client: Client,
    sessions: SessionReflection,
}

impl SupabaseNotesClient {
    pub fn from_config(config: &ClientConfig, sessions: SessionReflection) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            rows_url: config.rows_url(),
            anon_key: config.supabase_anon_key.clone(),
            client,
            sessions,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RemoteResult<RequestBuilder> {
        let session = self
            .sessions
            .current()
            .ok_or(RemoteError::Unauthenticated)?;
        Ok(request
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .header("Accept", "application/json"))
    }

    fn id_filter(id: &NoteId) -> (&'static str, String) {
        ("id", format!("eq.{id}"))
    }

    async fn send_rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = request.send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|error| RemoteError::Decode(error.to_string()))
    }
}

#[async_trait]
impl NotesBackend for SupabaseNotesClient {
    async fn list(&self) -> RemoteResult<Vec<Note>> {
        tracing::debug!("GET {} (list)", self.rows_url);
        let request = self.authorized(
            self.client
                .get(&self.rows_url)
                .query(&[("select", SELECT_COLUMNS), ("order", ORDER_NEWEST_FIRST)]),
        )?;
        self.send_rows(request).await
    }

    async fn insert(&self, note: NewNote) -> RemoteResult<Note> {
        tracing::debug!("POST {} (insert)", self.rows_url);
        let request = self.authorized(
            self.client
                .post(&self.rows_url)
                .query(&[("select", SELECT_COLUMNS)])
                .header("Prefer", "return=representation")
                .json(&note),
        )?;
        let rows: Vec<Note> = self.send_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("insert returned no row".to_string()))
    }

    async fn update(&self, id: &NoteId, update: NoteUpdate) -> RemoteResult<Note> {
        tracing::debug!("PATCH {} id={}", self.rows_url, id);
        let (column, filter) = Self::id_filter(id);
        let request = self.authorized(
            self.client
                .patch(&self.rows_url)
                .query(&[(column, filter.as_str()), ("select", SELECT_COLUMNS)])
                .header("Prefer", "return=representation")
                .json(&update),
        )?;
        let rows: Vec<Note> = self.send_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &NoteId) -> RemoteResult<()> {
        tracing::debug!("DELETE {} id={}", self.rows_url, id);
        let (column, filter) = Self::id_filter(id);
        let request = self.authorized(
            self.client
                .delete(&self.rows_url)
                .query(&[(column, filter.as_str()), ("select", "id")])
                .header("Prefer", "return=representation"),
        )?;
        let rows: Vec<serde_json::Value> = self.send_rows(request).await?;
        if rows.is_empty() {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn search(&self, pattern: &str) -> RemoteResult<Vec<Note>> {
        tracing::debug!("GET {} (search)", self.rows_url);
        let filter = ilike_any_filter(&["title", "content"], pattern);
        let request = self.authorized(self.client.get(&self.rows_url).query(&[
            ("select", SELECT_COLUMNS),
            ("or", filter.as_str()),
            ("order", ORDER_NEWEST_FIRST),
        ]))?;
        self.send_rows(request).await
    }
}

/// Build a PostgREST `or` filter matching `pattern` as a literal
/// case-insensitive substring of any of `columns`.
///
/// LIKE metacharacters are escaped first, then the value is double-quoted
/// so commas and parentheses in user input cannot break the filter syntax.
pub fn ilike_any_filter(columns: &[&str], pattern: &str) -> String {
    let like = format!("%{}%", escape_like(pattern));
    let quoted = quote_filter_value(&like);
    let clauses = columns
        .iter()
        .map(|column| format!("{column}.ilike.{quoted}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("({clauses})")
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn quote_filter_value(raw: &str) -> String {
    let mut quoted = String::with_capacity(raw.len() + 2);
    quoted.push('"');
    for ch in raw.chars() {
        if matches!(ch, '\\' | '"') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

async fn check_status(response: Response) -> RemoteResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = crate::auth::parse_api_error(status, &body);
    tracing::warn!("Remote request failed: {}", log_excerpt(&message));
    Err(RemoteError::Api {
        status: status.as_u16(),
        message,
    })
}
