//! Client configuration.
//!
//! One `ClientConfig` carries everything needed to reach a Supabase
//! project: the project URL and public anon key, the notes table, the HTTP
//! timeout and the cache policy. Values come from the environment or from a
//! JSON file; secrets never belong here.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::auth::resolve_optional_supabase_config;
use crate::error::{Error, Result};
use crate::notes::CachePolicy;
use crate::util::{is_http_url, normalize_text_option};

pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";
pub const NOTES_TABLE_ENV: &str = "JOT_NOTES_TABLE";

pub const DEFAULT_NOTES_TABLE: &str = "notes";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    #[serde(default = "default_notes_table")]
    pub notes_table: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub cache_policy: CachePolicy,
}

fn default_notes_table() -> String {
    DEFAULT_NOTES_TABLE.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl ClientConfig {
    /// Build a validated config with defaults for everything optional.
    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Result<Self> {
        let mut config = Self {
            supabase_url: supabase_url.into(),
            supabase_anon_key: supabase_anon_key.into(),
            notes_table: default_notes_table(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache_policy: CachePolicy::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Read `SUPABASE_URL` / `SUPABASE_ANON_KEY` (and optionally
    /// `JOT_NOTES_TABLE`) from the process environment.
    ///
    /// `Ok(None)` when neither Supabase variable is set; setting only one is
    /// an error.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let resolved = resolve_optional_supabase_config(
            lookup(SUPABASE_URL_ENV),
            lookup(SUPABASE_ANON_KEY_ENV),
        )
        .map_err(|_| {
            Error::Config(format!(
                "{SUPABASE_URL_ENV} and {SUPABASE_ANON_KEY_ENV} must be set together"
            ))
        })?;
        let Some((url, anon_key)) = resolved else {
            return Ok(None);
        };

        let mut config = Self::new(url, anon_key)?;
        if let Some(table) = normalize_text_option(lookup(NOTES_TABLE_ENV)) {
            config.notes_table = table;
        }
        Ok(Some(config))
    }

    /// Load and validate a JSON config file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!("Failed to read {}: {error}", path.display()))
        })?;
        let mut config: Self = serde_json::from_str(&raw).map_err(|error| {
            Error::Config(format!("Invalid config {}: {error}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Normalize in place and reject unusable values.
    pub fn validate(&mut self) -> Result<()> {
        let url = self.supabase_url.trim().trim_end_matches('/');
        if !is_http_url(url) {
            return Err(Error::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
        self.supabase_url = url.to_string();

        self.supabase_anon_key = self.supabase_anon_key.trim().to_string();
        if self.supabase_anon_key.is_empty() {
            return Err(Error::Config("supabase_anon_key is required".to_string()));
        }

        self.notes_table = self.notes_table.trim().to_string();
        if self.notes_table.is_empty() {
            return Err(Error::Config("notes_table must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// PostgREST endpoint for the notes table.
    #[must_use]
    pub fn rows_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.supabase_url,
            urlencoding::encode(&self.notes_table)
        )
    }
}
