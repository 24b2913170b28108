//! HTTP client for the Supabase auth (GoTrue) endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{
    validate_credentials, AuthError, AuthResult, AuthSession, AuthUser, SessionPersistence,
    SignUpOutcome,
};
use crate::config::ClientConfig;
use crate::remote::AuthBackend;
use crate::util::{is_http_url, unix_timestamp_now};

const AUTH_PATH: &str = "/auth/v1";

/// `/token` grants this client issues.
#[derive(Debug, Clone, Copy)]
enum Grant {
    Password,
    RefreshToken,
}

impl Grant {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// GoTrue client that mirrors every session it obtains into `S`.
#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    base: String,
    anon_key: String,
    http: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        Self::build(url.as_ref(), anon_key.into(), store, Client::builder())
    }

    /// Build from validated config, honouring its request timeout.
    pub fn from_config(config: &ClientConfig, store: S) -> AuthResult<Self> {
        Self::build(
            &config.supabase_url,
            config.supabase_anon_key.clone(),
            store,
            Client::builder().timeout(Duration::from_secs(config.request_timeout_secs)),
        )
    }

    fn build(
        url: &str,
        anon_key: String,
        store: S,
        http: reqwest::ClientBuilder,
    ) -> AuthResult<Self> {
        let base = normalize_auth_url(url)?;
        let anon_key = anon_key.trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }
        Ok(Self {
            base,
            anon_key,
            http: http.build()?,
            store,
        })
    }

    /// The persisted session, refreshed first if it has expired. A refresh
    /// the backend rejects clears the store and reports no session. Transport
    /// and decode failures are returned with the stored session left intact.
    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };
        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        tracing::debug!("Stored session expired; refreshing");
        match self.refresh_session(&stored.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(AuthError::Api(message)) => {
                tracing::warn!("Stored session was rejected: {}", message);
                self.store.clear_session()?;
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;
        let payload = self
            .token(Grant::Password, &json!({ "email": email, "password": password }))
            .await?;
        self.keep(payload, "Sign-in")
    }

    /// Create an account. Projects with email confirmation enabled answer
    /// with the user only, which maps to [`SignUpOutcome::ConfirmationRequired`].
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        validate_credentials(email, password)?;
        let payload = self
            .post("/signup", None, &json!({ "email": email, "password": password }))
            .await?;

        match payload.into_session()? {
            Some(session) => {
                self.store.save_session(&session)?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }
        let payload = self
            .token(Grant::RefreshToken, &json!({ "refresh_token": refresh_token }))
            .await?;
        self.keep(payload, "Refresh")
    }

    /// Revoke `access_token` and forget the stored session. A token the
    /// backend no longer knows (401) still counts as signed out.
    pub async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        let response = self
            .http
            .post(self.endpoint("/logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        self.store.clear_session()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn token(&self, grant: Grant, body: &serde_json::Value) -> AuthResult<TokenPayload> {
        self.post("/token", Some(grant), body).await
    }

    async fn post(
        &self,
        path: &str,
        grant: Option<Grant>,
        body: &serde_json::Value,
    ) -> AuthResult<TokenPayload> {
        let mut request = self
            .http
            .post(self.endpoint(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(body);
        if let Some(grant) = grant {
            request = request.query(&[("grant_type", grant.as_str())]);
        }

        tracing::debug!("POST {}{}", AUTH_PATH, path);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(response.json::<TokenPayload>().await?)
    }

    /// Persist the session a token grant must carry.
    fn keep(&self, payload: TokenPayload, what: &str) -> AuthResult<AuthSession> {
        let session = payload
            .into_session()?
            .ok_or_else(|| AuthError::Api(format!("{what} response carried no session")))?;
        self.store.save_session(&session)?;
        Ok(session)
    }
}

#[async_trait]
impl<S: SessionPersistence> AuthBackend for SupabaseAuthClient<S> {
    async fn get_session(&self) -> AuthResult<Option<AuthSession>> {
        self.restore_session().await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.sign_in(email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        Self::sign_up(self, email, password).await
    }

    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()> {
        Self::sign_out(self, &session.access_token).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        Self::refresh_session(self, refresh_token).await
    }
}

/// `{url}` → `{url}/auth/v1`, keeping an auth path that is already there.
pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let base = url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !is_http_url(base) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    Ok(if base.ends_with(AUTH_PATH) {
        base.to_string()
    } else {
        format!("{base}{AUTH_PATH}")
    })
}

/// Session fields as GoTrue returns them: at the top level for token
/// grants, nested under `session` for some sign-up responses.
#[derive(Debug, Default, Deserialize)]
struct SessionFields {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<GoTrueUser>,
}

impl SessionFields {
    fn or(self, fallback: Self) -> Self {
        Self {
            access_token: self.access_token.or(fallback.access_token),
            refresh_token: self.refresh_token.or(fallback.refresh_token),
            expires_at: self.expires_at.or(fallback.expires_at),
            expires_in: self.expires_in.or(fallback.expires_in),
            user: self.user.or(fallback.user),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(flatten)]
    top: SessionFields,
    #[serde(default)]
    session: Option<SessionFields>,
}

impl TokenPayload {
    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let fields = self.top.or(self.session.unwrap_or_default());
        let expires_at = fields.expires_at.or_else(|| {
            fields
                .expires_in
                .map(|seconds| unix_timestamp_now().saturating_add(seconds))
        });

        match (fields.access_token, fields.refresh_token, expires_at, fields.user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user: user.into(),
                }))
            }
            // User without tokens: the account awaits email confirmation.
            (None, None, None, Some(_)) => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response is missing session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(user: GoTrueUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

/// Error bodies use any of these keys depending on the endpoint.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

/// The backend's own message from an error body, suffixed with the status.
pub(crate) fn parse_api_error(status: StatusCode, body: &str) -> String {
    let code = status.as_u16();
    let message = serde_json::from_str::<ErrorBody>(body).ok().and_then(|parsed| {
        parsed
            .message
            .or(parsed.msg)
            .or(parsed.error_description)
            .or(parsed.error)
    });

    match message {
        Some(message) => format!("{} ({code})", message.trim()),
        None if body.trim().is_empty() => format!("HTTP {code}"),
        None => format!("{} ({code})", body.trim()),
    }
}
