//! Session configuration.
//!
//! [`SessionConfig`] is everything needed to start one authenticated
//! session: OAuth client credentials, the redirect/scope settings used to
//! build the consent URL, any tokens from a previous authorization, and a
//! few client knobs (timeout, endpoints, event defaults).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simplecal_core::EventDefaults;
use tracing::warn;

use crate::error::{CalendarError, CalendarResult};

/// OAuth 2.0 client credentials from the Google Cloud Console.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Layout of the credentials JSON downloaded from the Cloud Console.
///
/// Either an `installed`/`web` section, or `client_id`/`client_secret` at
/// the root (gcloud style).
#[derive(Debug, Deserialize)]
struct CredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl OAuthCredentials {
    /// Creates new credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads credentials from a Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> CalendarResult<Self> {
        Self::from_file_with_redirect(path).map(|(creds, _)| creds)
    }

    /// Loads credentials and the first registered redirect URI, if any.
    pub fn from_file_with_redirect(
        path: impl AsRef<Path>,
    ) -> CalendarResult<(Self, Option<String>)> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalendarError::configuration(format!(
                "failed to read credentials file {}: {e}",
                path.display()
            ))
            .with_source(e)
        })?;
        Self::parse(&content)
    }

    /// Parses credentials from the Cloud Console JSON format.
    pub fn from_json(json: &str) -> CalendarResult<Self> {
        Self::parse(json).map(|(creds, _)| creds)
    }

    fn parse(json: &str) -> CalendarResult<(Self, Option<String>)> {
        let file: CredentialsFile = serde_json::from_str(json).map_err(|e| {
            CalendarError::configuration(format!("failed to parse credentials JSON: {e}"))
        })?;

        if let Some(nested) = file.installed.or(file.web) {
            let redirect = nested.redirect_uris.into_iter().next();
            return Ok((Self::new(nested.client_id, nested.client_secret), redirect));
        }

        match (file.client_id, file.client_secret) {
            (Some(id), Some(secret)) => Ok((Self::new(id, secret), None)),
            _ => Err(CalendarError::configuration(
                "credentials file must contain an 'installed'/'web' section or root-level 'client_id'/'client_secret'",
            )),
        }
    }

    /// Checks both credentials are present.
    ///
    /// A client id without the Google suffix is only warned about, since
    /// proxies and mock token endpoints issue their own ids.
    pub fn validate(&self) -> CalendarResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(CalendarError::configuration("client_id is required"));
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            warn!(
                client_id = %self.client_id,
                "client_id does not end with .apps.googleusercontent.com"
            );
        }
        if self.client_secret.trim().is_empty() {
            return Err(CalendarError::configuration("client_secret is required"));
        }
        Ok(())
    }
}

/// Google endpoint URLs. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// OAuth consent page.
    pub auth_url: String,
    /// OAuth token endpoint (code exchange and refresh).
    pub token_url: String,
    /// OAuth revocation endpoint.
    pub revoke_url: String,
    /// Calendar API v3 base, without a trailing slash.
    pub api_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            revoke_url: "https://oauth2.googleapis.com/revoke".to_string(),
            api_base: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

impl Endpoints {
    /// Places every endpoint under one base URL (mock servers).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{base}/o/oauth2/auth"),
            token_url: format!("{base}/token"),
            revoke_url: format!("{base}/revoke"),
            api_base: format!("{base}/calendar/v3"),
        }
    }

    /// `users/me/calendarList`.
    pub fn calendar_list_url(&self) -> String {
        format!("{}/users/me/calendarList", self.api_base)
    }

    /// `calendars/{calendar_id}/events`.
    pub fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }

    /// `calendars/{calendar_id}/events/{event_id}`.
    pub fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }
}

/// Configuration for one authenticated session.
///
/// Deserializes from the same keys the consent flow uses (`client_id`,
/// `client_secret`, `redirect_uri`, `scope`, `access_type`, `response_type`,
/// `access_token`, `refresh_token`), in JSON or TOML.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Space separated OAuth scopes.
    pub scope: String,
    /// `offline` returns a refresh token on first consent.
    pub access_type: String,
    pub response_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Last authorization code exchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Log request and response headers for every exchange.
    pub debug: bool,
    pub endpoints: Endpoints,
    pub event_defaults: EventDefaults,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            scope: Self::DEFAULT_SCOPE.to_string(),
            access_type: "offline".to_string(),
            response_type: "code".to_string(),
            access_token: None,
            refresh_token: None,
            code: None,
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            user_agent: format!("simplecal/{}", env!("CARGO_PKG_VERSION")),
            debug: false,
            endpoints: Endpoints::default(),
            event_defaults: EventDefaults::default(),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SessionConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("access_type", &self.access_type)
            .field("response_type", &self.response_type)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("code", &redact(&self.code))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("debug", &self.debug)
            .field("endpoints", &self.endpoints)
            .field("event_defaults", &self.event_defaults)
            .finish()
    }
}

impl SessionConfig {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read/write calendar access, needed to create and change events.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a configuration for the given client credentials.
    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> CalendarResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            CalendarError::configuration(format!("failed to parse session config: {e}"))
        })
    }

    /// Returns the client credentials.
    pub fn credentials(&self) -> OAuthCredentials {
        OAuthCredentials::new(&self.client_id, &self.client_secret)
    }

    /// Returns the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_access_type(mut self, access_type: impl Into<String>) -> Self {
        self.access_type = access_type.into();
        self
    }

    #[must_use]
    pub fn with_response_type(mut self, response_type: impl Into<String>) -> Self {
        self.response_type = response_type.into();
        self
    }

    /// Seeds the session with tokens from a previous authorization.
    #[must_use]
    pub fn with_tokens(
        mut self,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        self.access_token = access_token;
        self.refresh_token = refresh_token;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    #[must_use]
    pub fn with_event_defaults(mut self, defaults: EventDefaults) -> Self {
        self.event_defaults = defaults;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CalendarResult<()> {
        self.credentials().validate()?;

        if self.scope.trim().is_empty() {
            return Err(CalendarError::configuration("at least one OAuth scope is required"));
        }
        if self.timeout_secs == 0 {
            return Err(CalendarError::configuration("timeout must be at least one second"));
        }
        if !self.redirect_uri.is_empty() {
            url::Url::parse(&self.redirect_uri).map_err(|e| {
                CalendarError::configuration(format!("invalid redirect_uri: {e}"))
            })?;
        }
        self.event_defaults
            .tz()
            .map_err(|e| CalendarError::configuration(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_credentials() -> OAuthCredentials {
        OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    #[test]
    fn credentials_validation() {
        assert!(test_credentials().validate().is_ok());
        assert!(OAuthCredentials::new("", "secret").validate().is_err());
        assert!(OAuthCredentials::new("mock-client", "secret").validate().is_ok());
        assert!(
            OAuthCredentials::new("id.apps.googleusercontent.com", " ")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let debug = format!("{:?}", test_credentials());
        assert!(!debug.contains("test-secret"));
    }

    #[test]
    fn credentials_from_json_installed() {
        let json = r#"{
            "installed": {
                "client_id": "test-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "project_id": "my-project",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let (creds, redirect) = OAuthCredentials::parse(json).unwrap();
        assert_eq!(creds.client_id, "test-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
        assert_eq!(redirect.as_deref(), Some("http://localhost"));
    }

    #[test]
    fn credentials_from_json_web() {
        let json = r#"{"web": {"client_id": "web.apps.googleusercontent.com", "client_secret": "s"}}"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web.apps.googleusercontent.com");
    }

    #[test]
    fn credentials_from_json_flat() {
        let json = r#"{"client_id": "flat.apps.googleusercontent.com", "client_secret": "flat", "refresh_token": "x"}"#;
        let creds = OAuthCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_secret, "flat");
    }

    #[test]
    fn credentials_from_json_invalid() {
        let err = OAuthCredentials::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert!(err.message().contains("client_id"));

        let err = OAuthCredentials::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn credentials_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"installed": {{"client_id": "file.apps.googleusercontent.com", "client_secret": "file-secret"}}}}"#
        )
        .unwrap();

        let creds = OAuthCredentials::from_file(file.path()).unwrap();
        assert_eq!(creds.client_id, "file.apps.googleusercontent.com");

        let missing = OAuthCredentials::from_file("/nonexistent/credentials.json");
        assert!(missing.is_err());
    }

    #[test]
    fn endpoint_urls() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.calendar_list_url(),
            "https://www.googleapis.com/calendar/v3/users/me/calendarList"
        );
        assert_eq!(
            endpoints.events_url("primary"),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events"
        );
        assert_eq!(
            endpoints.event_url("team@group.calendar.google.com", "evt 1"),
            "https://www.googleapis.com/calendar/v3/calendars/team%40group.calendar.google.com/events/evt%201"
        );
    }

    #[test]
    fn endpoints_with_base() {
        let endpoints = Endpoints::with_base("http://127.0.0.1:9999/");
        assert_eq!(endpoints.token_url, "http://127.0.0.1:9999/token");
        assert_eq!(endpoints.api_base, "http://127.0.0.1:9999/calendar/v3");
    }

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::new(test_credentials());
        assert_eq!(config.access_type, "offline");
        assert_eq!(config.response_type, "code");
        assert_eq!(config.scope, SessionConfig::DEFAULT_SCOPE);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.access_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn session_config_from_json_mapping() {
        let json = r#"{
            "client_id": "json.apps.googleusercontent.com",
            "client_secret": "json-secret",
            "redirect_uri": "http://localhost:8080/callback",
            "scope": "https://www.googleapis.com/auth/calendar",
            "access_type": "offline",
            "response_type": "code",
            "access_token": "ya29.current",
            "refresh_token": "1//refresh"
        }"#;

        let config = SessionConfig::from_json(json).unwrap();
        assert_eq!(config.redirect_uri, "http://localhost:8080/callback");
        assert_eq!(config.access_token.as_deref(), Some("ya29.current"));
        assert_eq!(config.refresh_token.as_deref(), Some("1//refresh"));
        assert_eq!(config.event_defaults.time_zone, "GMT");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn session_config_validation() {
        let empty_scope = SessionConfig::new(test_credentials()).with_scope("  ");
        assert!(empty_scope.validate().is_err());

        let bad_redirect = SessionConfig::new(test_credentials()).with_redirect_uri("not a url");
        assert!(bad_redirect.validate().is_err());

        let bad_tz = SessionConfig::new(test_credentials())
            .with_event_defaults(EventDefaults::default().with_time_zone("Nowhere/Special"));
        assert!(bad_tz.validate().is_err());
    }

    #[test]
    fn session_config_debug_hides_tokens() {
        let config = SessionConfig::new(test_credentials())
            .with_tokens(Some("ya29.secret".to_string()), Some("1//refresh".to_string()));
        let debug = format!("{config:?}");
        assert!(!debug.contains("ya29.secret"));
        assert!(!debug.contains("1//refresh"));
        assert!(!debug.contains("test-secret"));
    }
}
