//! CLI configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/simplecal/config.toml` by default:
//!
//! ```toml
//! [google]
//! client_id = "YOUR_ID.apps.googleusercontent.com"
//! client_secret = "pass::google/simplecal"
//! redirect_uri = "http://localhost:8080/callback"
//! refresh_token = "env::SIMPLECAL_REFRESH"
//!
//! [events]
//! start_time = "12:01:00"
//! end_time = "12:00:00"
//! time_zone = "GMT"
//! ```
//!
//! Credential and token values support secret references:
//! - `pass::path/in/store` resolved via `pass show`
//! - `env::VAR_NAME` resolved from the environment
//! - plain text used as-is

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use simplecal_core::EventDefaults;
use simplecal_google::{Endpoints, OAuthCredentials, SessionConfig};

use crate::error::{CliError, CliResult};

/// Configuration for the simplecal CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Google OAuth and API settings.
    pub google: Option<GoogleSettings>,

    /// Debug mode.
    pub debug: bool,

    /// Time of day, time zone, status and color for new events.
    pub events: EventDefaults,
}

/// Google settings.
///
/// Credentials come from `client_id`/`client_secret`, or from a Cloud
/// Console `credentials_file` when those are absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Path to a Google Cloud Console credentials JSON file.
    pub credentials_file: Option<PathBuf>,

    /// Redirect URI registered for the OAuth client.
    pub redirect_uri: Option<String>,

    /// Space separated OAuth scopes.
    pub scope: Option<String>,

    /// Access token from a previous authorization.
    pub access_token: Option<String>,

    /// Refresh token from a previous authorization.
    pub refresh_token: Option<String>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    /// Endpoint overrides, for proxies and tests.
    pub endpoints: Option<Endpoints>,
}

impl CliConfig {
    /// Loads configuration from `path`, or from the default path when it
    /// exists.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CliError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("simplecal")
            .join("config.toml")
    }

    /// Builds the session configuration, resolving secret references.
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let google = self.google.as_ref().ok_or_else(|| {
            CliError::Config(format!(
                "Google credentials not found. Add to {}:\n  \
                 [google]\n  \
                 client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                 client_secret = \"YOUR_SECRET\"",
                Self::default_path().display()
            ))
        })?;

        let (credentials, file_redirect) = google.resolve_credentials()?;
        let mut config = SessionConfig::new(credentials)
            .with_tokens(
                resolve_field("access_token", google.access_token.as_deref())?,
                resolve_field("refresh_token", google.refresh_token.as_deref())?,
            )
            .with_event_defaults(self.events.clone())
            .with_debug(self.debug);

        if let Some(uri) = google.redirect_uri.clone().or(file_redirect) {
            config = config.with_redirect_uri(uri);
        }
        if let Some(ref scope) = google.scope {
            config = config.with_scope(scope);
        }
        if let Some(secs) = google.timeout {
            config = config.with_timeout(std::time::Duration::from_secs(secs));
        }
        if let Some(ref endpoints) = google.endpoints {
            config = config.with_endpoints(endpoints.clone());
        }

        config.validate()?;
        Ok(config)
    }
}

impl GoogleSettings {
    /// Resolves OAuth credentials from inline fields or the credentials
    /// file, along with the file's first redirect URI.
    pub(crate) fn resolve_credentials(&self) -> CliResult<(OAuthCredentials, Option<String>)> {
        match (&self.client_id, &self.client_secret, &self.credentials_file) {
            (Some(id), Some(secret), _) => {
                let id = resolve_field("client_id", Some(id.as_str()))?.unwrap_or_default();
                let secret =
                    resolve_field("client_secret", Some(secret.as_str()))?.unwrap_or_default();
                Ok((OAuthCredentials::new(id, secret), None))
            }
            (None, None, Some(path)) => Ok(OAuthCredentials::from_file_with_redirect(path)?),
            (Some(_), None, _) => Err(CliError::Config(
                "client_secret is missing from [google] section in config.toml".to_string(),
            )),
            _ => Err(CliError::Config(
                "set client_id and client_secret, or credentials_file, in the [google] section"
                    .to_string(),
            )),
        }
    }
}

/// Where a credential or token setting takes its value from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SecretRef<'a> {
    /// First line of `pass show <entry>`.
    Pass(&'a str),
    /// An environment variable.
    Env(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    fn parse(value: &'a str) -> Self {
        if let Some(entry) = value.strip_prefix("pass::") {
            Self::Pass(entry)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Reads the value for the `[google]` setting `field`.
    fn read(self, field: &str) -> CliResult<String> {
        let fail = |reason: String| CliError::Config(format!("google.{field}: {reason}"));
        match self {
            Self::Plain(value) => Ok(value.to_string()),
            Self::Env(var) => {
                std::env::var(var).map_err(|_| fail(format!("${var} is not set")))
            }
            Self::Pass(entry) => {
                let output = Command::new("pass")
                    .args(["show", entry])
                    .output()
                    .map_err(|e| fail(format!("cannot run pass: {e}")))?;
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(fail(format!(
                        "pass show {entry} exited with {}: {}",
                        output.status,
                        stderr.trim()
                    )));
                }
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| fail(format!("pass entry {entry} is empty")))
            }
        }
    }
}

fn resolve_field(field: &str, value: Option<&str>) -> CliResult<Option<String>> {
    value.map(|v| SecretRef::parse(v).read(field)).transpose()
}
