//! Error types for OAuth and Calendar API operations.
//!
//! Every failure is a [`CalendarError`] tagged with an [`ErrorCode`]. Errors
//! reported by Google keep the HTTP status and the decoded JSON payload
//! verbatim so callers can inspect exactly what the API said.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// The category of a [`CalendarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Input rejected locally; no request was sent.
    Validation,
    /// No usable credentials in the session (missing access or refresh token).
    Authentication,
    /// Google answered 401: the access token is expired or invalid.
    Unauthorized,
    /// Google answered 403.
    Forbidden,
    /// Google answered 404.
    NotFound,
    /// Google answered 400 (including OAuth `invalid_grant`).
    BadRequest,
    /// Google answered 429.
    RateLimited,
    /// Google answered 5xx.
    Server,
    /// Any other error status, or an error object inside a 2xx body.
    Provider,
    /// Connection, DNS, TLS, timeout, or body read failure.
    Network,
    /// The body was not the JSON we expected.
    InvalidResponse,
    /// Invalid configuration or credentials file.
    Configuration,
}

impl ErrorCode {
    /// Maps an HTTP error status to a code.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Provider,
        }
    }

    /// Returns true for errors reported by the remote API.
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized
                | Self::Forbidden
                | Self::NotFound
                | Self::BadRequest
                | Self::RateLimited
                | Self::Server
                | Self::Provider
        )
    }

    /// Returns a stable snake_case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::RateLimited => "rate_limited",
            Self::Server => "server_error",
            Self::Provider => "provider_error",
            Self::Network => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::Configuration => "configuration_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from the token lifecycle or a calendar operation.
#[derive(Debug, Error)]
pub struct CalendarError {
    code: ErrorCode,
    message: String,
    /// HTTP status, when the error came from a response.
    status: Option<u16>,
    /// Decoded error body, when the response carried JSON.
    payload: Option<Value>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CalendarError {
    /// Creates an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            payload: None,
            source: None,
        }
    }

    /// Creates a local validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Authentication, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Configuration, message)
    }

    /// Builds a provider error from an HTTP status and raw body.
    ///
    /// The body is kept as decoded JSON when it parses. A 2xx status whose
    /// body holds an `error` object is classified by the embedded code.
    pub fn from_response(status: u16, body: &str) -> Self {
        let payload: Option<Value> = serde_json::from_str(body).ok();

        let code = if (200..300).contains(&status) {
            payload
                .as_ref()
                .and_then(embedded_error_code)
                .map_or(ErrorCode::Provider, ErrorCode::from_status)
        } else {
            ErrorCode::from_status(status)
        };

        let detail = payload
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| truncate(body, 200));

        Self {
            code,
            message: format!("HTTP {status}: {detail}"),
            status: Some(status),
            payload,
            source: None,
        }
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the decoded error payload, if any.
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// True when Google rejected the access token, either with a 401 status
    /// or with `error.code == 401` in the body.
    pub fn is_unauthorized(&self) -> bool {
        self.code == ErrorCode::Unauthorized
            || self.payload.as_ref().and_then(embedded_error_code) == Some(401)
    }

    /// True when the error was raised locally before any request.
    pub fn is_validation(&self) -> bool {
        self.code == ErrorCode::Validation
    }
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for calendar operations.
pub type CalendarResult<T> = Result<T, CalendarError>;

/// Reads `error.code` from a Calendar API error body. Accepts a number or a
/// numeric string.
pub(crate) fn embedded_error_code(payload: &Value) -> Option<u16> {
    let code = payload.get("error")?.get("code")?;
    match code {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extracts a human message from either error shape Google uses:
/// `{"error": {"message": ..}}` (Calendar API) or
/// `{"error": "invalid_grant", "error_description": ..}` (OAuth endpoints).
fn error_message(payload: &Value) -> Option<String> {
    let error = payload.get("error")?;
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    let kind = error.as_str()?;
    match payload.get("error_description").and_then(Value::as_str) {
        Some(description) => Some(format!("{kind}: {description}")),
        None => Some(kind.to_string()),
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut out: String = body.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
