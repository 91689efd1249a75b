//! Shared session state.
//!
//! The token manager and the calendar client both hold the same [`Session`].
//! Token updates made by one are seen by the other on its next request.

use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::config::{OAuthCredentials, SessionConfig};
use crate::error::{CalendarError, CalendarResult};
use crate::oauth::TokenResponse;

/// Mutable session: configuration plus the current tokens.
#[derive(Debug)]
pub struct Session {
    state: RwLock<SessionConfig>,
}

impl Session {
    /// Creates a session from a configuration.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: RwLock::new(config),
        }
    }

    /// Runs `f` with read access to the configuration.
    pub fn with_config<R>(&self, f: impl FnOnce(&SessionConfig) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn update<R>(&self, f: impl FnOnce(&mut SessionConfig) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Returns a copy of the current configuration, tokens included.
    ///
    /// Callers persist this after a refresh so the next run starts with the
    /// fresh access token.
    pub fn snapshot(&self) -> SessionConfig {
        self.with_config(Clone::clone)
    }

    /// Returns the client credentials.
    pub fn credentials(&self) -> OAuthCredentials {
        self.with_config(SessionConfig::credentials)
    }

    /// Returns the current access token. An empty token counts as absent.
    pub fn access_token(&self) -> Option<String> {
        self.with_config(|c| non_empty(c.access_token.as_deref()))
    }

    /// Returns the refresh token. An empty token counts as absent.
    pub fn refresh_token(&self) -> Option<String> {
        self.with_config(|c| non_empty(c.refresh_token.as_deref()))
    }

    /// Returns the access token or an authentication error.
    pub fn require_access_token(&self) -> CalendarResult<String> {
        self.access_token()
            .ok_or_else(|| CalendarError::authentication("no access token in session"))
    }

    /// Replaces the access token.
    pub fn set_access_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.update(|c| c.access_token = Some(token));
    }

    /// Drops the access token.
    pub fn clear_access_token(&self) {
        self.update(|c| c.access_token = None);
    }

    /// Stores tokens from a successful token endpoint call.
    ///
    /// The refresh token is only replaced when the response carries one;
    /// refresh responses usually don't.
    pub fn apply_token_response(&self, response: &TokenResponse, code: Option<&str>) {
        self.update(|c| {
            c.access_token = Some(response.access_token.clone());
            if let Some(ref refresh) = response.refresh_token {
                c.refresh_token = Some(refresh.clone());
            }
            if let Some(code) = code {
                c.code = Some(code.to_string());
            }
        });
        debug!(
            new_refresh_token = response.refresh_token.is_some(),
            expires_in = ?response.expires_in,
            "stored token response"
        );
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let creds = OAuthCredentials::new("id.apps.googleusercontent.com", "secret");
        Session::new(SessionConfig::new(creds))
    }

    #[test]
    fn empty_tokens_are_absent() {
        let session = session();
        assert!(session.access_token().is_none());

        session.set_access_token("");
        assert!(session.access_token().is_none());
        assert_eq!(
            session.require_access_token().unwrap_err().code(),
            crate::ErrorCode::Authentication
        );

        session.set_access_token("ya29.token");
        assert_eq!(session.require_access_token().unwrap(), "ya29.token");
    }

    #[test]
    fn token_response_keeps_refresh_token_when_absent() {
        let session = session();
        let first: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a1","refresh_token":"r1","expires_in":3599,"token_type":"Bearer"}"#,
        )
        .unwrap();
        session.apply_token_response(&first, Some("auth-code"));

        let refreshed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a2","expires_in":3599}"#).unwrap();
        session.apply_token_response(&refreshed, None);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.access_token.as_deref(), Some("a2"));
        assert_eq!(snapshot.refresh_token.as_deref(), Some("r1"));
        assert_eq!(snapshot.code.as_deref(), Some("auth-code"));
    }

    #[test]
    fn clear_access_token() {
        let session = session();
        session.set_access_token("a1");
        session.clear_access_token();
        assert!(session.access_token().is_none());
    }
}
