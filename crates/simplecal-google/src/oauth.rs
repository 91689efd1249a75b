//! OAuth 2.0 token lifecycle for Google APIs.
//!
//! # Flow Overview
//!
//! 1. [`TokenManager::build_authorization_url`] gives the consent page URL
//! 2. The user grants access; Google redirects with an authorization code
//! 3. [`TokenManager::exchange_code`] trades the code for access and refresh
//!    tokens
//! 4. When the access token expires, [`TokenManager::refresh_access_token`]
//!    trades the refresh token for a new one
//!
//! [`TokenManager::validate_session`] runs once when a client connects: it
//! probes the calendar list and refreshes if Google rejects the token.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CalendarError, CalendarResult};
use crate::session::Session;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Grant type for the initial code exchange.
pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";

/// Grant type for refreshing an access token.
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// Response from Google's token endpoint.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Only present on the first code exchange with `access_type=offline`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Any other fields Google sends.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenResponse {
    /// Returns when the access token expires, given when it was issued.
    ///
    /// `None` when the response has no lifetime or the lifetime is out of
    /// range.
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let lifetime = ChronoDuration::try_seconds(self.expires_in?)?;
        issued_at.checked_add_signed(lifetime)
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`TokenManager::validate_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The access token was accepted as is.
    Valid,
    /// The access token was missing or rejected and has been refreshed.
    Refreshed,
}

/// Builds consent URLs and exchanges codes and refresh tokens.
///
/// Successful exchanges update the shared [`Session`], so a
/// [`CalendarClient`](crate::CalendarClient) on the same session picks up
/// the new access token on its next call.
#[derive(Clone)]
pub struct TokenManager {
    session: Arc<Session>,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Creates a token manager over a session and transport.
    pub fn new(session: Arc<Session>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { session, transport }
    }

    /// Returns the shared session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Builds the Google consent page URL.
    ///
    /// Carries `redirect_uri`, `client_id`, `scope`, `access_type` and
    /// `response_type` from the session, each URL-encoded and present once.
    pub fn build_authorization_url(&self) -> String {
        self.session.with_config(|c| {
            format!(
                "{}?redirect_uri={}&client_id={}&scope={}&access_type={}&response_type={}",
                c.endpoints.auth_url,
                urlencoding::encode(&c.redirect_uri),
                urlencoding::encode(&c.client_id),
                urlencoding::encode(&c.scope),
                urlencoding::encode(&c.access_type),
                urlencoding::encode(&c.response_type),
            )
        })
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// On success the session's access token (and refresh token, when
    /// Google returns one) are replaced and the full response is returned.
    pub async fn exchange_code(&self, code: &str) -> CalendarResult<TokenResponse> {
        self.exchange_code_with_grant(code, GRANT_AUTHORIZATION_CODE)
            .await
    }

    /// Like [`exchange_code`](Self::exchange_code) with an explicit grant type.
    pub async fn exchange_code_with_grant(
        &self,
        code: &str,
        grant_type: &str,
    ) -> CalendarResult<TokenResponse> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CalendarError::validation("no authorization code specified"));
        }

        let (token_url, form) = self.session.with_config(|c| {
            (
                c.endpoints.token_url.clone(),
                vec![
                    ("code", code.to_string()),
                    ("grant_type", grant_type.to_string()),
                    ("redirect_uri", c.redirect_uri.clone()),
                    ("client_id", c.client_id.clone()),
                    ("client_secret", c.client_secret.clone()),
                ],
            )
        });

        let token = self
            .token_request(HttpRequest::post(token_url).with_form(form))
            .await?;
        self.session.apply_token_response(&token, Some(code));

        info!("successfully obtained tokens");
        Ok(token)
    }

    /// Exchanges the session's refresh token for a new access token.
    ///
    /// Fails with an authentication error, before any request, when the
    /// session has no refresh token.
    pub async fn refresh_access_token(&self) -> CalendarResult<String> {
        let refresh_token = self.session.refresh_token().ok_or_else(|| {
            CalendarError::authentication("no refresh token in session, authorize again")
        })?;

        let (token_url, form) = self.session.with_config(|c| {
            (
                c.endpoints.token_url.clone(),
                vec![
                    ("refresh_token", refresh_token),
                    ("grant_type", GRANT_REFRESH_TOKEN.to_string()),
                    ("client_id", c.client_id.clone()),
                    ("client_secret", c.client_secret.clone()),
                ],
            )
        });

        let token = self
            .token_request(HttpRequest::post(token_url).with_form(form))
            .await?;
        self.session.apply_token_response(&token, None);

        info!("successfully refreshed access token");
        Ok(token.access_token)
    }

    /// Revokes the session's access token, or its refresh token when there
    /// is no access token. The access token is cleared afterwards.
    pub async fn revoke_token(&self) -> CalendarResult<()> {
        let token = self
            .session
            .access_token()
            .or_else(|| self.session.refresh_token())
            .ok_or_else(|| CalendarError::authentication("no token in session to revoke"))?;
        let revoke_url = self.session.with_config(|c| c.endpoints.revoke_url.clone());

        let response = self
            .send(HttpRequest::post(revoke_url).with_form([("token", token)]))
            .await?;
        response.error_for_status()?;
        self.session.clear_access_token();

        info!("revoked token");
        Ok(())
    }

    /// Checks the access token with one lightweight calendar list read.
    ///
    /// Refreshes once if the probe is rejected with a 401 status or an
    /// embedded `error.code` of 401. With no access token but a refresh
    /// token, refreshes without probing. Any other probe failure is
    /// returned unchanged.
    ///
    /// This is a one-shot check; later calls may still see a 401.
    pub async fn validate_session(&self) -> CalendarResult<SessionStatus> {
        let Some(access_token) = self.session.access_token() else {
            if self.session.refresh_token().is_none() {
                return Err(CalendarError::authentication(
                    "session has neither an access token nor a refresh token",
                ));
            }
            debug!("no access token in session, refreshing");
            self.refresh_access_token().await?;
            return Ok(SessionStatus::Refreshed);
        };

        let probe_url = self.session.with_config(|c| c.endpoints.calendar_list_url());
        let probe = HttpRequest::get(probe_url)
            .with_query("maxResults", "1")
            .with_bearer(access_token);
        let response = self.send(probe).await?;

        match response.error_for_status() {
            Ok(()) => {
                debug!("access token accepted");
                Ok(SessionStatus::Valid)
            }
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "access token rejected, refreshing");
                self.refresh_access_token().await?;
                Ok(SessionStatus::Refreshed)
            }
            Err(e) => Err(e),
        }
    }

    async fn token_request(&self, request: HttpRequest) -> CalendarResult<TokenResponse> {
        let response = self.send(request).await?;
        let token: TokenResponse = response.json()?;
        if token.access_token.is_empty() {
            return Err(CalendarError::invalid_response(
                "token response has an empty access_token",
            ));
        }
        Ok(token)
    }

    async fn send(&self, request: HttpRequest) -> CalendarResult<HttpResponse> {
        let verbose = self.session.with_config(|c| c.debug);
        let response = self.transport.send(request).await?;
        response.log(verbose);
        Ok(response)
    }
}
