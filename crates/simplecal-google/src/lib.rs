//! Google OAuth 2.0 token lifecycle and Calendar v3 client.
//!
//! [`CalendarClient`] wraps the five calendar operations plus the calendar
//! list. [`TokenManager`] builds the consent URL and exchanges codes and
//! refresh tokens. Both share one [`Session`] holding the current tokens.
//!
//! ```ignore
//! use simplecal_google::{CalendarClient, NewEvent, OAuthCredentials, SessionConfig};
//!
//! let config = SessionConfig::new(OAuthCredentials::from_file("credentials.json")?)
//!     .with_tokens(Some(access_token), Some(refresh_token));
//! let client = CalendarClient::connect(config).await?;
//! let event = client
//!     .create_event(&NewEvent::booking("GX-1042", "2024-01-10", "2024-01-11"))
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod oauth;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::CalendarClient;
pub use config::{Endpoints, OAuthCredentials, SessionConfig};
pub use error::{CalendarError, CalendarResult, ErrorCode};
pub use oauth::{SessionStatus, TokenManager, TokenResponse};
pub use session::Session;
pub use transport::{
    BoxFuture, Diagnostics, HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
    RequestBody,
};
pub use types::{
    CalendarList, CalendarListEntry, Event, EventDateTime, EventList, EventRef, EventUpdate,
    NewEvent, PRIMARY_CALENDAR, calendar_or_primary,
};
