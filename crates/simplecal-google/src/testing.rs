//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::config::{OAuthCredentials, SessionConfig};
use crate::error::{CalendarError, CalendarResult};
use crate::transport::{BoxFuture, HttpRequest, HttpResponse, HttpTransport};

/// Records every request and replays queued responses in order.
#[derive(Default)]
pub(crate) struct StubTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<CalendarResult<HttpResponse>>>,
}

impl StubTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_json(&self, status: u16, body: Value) {
        self.push(Ok(HttpResponse::new(status, body.to_string())));
    }

    pub(crate) fn push_empty(&self, status: u16) {
        self.push(Ok(HttpResponse::new(status, "")));
    }

    pub(crate) fn push_error(&self, error: CalendarError) {
        self.push(Err(error));
    }

    fn push(&self, response: CalendarResult<HttpResponse>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl HttpTransport for StubTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, CalendarResult<HttpResponse>> {
        let method = request.method.to_string();
        let url = request.url.clone();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(CalendarError::network(format!("no stubbed response for {url}"))))
            .map(|mut response| {
                response.diagnostics.method = method;
                response.diagnostics.url = url;
                response
            });

        Box::pin(std::future::ready(next))
    }
}

/// A valid session holding a stale access token and a refresh token.
pub(crate) fn test_config() -> SessionConfig {
    SessionConfig::new(OAuthCredentials::new(
        "test-client.apps.googleusercontent.com",
        "test-secret",
    ))
    .with_redirect_uri("http://localhost:8080/callback")
    .with_tokens(
        Some("ya29.stale".to_string()),
        Some("1//refresh".to_string()),
    )
}
