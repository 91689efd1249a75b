//! HTTP transport.
//!
//! [`HttpTransport`] is the seam between the OAuth/Calendar logic and the
//! network. [`ReqwestTransport`] is the real implementation; tests plug in a
//! stub that records requests and replays canned responses.
//!
//! A transport only fails on transport problems. Any HTTP status, including
//! 4xx and 5xx, comes back as an [`HttpResponse`] for the caller to classify.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{CalendarError, CalendarResult};

/// A boxed future, keeps [`HttpTransport`] object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Connect timeout for the default transport.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP methods used by the Calendar and OAuth endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body encoding.
#[derive(Clone, PartialEq)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// `application/json`.
    Json(Value),
}

impl RequestBody {
    /// Returns the JSON body, if this is one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Looks up a form field by name.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match self {
            Self::Form(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

// Form bodies carry client secrets and refresh tokens.
impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Form(pairs) => {
                let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
                f.debug_tuple("Form").field(&keys).finish()
            }
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

/// An outgoing request.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Appended to the URL as a query string.
    pub query: Vec<(String, String)>,
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer: Option<String>,
    pub body: RequestBody,
}

impl HttpRequest {
    /// Creates a request with no query, credentials, or body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            bearer: None,
            body: RequestBody::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    /// Attaches a bearer token.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a form-encoded body.
    #[must_use]
    pub fn with_form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("body", &self.body)
            .finish()
    }
}

/// What was sent and how it went, for debug logging.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub elapsed: Duration,
    /// Request headers as sent, with the bearer token redacted.
    pub sent_headers: Vec<(String, String)>,
}

/// A completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub diagnostics: Diagnostics,
}

impl HttpResponse {
    /// Creates a response with empty headers and diagnostics.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            diagnostics: Diagnostics {
                status,
                ..Diagnostics::default()
            },
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Looks up a response header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Fails with a provider error for error statuses, or for a 2xx body
    /// that carries a Calendar API `error` object.
    pub fn error_for_status(&self) -> CalendarResult<()> {
        if !self.is_success() || self.has_embedded_error() {
            return Err(CalendarError::from_response(self.status, &self.body));
        }
        Ok(())
    }

    /// Checks the status, then decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> CalendarResult<T> {
        self.error_for_status()?;
        serde_json::from_str(&self.body).map_err(|e| {
            CalendarError::invalid_response(format!("failed to parse response: {e}"))
                .with_source(e)
        })
    }

    fn has_embedded_error(&self) -> bool {
        // Cheap pre-check before parsing successful bodies.
        if !self.body.contains("\"error\"") {
            return false;
        }
        serde_json::from_str::<Value>(&self.body)
            .ok()
            .is_some_and(|v| v.get("error").is_some_and(Value::is_object))
    }

    /// Logs the exchange at debug level. `verbose` adds headers.
    pub(crate) fn log(&self, verbose: bool) {
        let d = &self.diagnostics;
        debug!(
            method = %d.method,
            url = %d.url,
            status = self.status,
            elapsed_ms = d.elapsed.as_millis() as u64,
            "http exchange"
        );
        if verbose {
            debug!(sent = ?d.sent_headers, received = ?self.headers, "http headers");
        }
    }
}

/// Sends HTTP requests.
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns a [`ErrorCode::Network`](crate::ErrorCode::Network) error when
    /// the exchange itself fails.
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, CalendarResult<HttpResponse>>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    user_agent: String,
}

impl ReqwestTransport {
    /// Creates a transport with the given request timeout and user agent.
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> CalendarResult<Self> {
        let user_agent = user_agent.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(user_agent.clone())
            .build()
            .map_err(|e| {
                CalendarError::configuration(format!("failed to create HTTP client: {e}"))
                    .with_source(e)
            })?;

        Ok(Self { client, user_agent })
    }

    async fn execute(&self, request: HttpRequest) -> CalendarResult<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut sent_headers = vec![("User-Agent".to_string(), self.user_agent.clone())];
        let mut builder = self.client.request(method, &request.url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(ref token) = request.bearer {
            builder = builder.bearer_auth(token);
            sent_headers.push(("Authorization".to_string(), "Bearer <redacted>".to_string()));
        }

        match request.body {
            RequestBody::Empty => {}
            RequestBody::Form(ref pairs) => {
                builder = builder.form(pairs);
                sent_headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
            }
            RequestBody::Json(ref value) => {
                let bytes = serde_json::to_vec(value).map_err(|e| {
                    CalendarError::validation(format!("failed to encode request body: {e}"))
                })?;
                sent_headers.push(("Content-Type".to_string(), "application/json".to_string()));
                sent_headers.push(("Content-Length".to_string(), bytes.len().to_string()));
                builder = builder
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes);
            }
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {e}")
            } else {
                format!("request failed: {e}")
            };
            CalendarError::network(message).with_source(e)
        })?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.text().await.map_err(|e| {
            CalendarError::network(format!("failed to read response: {e}")).with_source(e)
        })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
            diagnostics: Diagnostics {
                method: request.method.to_string(),
                url,
                status,
                elapsed: started.elapsed(),
                sent_headers,
            },
        })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, CalendarResult<HttpResponse>> {
        Box::pin(self.execute(request))
    }
}
