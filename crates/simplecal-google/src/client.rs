//! Google Calendar API client.
//!
//! Each operation is one authenticated request against the Calendar v3 REST
//! API. Calendar ids default to `primary`. Operations that need an event id
//! or dates check them locally and fail before sending anything.

use std::sync::Arc;

use serde_json::{Value, json};
use simplecal_core::{EventDefaults, format_event_datetime, parse_event_date};
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{CalendarError, CalendarResult};
use crate::oauth::{SessionStatus, TokenManager};
use crate::session::Session;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{
    CalendarList, Event, EventList, EventRef, EventUpdate, NewEvent, calendar_or_primary,
    require_event_id,
};

/// Google Calendar API client.
#[derive(Clone)]
pub struct CalendarClient {
    session: Arc<Session>,
    transport: Arc<dyn HttpTransport>,
    tokens: TokenManager,
}

impl std::fmt::Debug for CalendarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarClient")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl CalendarClient {
    /// Creates a client using the default `reqwest` transport.
    ///
    /// No request is made; see [`connect`](Self::connect) to also validate
    /// the access token.
    pub fn new(config: SessionConfig) -> CalendarResult<Self> {
        let transport = ReqwestTransport::new(config.timeout(), config.user_agent.clone())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(
        config: SessionConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> CalendarResult<Self> {
        config.validate()?;
        let session = Arc::new(Session::new(config));
        let tokens = TokenManager::new(Arc::clone(&session), Arc::clone(&transport));
        Ok(Self {
            session,
            transport,
            tokens,
        })
    }

    /// Creates a client and validates the session once, refreshing the
    /// access token if Google rejects it.
    pub async fn connect(config: SessionConfig) -> CalendarResult<Self> {
        let client = Self::new(config)?;
        client.validate().await?;
        Ok(client)
    }

    /// Like [`connect`](Self::connect) over a custom transport.
    pub async fn connect_with_transport(
        config: SessionConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> CalendarResult<Self> {
        let client = Self::with_transport(config, transport)?;
        client.validate().await?;
        Ok(client)
    }

    async fn validate(&self) -> CalendarResult<()> {
        let status = self.tokens.validate_session().await?;
        debug!(?status, "session validated");
        Ok(())
    }

    /// Returns the token manager sharing this client's session.
    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// Returns the shared session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Lists the calendars of the authenticated user.
    pub async fn list_calendars(&self) -> CalendarResult<CalendarList> {
        let url = self.session.with_config(|c| c.endpoints.calendar_list_url());
        let list: CalendarList = self.send_authorized(HttpRequest::get(url)).await?.json()?;
        debug!("fetched {} calendars", list.items.len());
        Ok(list)
    }

    /// Lists the events of a calendar (`primary` when `None` or empty).
    pub async fn list_events(&self, calendar_id: Option<&str>) -> CalendarResult<EventList> {
        let calendar_id = calendar_or_primary(calendar_id);
        let url = self.session.with_config(|c| c.endpoints.events_url(calendar_id));
        let list: EventList = self.send_authorized(HttpRequest::get(url)).await?.json()?;
        debug!("fetched {} events from calendar {}", list.items.len(), calendar_id);
        Ok(list)
    }

    /// Fetches one event.
    pub async fn get_event(
        &self,
        calendar_id: Option<&str>,
        event_id: &str,
    ) -> CalendarResult<Event> {
        let event_id = require_event_id(event_id)?;
        let calendar_id = calendar_or_primary(calendar_id);
        let url = self
            .session
            .with_config(|c| c.endpoints.event_url(calendar_id, event_id));
        self.send_authorized(HttpRequest::get(url)).await?.json()
    }

    /// Creates an event and returns the resource Google stored.
    ///
    /// The request carries the session's default status, color and time
    /// zone. Start and end use the default start and end times of day.
    pub async fn create_event(&self, event: &NewEvent) -> CalendarResult<Event> {
        let defaults = self.session.with_config(|c| c.event_defaults.clone());
        let body = create_body(event, &defaults)?;
        let calendar_id = calendar_or_primary(event.calendar_id.as_deref());
        let url = self.session.with_config(|c| c.endpoints.events_url(calendar_id));

        let created: Event = self
            .send_authorized(HttpRequest::post(url).with_json(body))
            .await?
            .json()?;
        debug!(event_id = ?created.id, calendar_id, "created event");
        Ok(created)
    }

    /// Moves an event to new dates.
    ///
    /// Only start and end `dateTime` are sent; every other field of the
    /// event is replaced by what Google keeps for a PUT.
    pub async fn update_event(&self, update: &EventUpdate) -> CalendarResult<Event> {
        let event_id = require_event_id(&update.event_id)?;
        let defaults = self.session.with_config(|c| c.event_defaults.clone());
        let body = update_body(update, &defaults)?;
        let calendar_id = calendar_or_primary(update.calendar_id.as_deref());
        let url = self
            .session
            .with_config(|c| c.endpoints.event_url(calendar_id, event_id));

        let updated: Event = self
            .send_authorized(HttpRequest::put(url).with_json(body))
            .await?
            .json()?;
        debug!(event_id, calendar_id, "updated event");
        Ok(updated)
    }

    /// Deletes an event.
    pub async fn delete_event(&self, event: &EventRef) -> CalendarResult<()> {
        let event_id = require_event_id(&event.event_id)?;
        let calendar_id = calendar_or_primary(event.calendar_id.as_deref());
        let url = self
            .session
            .with_config(|c| c.endpoints.event_url(calendar_id, event_id));

        self.send_authorized(HttpRequest::delete(url))
            .await?
            .error_for_status()?;
        debug!(event_id, calendar_id, "deleted event");
        Ok(())
    }

    /// Runs the one-shot session check again.
    pub async fn revalidate(&self) -> CalendarResult<SessionStatus> {
        self.tokens.validate_session().await
    }

    async fn send_authorized(&self, request: HttpRequest) -> CalendarResult<HttpResponse> {
        let token = self.session.require_access_token()?;
        let verbose = self.session.with_config(|c| c.debug);
        let response = self.transport.send(request.with_bearer(token)).await?;
        response.log(verbose);
        Ok(response)
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Start,
    End,
}

/// Resolves a date string to the default start or end time of that day.
fn event_datetime(date: &str, defaults: &EventDefaults, edge: Edge) -> CalendarResult<String> {
    let date = parse_event_date(date).map_err(|e| CalendarError::validation(e.to_string()))?;
    let at = match edge {
        Edge::Start => defaults.start_on(date),
        Edge::End => defaults.end_on(date),
    }
    .map_err(|e| CalendarError::validation(e.to_string()))?;
    Ok(format_event_datetime(&at))
}

fn create_body(event: &NewEvent, defaults: &EventDefaults) -> CalendarResult<Value> {
    let start = event_datetime(&event.start_date, defaults, Edge::Start)?;
    let end = event_datetime(&event.end_date, defaults, Edge::End)?;

    let mut body = json!({
        "kind": "calendar#event",
        "status": defaults.status,
        "summary": event.summary,
        "start": {"dateTime": start, "timeZone": defaults.time_zone},
        "end": {"dateTime": end, "timeZone": defaults.time_zone},
        "colorId": defaults.color_id,
    });
    if let Some(ref description) = event.description {
        body["description"] = Value::String(description.clone());
    }
    Ok(body)
}

// PUT with start/end only; no timeZone.
fn update_body(update: &EventUpdate, defaults: &EventDefaults) -> CalendarResult<Value> {
    let start = event_datetime(&update.start_date, defaults, Edge::Start)?;
    let end = event_datetime(&update.end_date, defaults, Edge::End)?;
    Ok(json!({
        "start": {"dateTime": start},
        "end": {"dateTime": end},
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use crate::config::Endpoints;
    use crate::testing::{StubTransport, test_config};
    use crate::transport::HttpMethod;

    fn client(stub: &Arc<StubTransport>) -> CalendarClient {
        CalendarClient::with_transport(test_config(), stub.clone()).unwrap()
    }

    fn created_event() -> Value {
        json!({
            "kind": "calendar#event",
            "id": "evt1",
            "status": "tentative",
            "summary": "Booked, ref: GX-1042",
            "start": {"dateTime": "2024-01-10T12:01:00Z", "timeZone": "GMT"},
            "end": {"dateTime": "2024-01-11T12:00:00Z", "timeZone": "GMT"}
        })
    }

    #[tokio::test]
    async fn missing_calendar_targets_primary() {
        let stub = StubTransport::new();
        for _ in 0..5 {
            stub.push_json(200, created_event());
        }
        stub.push_empty(204);
        let client = client(&stub);

        client.list_events(None).await.unwrap();
        client.list_events(Some("")).await.unwrap();
        client.get_event(None, "evt1").await.unwrap();
        client
            .create_event(&NewEvent::booking("GX-1042", "2024-01-10", "2024-01-11"))
            .await
            .unwrap();
        client
            .update_event(&EventUpdate::new("evt1", "2024-01-12", "2024-01-13"))
            .await
            .unwrap();
        client
            .delete_event(&EventRef::new(Some(String::new()), "evt1"))
            .await
            .unwrap();

        let base = "https://www.googleapis.com/calendar/v3/calendars/primary/events";
        let urls: Vec<String> = stub.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                base.to_string(),
                base.to_string(),
                format!("{base}/evt1"),
                base.to_string(),
                format!("{base}/evt1"),
                format!("{base}/evt1"),
            ]
        );
    }

    #[tokio::test]
    async fn missing_event_id_makes_no_request() {
        let stub = StubTransport::new();
        let client = client(&stub);

        let err = client.get_event(None, "").await.unwrap_err();
        assert!(err.is_validation());

        let err = client
            .update_event(&EventUpdate::new("", "2024-01-10", "2024-01-11"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = client
            .delete_event(&EventRef::new(None, "  "))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);

        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn bad_date_makes_no_request() {
        let stub = StubTransport::new();
        let client = client(&stub);

        let err = client
            .create_event(&NewEvent::new("Hold", "next tuesday", "2024-01-11"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = client
            .create_event(&NewEvent::new("Hold", "10-01-24", "11-01-2024"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = client
            .update_event(&EventUpdate::new("evt1", "2024-01-10", "1-2-3"))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn create_event_body() {
        let stub = StubTransport::new();
        stub.push_json(200, created_event());
        let client = client(&stub);

        let event = NewEvent::booking("GX-1042", "2024-01-10", "2024-01-11")
            .with_description("Custom booking");
        let created = client.create_event(&event).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("evt1"));

        let requests = stub.requests();
        let req = &requests[0];
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.bearer.as_deref(), Some("ya29.stale"));

        let body = req.body.as_json().unwrap();
        assert_eq!(body["start"]["dateTime"], json!("2024-01-10T12:01:00+00:00"));
        assert_eq!(body["end"]["dateTime"], json!("2024-01-11T12:00:00+00:00"));

        insta::with_settings!({sort_maps => true}, {
            insta::assert_json_snapshot!(body, @r###"
            {
              "colorId": "4",
              "description": "Custom booking",
              "end": {
                "dateTime": "2024-01-11T12:00:00+00:00",
                "timeZone": "GMT"
              },
              "kind": "calendar#event",
              "start": {
                "dateTime": "2024-01-10T12:01:00+00:00",
                "timeZone": "GMT"
              },
              "status": "tentative",
              "summary": "Booked, ref: GX-1042"
            }
            "###);
        });
    }

    #[tokio::test]
    async fn create_event_honours_defaults() {
        let stub = StubTransport::new();
        stub.push_json(200, created_event());
        let defaults = EventDefaults::default().with_time_zone("Europe/Paris");
        let config = test_config().with_event_defaults(defaults);
        let client = CalendarClient::with_transport(config, stub.clone()).unwrap();

        client
            .create_event(&NewEvent::new("Hold", "10-07-2024", "11-07-2024").with_calendar_id("team"))
            .await
            .unwrap();

        let req = &stub.requests()[0];
        assert_eq!(
            req.url,
            "https://www.googleapis.com/calendar/v3/calendars/team/events"
        );
        let body = req.body.as_json().unwrap();
        assert_eq!(
            body["start"],
            json!({"dateTime": "2024-07-10T12:01:00+02:00", "timeZone": "Europe/Paris"})
        );
        assert!(body.get("description").is_none());
    }

    #[tokio::test]
    async fn update_event_sends_only_dates() {
        let stub = StubTransport::new();
        stub.push_json(200, created_event());
        let client = client(&stub);

        client
            .update_event(&EventUpdate::new("evt1", "2024-02-01", "2024-02-02").with_calendar_id("team"))
            .await
            .unwrap();

        let req = &stub.requests()[0];
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(
            req.url,
            "https://www.googleapis.com/calendar/v3/calendars/team/events/evt1"
        );
        assert_eq!(
            req.body.as_json().unwrap(),
            &json!({
                "start": {"dateTime": "2024-02-01T12:01:00+00:00"},
                "end": {"dateTime": "2024-02-02T12:00:00+00:00"}
            })
        );
    }

    #[tokio::test]
    async fn responses_keep_every_field() {
        let raw = json!({
            "kind": "calendar#events",
            "etag": "\"p32g\"",
            "summary": "user@example.com",
            "updated": "2024-01-09T08:00:00.000Z",
            "timeZone": "Europe/London",
            "accessRole": "owner",
            "defaultReminders": [{"method": "popup", "minutes": 10}],
            "items": [{
                "kind": "calendar#event",
                "id": "evt1",
                "status": "confirmed",
                "htmlLink": "https://www.google.com/calendar/event?eid=ZXZ0MQ",
                "organizer": {"email": "user@example.com", "self": true},
                "start": {"dateTime": "2024-01-10T12:01:00Z", "timeZone": "GMT"},
                "end": {"dateTime": "2024-01-11T12:00:00Z", "timeZone": "GMT"},
                "attendees": [{"email": "guest@example.com", "responseStatus": "needsAction"}]
            }]
        });
        let stub = StubTransport::new();
        stub.push_json(200, raw.clone());
        let client = client(&stub);

        let list = client.list_events(Some("primary")).await.unwrap();
        assert_eq!(serde_json::to_value(&list).unwrap(), raw);
    }

    #[tokio::test]
    async fn provider_error_is_returned_verbatim() {
        let stub = StubTransport::new();
        let payload = json!({
            "error": {
                "code": 404,
                "message": "Not Found",
                "errors": [{"domain": "global", "reason": "notFound", "message": "Not Found"}]
            }
        });
        stub.push_json(404, payload.clone());
        let client = client(&stub);

        let err = client.get_event(None, "missing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.payload(), Some(&payload));
    }

    #[tokio::test]
    async fn unauthorized_is_not_retried() {
        let stub = StubTransport::new();
        stub.push_json(401, json!({"error": {"code": 401, "message": "Invalid Credentials"}}));
        let client = client(&stub);

        let err = client.list_calendars().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(stub.request_count(), 1);
    }

    #[tokio::test]
    async fn refresh_is_seen_by_later_calls() {
        let stub = StubTransport::new();
        stub.push_json(200, json!({"access_token": "ya29.fresh"}));
        stub.push_json(200, json!({"items": []}));
        let client = client(&stub);

        client.tokens().refresh_access_token().await.unwrap();
        client.list_calendars().await.unwrap();

        let requests = stub.requests();
        assert_eq!(requests[1].bearer.as_deref(), Some("ya29.fresh"));
    }

    #[tokio::test]
    async fn no_access_token_fails_locally() {
        let stub = StubTransport::new();
        let config = test_config().with_tokens(None, Some("1//refresh".to_string()));
        let client = CalendarClient::with_transport(config, stub.clone()).unwrap();

        let err = client.list_calendars().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Authentication);
        assert_eq!(stub.request_count(), 0);
    }

    #[tokio::test]
    async fn connect_refreshes_rejected_token() {
        let stub = StubTransport::new();
        stub.push_json(200, json!({"error": {"code": 401, "message": "Invalid Credentials"}}));
        stub.push_json(200, json!({"access_token": "ya29.fresh", "expires_in": 3599}));

        let client = CalendarClient::connect_with_transport(test_config(), stub.clone())
            .await
            .unwrap();

        assert_eq!(stub.request_count(), 2);
        assert_eq!(client.session().access_token().as_deref(), Some("ya29.fresh"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let stub = StubTransport::new();
        let config = test_config().with_scope("");
        let err = CalendarClient::with_transport(config, stub).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Configuration);
    }

    #[test]
    fn non_google_client_id_is_accepted() {
        let stub = StubTransport::new();
        let mut config = test_config().with_endpoints(Endpoints::with_base("http://127.0.0.1:9"));
        config.client_id = "mock-client".to_string();
        assert!(CalendarClient::with_transport(config, stub).is_ok());
    }
}
