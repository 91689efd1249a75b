//! Calendar API resources and per-call inputs.
//!
//! Resource types name the fields this crate reads and keep everything else
//! in `extra`, so a decoded response serializes back with every field Google
//! sent. Event string fields are `Option<Option<_>>`: the outer `None` is an
//! absent field, `Some(None)` an explicit `null`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{CalendarError, CalendarResult};

/// Calendar used when no calendar id is given.
pub const PRIMARY_CALENDAR: &str = "primary";

/// Response from the calendarList endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarList {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A calendar from the calendar list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The calendar ID.
    pub id: String,
    /// The calendar summary (name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Whether this is the primary calendar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<bool>,
    /// The calendar timezone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CalendarListEntry {
    /// True for the user's primary calendar.
    pub fn is_primary(&self) -> bool {
        self.primary.unwrap_or(false)
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A calendar event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub status: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub html_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub color_id: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    pub fn status(&self) -> Option<&str> {
        text(&self.status)
    }

    pub fn summary(&self) -> Option<&str> {
        text(&self.summary)
    }

    pub fn description(&self) -> Option<&str> {
        text(&self.description)
    }

    pub fn color_id(&self) -> Option<&str> {
        text(&self.color_id)
    }
}

/// Start or end of an event. Timed events use `date_time`, all-day events
/// use `date`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventDateTime {
    pub fn date_time(&self) -> Option<&str> {
        text(&self.date_time)
    }

    pub fn date(&self) -> Option<&str> {
        text(&self.date)
    }

    pub fn time_zone(&self) -> Option<&str> {
        text(&self.time_zone)
    }
}

/// Reads a present field, keeping `null` as `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn text(field: &Option<Option<String>>) -> Option<&str> {
    field.as_ref().and_then(Option::as_deref)
}

/// Input for [`CalendarClient::create_event`](crate::CalendarClient::create_event).
///
/// Dates are `YYYY-MM-DD` or `DD-MM-YYYY`; the time of day and time zone
/// come from the session's event defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewEvent {
    /// Target calendar, `primary` when empty or absent.
    #[serde(default)]
    pub calendar_id: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
}

impl NewEvent {
    pub fn new(
        summary: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            calendar_id: None,
            summary: summary.into(),
            description: None,
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    /// A booking hold, summarized as `Booked, ref: <reference>`.
    pub fn booking(
        reference: &str,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self::new(format!("Booked, ref: {reference}"), start_date, end_date)
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }
}

/// Input for [`CalendarClient::update_event`](crate::CalendarClient::update_event).
/// Only the start and end dates are revised.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    #[serde(default)]
    pub calendar_id: Option<String>,
    pub event_id: String,
    pub start_date: String,
    pub end_date: String,
}

impl EventUpdate {
    pub fn new(
        event_id: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            calendar_id: None,
            event_id: event_id.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    #[must_use]
    pub fn with_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }
}

/// Identifies one event, for [`CalendarClient::delete_event`](crate::CalendarClient::delete_event).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventRef {
    #[serde(default)]
    pub calendar_id: Option<String>,
    pub event_id: String,
}

impl EventRef {
    pub fn new(calendar_id: Option<String>, event_id: impl Into<String>) -> Self {
        Self {
            calendar_id,
            event_id: event_id.into(),
        }
    }
}

/// Resolves an optional calendar id, falling back to `primary`.
pub fn calendar_or_primary(calendar_id: Option<&str>) -> &str {
    match calendar_id.map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => PRIMARY_CALENDAR,
    }
}

/// Fails with a validation error when `event_id` is blank.
pub(crate) fn require_event_id(event_id: &str) -> CalendarResult<&str> {
    let event_id = event_id.trim();
    if event_id.is_empty() {
        return Err(CalendarError::validation("no event id specified"));
    }
    Ok(event_id)
}
