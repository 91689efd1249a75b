//! Event commands.

use serde_json::json;
use simplecal_google::{CalendarClient, EventRef, EventUpdate, NewEvent};

use super::print_json;
use crate::cli::EventAction;
use crate::error::CliResult;

/// Runs an event action and prints its result.
pub async fn run(client: &CalendarClient, action: EventAction) -> CliResult<()> {
    match action {
        EventAction::List { calendar } => {
            let events = client.list_events(calendar.calendar.as_deref()).await?;
            print_json(&events)
        }
        EventAction::Get { event_id, calendar } => {
            let event = client
                .get_event(calendar.calendar.as_deref(), &event_id)
                .await?;
            print_json(&event)
        }
        EventAction::Create {
            start,
            end,
            summary,
            booking_ref,
            description,
            calendar,
        } => {
            let event = new_event(start, end, summary, booking_ref, description, calendar.calendar);
            let created = client.create_event(&event).await?;
            print_json(&created)
        }
        EventAction::Update {
            event_id,
            start,
            end,
            calendar,
        } => {
            let mut update = EventUpdate::new(event_id, start, end);
            update.calendar_id = calendar.calendar;
            let updated = client.update_event(&update).await?;
            print_json(&updated)
        }
        EventAction::Delete { event_id, calendar } => {
            let event = EventRef::new(calendar.calendar, event_id);
            client.delete_event(&event).await?;
            print_json(&json!({ "deleted": event.event_id }))
        }
    }
}

/// Builds the create input. A booking reference wins over a summary.
fn new_event(
    start: String,
    end: String,
    summary: Option<String>,
    booking_ref: Option<String>,
    description: Option<String>,
    calendar_id: Option<String>,
) -> NewEvent {
    let mut event = match booking_ref {
        Some(reference) => NewEvent::booking(&reference, start, end),
        None => NewEvent::new(summary.unwrap_or_default(), start, end),
    };
    event.description = description;
    event.calendar_id = calendar_id;
    event
}
