//! Core pieces shared by the simplecal crates: tracing setup and the
//! date/time rules used when booking calendar events.

pub mod time;
pub mod tracing;

pub use time::{EventDefaults, TimeError, format_event_datetime, parse_event_date};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
