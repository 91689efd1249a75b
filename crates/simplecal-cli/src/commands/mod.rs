//! Command implementations.
//!
//! Results go to stdout as pretty JSON; logs go to stderr.

pub mod auth;
pub mod calendars;
pub mod events;

use serde::Serialize;

use crate::error::CliResult;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
