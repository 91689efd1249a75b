//! Calendar list command.

use simplecal_google::CalendarClient;

use super::print_json;
use crate::error::CliResult;

/// Prints the calendars of the authenticated user.
pub async fn list(client: &CalendarClient) -> CliResult<()> {
    let calendars = client.list_calendars().await?;
    print_json(&calendars)
}
