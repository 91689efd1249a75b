//! Command-line interface definition.

use std::path::PathBuf;

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use simplecal_google::SessionConfig;

/// simplecal - Google Calendar from the command line
#[derive(Debug, Parser)]
#[command(name = "simplecal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "SIMPLECAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output, including HTTP headers
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Access token, overrides the configuration file
    #[arg(long, env = "SIMPLECAL_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Refresh token, overrides the configuration file
    #[arg(long, env = "SIMPLECAL_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// True for commands that talk to the Calendar API and so validate the
    /// session first.
    pub fn needs_session(&self) -> bool {
        !matches!(self.command, Command::Auth { .. })
    }

    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_to(&self, mut config: SessionConfig) -> SessionConfig {
        if self.debug {
            config = config.with_debug(true);
        }
        if let Some(ref token) = self.access_token {
            config.access_token = Some(token.clone());
        }
        if let Some(ref token) = self.refresh_token {
            config.refresh_token = Some(token.clone());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// OAuth commands
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// List the calendars of the authenticated user
    Calendars,

    /// Event commands
    Events {
        #[command(subcommand)]
        action: EventAction,
    },
}

/// OAuth actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Print the consent page URL
    Url {
        /// Open the URL in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Exchange an authorization code for tokens
    Exchange {
        /// Authorization code from the consent redirect
        code: String,

        /// OAuth grant type
        #[arg(long, default_value = "authorization_code")]
        grant_type: String,
    },

    /// Trade the refresh token for a new access token
    Refresh,

    /// Revoke the current token
    Revoke,
}

/// Calendar selection shared by event actions.
#[derive(Debug, Clone, Args)]
pub struct CalendarArg {
    /// Calendar ID (defaults to primary)
    #[arg(long)]
    pub calendar: Option<String>,
}

/// Event actions.
#[derive(Debug, Subcommand)]
pub enum EventAction {
    /// List events
    List {
        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Show one event
    Get {
        event_id: String,

        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Create an event spanning the given dates
    Create {
        /// Start date (YYYY-MM-DD or DD-MM-YYYY)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD or DD-MM-YYYY)
        #[arg(long)]
        end: String,

        /// Event summary
        #[arg(long, required_unless_present = "booking_ref", conflicts_with = "booking_ref")]
        summary: Option<String>,

        /// Booking reference, summarized as "Booked, ref: <REF>"
        #[arg(long)]
        booking_ref: Option<String>,

        /// Event description
        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Move an event to new dates
    Update {
        event_id: String,

        /// New start date
        #[arg(long)]
        start: String,

        /// New end date
        #[arg(long)]
        end: String,

        #[command(flatten)]
        calendar: CalendarArg,
    },

    /// Delete an event
    Delete {
        event_id: String,

        #[command(flatten)]
        calendar: CalendarArg,
    },
}
