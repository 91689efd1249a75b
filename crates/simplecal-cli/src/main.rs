//! simplecal CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use simplecal_core::{TracingConfig, init_tracing};
use simplecal_google::CalendarClient;

use simplecal_cli::cli::{AuthAction, Cli, Command};
use simplecal_cli::commands;
use simplecal_cli::config::CliConfig;
use simplecal_cli::error::{CliError, CliResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", CliError::from(e));
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(payload) = e.payload()
                && let Ok(pretty) = serde_json::to_string_pretty(payload)
            {
                eprintln!("{}", pretty);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let session = cli.apply_to(config.session_config()?);

    let client = if cli.needs_session() {
        CalendarClient::connect(session).await?
    } else {
        CalendarClient::new(session)?
    };

    match cli.command {
        Command::Auth { action } => match action {
            AuthAction::Url { open } => commands::auth::url(&client, open),
            AuthAction::Exchange { code, grant_type } => {
                commands::auth::exchange(&client, &code, &grant_type).await
            }
            AuthAction::Refresh => commands::auth::refresh(&client).await,
            AuthAction::Revoke => commands::auth::revoke(&client).await,
        },
        Command::Calendars => commands::calendars::list(&client).await,
        Command::Events { action } => commands::events::run(&client, action).await,
    }
}
