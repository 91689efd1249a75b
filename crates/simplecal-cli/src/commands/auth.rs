//! Authentication commands.

use serde_json::json;
use simplecal_google::CalendarClient;
use tracing::{info, warn};

use super::print_json;
use crate::error::CliResult;

/// Prints the consent page URL, optionally opening it in the browser.
pub fn url(client: &CalendarClient, open: bool) -> CliResult<()> {
    let auth_url = client.tokens().build_authorization_url();

    if open {
        info!("opening consent page in browser");
        if let Err(e) = open::that(&auth_url) {
            warn!("failed to open browser: {}", e);
            eprintln!("\nPlease open this URL in your browser:\n");
        }
    }

    println!("{}", auth_url);
    Ok(())
}

/// Exchanges an authorization code and prints the token response.
///
/// Tokens are not stored; copy them into `config.toml` or the
/// `SIMPLECAL_*_TOKEN` environment variables.
pub async fn exchange(client: &CalendarClient, code: &str, grant_type: &str) -> CliResult<()> {
    let token = client
        .tokens()
        .exchange_code_with_grant(code, grant_type)
        .await?;
    if token.refresh_token.is_none() {
        warn!("no refresh token returned; revoke access and consent again with access_type=offline");
    }
    print_json(&token)
}

/// Refreshes the access token and prints it.
pub async fn refresh(client: &CalendarClient) -> CliResult<()> {
    let access_token = client.tokens().refresh_access_token().await?;
    print_json(&json!({ "access_token": access_token }))
}

/// Revokes the current token.
pub async fn revoke(client: &CalendarClient) -> CliResult<()> {
    client.tokens().revoke_token().await?;
    print_json(&json!({ "revoked": true }))
}
