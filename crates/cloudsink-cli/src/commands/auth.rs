//! Auth commands - Token exchange for the remote store
//!
//! Provides the `cloudsink auth` CLI subcommands:
//! - `refresh` - Exchanges the configured refresh credential for a new access
//!   token and persists the exchange response to the token file.

use anyhow::Result;
use clap::Subcommand;
use tracing::info;

use cloudsink_api::client::ApiClient;
use cloudsink_api::ApiError;
use cloudsink_core::config::Config;

use crate::output::{OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Exchange the refresh token for a new access token and save it
    Refresh,
}

impl AuthCommand {
    pub async fn execute(&self, format: OutputFormat, config: Config) -> Result<()> {
        let fmt = format.formatter();
        match self {
            AuthCommand::Refresh => execute_refresh(&config, &*fmt).await,
        }
    }
}

async fn execute_refresh(config: &Config, fmt: &dyn OutputFormatter) -> Result<()> {
    let client = ApiClient::from_config(config);
    let tokens = client.tokens();

    info!(url = %config.auth.refresh_url, "Forcing token refresh");

    match tokens.refresh().await {
        Ok(_) => {
            fmt.success(&format!(
                "Access token refreshed and saved to {}",
                tokens.token_file().display()
            ));
            Ok(())
        }
        Err(ApiError::MissingRefreshToken) => {
            fmt.error("No refresh token configured. Set auth.refresh_token in config.yaml");
            Err(ApiError::MissingRefreshToken.into())
        }
        Err(err) => {
            fmt.error(&format!("Token refresh failed: {err}"));
            Err(err.into())
        }
    }
}
