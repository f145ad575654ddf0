//! Sync command - Mirror a local directory into the remote store
//!
//! Provides the `cloudsink sync` CLI command which:
//! 1. Applies command-line overrides to the loaded configuration and validates it
//! 2. Creates the remote store session (token file, refresh credential)
//! 3. Runs the SyncDriver and displays the run statistics

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use cloudsink_api::client::ApiClient;
use cloudsink_api::provider::DriveStore;
use cloudsink_core::config::{Config, ConfigBuilder};
use cloudsink_sync::engine::{SyncDriver, SyncOptions};
use cloudsink_sync::SyncError;

use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Local directory to mirror (overrides sync.source)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Remote folder path, e.g. /Backup/Photos (overrides sync.target)
    #[arg(long)]
    pub target: Option<String>,

    /// Do not write .md5 side-car files
    #[arg(long)]
    pub no_persist_hashes: bool,

    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    /// Applies the command-line overrides on top of `config`
    fn apply(&self, config: Config) -> Config {
        let mut builder = ConfigBuilder::from_config(config);
        if let Some(source) = &self.source {
            builder = builder.sync_source(super::expand_tilde(&source.to_string_lossy()));
        }
        if let Some(target) = &self.target {
            builder = builder.sync_target(target.clone());
        }
        if self.no_persist_hashes {
            builder = builder.sync_persist_hashes(false);
        }
        if self.dry_run {
            builder = builder.sync_dry_run(true);
        }
        builder.build()
    }

    pub async fn execute(&self, format: OutputFormat, config: Config) -> Result<()> {
        let formatter = format.formatter();
        let config = self.apply(config);

        let errors = config.validate();
        if !errors.is_empty() {
            for err in &errors {
                formatter.error(&err.to_string());
            }
            anyhow::bail!("Invalid configuration ({} error(s))", errors.len());
        }

        if config.auth.refresh_token.is_none() && !config.auth.token_file.exists() {
            formatter.warn("No refresh token configured and no token file found; requests will fail");
        }

        let mime = config.mime_table().context("Invalid extension table")?;
        let target = config.target_path().context("Invalid sync target")?;

        info!(
            source = %config.sync.source.display(),
            target = %target,
            tracked_extensions = mime.len(),
            "Starting sync"
        );

        let store = Arc::new(DriveStore::new(ApiClient::from_config(&config)));
        let driver = SyncDriver::new(
            store,
            mime,
            SyncOptions {
                dry_run: config.sync.dry_run,
                persist_hashes: config.sync.persist_hashes,
            },
        );

        let report = match driver.run(&config.sync.source, &target).await {
            Ok(report) => report,
            Err(err @ SyncError::Conflict { .. }) => {
                formatter.error(&format!(
                    "{err}. Resolve the mismatch manually, then run the sync again."
                ));
                return Err(err.into());
            }
            Err(err @ SyncError::Auth(_)) => {
                formatter.error(&format!(
                    "{err}. Check auth.refresh_token, then run `cloudsink auth refresh`."
                ));
                return Err(err.into());
            }
            Err(err) => {
                formatter.error(&err.to_string());
                return Err(err.into());
            }
        };

        formatter.report(&report);

        if report.stats.failed > 0 {
            anyhow::bail!("{} file(s) failed to sync", report.stats.failed);
        }
        Ok(())
    }
}
