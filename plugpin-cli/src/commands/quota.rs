//! `plugpin quota`: show the remaining API quota.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use plugpin_sync::{SyncError, AUTH_ENV};

use super::{client, ConfigArg};

/// Arguments for `plugpin quota`.
#[derive(Args, Debug)]
pub struct QuotaArgs {
    #[command(flatten)]
    pub config: ConfigArg,
}

impl QuotaArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let client = client(&config);

        match client.check_quota() {
            Ok(quota) => {
                println!("{} {quota}", "✓".green());
                Ok(())
            }
            Err(e @ SyncError::QuotaExhausted { .. }) => Err(e.into()),
            Err(e) => Err(anyhow::Error::new(e).context(format!(
                "could not query {} (credentials from {AUTH_ENV})",
                client.endpoints().rate_limit()
            ))),
        }
    }
}
