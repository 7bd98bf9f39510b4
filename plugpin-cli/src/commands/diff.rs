//! `plugpin diff`: show the unified diff `update` would apply.

use anyhow::{Context, Result};
use clap::Args;

use super::PipelineArgs;

/// Arguments for `plugpin diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub common: PipelineArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let (pipeline, rules) = self.common.prepare()?;

        let report = pipeline
            .diff(&rules, &self.common.output)
            .context("diff failed")?;

        let Some(diff) = report.unified_diff else {
            println!("No differences for {}.", report.path.display());
            return Ok(());
        };

        print!("{diff}");
        if !diff.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
