//! `plugpin update`: regenerate the artifact.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use plugpin_sync::WriteResult;

use super::PipelineArgs;

/// Arguments for `plugpin update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: PipelineArgs,
}

impl UpdateArgs {
    pub fn run(self) -> Result<()> {
        let (pipeline, rules) = self.common.prepare()?;
        let output = &self.common.output;

        let report = pipeline
            .run(&rules, output)
            .with_context(|| format!("update failed; {} left as it was", output.display()))?;

        for target in &report.skipped {
            println!("  {} {target} (no release)", "skipped".yellow());
        }

        let summary = format!(
            "{} plugins, {} retries, {}",
            report.entries.len(),
            report.retries,
            report.quota
        );
        match &report.write {
            WriteResult::Written { path } => {
                println!("{} wrote {} ({summary})", "✓".green(), path.display())
            }
            WriteResult::Unchanged { path } => {
                println!("{} {} unchanged ({summary})", "·".dimmed(), path.display())
            }
        }
        Ok(())
    }
}
