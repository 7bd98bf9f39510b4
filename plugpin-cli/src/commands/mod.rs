pub mod diff;
pub mod quota;
pub mod update;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use plugpin_core::{rules, Config, SelectionRule};
use plugpin_renderer::Renderer;
use plugpin_sync::{Credentials, GitHubClient, Pipeline, UreqTransport};

/// Configuration file flag shared by every subcommand.
#[derive(Args, Debug)]
pub struct ConfigArg {
    /// YAML configuration file. Built-in defaults apply when omitted.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

impl ConfigArg {
    pub fn load(&self) -> Result<Config> {
        Config::load_or_default(self.config.as_deref()).with_context(|| match &self.config {
            Some(path) => format!("could not load config {}", path.display()),
            None => "could not build default config".to_string(),
        })
    }
}

/// Arguments shared by `update` and `diff`.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Selection rules, one per line.
    #[arg(long, short = 'r', default_value = "plugins.txt")]
    pub rules: PathBuf,

    /// Generated Nix file.
    #[arg(long, short = 'o', default_value = "data.nix")]
    pub output: PathBuf,

    /// Tera template replacing the built-in artifact layout.
    #[arg(long)]
    pub template: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArg,
}

impl PipelineArgs {
    /// Load rules and config, then assemble the pipeline.
    ///
    /// Nothing touches the network or the artifact until this succeeds.
    pub fn prepare(&self) -> Result<(Pipeline<UreqTransport>, Vec<SelectionRule>)> {
        let rules = load_rules(&self.rules)?;
        let config = self.config.load()?;
        let renderer = match &self.template {
            Some(path) => Renderer::with_template(path)
                .with_context(|| format!("could not load template {}", path.display()))?,
            None => Renderer::new().context("could not load built-in template")?,
        };
        let client = client(&config);
        Ok((Pipeline::new(client, config, renderer), rules))
    }
}

fn load_rules(path: &Path) -> Result<Vec<SelectionRule>> {
    let rules = rules::load_rules(path)
        .with_context(|| format!("could not read rules from {}", path.display()))?;
    if rules.is_empty() {
        tracing::warn!("{} has no rules; the artifact will be empty", path.display());
    }
    Ok(rules)
}

/// HTTP client with credentials from the environment, if any.
pub fn client(config: &Config) -> GitHubClient<UreqTransport> {
    let credentials = Credentials::from_env();
    match &credentials {
        Some(c) => tracing::debug!("using credentials {c:?}"),
        None => tracing::debug!("no credentials, anonymous quota applies"),
    }
    let transport = UreqTransport::new(&config.user_agent, credentials.as_ref());
    GitHubClient::from_config(transport, config, credentials.is_some())
}
