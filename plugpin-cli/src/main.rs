//! plugpin: pin GitHub plugin releases into a generated Nix file.
//!
//! # Usage
//!
//! ```text
//! plugpin update [--rules plugins.txt] [--output data.nix] [--config plugpin.yaml] [--template FILE]
//! plugpin diff   [--rules plugins.txt] [--output data.nix] [--config plugpin.yaml] [--template FILE]
//! plugpin quota  [--config plugpin.yaml]
//! ```
//!
//! Credentials are read from `GITHUB_AUTH` (`user:token` or a bare token).

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{diff::DiffArgs, quota::QuotaArgs, update::UpdateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "plugpin",
    version,
    about = "Pin the latest release of GitHub-hosted plugins into a generated Nix file",
    long_about = None,
)]
struct Cli {
    /// More log output (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve every rule, hash the latest releases and rewrite the artifact.
    Update(UpdateArgs),

    /// Show the unified diff `update` would apply, without writing.
    Diff(DiffArgs),

    /// Show the remaining GitHub API quota.
    Quota(QuotaArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Update(args) => args.run(),
        Commands::Diff(args) => args.run(),
        Commands::Quota(args) => args.run(),
    }
}

/// Log to stderr so `plugpin diff` output stays clean on stdout.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
