//! JSCP CLI tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::WebhookArgs;

#[derive(Parser)]
#[command(name = "jscp")]
#[command(about = "JSCP configuration and webhook tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a configuration directory and report every file that fails
    Validate {
        /// Configuration root directory
        #[arg(env = "JSCP_CONFIG_DIR", default_value = "./configs")]
        dir: PathBuf,
    },
    /// Authenticate and normalize a webhook payload
    Normalize {
        #[command(flatten)]
        webhook: WebhookArgs,
        /// Include the raw payload in the output
        #[arg(long)]
        raw: bool,
    },
    /// Normalize a webhook payload and resolve it against the configuration
    Resolve {
        #[command(flatten)]
        webhook: WebhookArgs,
        /// Configuration root directory
        #[arg(long, env = "JSCP_CONFIG_DIR", default_value = "./configs")]
        dir: PathBuf,
        /// Project id (defaults to the repository name from the payload)
        #[arg(long)]
        project: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { dir } => {
            commands::config::validate(&dir)?;
        }
        Commands::Normalize { webhook, raw } => {
            commands::webhook::normalize(&webhook, raw)?;
        }
        Commands::Resolve {
            webhook,
            dir,
            project,
        } => {
            commands::webhook::resolve(&webhook, &dir, project.as_deref())?;
        }
    }

    Ok(())
}
