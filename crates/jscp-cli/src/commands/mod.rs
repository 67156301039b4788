//! CLI command implementations.

pub mod config;
pub mod webhook;

use anyhow::{Context, Result};
use clap::Args;
use jscp_core::NormalizedEvent;
use std::io::Read;
use std::path::{Path, PathBuf};

/// A webhook request reconstructed from the command line.
#[derive(Debug, Args)]
pub struct WebhookArgs {
    /// JSON payload file ("-" reads stdin)
    pub payload: PathBuf,
    /// X-Hub-Signature-256 header value
    #[arg(long)]
    pub signature: Option<String>,
    /// Shared webhook secret; verification is skipped when unset
    #[arg(long, env = "JSCP_WEBHOOK_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

impl WebhookArgs {
    pub fn read_event(&self) -> Result<NormalizedEvent> {
        let body = read_payload(&self.payload)?;
        jscp_webhook::normalize(&body, self.signature.as_deref(), self.secret.as_deref())
            .context("webhook rejected")
    }
}

fn read_payload(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("failed to read payload from stdin")?;
        return Ok(body);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
