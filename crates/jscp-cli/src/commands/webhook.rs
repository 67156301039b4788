//! Webhook commands.

use anyhow::{Context, Result};
use jscp_config::Registry;
use jscp_core::{NormalizedEvent, StatusReport};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use super::WebhookArgs;

pub fn normalize(args: &WebhookArgs, raw: bool) -> Result<()> {
    let event = args.read_event()?;

    let mut output = serde_json::to_value(event.summary())?;
    if raw {
        output["raw"] = event.raw().clone();
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn resolve(args: &WebhookArgs, dir: &Path, project: Option<&str>) -> Result<()> {
    let event = args.read_event()?;
    if !event.build_relevant() {
        info!("Event ignored; nothing to dispatch");
        println!("{}", serde_json::to_string_pretty(&event.summary())?);
        return Ok(());
    }

    let registry = Registry::open(dir)?;
    let resolution = resolve_event(&registry, &event, project)?;
    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}

/// What dispatch would do with an event.
#[derive(Debug, Serialize)]
pub struct Resolution {
    pub project: String,
    pub pipelines: Vec<String>,
    pub status: Option<StatusReport>,
}

pub fn resolve_event(
    registry: &Registry,
    event: &NormalizedEvent,
    project: Option<&str>,
) -> Result<Resolution> {
    let project = project
        .or(event.repo_short_name())
        .context("payload has no repository; pass --project")?;

    let record = registry
        .get(project)
        .with_context(|| format!("config not found for project: {}", project))?;

    Ok(Resolution {
        project: project.to_string(),
        pipelines: record
            .pipelines_for(event)
            .map(|p| p.name.clone())
            .collect(),
        status: StatusReport::pending(event, &record),
    })
}
