//! Configuration commands.

use anyhow::{Result, bail};
use jscp_config::Registry;
use std::path::Path;

pub fn validate(dir: &Path) -> Result<()> {
    let (registry, report) = Registry::open_with_report(dir)?;

    for (project, path) in &report.loaded {
        println!("ok     {:<24} {}", project.as_str(), path.display());
    }
    for (path, err) in &report.failed {
        println!("error  {}: {}", path.display(), err);
    }

    let duplicates = report.loaded.len().saturating_sub(registry.len());
    if duplicates > 0 {
        println!(
            "warning: {} file(s) reuse a project id already loaded; the last one read wins",
            duplicates
        );
    }
    println!(
        "{} project(s) loaded, {} file(s) failed",
        registry.len(),
        report.failed.len()
    );

    if !report.is_clean() {
        bail!(
            "{} configuration file(s) failed to load",
            report.failed.len()
        );
    }
    Ok(())
}
