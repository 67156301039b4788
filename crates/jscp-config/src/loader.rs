//! Reading configuration files from disk.

use crate::{ConfigError, ConfigResult};
use jscp_core::{ConfigurationRecord, ProjectId};
use std::path::{Path, PathBuf};
use tracing::warn;

/// File extensions recognized as configuration files.
pub const CONFIG_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Outcome of loading a directory tree. Failed files never stop the others.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<(ProjectId, PathBuf)>,
    pub failed: Vec<(PathBuf, ConfigError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Whether `path` has a recognized configuration extension.
pub fn is_config_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CONFIG_EXTENSIONS.contains(&e))
}

/// The project a config file is named after (`<project>.yaml`).
pub fn project_for_path(path: &Path) -> Option<ProjectId> {
    if !is_config_file(path) {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(ProjectId::from)
}

/// Parse a configuration record. `path` is only used in error messages.
pub fn parse_record(path: &Path, bytes: &[u8]) -> ConfigResult<ConfigurationRecord> {
    let record: ConfigurationRecord =
        serde_yaml::from_slice(bytes).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

    if record.project.as_str().trim().is_empty() {
        return Err(ConfigError::MissingField {
            path: path.to_path_buf(),
            field: "project",
        });
    }

    Ok(record)
}

/// Read and parse a single configuration file.
pub fn read_record(path: &Path) -> ConfigResult<ConfigurationRecord> {
    let bytes = std::fs::read(path).map_err(|e| ConfigError::io(path, e))?;
    parse_record(path, &bytes)
}

/// Directories and config files found under a root.
#[derive(Debug, Default)]
pub struct Tree {
    /// Every directory, including the root, parents before children.
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// Walk `root` recursively. Entries are visited in name order.
///
/// Only an unreadable root is an error; unreadable subdirectories are
/// logged and skipped. Symlinked directories are not followed.
pub fn walk(root: &Path) -> ConfigResult<Tree> {
    let meta = std::fs::metadata(root).map_err(|e| ConfigError::io(root, e))?;
    if !meta.is_dir() {
        return Err(ConfigError::NotADirectory(root.to_path_buf()));
    }

    let mut tree = Tree::default();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir == root => return Err(ConfigError::io(root, e)),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };

        let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.file_name());

        let mut subdirs = Vec::new();
        for entry in entries {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                subdirs.push(path);
            } else if is_config_file(&path) {
                tree.files.push(path);
            }
        }

        tree.dirs.push(dir);
        // Reverse so the stack pops subdirectories in name order.
        stack.extend(subdirs.into_iter().rev());
    }

    Ok(tree)
}
