//! In-memory registry of per-project configuration.

use crate::loader::{self, LoadReport};
use crate::ConfigResult;
use jscp_core::{ConfigurationRecord, ProjectId};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

type RecordMap = HashMap<ProjectId, Arc<ConfigurationRecord>>;

/// Shared, concurrently readable map from project id to configuration.
///
/// Cloning is cheap and every clone sees the same records. Readers get an
/// `Arc` snapshot of a record, so a concurrent reload replaces the record
/// wholesale and never exposes a partially written one.
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    root: PathBuf,
    records: RwLock<RecordMap>,
}

impl Registry {
    /// Load every config file under `root`.
    ///
    /// Only a missing or unreadable root is an error. Individual files that
    /// fail to load are logged and skipped.
    pub fn open(root: impl Into<PathBuf>) -> ConfigResult<Self> {
        Self::open_with_report(root).map(|(registry, _)| registry)
    }

    /// Like [`open`](Self::open), also returning what loaded and what failed.
    pub fn open_with_report(root: impl Into<PathBuf>) -> ConfigResult<(Self, LoadReport)> {
        let registry = Self {
            inner: Arc::new(Shared {
                root: root.into(),
                records: RwLock::new(HashMap::new()),
            }),
        };
        let report = registry.load_all()?;
        Ok((registry, report))
    }

    fn load_all(&self) -> ConfigResult<LoadReport> {
        let tree = loader::walk(self.root())?;
        let mut report = LoadReport::default();

        for path in tree.files {
            match self.load_file(&path) {
                Ok(project) => report.loaded.push((project, path)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load config");
                    report.failed.push((path, e));
                }
            }
        }

        info!(
            root = %self.root().display(),
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Configuration loaded"
        );
        Ok(report)
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Look up a project's configuration.
    pub fn get(&self, project: &str) -> Option<Arc<ConfigurationRecord>> {
        self.read().get(project).cloned()
    }

    /// Load one file, replacing any record with the same project id.
    pub fn load_file(&self, path: &Path) -> ConfigResult<ProjectId> {
        let record = loader::read_record(path)?;
        let project = record.project.clone();

        let previous = self.write().insert(project.clone(), Arc::new(record));
        info!(
            project = %project,
            path = %path.display(),
            replaced = previous.is_some(),
            "Loaded config"
        );
        Ok(project)
    }

    /// Drop the record named after a removed file (`<project>.yaml`).
    ///
    /// Removing a file that matches no loaded project is a no-op.
    pub fn remove_path(&self, path: &Path) -> Option<Arc<ConfigurationRecord>> {
        let removed = loader::project_for_path(path)
            .and_then(|project| self.write().remove(project.as_str()));

        match &removed {
            Some(record) => {
                info!(project = %record.project, path = %path.display(), "Removed config")
            }
            None => debug!(path = %path.display(), "Removed unknown file"),
        }
        removed
    }

    /// Loaded project ids, sorted.
    pub fn projects(&self) -> Vec<ProjectId> {
        let mut projects: Vec<_> = self.read().keys().cloned().collect();
        projects.sort();
        projects
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Every write is a single insert or remove, so a poisoned map is still
    // consistent.
    fn read(&self) -> RwLockReadGuard<'_, RecordMap> {
        self.inner
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RecordMap> {
        self.inner
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use std::fs;
    use tempfile::tempdir;

    fn config(project: &str, tag: &str) -> String {
        format!(
            r#"
repo: acme/{project}
version: 1
project: {project}
registry_url: registry.example.com
pipelines:
  - name: main
    trigger:
      branch: main
      event: push
    build:
      context: .
      dockerfile: Dockerfile
      tag: {tag}
    deploy:
      namespace: prod
      deployment_name: {project}
"#
        )
    }

    #[test]
    fn test_loads_every_valid_file() {
        let dir = tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("api.yaml"), config("api", "v1")).unwrap();
        fs::write(dir.path().join("nested/web.yml"), config("web", "v1")).unwrap();
        fs::write(dir.path().join("nested/deeper/worker.yaml"), config("worker", "v1")).unwrap();

        let (registry, report) = Registry::open_with_report(dir.path()).unwrap();
        assert!(report.is_clean());
        assert_eq!(registry.len(), 3);
        for project in ["api", "web", "worker"] {
            let record = registry.get(project).expect("record loaded");
            assert_eq!(record.project.as_str(), project);
            assert_eq!(record.pipelines[0].deploy.deployment_name, project);
        }
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_invalid_files_do_not_block_others() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("api.yaml"), config("api", "v1")).unwrap();
        fs::write(dir.path().join("anonymous.yaml"), "repo: acme/anon\npipelines: []\n").unwrap();
        fs::write(dir.path().join("broken.yaml"), "project: [unterminated\n").unwrap();
        fs::write(dir.path().join("web.yaml"), config("web", "v1")).unwrap();

        let (registry, report) = Registry::open_with_report(dir.path()).unwrap();
        assert_eq!(registry.projects(), vec![ProjectId::from("api"), ProjectId::from("web")]);
        assert_eq!(report.failed.len(), 2);
        assert!(report
            .failed
            .iter()
            .any(|(_, e)| matches!(e, ConfigError::MissingField { .. })));
        assert!(report
            .failed
            .iter()
            .any(|(_, e)| matches!(e, ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().expect("tempdir");
        assert!(Registry::open(dir.path().join("absent")).is_err());
    }

    #[test]
    fn test_load_file_replaces_record() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("api.yaml");
        fs::write(&path, config("api", "v1")).unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        let before = registry.get("api").unwrap();

        fs::write(&path, config("api", "v2")).unwrap();
        assert_eq!(registry.load_file(&path).unwrap().as_str(), "api");

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("api").unwrap().pipelines[0].build.tag, "v2");
        // Earlier snapshot is untouched.
        assert_eq!(before.pipelines[0].build.tag, "v1");
    }

    #[test]
    fn test_remove_path_matches_file_name() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("api.yaml"), config("api", "v1")).unwrap();
        fs::write(dir.path().join("web.yml"), config("web", "v1")).unwrap();
        let registry = Registry::open(dir.path()).unwrap();

        let removed = registry.remove_path(&dir.path().join("web.yml"));
        assert_eq!(removed.map(|r| r.project.clone()), Some(ProjectId::from("web")));
        assert!(registry.get("web").is_none());

        assert!(registry.remove_path(&dir.path().join("unknown.yaml")).is_none());
        assert!(registry.remove_path(&dir.path().join("api.json")).is_none());
        assert_eq!(registry.projects(), vec![ProjectId::from("api")]);
    }

    #[test]
    fn test_concurrent_readers_see_whole_records() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("api.yaml");
        fs::write(&path, config("api", "v0")).unwrap();
        let registry = Registry::open(dir.path()).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let registry = registry.clone();
                s.spawn(move || {
                    for _ in 0..200 {
                        let record = registry.get("api").expect("never absent");
                        let pipeline = &record.pipelines[0];
                        assert_eq!(pipeline.name, "main");
                        assert!(pipeline.build.tag.starts_with('v'));
                    }
                });
            }
            for i in 1..20 {
                fs::write(&path, config("api", &format!("v{}", i))).unwrap();
                registry.load_file(&path).unwrap();
            }
        });

        assert_eq!(registry.get("api").unwrap().pipelines[0].build.tag, "v19");
    }
}
