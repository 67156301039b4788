//! Live reload of the registry from filesystem notifications.

use crate::debounce::{ChangeKind, DebounceMode, Debouncer, FsChange, MAX_WINDOW};
use crate::loader::{self, is_config_file};
use crate::{ConfigResult, Registry};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Watch loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Quiet interval applied to change notifications.
    pub debounce: Duration,
    pub mode: DebounceMode,
}

impl WatchConfig {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

    /// Read `JSCP_DEBOUNCE_MS` and `JSCP_DEBOUNCE_MODE`, falling back to
    /// defaults for anything unset or invalid. The window is capped at
    /// [`MAX_WINDOW`].
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ms) = std::env::var("JSCP_DEBOUNCE_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => config.debounce = Duration::from_millis(ms),
                Err(e) => warn!(value = %ms, error = %e, "Ignoring invalid JSCP_DEBOUNCE_MS"),
            }
            if config.debounce > MAX_WINDOW {
                warn!(
                    value = %ms,
                    max_ms = MAX_WINDOW.as_millis() as u64,
                    "Clamping JSCP_DEBOUNCE_MS"
                );
                config.debounce = MAX_WINDOW;
            }
        }
        if let Ok(mode) = std::env::var("JSCP_DEBOUNCE_MODE") {
            match mode.parse() {
                Ok(mode) => config.mode = mode,
                Err(e) => warn!(error = %e, "Ignoring invalid JSCP_DEBOUNCE_MODE"),
            }
        }

        config
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_mode(mut self, mode: DebounceMode) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: Self::DEFAULT_DEBOUNCE,
            mode: DebounceMode::default(),
        }
    }
}

/// A running watch task together with its stop signal.
pub struct WatchHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Signal the watch task to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Config watch task panicked");
        }
    }
}

impl Registry {
    /// Start watching the registry root, stopping when `shutdown` turns
    /// `true` or its sender is dropped.
    ///
    /// The watches are in place when this returns. An error here means the
    /// filesystem cannot be observed; the registry keeps serving what it has.
    /// Must be called from within a Tokio runtime.
    pub fn spawn_watcher(
        &self,
        config: WatchConfig,
        shutdown: watch::Receiver<bool>,
    ) -> ConfigResult<JoinHandle<()>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;

        let mut watch_loop = WatchLoop {
            registry: self.clone(),
            watcher,
            watched: HashSet::new(),
            debouncer: Debouncer::new(config.mode, config.debounce),
        };
        watch_loop.watch_root()?;

        info!(
            root = %self.root().display(),
            dirs = watch_loop.watched.len(),
            debounce_ms = watch_loop.debouncer.window().as_millis() as u64,
            mode = ?config.mode,
            "Watching config directory"
        );
        Ok(tokio::spawn(watch_loop.run(rx, shutdown)))
    }

    /// Start watching with an owned stop handle.
    pub fn watch(&self, config: WatchConfig) -> ConfigResult<WatchHandle> {
        let (shutdown, rx) = watch::channel(false);
        let task = self.spawn_watcher(config, rx)?;
        Ok(WatchHandle { shutdown, task })
    }
}

struct WatchLoop {
    registry: Registry,
    watcher: RecommendedWatcher,
    /// Every directory ever watched. Never shrinks.
    watched: HashSet<PathBuf>,
    debouncer: Debouncer,
}

impl WatchLoop {
    fn watch_root(&mut self) -> ConfigResult<()> {
        let root = self.registry.root().to_path_buf();
        let tree = loader::walk(&root)?;

        self.watcher.watch(&root, RecursiveMode::NonRecursive)?;
        self.watched.insert(root.clone());

        for dir in tree.dirs.iter().filter(|d| **d != root) {
            self.watch_dir(dir);
        }
        Ok(())
    }

    fn watch_dir(&mut self, dir: &Path) -> bool {
        // Re-adding is harmless and needed when a removed directory reappears.
        if let Err(e) = self.watcher.watch(dir, RecursiveMode::NonRecursive) {
            warn!(path = %dir.display(), error = %e, "Failed to watch directory");
            return false;
        }
        self.watched.insert(dir.to_path_buf())
    }

    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if *shutdown.borrow() {
            return;
        }

        loop {
            let deadline = self.debouncer.deadline();
            let flush_at = deadline.map(Instant::from_std).unwrap_or_else(Instant::now);

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Config watch stopping");
                        break;
                    }
                }
                event = events.recv() => match event {
                    Some(Ok(event)) => self.on_event(event),
                    Some(Err(e)) => warn!(error = %e, "Config watch error"),
                    None => {
                        error!("Config watch notification stream closed");
                        break;
                    }
                },
                _ = tokio::time::sleep_until(flush_at), if deadline.is_some() => {
                    let ready = self.debouncer.take_ready(std::time::Instant::now());
                    for change in ready {
                        self.apply(change);
                    }
                }
            }
        }
    }

    fn on_event(&mut self, event: notify::Event) {
        // Reads and closes are not changes and never claim the debounce window.
        if matches!(event.kind, EventKind::Access(_)) {
            return;
        }

        let changes = changes_from_event(&event)
            .into_iter()
            .filter(is_relevant)
            .collect();
        for change in self.debouncer.offer(changes, std::time::Instant::now()) {
            self.apply(change);
        }
    }

    fn apply(&mut self, change: FsChange) {
        match change.kind {
            ChangeKind::Changed => match std::fs::metadata(&change.path) {
                Ok(meta) if meta.is_dir() => self.add_directory(&change.path),
                Ok(_) if is_config_file(&change.path) => {
                    info!(path = %change.path.display(), "Detected config change");
                    if let Err(e) = self.registry.load_file(&change.path) {
                        warn!(path = %change.path.display(), error = %e, "Failed to load config");
                    }
                }
                Ok(_) => debug!(path = %change.path.display(), "Ignoring non-config file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    self.registry.remove_path(&change.path);
                }
                Err(e) => {
                    warn!(path = %change.path.display(), error = %e, "Failed to stat changed path")
                }
            },
            ChangeKind::Removed => {
                self.registry.remove_path(&change.path);
            }
        }
    }

    /// Watch a new directory and everything already inside it.
    fn add_directory(&mut self, dir: &Path) {
        if self.watch_dir(dir) {
            info!(path = %dir.display(), "New directory added to watch");
        }

        // Files moved in together with the directory produce no events of
        // their own.
        let tree = match loader::walk(dir) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to scan new directory");
                return;
            }
        };
        for sub in tree.dirs.iter().filter(|d| d.as_path() != dir) {
            self.watch_dir(sub);
        }
        for file in &tree.files {
            if let Err(e) = self.registry.load_file(file) {
                warn!(path = %file.display(), error = %e, "Failed to load config");
            }
        }
    }
}

/// Whether a change can affect the registry. Removals always can; a change
/// counts only for config files and directories.
fn is_relevant(change: &FsChange) -> bool {
    match change.kind {
        ChangeKind::Removed => true,
        ChangeKind::Changed => is_config_file(&change.path) || change.path.is_dir(),
    }
}

/// Reduce a watcher notification to path-level changes.
fn changes_from_event(event: &notify::Event) -> Vec<FsChange> {
    let paths = &event.paths;
    match event.kind {
        EventKind::Create(_) => paths.iter().map(FsChange::changed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.iter().map(FsChange::removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if i == 0 {
                    FsChange::removed(p)
                } else {
                    FsChange::changed(p)
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => paths.iter().map(FsChange::changed).collect(),
        EventKind::Remove(_) => paths.iter().map(FsChange::removed).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
