//! Debouncing of filesystem change notifications.
//!
//! Two policies are supported:
//!
//! - [`DebounceMode::Coalesce`] collects distinct paths until the stream has
//!   been quiet for the debounce window, then releases the de-duplicated set
//!   in first-seen order. No change is lost, and a stream that never goes
//!   quiet still flushes after [`MAX_WAIT_WINDOWS`] windows.
//! - [`DebounceMode::DropWithinWindow`] acts on a notification only if the
//!   window has elapsed since the last acted-on notification and discards
//!   everything else. A burst keeps only its first notification.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Created, written or renamed into place.
    Changed,
    Removed,
}

/// A single path-level change derived from a watcher notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FsChange {
    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Changed,
        }
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Removed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DebounceMode {
    #[default]
    Coalesce,
    DropWithinWindow,
}

impl std::str::FromStr for DebounceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coalesce" => Ok(DebounceMode::Coalesce),
            "drop" | "drop_within_window" => Ok(DebounceMode::DropWithinWindow),
            _ => Err(format!("Unknown debounce mode: {}", s)),
        }
    }
}

/// Upper bound on the debounce window.
pub const MAX_WINDOW: Duration = Duration::from_secs(60);

/// In coalescing mode, pending changes are released at most this many
/// windows after the first of them arrived, even if the stream never goes
/// quiet.
pub const MAX_WAIT_WINDOWS: u32 = 10;

#[derive(Debug)]
pub struct Debouncer {
    mode: DebounceMode,
    window: Duration,
    max_wait: Duration,
    last_acted: Option<Instant>,
    pending: Vec<FsChange>,
    first_pending: Option<Instant>,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Windows longer than [`MAX_WINDOW`] are clamped.
    pub fn new(mode: DebounceMode, window: Duration) -> Self {
        let window = window.min(MAX_WINDOW);
        Self {
            mode,
            window,
            max_wait: window.saturating_mul(MAX_WAIT_WINDOWS),
            last_acted: None,
            pending: Vec::new(),
            first_pending: None,
            deadline: None,
        }
    }

    pub fn mode(&self) -> DebounceMode {
        self.mode
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Offer the changes carried by one raw notification observed at `now`.
    ///
    /// Returns the changes to act on immediately. In drop mode every
    /// notification claims the window, even one that carries no changes.
    /// In coalescing mode this is always empty; changes are released by
    /// [`take_ready`](Self::take_ready).
    pub fn offer(&mut self, changes: Vec<FsChange>, now: Instant) -> Vec<FsChange> {
        match self.mode {
            DebounceMode::DropWithinWindow => {
                if let Some(last) = self.last_acted {
                    if now.saturating_duration_since(last) < self.window {
                        debug!(dropped = changes.len(), "Dropped notification inside debounce window");
                        return Vec::new();
                    }
                }
                self.last_acted = Some(now);
                changes
            }
            DebounceMode::Coalesce => {
                if changes.is_empty() {
                    return Vec::new();
                }
                for change in changes {
                    match self.pending.iter_mut().find(|c| c.path == change.path) {
                        Some(existing) => existing.kind = change.kind,
                        None => self.pending.push(change),
                    }
                }
                let first = *self.first_pending.get_or_insert(now);
                self.deadline = Some((now + self.window).min(first + self.max_wait));
                Vec::new()
            }
        }
    }

    /// When the pending set will be released, if anything is pending.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drain the pending set if its deadline has passed by `now`.
    pub fn take_ready(&mut self, now: Instant) -> Vec<FsChange> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.first_pending = None;
                std::mem::take(&mut self.pending)
            }
            _ => Vec::new(),
        }
    }
}
