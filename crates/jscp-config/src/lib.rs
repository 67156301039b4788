//! Configuration registry for JSCP.
//!
//! This crate handles:
//! - Loading per-project YAML configuration files from a directory tree
//! - Serving records to concurrent readers
//! - Hot-reloading records as files change on disk

pub mod debounce;
pub mod error;
pub mod loader;
pub mod registry;
pub mod watch;

pub use debounce::{ChangeKind, DebounceMode, Debouncer, FsChange};
pub use error::{ConfigError, ConfigResult};
pub use loader::LoadReport;
pub use registry::Registry;
pub use watch::{WatchConfig, WatchHandle};
