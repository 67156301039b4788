//! Core domain types and traits for the JSCP dispatcher.
//!
//! This crate contains:
//! - Project identifiers
//! - Configuration record model (pipelines, triggers, build and deploy metadata)
//! - Normalized webhook events
//! - Outbound commit status reports

pub mod error;
pub mod event;
pub mod id;
pub mod record;
pub mod status;

pub use error::{Error, Result};
pub use event::{EventKind, EventType, NormalizedEvent};
pub use id::ProjectId;
pub use record::ConfigurationRecord;
pub use status::{CommitState, StatusReport, StatusReporter};
