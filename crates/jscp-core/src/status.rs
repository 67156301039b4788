//! Outbound commit status reports.
//!
//! The provider client that actually sends these lives outside this crate;
//! all the core owes it is a fully populated [`StatusReport`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::event::NormalizedEvent;
use crate::record::ConfigurationRecord;

/// Default status context shown next to the commit.
pub const DEFAULT_CONTEXT: &str = "JSCP";

/// Commit status state, as understood by the provider API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

impl std::fmt::Display for CommitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitState::Pending => write!(f, "pending"),
            CommitState::Success => write!(f, "success"),
            CommitState::Failure => write!(f, "failure"),
            CommitState::Error => write!(f, "error"),
        }
    }
}

/// Everything needed to post one commit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub owner: String,
    pub repo: String,
    pub commit_sha: String,
    pub state: CommitState,
    pub description: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

impl StatusReport {
    /// The "pipeline started" report for an event resolved against its record.
    ///
    /// Owner and repo come from the event's repository full name, falling back
    /// to the record's `repo` field. Returns `None` for ignored events or when
    /// owner, repo or commit cannot be determined.
    pub fn pending(event: &NormalizedEvent, record: &ConfigurationRecord) -> Option<Self> {
        if !event.build_relevant() {
            return None;
        }

        let full_name = event
            .repo_name()
            .filter(|n| n.contains('/'))
            .unwrap_or(record.repo.as_str());
        let (owner, repo) = full_name.split_once('/')?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }

        let commit_sha = event.commit_sha()?;

        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            commit_sha: commit_sha.to_string(),
            state: CommitState::Pending,
            description: format!("{} pipeline started", DEFAULT_CONTEXT),
            context: DEFAULT_CONTEXT.to_string(),
            target_url: None,
        })
    }

    pub fn with_state(mut self, state: CommitState, description: impl Into<String>) -> Self {
        self.state = state;
        self.description = description.into();
        self
    }
}

/// Trait for outbound status reporting backends.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Post a status. `credential` is the project's provider token, if any.
    async fn report(&self, credential: Option<&str>, report: &StatusReport) -> Result<()>;
}
