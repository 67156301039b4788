//! Normalized webhook events.

use serde::{Deserialize, Serialize};

/// Canonical event classification for an inbound webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Push,
    PullRequest,
    Release,
    WorkflowRun,
    Deployment,
    Ignored,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Push => "push",
            EventType::PullRequest => "pull_request",
            EventType::Release => "release",
            EventType::WorkflowRun => "workflow_run",
            EventType::Deployment => "deployment",
            EventType::Ignored => "ignored",
        }
    }

    /// Whether an event of this type should feed a build/deploy decision.
    pub fn is_build_relevant(&self) -> bool {
        !matches!(self, EventType::Ignored)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "push" => Ok(EventType::Push),
            "pull_request" => Ok(EventType::PullRequest),
            "release" => Ok(EventType::Release),
            "workflow_run" => Ok(EventType::WorkflowRun),
            "deployment" => Ok(EventType::Deployment),
            "ignored" => Ok(EventType::Ignored),
            _ => Err(format!("Unknown event type: {}", s)),
        }
    }
}

/// Per-kind event data. Each variant carries only the fields that event
/// actually has in the provider payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Push {
        r#ref: Option<String>,
        /// Head commit id, or the `after` sha when there is no head commit.
        head_sha: Option<String>,
    },
    PullRequest {
        number: Option<u64>,
        head_ref: Option<String>,
        head_sha: Option<String>,
    },
    Release {
        tag_name: Option<String>,
        target_commitish: Option<String>,
    },
    WorkflowRun {
        name: Option<String>,
        head_branch: Option<String>,
        head_sha: Option<String>,
    },
    Deployment {
        environment: Option<String>,
        r#ref: Option<String>,
        sha: Option<String>,
    },
    Ignored,
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::Push { .. } => EventType::Push,
            EventKind::PullRequest { .. } => EventType::PullRequest,
            EventKind::Release { .. } => EventType::Release,
            EventKind::WorkflowRun { .. } => EventType::WorkflowRun,
            EventKind::Deployment { .. } => EventType::Deployment,
            EventKind::Ignored => EventType::Ignored,
        }
    }

    /// The git ref this event points at.
    pub fn git_ref(&self) -> Option<&str> {
        match self {
            EventKind::Push { r#ref, .. } => r#ref.as_deref(),
            EventKind::PullRequest { head_ref, .. } => head_ref.as_deref(),
            EventKind::Release {
                target_commitish, ..
            } => target_commitish.as_deref(),
            EventKind::WorkflowRun { head_branch, .. } => head_branch.as_deref(),
            EventKind::Deployment { r#ref, .. } => r#ref.as_deref(),
            EventKind::Ignored => None,
        }
    }

    /// The identifying commit token. For releases this is the tag name.
    pub fn commit_sha(&self) -> Option<&str> {
        match self {
            EventKind::Push { head_sha, .. } => head_sha.as_deref(),
            EventKind::PullRequest { head_sha, .. } => head_sha.as_deref(),
            EventKind::Release { tag_name, .. } => tag_name.as_deref(),
            EventKind::WorkflowRun { head_sha, .. } => head_sha.as_deref(),
            EventKind::Deployment { sha, .. } => sha.as_deref(),
            EventKind::Ignored => None,
        }
    }
}

/// A provider webhook reduced to the fields a build trigger needs.
///
/// Built once per inbound request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    kind: EventKind,
    repo_name: Option<String>,
    actor: Option<String>,
    action: Option<String>,
    raw: serde_json::Value,
}

impl NormalizedEvent {
    pub fn new(
        kind: EventKind,
        repo_name: Option<String>,
        actor: Option<String>,
        action: Option<String>,
        raw: serde_json::Value,
    ) -> Self {
        if matches!(kind, EventKind::Ignored) {
            return Self::ignored(raw);
        }
        Self {
            kind,
            repo_name,
            actor,
            action,
            raw,
        }
    }

    /// An unrecognized payload. Only `raw` is retained.
    pub fn ignored(raw: serde_json::Value) -> Self {
        Self {
            kind: EventKind::Ignored,
            repo_name: None,
            actor: None,
            action: None,
            raw,
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn build_relevant(&self) -> bool {
        self.event_type().is_build_relevant()
    }

    pub fn repo_name(&self) -> Option<&str> {
        self.repo_name.as_deref()
    }

    pub fn git_ref(&self) -> Option<&str> {
        self.kind.git_ref()
    }

    pub fn commit_sha(&self) -> Option<&str> {
        self.kind.commit_sha()
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Branch name with any `refs/heads/` prefix removed.
    pub fn branch(&self) -> Option<&str> {
        self.git_ref()
            .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
    }

    /// Owner half of an `owner/name` repository full name.
    pub fn repo_owner(&self) -> Option<&str> {
        self.repo_name()
            .and_then(|n| n.split_once('/'))
            .map(|(owner, _)| owner)
    }

    /// Repository name without its owner.
    pub fn repo_short_name(&self) -> Option<&str> {
        self.repo_name()
            .map(|n| n.split_once('/').map(|(_, name)| name).unwrap_or(n))
    }

    /// Flat, serializable view of the event without the raw payload.
    pub fn summary(&self) -> EventSummary<'_> {
        EventSummary {
            event_type: self.event_type(),
            repo_name: self.repo_name(),
            r#ref: self.git_ref(),
            commit_sha: self.commit_sha(),
            actor: self.actor(),
            action: self.action(),
            build_relevant: self.build_relevant(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSummary<'a> {
    pub event_type: EventType,
    pub repo_name: Option<&'a str>,
    pub r#ref: Option<&'a str>,
    pub commit_sha: Option<&'a str>,
    pub actor: Option<&'a str>,
    pub action: Option<&'a str>,
    pub build_relevant: bool,
}
