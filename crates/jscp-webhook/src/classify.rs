//! Payload classification and field extraction.

use jscp_core::{EventKind, EventType};
use serde_json::Value;

/// Top-level keys tested in order; the first one present decides the type.
///
/// A pull request payload also carries commit data, so it must be tested
/// before the push keys.
const PRECEDENCE: &[(&str, EventType)] = &[
    ("pull_request", EventType::PullRequest),
    ("head_commit", EventType::Push),
    ("commits", EventType::Push),
    ("release", EventType::Release),
    ("workflow_run", EventType::WorkflowRun),
    ("deployment", EventType::Deployment),
];

/// Where the acting user is found, tried in order.
pub const ACTOR_CHAIN: &[(&str, &str)] = &[
    ("pusher", "/pusher/name"),
    ("sender", "/sender/login"),
    ("pull_request.user", "/pull_request/user/login"),
    ("release.author", "/release/author/login"),
    ("deployment.creator", "/deployment/creator/login"),
    ("workflow_run.actor", "/workflow_run/actor/login"),
];

fn present(payload: &Value, key: &str) -> bool {
    payload.get(key).is_some_and(|v| !v.is_null())
}

/// Non-empty string at a JSON pointer.
fn string_at(payload: &Value, pointer: &str) -> Option<String> {
    payload
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Select the event type for a decoded payload.
pub fn classify(payload: &Value) -> EventType {
    PRECEDENCE
        .iter()
        .find(|(key, _)| present(payload, key))
        .map(|(_, event_type)| *event_type)
        .unwrap_or(EventType::Ignored)
}

/// Pull the per-type fields out of a payload already classified as `event_type`.
pub fn extract(event_type: EventType, payload: &Value) -> EventKind {
    match event_type {
        EventType::Push => EventKind::Push {
            r#ref: string_at(payload, "/ref"),
            head_sha: string_at(payload, "/head_commit/id")
                .or_else(|| string_at(payload, "/after")),
        },
        EventType::PullRequest => EventKind::PullRequest {
            number: payload
                .pointer("/pull_request/number")
                .and_then(|n| n.as_u64())
                .or_else(|| payload.get("number").and_then(|n| n.as_u64())),
            head_ref: string_at(payload, "/pull_request/head/ref"),
            head_sha: string_at(payload, "/pull_request/head/sha"),
        },
        EventType::Release => EventKind::Release {
            tag_name: string_at(payload, "/release/tag_name"),
            target_commitish: string_at(payload, "/release/target_commitish"),
        },
        EventType::WorkflowRun => EventKind::WorkflowRun {
            name: string_at(payload, "/workflow_run/name"),
            head_branch: string_at(payload, "/workflow_run/head_branch"),
            head_sha: string_at(payload, "/workflow_run/head_sha"),
        },
        EventType::Deployment => EventKind::Deployment {
            environment: string_at(payload, "/deployment/environment"),
            r#ref: string_at(payload, "/deployment/ref"),
            sha: string_at(payload, "/deployment/sha"),
        },
        EventType::Ignored => EventKind::Ignored,
    }
}

/// First actor found along [`ACTOR_CHAIN`].
pub fn resolve_actor(payload: &Value) -> Option<String> {
    ACTOR_CHAIN
        .iter()
        .find_map(|(_, pointer)| string_at(payload, pointer))
}

pub(crate) fn repo_name(payload: &Value) -> Option<String> {
    string_at(payload, "/repository/full_name")
}

pub(crate) fn action(payload: &Value) -> Option<String> {
    string_at(payload, "/action")
}
