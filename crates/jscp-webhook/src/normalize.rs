//! The authenticate, decode, classify, extract pipeline.

use jscp_core::{EventType, NormalizedEvent};
use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::{self, classify, extract, resolve_actor};
use crate::signature::verify_signature;
use crate::WebhookResult;

/// Normalize a raw webhook request.
///
/// `signature` is the `X-Hub-Signature-256` header value. When `secret` is
/// `None` or empty, signature verification is skipped entirely; callers that
/// need strict mode must configure a secret.
///
/// Fails only on authentication or JSON decoding. Any well-formed payload
/// yields an event, `ignored` in the worst case.
pub fn normalize(
    body: &[u8],
    signature: Option<&str>,
    secret: Option<&str>,
) -> WebhookResult<NormalizedEvent> {
    if let Some(secret) = secret.filter(|s| !s.is_empty()) {
        if let Err(e) = verify_signature(secret, body, signature) {
            warn!(error = %e, "Rejected webhook");
            return Err(e);
        }
    }

    let payload: Value = serde_json::from_slice(body)?;
    Ok(from_payload(payload))
}

/// Build an event from an already authenticated, decoded payload.
pub fn from_payload(payload: Value) -> NormalizedEvent {
    let event_type = classify(&payload);
    if event_type == EventType::Ignored {
        debug!("Webhook payload matched no known event shape");
        return NormalizedEvent::ignored(payload);
    }

    let kind = extract(event_type, &payload);
    let event = NormalizedEvent::new(
        kind,
        classify::repo_name(&payload),
        resolve_actor(&payload),
        classify::action(&payload),
        payload,
    );

    debug!(
        event_type = %event.event_type(),
        repo = ?event.repo_name(),
        git_ref = ?event.git_ref(),
        sha = ?event.commit_sha(),
        "Normalized webhook"
    );
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign;
    use crate::WebhookError;
    use jscp_core::EventKind;
    use serde_json::json;

    const SECRET: &str = "s3cr3t";

    fn push_body() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "ref": "refs/heads/main",
            "before": "0000000000000000000000000000000000000000",
            "after": "9f2c1c0de2b1f6d05ea4c8f1d6c0e1d2a3b4c5d6",
            "repository": {"name": "widgets", "full_name": "acme/widgets"},
            "pusher": {"name": "octocat"},
            "sender": {"login": "octocat-login"},
            "head_commit": {"id": "9f2c1c0de2b1f6d05ea4c8f1d6c0e1d2a3b4c5d6", "message": "fix"},
            "commits": [{"id": "9f2c1c0de2b1f6d05ea4c8f1d6c0e1d2a3b4c5d6"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_signed_push() {
        let body = push_body();
        let signature = sign(SECRET, &body);
        let event = normalize(&body, Some(&signature), Some(SECRET)).unwrap();

        assert_eq!(event.event_type(), EventType::Push);
        assert!(event.build_relevant());
        assert_eq!(event.repo_name(), Some("acme/widgets"));
        assert_eq!(event.git_ref(), Some("refs/heads/main"));
        assert_eq!(event.branch(), Some("main"));
        assert_eq!(event.commit_sha(), Some("9f2c1c0de2b1f6d05ea4c8f1d6c0e1d2a3b4c5d6"));
        assert_eq!(event.actor(), Some("octocat"));
        assert_eq!(event.action(), None);
        assert_eq!(event.raw()["pusher"]["name"], "octocat");
    }

    #[test]
    fn test_rejects_before_decoding() {
        let err = normalize(b"not json", Some("sha256=00"), Some(SECRET)).unwrap_err();
        assert!(err.is_authentication());

        let err = normalize(b"not json", None, Some(SECRET)).unwrap_err();
        assert!(matches!(err, WebhookError::MissingSignature));
    }

    #[test]
    fn test_permissive_without_secret() {
        let body = push_body();
        assert!(normalize(&body, None, None).is_ok());
        assert!(normalize(&body, Some("sha256=garbage"), Some("")).is_ok());
    }

    #[test]
    fn test_malformed_json() {
        let body = b"{\"ref\": ";
        let signature = sign(SECRET, body);
        let err = normalize(body, Some(&signature), Some(SECRET)).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidPayload(_)));
        assert!(!err.is_authentication());
    }

    #[test]
    fn test_unrecognized_payload_is_ignored() {
        let body = br#"{"zen": "Design for failure.", "hook_id": 42, "action": "ping",
            "repository": {"full_name": "acme/widgets"}, "sender": {"login": "octocat"}}"#;
        let event = normalize(body, None, None).unwrap();

        assert_eq!(event.event_type(), EventType::Ignored);
        assert!(!event.build_relevant());
        assert_eq!(event.git_ref(), None);
        assert_eq!(event.commit_sha(), None);
        assert_eq!(event.action(), None);
        assert_eq!(event.repo_name(), None);
        assert_eq!(event.raw()["hook_id"], 42);
    }

    #[test]
    fn test_pull_request_with_commits_is_pull_request() {
        let payload = json!({
            "action": "synchronize",
            "number": 7,
            "pull_request": {
                "number": 7,
                "user": {"login": "contributor"},
                "head": {"ref": "feature/login", "sha": "c0ffee"}
            },
            "commits": [{"id": "c0ffee"}],
            "repository": {"full_name": "acme/widgets"},
            "sender": {"login": "reviewer"}
        });
        let event = from_payload(payload);

        assert_eq!(
            event.kind(),
            &EventKind::PullRequest {
                number: Some(7),
                head_ref: Some("feature/login".to_string()),
                head_sha: Some("c0ffee".to_string()),
            }
        );
        assert_eq!(event.action(), Some("synchronize"));
        // sender precedes the pull request author in the chain
        assert_eq!(event.actor(), Some("reviewer"));
    }

    #[test]
    fn test_release_event() {
        let payload = json!({
            "action": "published",
            "release": {
                "tag_name": "v1.2.0",
                "target_commitish": "main",
                "author": {"login": "releaser"}
            },
            "repository": {"full_name": "acme/widgets"}
        });
        let event = from_payload(payload);

        assert_eq!(event.event_type(), EventType::Release);
        assert_eq!(event.git_ref(), Some("main"));
        assert_eq!(event.commit_sha(), Some("v1.2.0"));
        assert_eq!(event.actor(), Some("releaser"));
        assert_eq!(event.action(), Some("published"));
    }
}
