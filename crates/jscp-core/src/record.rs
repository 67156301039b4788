//! Per-project pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::event::NormalizedEvent;
use crate::ProjectId;

/// One project's configuration, as declared in a single YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationRecord {
    /// Registry key. Required; files without it are rejected by the loader.
    #[serde(default)]
    pub project: ProjectId,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub registry_url: String,
    /// Credential used when reporting commit status for this project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(default)]
    pub pipelines: Vec<Pipeline>,
}

/// A named build-and-deploy pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub build: Build,
    #[serde(default)]
    pub deploy: Deploy,
}

/// What starts a pipeline. Empty fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub event: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub dockerfile: String,
    #[serde(default)]
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deploy {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub deployment_name: String,
}

impl ConfigurationRecord {
    /// Pipelines whose trigger matches the event, in declaration order.
    pub fn pipelines_for<'a>(
        &'a self,
        event: &'a NormalizedEvent,
    ) -> impl Iterator<Item = &'a Pipeline> + 'a {
        self.pipelines.iter().filter(move |p| p.is_triggered_by(event))
    }

    pub fn pipeline(&self, name: &str) -> Option<&Pipeline> {
        self.pipelines.iter().find(|p| p.name == name)
    }
}

impl Pipeline {
    pub fn is_triggered_by(&self, event: &NormalizedEvent) -> bool {
        self.trigger.matches(event)
    }
}

impl Trigger {
    pub fn matches(&self, event: &NormalizedEvent) -> bool {
        if !event.build_relevant() {
            return false;
        }

        let event_ok = self.event.is_empty() || self.event == event.event_type().as_str();
        if !event_ok {
            return false;
        }

        if self.branch.is_empty() {
            return true;
        }
        match event.branch() {
            Some(branch) => matches_branch_pattern(branch, &self.branch),
            None => false,
        }
    }
}

/// Check if a branch name matches a pattern.
/// Supports simple glob patterns with '*' wildcard.
fn matches_branch_pattern(branch: &str, pattern: &str) -> bool {
    if !pattern.contains('*') {
        return branch == pattern;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 2 {
        let (prefix, suffix) = (parts[0], parts[1]);
        branch.len() >= prefix.len() + suffix.len()
            && branch.starts_with(prefix)
            && branch.ends_with(suffix)
    } else {
        // Complex glob - fall back to exact match
        branch == pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use serde_json::json;

    fn push_to(branch: &str) -> NormalizedEvent {
        NormalizedEvent::new(
            EventKind::Push {
                r#ref: Some(format!("refs/heads/{}", branch)),
                head_sha: Some("deadbeef".to_string()),
            },
            Some("acme/api".to_string()),
            None,
            None,
            json!({}),
        )
    }

    fn pipeline(name: &str, branch: &str, event: &str) -> Pipeline {
        Pipeline {
            name: name.to_string(),
            trigger: Trigger {
                branch: branch.to_string(),
                event: event.to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_config_file() {
        let yaml = r#"
repo: acme/api
version: 1
project: api
registry_url: registry.example.com
github_token: ghp_example
pipelines:
  - name: main
    trigger:
      branch: main
      event: push
    build:
      context: .
      dockerfile: Dockerfile
      tag: latest
    deploy:
      namespace: prod
      deployment_name: api
"#;
        let record: ConfigurationRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(record.project.as_str(), "api");
        assert_eq!(record.github_token.as_deref(), Some("ghp_example"));
        assert_eq!(record.pipelines.len(), 1);
        assert_eq!(record.pipelines[0].build.dockerfile, "Dockerfile");
        assert_eq!(record.pipelines[0].deploy.deployment_name, "api");
    }

    #[test]
    fn test_missing_project_deserializes_empty() {
        let record: ConfigurationRecord = serde_yaml::from_str("repo: acme/api\n").unwrap();
        assert!(record.project.is_empty());
    }

    #[test]
    fn test_pipelines_for_filters_by_branch_and_event() {
        let record = ConfigurationRecord {
            project: "api".into(),
            pipelines: vec![
                pipeline("main", "main", "push"),
                pipeline("release", "release/*", "push"),
                pipeline("prs", "", "pull_request"),
                pipeline("any", "", ""),
            ],
            ..Default::default()
        };

        let event = push_to("main");
        let names: Vec<_> = record.pipelines_for(&event).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["main", "any"]);

        let event = push_to("release/1.4");
        let names: Vec<_> = record.pipelines_for(&event).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["release", "any"]);
    }

    #[test]
    fn test_ignored_event_triggers_nothing() {
        let record = ConfigurationRecord {
            project: "api".into(),
            pipelines: vec![pipeline("any", "", "")],
            ..Default::default()
        };
        let event = NormalizedEvent::ignored(json!({"zen": "hi"}));
        assert_eq!(record.pipelines_for(&event).count(), 0);
    }

    #[test]
    fn test_branch_patterns() {
        assert!(matches_branch_pattern("main", "main"));
        assert!(matches_branch_pattern("feature/login", "feature/*"));
        assert!(matches_branch_pattern("hotfix-prod", "*-prod"));
        assert!(!matches_branch_pattern("feature", "feature/*"));
        assert!(!matches_branch_pattern("develop", "main"));
        assert!(!matches_branch_pattern("ab", "ab*ba"));
    }
}
