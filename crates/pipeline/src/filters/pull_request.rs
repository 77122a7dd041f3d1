//! Build trigger filter.

use serde::{Deserialize, Serialize};

use crate::envelope::{detail_types, sources};
use crate::{EventEnvelope, GitRef, ProjectName, PullRequestAction, PullRequestEvent, RepositoryId};

/// Branch prefix the update task pushes its pull requests from.
pub const SOURCE_REF_PREFIX: &str = "refs/heads/library_update_";

/// The trunk branch update pull requests must target.
pub const TRUNK_REF: &str = "refs/heads/main";

/// A build to start, derived from a matching pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTrigger {
    pub project: ProjectName,
    /// The pull request's source reference, passed to the build unmodified.
    pub source_version: GitRef,
}

/// Matches newly created update pull requests against trunk in the
/// dependent repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTriggerFilter {
    repository: RepositoryId,
    project: ProjectName,
}

impl BuildTriggerFilter {
    /// Creates a filter for pull requests in `repository` that builds them
    /// with `project`.
    pub fn new(repository: RepositoryId, project: ProjectName) -> Self {
        Self {
            repository,
            project,
        }
    }

    /// Returns `true` if `event` is an update pull request that should be built.
    pub fn accepts(&self, event: &PullRequestEvent) -> bool {
        event.action == PullRequestAction::Created
            && event.repository_ids.contains(&self.repository)
            && event.source_reference.as_str().starts_with(SOURCE_REF_PREFIX)
            && event.destination_reference.as_str() == TRUNK_REF
    }

    /// Returns the build to start if `envelope` is a matching pull request
    /// event.
    pub fn evaluate(&self, envelope: &EventEnvelope) -> Option<BuildTrigger> {
        if !envelope.is(sources::SOURCE_CONTROL, detail_types::PULL_REQUEST_STATE_CHANGE) {
            return None;
        }
        let event = PullRequestEvent::from_envelope(envelope)?;
        self.accepts(&event).then(|| BuildTrigger {
            project: self.project.clone(),
            source_version: event.source_reference,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{pull_request_envelope, BUILD_PROJECT, REPOSITORY_ARN};
    use serde_json::json;

    fn filter() -> BuildTriggerFilter {
        BuildTriggerFilter::new(
            RepositoryId::new(REPOSITORY_ARN).unwrap(),
            ProjectName::new(BUILD_PROJECT).unwrap(),
        )
    }

    #[test]
    fn update_branch_against_main_triggers_build() {
        let envelope = pull_request_envelope("refs/heads/library_update_2.1.0", "refs/heads/main");

        let trigger = filter().evaluate(&envelope).unwrap();

        assert_eq!(trigger.project.as_str(), BUILD_PROJECT);
        assert_eq!(trigger.source_version.as_str(), "refs/heads/library_update_2.1.0");
    }

    #[test]
    fn other_destination_does_not_trigger() {
        let envelope = pull_request_envelope("refs/heads/library_update_2.1.0", "refs/heads/dev");
        assert!(filter().evaluate(&envelope).is_none());
    }

    #[test]
    fn branch_without_prefix_does_not_trigger() {
        for source in [
            "refs/heads/feature/library_update_2.1.0",
            "refs/heads/library-update_2.1.0",
            "library_update_2.1.0",
            "refs/heads/Library_update_2.1.0",
        ] {
            let envelope = pull_request_envelope(source, "refs/heads/main");
            assert!(filter().evaluate(&envelope).is_none(), "{source} must not trigger");
        }
    }

    #[test]
    fn bare_prefix_triggers() {
        let envelope = pull_request_envelope("refs/heads/library_update_", "refs/heads/main");
        assert!(filter().evaluate(&envelope).is_some());
    }

    #[test]
    fn actions_other_than_created_do_not_trigger() {
        let mut envelope =
            pull_request_envelope("refs/heads/library_update_2.1.0", "refs/heads/main");
        envelope.detail["event"] = json!("pullRequestSourceBranchUpdated");
        assert!(filter().evaluate(&envelope).is_none());
    }

    #[test]
    fn other_repository_does_not_trigger() {
        let mut envelope =
            pull_request_envelope("refs/heads/library_update_2.1.0", "refs/heads/main");
        envelope.resources = vec!["arn:aws:codecommit:eu-west-1:222222222222:Other".to_string()];
        assert!(filter().evaluate(&envelope).is_none());
    }

    #[test]
    fn wrong_source_does_not_trigger() {
        let mut envelope =
            pull_request_envelope("refs/heads/library_update_2.1.0", "refs/heads/main");
        envelope.source = "aws.codebuild".to_string();
        assert!(filter().evaluate(&envelope).is_none());
    }

    #[test]
    fn accepts_checks_the_typed_event() {
        let event = PullRequestEvent {
            repository_ids: vec![RepositoryId::new(REPOSITORY_ARN).unwrap()],
            source_reference: GitRef::new("refs/heads/library_update_3.0.0").unwrap(),
            destination_reference: GitRef::new("refs/heads/main").unwrap(),
            action: PullRequestAction::Created,
        };
        assert!(filter().accepts(&event));

        let closed = PullRequestEvent {
            action: PullRequestAction::StatusChanged,
            ..event
        };
        assert!(!filter().accepts(&closed));
    }
}
