//! Release event filter.

use crate::envelope::{detail_types, sources};
use crate::{AccountId, EventEnvelope, PackageFormat, PackageVersionState, ReleaseEvent};

/// Matches published Maven package versions owned by the producer account.
///
/// The consumer side uses the bare filter. The producer side additionally
/// restricts it to the shared repository domain and repository with
/// [`ReleaseFilter::restricted_to`], so unrelated repositories in the same
/// account are never forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFilter {
    domain_owner: AccountId,
    domain_name: Option<String>,
    repository_name: Option<String>,
}

impl ReleaseFilter {
    /// Creates a filter for releases owned by `domain_owner`.
    pub fn new(domain_owner: AccountId) -> Self {
        Self {
            domain_owner,
            domain_name: None,
            repository_name: None,
        }
    }

    /// Additionally requires `detail.domainName` and `detail.repositoryName`
    /// to equal the given values.
    pub fn restricted_to(
        mut self,
        domain_name: impl Into<String>,
        repository_name: impl Into<String>,
    ) -> Self {
        self.domain_name = Some(domain_name.into());
        self.repository_name = Some(repository_name.into());
        self
    }

    /// Returns the release carried by `envelope` if it matches.
    pub fn evaluate(&self, envelope: &EventEnvelope) -> Option<ReleaseEvent> {
        if !envelope.is(
            sources::ARTIFACT_REPOSITORY,
            detail_types::PACKAGE_VERSION_STATE_CHANGE,
        ) {
            return None;
        }
        if envelope.detail_str("domainOwner") != Some(self.domain_owner.as_str()) {
            return None;
        }
        if let Some(domain_name) = &self.domain_name {
            if envelope.detail_str("domainName") != Some(domain_name.as_str()) {
                return None;
            }
        }
        if let Some(repository_name) = &self.repository_name {
            if envelope.detail_str("repositoryName") != Some(repository_name.as_str()) {
                return None;
            }
        }

        let release = ReleaseEvent::from_envelope(envelope)?;
        let accepted = release.state == PackageVersionState::Published
            && release.package_format == PackageFormat::Maven;
        accepted.then_some(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{release_envelope, PRODUCER};
    use serde_json::json;

    fn filter() -> ReleaseFilter {
        ReleaseFilter::new(AccountId::new(PRODUCER).unwrap())
    }

    #[test]
    fn published_maven_release_matches() {
        let release = filter()
            .evaluate(&release_envelope("com.acme", "shared", "3.0.0"))
            .unwrap();

        assert_eq!(release.package_namespace.as_str(), "com.acme");
        assert_eq!(release.package_name.as_str(), "shared");
        assert_eq!(release.package_version.as_str(), "3.0.0");
    }

    #[test]
    fn snapshot_versions_still_match_the_filter() {
        // Snapshots are dropped by the launch decision, not here.
        let envelope = release_envelope("com.acme", "shared", "3.0.0-SNAPSHOT");
        assert!(filter().evaluate(&envelope).is_some());
    }

    #[test]
    fn wrong_state_does_not_match() {
        let mut envelope = release_envelope("com.acme", "shared", "3.0.0");
        envelope.detail["packageVersionState"] = json!("Unpublished");
        assert!(filter().evaluate(&envelope).is_none());

        envelope.detail["packageVersionState"] = json!("Unlisted");
        assert!(filter().evaluate(&envelope).is_none());
    }

    #[test]
    fn wrong_format_does_not_match() {
        let mut envelope = release_envelope("com.acme", "shared", "3.0.0");
        envelope.detail["packageFormat"] = json!("npm");
        assert!(filter().evaluate(&envelope).is_none());
    }

    #[test]
    fn wrong_source_or_detail_type_does_not_match() {
        let mut envelope = release_envelope("com.acme", "shared", "3.0.0");
        envelope.source = "custom.publisher".to_string();
        assert!(filter().evaluate(&envelope).is_none());

        let mut envelope = release_envelope("com.acme", "shared", "3.0.0");
        envelope.detail_type = "Package Version State Change".to_string();
        assert!(filter().evaluate(&envelope).is_none());
    }

    #[test]
    fn other_domain_owner_does_not_match() {
        let mut envelope = release_envelope("com.acme", "shared", "3.0.0");
        envelope.detail["domainOwner"] = json!("999999999999");
        assert!(filter().evaluate(&envelope).is_none());
    }

    #[test]
    fn restricted_filter_checks_domain_and_repository() {
        let restricted = filter().restricted_to("codeartifact-domain", "codeartifact");

        let envelope = release_envelope("com.acme", "shared", "3.0.0");
        assert!(restricted.evaluate(&envelope).is_some());

        let mut other_repo = envelope.clone();
        other_repo.detail["repositoryName"] = json!("scratch");
        assert!(restricted.evaluate(&other_repo).is_none());

        let mut no_domain = envelope;
        no_domain.detail.as_object_mut().unwrap().remove("domainName");
        assert!(restricted.evaluate(&no_domain).is_none());
    }
}
