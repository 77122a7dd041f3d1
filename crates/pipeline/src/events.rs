//! Typed views of the three inbound event kinds.
//!
//! Each type is extracted from an [`EventEnvelope`] by the matching filter in
//! [`crate::filters`]; none of them is ever mutated after extraction.

use serde::{Deserialize, Serialize};

use crate::{
    AccountId, EventEnvelope, GitRef, PackageName, PackageNamespace, PackageVersion, ProjectName,
    RepositoryId,
};

// ---------------------------------------------------------------------------
// Release events
// ---------------------------------------------------------------------------

/// Package format reported by the artifact repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageFormat {
    Maven,
    Npm,
    Pypi,
    Nuget,
    Generic,
    /// A format this relay does not know by name.
    Other(String),
}

impl PackageFormat {
    /// Parses the wire value (`"maven"`, `"npm"`, ...).
    pub fn from_wire(value: &str) -> Self {
        match value {
            "maven" => Self::Maven,
            "npm" => Self::Npm,
            "pypi" => Self::Pypi,
            "nuget" => Self::Nuget,
            "generic" => Self::Generic,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire value.
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Maven => "maven",
            Self::Npm => "npm",
            Self::Pypi => "pypi",
            Self::Nuget => "nuget",
            Self::Generic => "generic",
            Self::Other(other) => other,
        }
    }
}

/// State of a package version in the artifact repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageVersionState {
    Published,
    Unfinished,
    Unlisted,
    Archived,
    Disposed,
    Deleted,
    /// A state this relay does not know by name.
    Other(String),
}

impl PackageVersionState {
    /// Parses the wire value (`"Published"`, `"Unlisted"`, ...).
    pub fn from_wire(value: &str) -> Self {
        match value {
            "Published" => Self::Published,
            "Unfinished" => Self::Unfinished,
            "Unlisted" => Self::Unlisted,
            "Archived" => Self::Archived,
            "Disposed" => Self::Disposed,
            "Deleted" => Self::Deleted,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the wire value.
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Published => "Published",
            Self::Unfinished => "Unfinished",
            Self::Unlisted => "Unlisted",
            Self::Archived => "Archived",
            Self::Disposed => "Disposed",
            Self::Deleted => "Deleted",
            Self::Other(other) => other,
        }
    }
}

/// A package version state change in the artifact repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEvent {
    /// Account that owns the artifact repository domain.
    pub domain_owner: AccountId,
    pub package_namespace: PackageNamespace,
    pub package_name: PackageName,
    pub package_version: PackageVersion,
    pub package_format: PackageFormat,
    pub state: PackageVersionState,
}

impl ReleaseEvent {
    /// Reads a release event out of an envelope's detail.
    ///
    /// Returns `None` if any of the six fields is missing, not a string, or
    /// empty, or if the domain owner is not a well-formed account id. The
    /// envelope's source and detail type are not checked here.
    pub fn from_envelope(envelope: &EventEnvelope) -> Option<Self> {
        Some(Self {
            domain_owner: AccountId::new(envelope.detail_str("domainOwner")?)?,
            package_namespace: PackageNamespace::new(envelope.detail_str("packageNamespace")?)?,
            package_name: PackageName::new(envelope.detail_str("packageName")?)?,
            package_version: PackageVersion::new(envelope.detail_str("packageVersion")?)?,
            package_format: PackageFormat::from_wire(envelope.detail_str("packageFormat")?),
            state: PackageVersionState::from_wire(envelope.detail_str("packageVersionState")?),
        })
    }
}

// ---------------------------------------------------------------------------
// Pull request events
// ---------------------------------------------------------------------------

/// What happened to a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PullRequestAction {
    Created,
    SourceBranchUpdated,
    StatusChanged,
    MergeStatusUpdated,
    /// An action this relay does not know by name.
    Other(String),
}

impl PullRequestAction {
    /// Parses the wire value of `detail.event`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "pullRequestCreated" => Self::Created,
            "pullRequestSourceBranchUpdated" => Self::SourceBranchUpdated,
            "pullRequestStatusChanged" => Self::StatusChanged,
            "pullRequestMergeStatusUpdated" => Self::MergeStatusUpdated,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A pull request state change in the source-control host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    /// Repositories named in the envelope's `resources`.
    pub repository_ids: Vec<RepositoryId>,
    pub source_reference: GitRef,
    pub destination_reference: GitRef,
    pub action: PullRequestAction,
}

impl PullRequestEvent {
    /// Reads a pull request event out of an envelope.
    ///
    /// Returns `None` if `event`, `sourceReference` or `destinationReference`
    /// is missing, not a string, or empty.
    pub fn from_envelope(envelope: &EventEnvelope) -> Option<Self> {
        Some(Self {
            repository_ids: envelope
                .resources
                .iter()
                .filter_map(|r| RepositoryId::new(r.as_str()))
                .collect(),
            source_reference: GitRef::new(envelope.detail_str("sourceReference")?)?,
            destination_reference: GitRef::new(envelope.detail_str("destinationReference")?)?,
            action: PullRequestAction::from_wire(envelope.detail_str("event")?),
        })
    }
}

// ---------------------------------------------------------------------------
// Build status events
// ---------------------------------------------------------------------------

/// Build state reported by the build runner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildStatus {
    Failed,
    Succeeded,
    InProgress,
    Stopped,
    Fault,
    TimedOut,
    /// A status this relay does not know by name.
    Other(String),
}

impl BuildStatus {
    /// Parses the wire value of `detail["build-status"]`.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "FAILED" => Self::Failed,
            "SUCCEEDED" => Self::Succeeded,
            "IN_PROGRESS" => Self::InProgress,
            "STOPPED" => Self::Stopped,
            "FAULT" => Self::Fault,
            "TIMED_OUT" => Self::TimedOut,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A build state change in the build runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatusEvent {
    /// The project the build belongs to, if the event names one.
    pub project_id: Option<ProjectName>,
    pub status: BuildStatus,
    /// Account the build ran in.
    pub origin_account: AccountId,
}

impl BuildStatusEvent {
    /// Reads a build status event out of an envelope.
    ///
    /// Returns `None` if `detail["build-status"]` is missing or not a string,
    /// or if the envelope's `account` is absent or malformed.
    pub fn from_envelope(envelope: &EventEnvelope) -> Option<Self> {
        Some(Self {
            project_id: envelope.detail_str("project-name").and_then(ProjectName::new),
            status: BuildStatus::from_wire(envelope.detail_str("build-status")?),
            origin_account: AccountId::new(envelope.account.as_deref()?)?,
        })
    }
}
