//! Task launch decision.
//!
//! The single business rule of the relay: every accepted release launches
//! exactly one update task, except snapshot builds, which never do.

use tracing::info;

use crate::launch::env;
use crate::{EnvironmentVariable, LaunchConfig, LaunchRequest, LaunchType, ReleaseEvent};

/// Marker that identifies a snapshot version.
///
/// Matched as a case-sensitive substring anywhere in the version string, so
/// `"1.0-SNAPSHOT"`, `"SNAPSHOT-1"` and `"1.0-SNAPSHOTX"` are all skipped while
/// `"1.0-snapshot"` is not.
pub const SNAPSHOT_MARKER: &str = "SNAPSHOT";

/// Outcome of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchDecision {
    /// Launch the task described by the request.
    Go(LaunchRequest),
    /// Do not launch; the release is a snapshot.
    Skip {
        /// The skipped version, for logging.
        version: String,
    },
}

impl LaunchDecision {
    /// Returns the launch request, or `None` for a skip.
    pub fn into_request(self) -> Option<LaunchRequest> {
        match self {
            Self::Go(request) => Some(request),
            Self::Skip { .. } => None,
        }
    }
}

/// Returns `true` if `version` contains [`SNAPSHOT_MARKER`].
pub fn is_snapshot(version: &str) -> bool {
    version.contains(SNAPSHOT_MARKER)
}

/// Decides whether `release` launches an update task and builds the request.
///
/// The environment carries the repository coordinates from `config` and the
/// package name and version from `release`, copied verbatim.
pub fn decide(release: &ReleaseEvent, config: &LaunchConfig) -> LaunchDecision {
    let version = release.package_version.as_str();
    let artifact = release.package_name.as_str();

    if is_snapshot(version) {
        info!(artifact, version, "Skipping SNAPSHOT version");
        return LaunchDecision::Skip {
            version: version.to_string(),
        };
    }

    info!(artifact, version, "Launching update task for release");
    LaunchDecision::Go(LaunchRequest {
        launch_type: LaunchType::Fargate,
        task_definition: config.task_definition.clone(),
        cluster: config.cluster.clone(),
        subnets: config.subnets.clone(),
        container_name: config.container_name.clone(),
        environment: vec![
            EnvironmentVariable::new(env::REPO_URL, config.repo_url.as_str()),
            EnvironmentVariable::new(env::REPO_NAME, config.repo_name.as_str()),
            EnvironmentVariable::new(env::REPO_REGION, config.repo_region.as_str()),
            EnvironmentVariable::new(env::ARTIFACT_VERSION, version),
            EnvironmentVariable::new(env::ARTIFACT_ID, artifact),
        ],
    })
}

/// Shorthand for `decide(release, config).into_request()`.
pub fn launch_request(release: &ReleaseEvent, config: &LaunchConfig) -> Option<LaunchRequest> {
    decide(release, config).into_request()
}
