//! Launch configuration and the launch request derived from it.
//!
//! The environment variable names in [`env`] are a contract with the launched
//! task: it reads exactly these five names to know which repository to update
//! and which artifact version to move to.

use serde::{Deserialize, Serialize};

use crate::{ClusterRef, ContainerName, LaunchType, Region, SubnetId, TaskDefinitionRef};

/// Names of the environment bindings handed to the launched task.
pub mod env {
    /// Clone URL of the dependent repository.
    pub const REPO_URL: &str = "REPO_URL";
    /// Name of the dependent repository.
    pub const REPO_NAME: &str = "REPO_NAME";
    /// Region the dependent repository lives in.
    pub const REPO_REGION: &str = "REPO_REGION";
    /// The newly published artifact version.
    pub const ARTIFACT_VERSION: &str = "ARTIFACT_VERSION";
    /// The newly published artifact's name.
    pub const ARTIFACT_ID: &str = "ARTIFACT_ID";
}

/// Static launch configuration, loaded once at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub task_definition: TaskDefinitionRef,
    pub cluster: ClusterRef,
    /// Subnets in the order they are passed to the scheduler.
    pub subnets: Vec<SubnetId>,
    /// Container that receives the environment overrides.
    pub container_name: ContainerName,
    pub repo_url: String,
    pub repo_name: String,
    pub repo_region: Region,
}

/// One `name=value` environment override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

impl EnvironmentVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A fully-resolved one-shot task invocation.
///
/// Has no identity of its own: it exists only for the single call that
/// issues it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub launch_type: LaunchType,
    pub task_definition: TaskDefinitionRef,
    pub cluster: ClusterRef,
    pub subnets: Vec<SubnetId>,
    pub container_name: ContainerName,
    /// Overrides for [`Self::container_name`]; names are unique.
    pub environment: Vec<EnvironmentVariable>,
}

impl LaunchRequest {
    /// Returns the value bound to `name`, if any.
    pub fn env(&self, name: &str) -> Option<&str> {
        self.environment
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }
}

/// Acknowledgement returned by the task-execution capability.
///
/// Confirms the scheduler accepted the request; it says nothing about whether
/// the task will succeed. The relay never waits for completion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchAcknowledgement {
    /// Opaque handles (task ARNs) of the tasks that were started.
    pub task_handles: Vec<String>,
}
