//! In-memory fakes of the port traits and event fixtures (testing only).
//!
//! Compiled for this crate's own tests and, through the `fakes` feature, for
//! the tests of downstream crates. The recording fakes satisfy the port
//! contracts without any I/O and remember every call they receive.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::json;

use crate::bridge::BusAddress;
use crate::config::{ConsumerSettings, ProducerSettings, SideSettings};
use crate::envelope::{detail_types, sources};
use crate::filters::BuildTrigger;
use crate::ports::{
    BuildHandle, BuildStarter, EventBusPublisher, EventSource, PublishReceipt, TaskLauncher,
    TopicPublisher,
};
use crate::{
    AccountId, ClusterRef, ContainerName, EventBusName, EventEnvelope, LaunchAcknowledgement,
    LaunchConfig, LaunchRequest, PackageFormat, PackageName, PackageNamespace, PackageVersion,
    PackageVersionState, ProjectName, Region, RelayConfig, RelayError, ReleaseEvent, RepositoryId,
    SubnetId, TaskDefinitionRef, TopicRef,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const PRODUCER: &str = "111111111111";
pub const CONSUMER: &str = "222222222222";
pub const REGION: &str = "eu-west-1";
pub const REPOSITORY_ARN: &str = "arn:aws:codecommit:eu-west-1:222222222222:DownstreamArtifact";
pub const BUILD_PROJECT: &str = "DownstreamArtifactBuild";
pub const ALERT_TOPIC: &str = "arn:aws:sns:eu-west-1:111111111111:BrokenDownstreamBuildTopic";
pub const DOMAIN_NAME: &str = "codeartifact-domain";
pub const REPOSITORY_NAME: &str = "codeartifact";

/// A launch configuration with two subnets.
pub fn launch_config() -> LaunchConfig {
    LaunchConfig {
        task_definition: TaskDefinitionRef::new(
            "arn:aws:ecs:eu-west-1:222222222222:task-definition/PullRequestCreatorTask:1",
        )
        .expect("fixture"),
        cluster: ClusterRef::new("arn:aws:ecs:eu-west-1:222222222222:cluster/ECSCluster")
            .expect("fixture"),
        subnets: vec![
            SubnetId::new("subnet-0a").expect("fixture"),
            SubnetId::new("subnet-0b").expect("fixture"),
        ],
        container_name: ContainerName::new("PullRequestCreatorContainer").expect("fixture"),
        repo_url: "https://git-codecommit.eu-west-1.amazonaws.com/v1/repos/DownstreamArtifact"
            .to_string(),
        repo_name: "DownstreamArtifact".to_string(),
        repo_region: Region::new(REGION).expect("fixture"),
    }
}

/// A published Maven release of `com.acme:{name}:{version}` owned by the producer.
pub fn release(name: &str, version: &str) -> ReleaseEvent {
    ReleaseEvent {
        domain_owner: AccountId::new(PRODUCER).expect("fixture"),
        package_namespace: PackageNamespace::new("com.acme").expect("fixture"),
        package_name: PackageName::new(name).expect("fixture"),
        package_version: PackageVersion::new(version).expect("fixture"),
        package_format: PackageFormat::Maven,
        state: PackageVersionState::Published,
    }
}

/// A bus envelope announcing a published Maven release in the shared repository.
pub fn release_envelope(namespace: &str, name: &str, version: &str) -> EventEnvelope {
    EventEnvelope::new(
        sources::ARTIFACT_REPOSITORY,
        detail_types::PACKAGE_VERSION_STATE_CHANGE,
        json!({
            "domainName": DOMAIN_NAME,
            "domainOwner": PRODUCER,
            "repositoryName": REPOSITORY_NAME,
            "packageFormat": "maven",
            "packageNamespace": namespace,
            "packageName": name,
            "packageVersion": version,
            "packageVersionState": "Published",
            "packageVersionRevision": "Ypu1Ol9fXx4=",
            "changes": { "assetsAdded": 3, "assetsRemoved": 0, "metadataChanged": true },
            "operationType": "Created",
            "sequenceNumber": 1,
            "eventDeduplicationId": "0123456789abcdef",
        }),
    )
    .with_account(PRODUCER)
    .with_region(REGION)
}

/// A bus envelope announcing a new pull request in the dependent repository.
pub fn pull_request_envelope(source_reference: &str, destination_reference: &str) -> EventEnvelope {
    EventEnvelope::new(
        sources::SOURCE_CONTROL,
        detail_types::PULL_REQUEST_STATE_CHANGE,
        json!({
            "event": "pullRequestCreated",
            "pullRequestId": "1",
            "pullRequestStatus": "Open",
            "repositoryNames": ["DownstreamArtifact"],
            "sourceReference": source_reference,
            "destinationReference": destination_reference,
            "title": "Update shared library",
        }),
    )
    .with_account(CONSUMER)
    .with_region(REGION)
    .with_resource(REPOSITORY_ARN)
}

/// A bus envelope announcing a build state change in `account`.
pub fn build_envelope(status: &str, account: &str) -> EventEnvelope {
    EventEnvelope::new(
        sources::BUILD_SYSTEM,
        detail_types::BUILD_STATE_CHANGE,
        json!({
            "build-status": status,
            "project-name": BUILD_PROJECT,
            "build-id": format!("arn:aws:codebuild:{REGION}:{account}:build/{BUILD_PROJECT}:1"),
            "current-phase": "COMPLETED",
        }),
    )
    .with_account(account)
    .with_region(REGION)
}

fn accounts() -> (AccountId, AccountId, Region, EventBusName) {
    (
        AccountId::new(PRODUCER).expect("fixture"),
        AccountId::new(CONSUMER).expect("fixture"),
        Region::new(REGION).expect("fixture"),
        EventBusName::new("default").expect("fixture"),
    )
}

/// Configuration of a consumer-side relay.
pub fn consumer_config() -> RelayConfig {
    let (producer, consumer, region, bus) = accounts();
    RelayConfig::new(
        producer,
        consumer,
        region,
        bus,
        SideSettings::Consumer(ConsumerSettings {
            launch: launch_config(),
            repository: RepositoryId::new(REPOSITORY_ARN).expect("fixture"),
            build_project: ProjectName::new(BUILD_PROJECT).expect("fixture"),
        }),
    )
    .expect("fixture")
}

/// Configuration of a producer-side relay.
pub fn producer_config() -> RelayConfig {
    let (producer, consumer, region, bus) = accounts();
    RelayConfig::new(
        producer,
        consumer,
        region,
        bus,
        SideSettings::Producer(ProducerSettings {
            domain_name: DOMAIN_NAME.to_string(),
            repository_name: REPOSITORY_NAME.to_string(),
            alert_topic: TopicRef::new(ALERT_TOPIC).expect("fixture"),
        }),
    )
    .expect("fixture")
}

// ---------------------------------------------------------------------------
// Recording fakes
// ---------------------------------------------------------------------------

fn snapshot<T: Clone>(calls: &Mutex<Vec<T>>) -> Vec<T> {
    calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn record<T>(calls: &Mutex<Vec<T>>, call: T) {
    calls
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(call);
}

/// [`TaskLauncher`] that records requests and optionally rejects them all.
#[derive(Debug, Default)]
pub struct RecordingTaskLauncher {
    calls: Mutex<Vec<LaunchRequest>>,
    reject_with: Option<String>,
}

impl RecordingTaskLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose every call fails with `reason`.
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            calls: Mutex::default(),
            reject_with: Some(reason.into()),
        }
    }

    /// Every request received so far, including rejected ones.
    pub fn requests(&self) -> Vec<LaunchRequest> {
        snapshot(&self.calls)
    }
}

#[async_trait]
impl TaskLauncher for RecordingTaskLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchAcknowledgement, RelayError> {
        record(&self.calls, request.clone());
        if let Some(reason) = &self.reject_with {
            return Err(RelayError::LaunchFailed {
                reason: reason.clone(),
            });
        }
        let n = snapshot(&self.calls).len();
        Ok(LaunchAcknowledgement {
            task_handles: vec![format!("task/{n}")],
        })
    }
}

/// [`BuildStarter`] that records triggers and optionally rejects them all.
#[derive(Debug, Default)]
pub struct RecordingBuildStarter {
    calls: Mutex<Vec<BuildTrigger>>,
    reject_with: Option<String>,
}

impl RecordingBuildStarter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            calls: Mutex::default(),
            reject_with: Some(reason.into()),
        }
    }

    pub fn triggers(&self) -> Vec<BuildTrigger> {
        snapshot(&self.calls)
    }
}

#[async_trait]
impl BuildStarter for RecordingBuildStarter {
    async fn start_build(&self, trigger: &BuildTrigger) -> Result<BuildHandle, RelayError> {
        record(&self.calls, trigger.clone());
        if let Some(reason) = &self.reject_with {
            return Err(RelayError::BuildStartFailed {
                project: trigger.project.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(BuildHandle(format!("{}:{}", trigger.project, snapshot(&self.calls).len())))
    }
}

/// [`EventBusPublisher`] that records every put.
#[derive(Debug, Default)]
pub struct RecordingBusPublisher {
    calls: Mutex<Vec<(BusAddress, EventEnvelope)>>,
    reject_with: Option<String>,
}

impl RecordingBusPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            calls: Mutex::default(),
            reject_with: Some(reason.into()),
        }
    }

    pub fn published(&self) -> Vec<(BusAddress, EventEnvelope)> {
        snapshot(&self.calls)
    }
}

#[async_trait]
impl EventBusPublisher for RecordingBusPublisher {
    async fn put_event(
        &self,
        target: &BusAddress,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, RelayError> {
        record(&self.calls, (target.clone(), event.clone()));
        match &self.reject_with {
            Some(reason) => Err(RelayError::PublishFailed {
                target: target.arn(),
                reason: reason.clone(),
            }),
            None => Ok(PublishReceipt::default()),
        }
    }
}

/// [`TopicPublisher`] that records every publish.
#[derive(Debug, Default)]
pub struct RecordingTopicPublisher {
    calls: Mutex<Vec<(TopicRef, EventEnvelope)>>,
}

impl RecordingTopicPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(TopicRef, EventEnvelope)> {
        snapshot(&self.calls)
    }
}

#[async_trait]
impl TopicPublisher for RecordingTopicPublisher {
    async fn publish(
        &self,
        topic: &TopicRef,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, RelayError> {
        record(&self.calls, (topic.clone(), event.clone()));
        Ok(PublishReceipt::default())
    }
}

/// [`EventSource`] that yields a fixed list of events, then ends.
#[derive(Debug, Default)]
pub struct VecEventSource {
    events: VecDeque<EventEnvelope>,
}

impl VecEventSource {
    pub fn new(events: impl IntoIterator<Item = EventEnvelope>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

#[async_trait]
impl EventSource for VecEventSource {
    async fn next_event(&mut self) -> Option<EventEnvelope> {
        self.events.pop_front()
    }
}
