//! Core event pipeline domain for LibRelay.
//!
//! LibRelay ties a shared library's release in a *producer* account to an
//! automated dependency-update pull request, build and failure report in a
//! *consumer* account. This crate contains every domain concept of that
//! pipeline: the event model, the pure filters, the task launch decision, the
//! routing rules, and the port traits the infrastructure crates implement.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`AccountId`, `TaskDefinitionRef`, etc.) |
//! | [`types`] | Shared value types (`DeploymentSide`, `LaunchType`, `Timestamp`) |
//! | [`errors`] | The [`RelayError`] type |
//! | [`envelope`] | The bus wire envelope |
//! | [`events`] | Typed release, pull request and build status events |
//! | [`filters`] | Pure event filters |
//! | [`launch`] | Launch configuration and launch request |
//! | [`decision`] | The task launch decision (snapshot filter) |
//! | [`bridge`] | Cross-account bus addresses and trust relations |
//! | [`config`] | Immutable relay configuration |
//! | [`rules`] | Event → action routing rules and rule sets |
//! | [`ports`] | Traits implemented by infrastructure crates |
//! | [`signature`] | HMAC signing of relay-to-relay deliveries |

pub mod bridge;
pub mod config;
pub mod decision;
pub mod envelope;
pub mod errors;
pub mod events;
pub mod filters;
pub mod identifiers;
pub mod launch;
pub mod ports;
pub mod rules;
pub mod signature;
pub mod types;

#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use bridge::{Bridge, BusAddress, CrossAccountPermission};
pub use config::{ConsumerSettings, ProducerSettings, RelayConfig, SideSettings};
pub use decision::{decide, is_snapshot, launch_request, LaunchDecision};
pub use envelope::EventEnvelope;
pub use errors::RelayError;
pub use events::{
    BuildStatus, BuildStatusEvent, PackageFormat, PackageVersionState, PullRequestAction,
    PullRequestEvent, ReleaseEvent,
};
pub use filters::{BuildTrigger, BuildTriggerFilter, FailureFilter, ReleaseFilter};
pub use identifiers::{
    AccountId, ClusterRef, ContainerName, EventBusName, EventId, GitRef, InvocationId,
    PackageName, PackageNamespace, PackageVersion, ProjectName, Region, RepositoryId, SubnetId,
    TaskDefinitionRef, TopicRef,
};
pub use launch::{EnvironmentVariable, LaunchAcknowledgement, LaunchConfig, LaunchRequest};
pub use ports::{
    BuildHandle, BuildStarter, EventBusPublisher, EventSource, PublishReceipt, TaskLauncher,
    TopicPublisher,
};
pub use rules::{Action, Rule, RuleMatch, RuleSet};
pub use signature::{SharedSecret, SignatureError};
pub use types::{DeploymentSide, LaunchType, Timestamp};
