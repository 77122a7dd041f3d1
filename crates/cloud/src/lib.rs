//! LibRelay cloud infrastructure adapters.
//!
//! Implements the [`pipeline`] port traits against the managed services the
//! pipeline runs on:
//!
//! | Port | Adapter | Service call |
//! |------|---------|--------------|
//! | [`pipeline::TaskLauncher`] | [`EcsTaskLauncher`] | ECS `RunTask` |
//! | [`pipeline::BuildStarter`] | [`CodeBuildStarter`] | CodeBuild `StartBuild` |
//! | [`pipeline::EventBusPublisher`] | [`EventBridgePublisher`] | EventBridge `PutEvents` |
//! | [`pipeline::EventBusPublisher`] | [`HttpBusPublisher`] | `POST /events` on a peer relay |
//! | [`pipeline::TopicPublisher`] | [`SnsTopicPublisher`] | SNS `Publish` |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The AWS adapters sit on the AWS SDK clients, sharing
//! one [`SdkConfig`] built by [`load_sdk_config`]; the peer-relay adapter
//! signs its deliveries itself. Every adapter makes exactly one attempt per
//! port call. Failures are reported as [`CloudError`] internally and mapped
//! into [`pipeline::RelayError`] at the port boundary.

pub mod aws;
pub mod codebuild;
pub mod ecs;
pub mod error;
pub mod eventbridge;
pub mod http_bus;
pub mod sns;

#[cfg(test)]
mod test_support;

pub use aws::load_sdk_config;
pub use aws_config::SdkConfig;
pub use codebuild::CodeBuildStarter;
pub use ecs::EcsTaskLauncher;
pub use error::CloudError;
pub use eventbridge::EventBridgePublisher;
pub use http_bus::HttpBusPublisher;
pub use sns::SnsTopicPublisher;
