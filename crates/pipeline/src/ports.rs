//! Port traits the relay needs from the outside world.
//!
//! Infrastructure crates implement these; this crate defines *what* is needed
//! and never *how*. Every method performs exactly one external call and
//! returns as soon as the service acknowledges it: nothing here waits for a
//! task or build to finish, and nothing retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bridge::BusAddress;
use crate::filters::BuildTrigger;
use crate::{EventEnvelope, LaunchAcknowledgement, LaunchRequest, RelayError, TopicRef};

/// Opaque identifier of a started build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildHandle(pub String);

/// Acknowledgement of a bus or topic publish.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Identifier the bus or topic assigned to the published message, if it
    /// reported one.
    pub message_id: Option<String>,
}

/// Starts one-shot container tasks.
#[async_trait]
pub trait TaskLauncher: Send + Sync {
    /// Issues `request` exactly once.
    ///
    /// # Errors
    ///
    /// [`RelayError::LaunchFailed`] if the scheduler rejects the request or
    /// cannot be reached.
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchAcknowledgement, RelayError>;
}

/// Starts builds of a source version.
#[async_trait]
pub trait BuildStarter: Send + Sync {
    /// # Errors
    ///
    /// [`RelayError::BuildStartFailed`] if the build runner rejects the
    /// request or cannot be reached.
    async fn start_build(&self, trigger: &BuildTrigger) -> Result<BuildHandle, RelayError>;
}

/// Puts events onto an event bus, possibly in another account.
#[async_trait]
pub trait EventBusPublisher: Send + Sync {
    /// # Errors
    ///
    /// [`RelayError::PublishFailed`] if the bus rejects the event.
    async fn put_event(
        &self,
        target: &BusAddress,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, RelayError>;
}

/// Publishes events to a pub/sub topic.
#[async_trait]
pub trait TopicPublisher: Send + Sync {
    /// # Errors
    ///
    /// [`RelayError::PublishFailed`] if the topic rejects the message.
    async fn publish(
        &self,
        topic: &TopicRef,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, RelayError>;
}

/// A stream of inbound events.
///
/// Implementations decide how events arrive (a file, an HTTP endpoint); the
/// relay only pulls the next one.
#[async_trait]
pub trait EventSource: Send {
    /// Returns the next event, or `None` once the source is exhausted or shut
    /// down.
    async fn next_event(&mut self) -> Option<EventEnvelope>;
}
