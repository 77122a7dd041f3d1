//! Top-level error type for the relay domain.
//!
//! [`RelayError`] covers every condition the pipeline reports to its caller.
//! A filter that does not match is **not** an error: filters return `None`
//! and the event is dropped silently, because unmatched events are routine
//! traffic on a shared bus.
//!
//! Infrastructure crates keep their own error enums (HTTP status, transport
//! failure, credentials) and map them into [`RelayError`] at the port
//! boundary, so this crate never depends on transport types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while configuring the relay or executing an action.
///
/// None of these are retried by the relay. Failures from executing actions
/// are logged and reported per event; whether the triggering event is
/// re-delivered is up to the hosting event substrate.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RelayError {
    /// The static configuration is missing a required value or contains an
    /// invalid one.
    ///
    /// Produced at load time; the relay never starts processing events with
    /// an invalid configuration.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// The task-execution capability rejected a launch request (bad
    /// configuration, quota, permission denial) or could not be reached.
    #[error("Task launch failed: {reason}")]
    LaunchFailed {
        /// Description reported by the task-execution capability or transport.
        reason: String,
    },

    /// The build runner rejected a build start request or could not be reached.
    #[error("Build start failed for project '{project}': {reason}")]
    BuildStartFailed {
        /// The build project the start request targeted.
        project: String,
        /// Description reported by the build runner or transport.
        reason: String,
    },

    /// Publishing an event to a bus or topic failed.
    #[error("Publish to '{target}' failed: {reason}")]
    PublishFailed {
        /// Address of the bus or topic the publish targeted.
        target: String,
        /// Description reported by the bus/topic or transport.
        reason: String,
    },

    /// An inbound payload could not be decoded as an event envelope.
    #[error("Malformed event: {reason}")]
    MalformedEvent {
        /// Decoder message.
        reason: String,
    },
}

impl RelayError {
    /// Shorthand for [`RelayError::ConfigurationError`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}
