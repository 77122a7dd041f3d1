//! Shared value types for the relay domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! a closed set of meanings (which side of the trust boundary a relay serves,
//! how a task is launched) or wrap an external representation (time).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Deployment
// ---------------------------------------------------------------------------

/// Which account a relay instance serves.
///
/// The two sides run the same binary with different rule sets: the producer
/// forwards releases out and turns incoming build failures into alerts; the
/// consumer launches update tasks, starts builds and forwards failures back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentSide {
    /// The account that owns the artifact repository and the alert topic.
    Producer,
    /// The account that owns the dependent repository and its build.
    Consumer,
}

impl DeploymentSide {
    /// The side on the other end of the bridge.
    pub fn opposite(self) -> Self {
        match self {
            Self::Producer => Self::Consumer,
            Self::Consumer => Self::Producer,
        }
    }

    /// Returns the lower-case name used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

impl std::fmt::Display for DeploymentSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DeploymentSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "producer" => Ok(Self::Producer),
            "consumer" => Ok(Self::Consumer),
            other => Err(format!(
                "unknown deployment side '{other}' (expected 'producer' or 'consumer')"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Task launch
// ---------------------------------------------------------------------------

/// How the container scheduler runs a launched task.
///
/// Only one mode is supported; the type exists so the wire value is spelled
/// in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LaunchType {
    /// Serverless container execution.
    #[default]
    #[serde(rename = "FARGATE")]
    Fargate,
}

impl LaunchType {
    /// Returns the wire value of this launch type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fargate => "FARGATE",
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_side_round_trips_through_its_name() {
        assert_eq!("producer".parse::<DeploymentSide>(), Ok(DeploymentSide::Producer));
        assert_eq!("consumer".parse::<DeploymentSide>(), Ok(DeploymentSide::Consumer));
        assert!("both".parse::<DeploymentSide>().is_err());
        assert_eq!(DeploymentSide::Producer.opposite(), DeploymentSide::Consumer);
    }

    #[test]
    fn launch_type_serialises_to_wire_value() {
        let json = serde_json::to_string(&LaunchType::Fargate).unwrap();
        assert_eq!(json, "\"FARGATE\"");
    }
}
