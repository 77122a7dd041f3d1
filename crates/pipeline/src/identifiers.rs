//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`ClusterRef`] with a [`TaskDefinitionRef`] even though both are ARNs under
//! the hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// A cloud account identifier: exactly twelve ASCII digits.
///
/// Both trust domains of the pipeline (producer and consumer) are identified
/// by one of these. Leading zeros are significant, so the value is kept as a
/// string rather than parsed into an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Number of digits in a well-formed account identifier.
    pub const LEN: usize = 12;

    /// Creates an [`AccountId`], returning `None` unless `value` is exactly
    /// twelve ASCII digits.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.len() == Self::LEN && v.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(v))
        } else {
            None
        }
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.clone()).ok_or_else(|| format!("'{value}' is not a 12-digit account id"))
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// UUID-backed identifiers (internally generated)
// ---------------------------------------------------------------------------

/// Identifies the handling of one ingested event.
///
/// Generated fresh for every event the relay receives; recorded on the event's
/// span so every filter decision and external call caused by that event can be
/// correlated. Re-delivery of the same bus event yields a new invocation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a new random invocation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an [`InvocationId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// String-backed identifiers (bus and service references)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifier assigned to an event by the bus that delivered it.
    EventId
}

string_id! {
    /// A cloud region name (e.g. `"eu-west-1"`).
    Region
}

string_id! {
    /// Name of an event bus within an account (usually `"default"`).
    EventBusName
}

string_id! {
    /// Reference (ARN) of the task definition launched for each accepted release.
    TaskDefinitionRef
}

string_id! {
    /// Reference (ARN) of the cluster the launched task runs in.
    ClusterRef
}

string_id! {
    /// Identifier of a subnet the launched task is attached to.
    SubnetId
}

string_id! {
    /// Name of the container inside the task definition that receives the
    /// environment overrides.
    ContainerName
}

string_id! {
    /// Identifies a source-control repository (its ARN, as it appears in the
    /// `resources` list of pull-request events).
    RepositoryId
}

string_id! {
    /// Name of the build project that builds update pull requests.
    ProjectName
}

string_id! {
    /// Reference (ARN) of the pub/sub topic broken-build alerts go to.
    TopicRef
}

string_id! {
    /// A fully-qualified Git reference (e.g. `"refs/heads/main"`).
    GitRef
}

string_id! {
    /// Namespace (Maven group id) of a published package.
    PackageNamespace
}

string_id! {
    /// Name (Maven artifact id) of a published package.
    PackageName
}

string_id! {
    /// Version string of a published package, exactly as the repository reports it.
    PackageVersion
}
