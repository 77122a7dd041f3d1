//! Pure event filters.
//!
//! Each filter is a predicate over an [`crate::EventEnvelope`] plus the static
//! configuration it was built with. A filter that does not match returns
//! `None` (or `false`); that is routine and never an error. Filters hold no
//! mutable state, so one instance can be shared by any number of concurrent
//! invocations.

pub mod build_status;
pub mod pull_request;
pub mod release;

pub use build_status::FailureFilter;
pub use pull_request::{BuildTrigger, BuildTriggerFilter, SOURCE_REF_PREFIX, TRUNK_REF};
pub use release::ReleaseFilter;
