//! LibRelay orchestration layer.
//!
//! This crate turns the pure decisions of the [`pipeline`] crate into effects:
//! the [`Executor`] performs each [`pipeline::Action`] through the port traits,
//! and the [`Relay`] drives one deployment side's event loop (bridge
//! admission, rule evaluation, action execution, per-event reporting).
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The relay sequences calls between business logic in
//! the [`pipeline`] crate and infrastructure traits (task launcher, build
//! starter, bus and topic publishers). It contains no domain rules of its own.

pub mod executor;
pub mod relay;

pub use executor::{ActionOutcome, Executor};
pub use relay::{EventReport, Relay, RuleOutcome, RunSummary};
