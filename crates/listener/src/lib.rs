//! LibRelay event source infrastructure.
//!
//! Implements the [`pipeline::EventSource`] trait with two backends:
//!
//! - [`SingleShotEventSource`]: reads one envelope, or a JSON array of
//!   envelopes, from a file or stdin and yields them in order. Used by
//!   `librelay once` and for replaying captured bus traffic.
//!
//! - [`WebhookEventSource`]: binds an HTTP server with `POST /events` and
//!   `GET /health`. Only bodies signed with the bridge's shared secret are
//!   accepted; each one is queued and handed to the relay. The peer relay
//!   delivers to it through `cloud::HttpBusPublisher`.
//!
//! ## Deployment Scenarios
//!
//! | Scenario | EventSource | Notes |
//! |----------|-------------|-------|
//! | Replay / one invocation | `SingleShotEventSource` | Ends when the input is exhausted |
//! | Long-running relay | `WebhookEventSource` | Ends on graceful shutdown |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details and payload decoding live here. The
//! [`pipeline`] crate sees only [`pipeline::EventSource`] and
//! [`pipeline::EventEnvelope`].

mod error;
pub mod single_shot;
pub mod webhook;

pub use error::ListenerError;
pub use single_shot::SingleShotEventSource;
pub use webhook::{router, WebhookEventSource};
