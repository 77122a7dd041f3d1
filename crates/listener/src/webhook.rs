//! HTTP webhook event source.
//!
//! `POST /events` accepts one envelope as JSON and answers `202 Accepted`
//! once the envelope is queued for the relay; handling happens after the
//! response. Every body must carry a valid [`SIGNATURE_HEADER`] made with the
//! bridge's shared secret: unsigned or wrongly signed bodies get `401` and
//! bodies that do not decode as an envelope get `400`, and neither reaches
//! the queue. `GET /health` reports liveness.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pipeline::signature::{verify_body, SIGNATURE_HEADER};
use pipeline::{EventEnvelope, EventSource, SharedSecret};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::ListenerError;

pub const EVENTS_PATH: &str = "/events";
pub const HEALTH_PATH: &str = "/health";

/// Envelopes accepted but not yet taken by the relay.
const QUEUE_CAPACITY: usize = 1024;

#[derive(Clone)]
struct WebhookState {
    queue: mpsc::Sender<EventEnvelope>,
    secret: Arc<SharedSecret>,
}

#[derive(Serialize)]
struct AcceptedResponse<'a> {
    status: &'static str,
    event_id: &'a str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

fn refuse(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// Builds the webhook router; envelopes signed with `secret` are sent to
/// `queue`.
pub fn router(queue: mpsc::Sender<EventEnvelope>, secret: SharedSecret) -> Router {
    Router::new()
        .route(EVENTS_PATH, post(receive_event))
        .route(HEALTH_PATH, get(health_check))
        .with_state(WebhookState {
            queue,
            secret: Arc::new(secret),
        })
}

async fn receive_event(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    if let Err(e) = verify_body(&state.secret, signature, &body) {
        warn!(error = %e, "Rejected unauthenticated event");
        return refuse(StatusCode::UNAUTHORIZED, e.to_string());
    }

    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Rejected malformed event");
            return refuse(StatusCode::BAD_REQUEST, format!("invalid event envelope: {e}"));
        }
    };

    let event_id = envelope.id_for_log().to_string();
    debug!(event_id = %event_id, source = %envelope.source, "Event received");
    match state.queue.send(envelope).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(AcceptedResponse {
                status: "accepted",
                event_id: &event_id,
            }),
        )
            .into_response(),
        Err(_) => {
            error!(event_id = %event_id, "Relay is no longer consuming events");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// An HTTP server whose accepted envelopes form an event stream.
///
/// The stream ends once `shutdown` resolves, in-flight requests have
/// completed and every queued envelope has been taken.
#[derive(Debug)]
pub struct WebhookEventSource {
    queue: mpsc::Receiver<EventEnvelope>,
    local_addr: SocketAddr,
    server: JoinHandle<()>,
}

impl WebhookEventSource {
    /// Binds `addr` and starts serving in the background. Only bodies signed
    /// with `secret` are accepted.
    pub async fn bind<F>(
        addr: SocketAddr,
        secret: SharedSecret,
        shutdown: F,
    ) -> Result<Self, ListenerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let app = router(tx, secret);

        info!(addr = %local_addr, "Webhook listening");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "Webhook server failed");
            }
            info!("Webhook stopped");
        });

        Ok(Self {
            queue: rx,
            local_addr,
            server,
        })
    }

    /// The bound address; differs from the requested one when port 0 was used.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for WebhookEventSource {
    fn drop(&mut self) {
        self.server.abort();
    }
}

#[async_trait]
impl EventSource for WebhookEventSource {
    async fn next_event(&mut self) -> Option<EventEnvelope> {
        self.queue.recv().await
    }
}
