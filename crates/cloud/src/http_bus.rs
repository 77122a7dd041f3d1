//! [`EventBusPublisher`] that delivers straight to a peer relay's webhook.
//!
//! Stands in for the managed bus when both relays run outside it: the peer's
//! `POST /events` endpoint plays the role of the target bus, so the
//! [`BusAddress`] is only used for logging and error reporting. Every
//! delivery is signed with the secret the two relays share (see
//! [`pipeline::signature`]); the peer refuses unsigned bodies.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::signature::{sign_body, SIGNATURE_HEADER};
use pipeline::{
    BusAddress, EventBusPublisher, EventEnvelope, PublishReceipt, RelayError, SharedSecret,
};
use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};

use crate::CloudError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpBusPublisher {
    http: reqwest::Client,
    peer_url: String,
    secret: SharedSecret,
    timeout: Duration,
}

impl HttpBusPublisher {
    /// `peer_url` is the base URL of the peer relay, e.g. `http://relay:8080`.
    pub fn new(peer_url: impl Into<String>, secret: SharedSecret) -> Result<Self, CloudError> {
        Self::with_timeout(peer_url, secret, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        peer_url: impl Into<String>,
        secret: SharedSecret,
        timeout: Duration,
    ) -> Result<Self, CloudError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CloudError::HttpClient)?;
        Ok(Self {
            http,
            peer_url: peer_url.into(),
            secret,
            timeout,
        })
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.peer_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl EventBusPublisher for HttpBusPublisher {
    async fn put_event(
        &self,
        target: &BusAddress,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, RelayError> {
        let failed = |reason: String| {
            warn!(target = %target, peer = %self.peer_url, reason = %reason, "Peer relay delivery failed");
            RelayError::PublishFailed {
                target: target.arn(),
                reason,
            }
        };

        let body = serde_json::to_vec(event)
            .map_err(|e| failed(format!("cannot encode envelope: {e}")))?;
        let signature = sign_body(&self.secret, &body);

        let response = self
            .http
            .post(self.events_url())
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    failed(format!("request to peer relay timed out after {:?}", self.timeout))
                } else {
                    failed(format!("request to peer relay failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failed(format!("peer relay returned HTTP {status}: {body}")));
        }

        info!(target = %target, peer = %self.peer_url, "Event delivered to peer relay");
        Ok(PublishReceipt {
            message_id: event.id.as_ref().map(ToString::to_string),
        })
    }
}
