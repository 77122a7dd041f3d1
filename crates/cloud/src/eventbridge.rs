//! [`EventBusPublisher`] over EventBridge `PutEvents`.
//!
//! The target bus is addressed by ARN, which is how a bus in another account
//! is reached. The receiving bus stamps its own `id` and `account` on the
//! event; `source`, `detail-type`, `detail`, `resources` and `time` are
//! carried over unchanged.
//!
//! EventBridge refuses entries whose source starts with `aws.` unless the
//! caller is the owning service, and every event the pipeline forwards comes
//! from a managed service. Such envelopes are put on the bus wrapped under
//! `librelay.forward` (see [`EventEnvelope::wrap_forwarded`]) and the
//! receiving relay unwraps them before its rules run.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_eventbridge::primitives::DateTime;
use aws_sdk_eventbridge::types::PutEventsRequestEntry;
use aws_sdk_eventbridge::{config, Client};
use pipeline::{BusAddress, EventBusPublisher, EventEnvelope, PublishReceipt, RelayError};
use tracing::{debug, info, warn};

use crate::CloudError;

const SERVICE: &str = "EventBridge";

#[derive(Debug, Clone)]
pub struct EventBridgePublisher {
    config: SdkConfig,
    client: Client,
}

impl EventBridgePublisher {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            config: config.clone(),
            client: Client::new(config),
        }
    }

    // Entries are published in the target bus's region.
    fn client_for(&self, target: &BusAddress) -> Client {
        if self.config.region().map(|r| r.as_ref()) == Some(target.region.as_str()) {
            return self.client.clone();
        }
        let conf = config::Builder::from(&self.config)
            .region(config::Region::new(target.region.to_string()))
            .build();
        Client::from_conf(conf)
    }

    fn entry(target: &BusAddress, event: &EventEnvelope) -> Result<PutEventsRequestEntry, CloudError> {
        let wrapped;
        let event = if event.has_reserved_source() {
            wrapped = event
                .wrap_forwarded()
                .map_err(|e| CloudError::invalid_request(SERVICE, e))?;
            debug!(source = %event.source, "Wrapping reserved-source event for forwarding");
            &wrapped
        } else {
            event
        };

        let detail = serde_json::to_string(&event.detail)
            .map_err(|e| CloudError::invalid_request(SERVICE, e))?;
        let mut entry = PutEventsRequestEntry::builder()
            .source(event.source.as_str())
            .detail_type(event.detail_type.as_str())
            .detail(detail)
            .event_bus_name(target.arn());
        if !event.resources.is_empty() {
            entry = entry.set_resources(Some(event.resources.clone()));
        }
        if let Some(time) = event.time {
            entry = entry.time(DateTime::from_secs(time.as_datetime().timestamp()));
        }
        Ok(entry.build())
    }

    async fn put(
        &self,
        target: &BusAddress,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, CloudError> {
        let output = self
            .client_for(target)
            .put_events()
            .entries(Self::entry(target, event)?)
            .send()
            .await
            .map_err(|e| CloudError::from_sdk(SERVICE, e))?;

        let entry = output.entries().first();
        let error_code = entry.and_then(|e| e.error_code());
        if output.failed_entry_count() > 0 || error_code.is_some() {
            return Err(CloudError::Rejected {
                service: SERVICE,
                message: format!(
                    "{}: {}",
                    error_code.unwrap_or("Unknown"),
                    entry
                        .and_then(|e| e.error_message())
                        .unwrap_or("entry was not accepted")
                ),
            });
        }
        Ok(PublishReceipt {
            message_id: entry.and_then(|e| e.event_id()).map(str::to_string),
        })
    }
}

#[async_trait]
impl EventBusPublisher for EventBridgePublisher {
    async fn put_event(
        &self,
        target: &BusAddress,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, RelayError> {
        match self.put(target, event).await {
            Ok(receipt) => {
                info!(target = %target, message_id = ?receipt.message_id, "Event put on bus");
                Ok(receipt)
            }
            Err(e) => {
                warn!(target = %target, error = %e, "PutEvents failed");
                Err(RelayError::PublishFailed {
                    target: target.arn(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
