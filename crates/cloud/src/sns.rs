//! [`TopicPublisher`] over SNS `Publish`.
//!
//! The message body is the full event envelope as JSON, which is what a
//! bus rule with a topic target delivers to subscribers.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sns::Client;
use pipeline::{EventEnvelope, PublishReceipt, RelayError, TopicPublisher, TopicRef};
use tracing::{info, warn};

use crate::CloudError;

const SERVICE: &str = "SNS";

#[derive(Debug, Clone)]
pub struct SnsTopicPublisher {
    client: Client,
}

impl SnsTopicPublisher {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn publish_message(
        &self,
        topic: &TopicRef,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, CloudError> {
        let message =
            serde_json::to_string(event).map_err(|e| CloudError::invalid_request(SERVICE, e))?;
        let output = self
            .client
            .publish()
            .topic_arn(topic.as_str())
            .message(message)
            .send()
            .await
            .map_err(|e| CloudError::from_sdk(SERVICE, e))?;

        Ok(PublishReceipt {
            message_id: output.message_id().map(str::to_string),
        })
    }
}

#[async_trait]
impl TopicPublisher for SnsTopicPublisher {
    async fn publish(
        &self,
        topic: &TopicRef,
        event: &EventEnvelope,
    ) -> Result<PublishReceipt, RelayError> {
        match self.publish_message(topic, event).await {
            Ok(receipt) => {
                info!(topic = %topic, message_id = ?receipt.message_id, "Event published to topic");
                Ok(receipt)
            }
            Err(e) => {
                warn!(topic = %topic, error = %e, "Publish failed");
                Err(RelayError::PublishFailed {
                    target: topic.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
