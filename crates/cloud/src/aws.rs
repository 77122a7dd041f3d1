//! Shared AWS SDK configuration for every AWS adapter.
//!
//! Credentials come from the SDK's default provider chain: environment
//! variables, shared profile, web identity, the ECS container credentials
//! endpoint (task roles) and instance metadata. The chain caches credentials
//! and refreshes them before they expire, so a long-running relay keeps
//! working across session-token rotations.
//!
//! SDK retries are switched off: each port call is one attempt, and a
//! failure is reported rather than retried.

use std::time::Duration;

use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use pipeline::Region;
use tracing::debug;

/// Upper bound for one service call, including connection setup.
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Loads the shared configuration for `region`.
///
/// `endpoint_url` sends every call to one endpoint instead of the regional
/// ones (local emulators).
pub async fn load_sdk_config(region: &Region, endpoint_url: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()))
        .retry_config(RetryConfig::disabled())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(OPERATION_TIMEOUT)
                .build(),
        );
    if let Some(url) = endpoint_url {
        debug!(endpoint = url, "Overriding AWS endpoints");
        loader = loader.endpoint_url(url);
    }
    loader.load().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_uses_credential_chain_without_retries() {
        let region = Region::new("eu-west-1").unwrap();

        let config = load_sdk_config(&region, Some("http://127.0.0.1:4566")).await;

        assert_eq!(config.region().map(|r| r.as_ref()), Some("eu-west-1"));
        assert!(config.credentials_provider().is_some());
        assert_eq!(config.retry_config().map(|r| r.max_attempts()), Some(1));
        assert_eq!(
            config.timeout_config().and_then(|t| t.operation_timeout()),
            Some(OPERATION_TIMEOUT)
        );
        assert_eq!(config.endpoint_url(), Some("http://127.0.0.1:4566"));
    }
}
