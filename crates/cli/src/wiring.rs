//! Constructs the concrete adapters a side needs and injects them into the
//! [`Executor`].
//!
//! | Side | Task launcher | Build starter | Bus publisher | Topic publisher |
//! |------|---------------|---------------|---------------|-----------------|
//! | consumer | ECS | CodeBuild | EventBridge or HTTP | - |
//! | producer | - | - | EventBridge or HTTP | SNS |

use std::sync::Arc;

use cloud::{
    load_sdk_config, CodeBuildStarter, EcsTaskLauncher, EventBridgePublisher, HttpBusPublisher,
    SdkConfig, SnsTopicPublisher,
};
use pipeline::{DeploymentSide, EventBusPublisher, RelayError};
use rules::Executor;
use tracing::info;

use crate::config::{BusTransport, Settings};

/// Builds the executor for `settings`, resolving AWS credentials through the
/// SDK's default provider chain.
pub async fn executor(settings: &Settings) -> anyhow::Result<Executor> {
    let sdk_config =
        load_sdk_config(settings.relay.region(), settings.aws_endpoint.as_deref()).await;
    Ok(executor_with(settings, &sdk_config)?)
}

pub fn executor_with(settings: &Settings, sdk_config: &SdkConfig) -> Result<Executor, RelayError> {
    let bus: Arc<dyn EventBusPublisher> = match settings.bus_transport {
        BusTransport::EventBridge => Arc::new(EventBridgePublisher::new(sdk_config)),
        BusTransport::Http => {
            let peer = settings.peer_url.clone().ok_or_else(|| {
                RelayError::configuration("bus.peer_url is required with transport = \"http\"")
            })?;
            let secret = settings.shared_secret.clone().ok_or_else(|| {
                RelayError::configuration("bus.shared_secret is required with transport = \"http\"")
            })?;
            let publisher = HttpBusPublisher::new(peer, secret).map_err(|e| {
                RelayError::configuration(format!("cannot set up peer relay delivery: {e}"))
            })?;
            Arc::new(publisher)
        }
    };

    let side = settings.relay.side();
    info!(
        side = %side,
        region = %settings.relay.region(),
        bus_transport = ?settings.bus_transport,
        peer_bus = %settings.relay.peer_bus(),
        "Wiring adapters"
    );

    let executor = Executor::new().with_bus(bus);
    Ok(match side {
        DeploymentSide::Consumer => executor
            .with_launcher(Arc::new(EcsTaskLauncher::new(sdk_config)))
            .with_build_starter(Arc::new(CodeBuildStarter::new(sdk_config))),
        DeploymentSide::Producer => {
            executor.with_topics(Arc::new(SnsTopicPublisher::new(sdk_config)))
        }
    })
}
