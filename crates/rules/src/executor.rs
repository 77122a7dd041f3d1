//! Action executor: performs the effects rules ask for.
//!
//! Each [`Action`] maps to exactly one call on one port. The executor never
//! retries and never deduplicates: a failure is returned to the relay, which
//! logs it and reports it for the triggering event only.

use std::sync::Arc;

use pipeline::{
    Action, BuildHandle, BuildStarter, EventBusPublisher, LaunchAcknowledgement, PublishReceipt,
    RelayError, TaskLauncher, TopicPublisher,
};
use serde::Serialize;
use tracing::{error, info};

/// What a successfully executed action returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionOutcome {
    Launched(LaunchAcknowledgement),
    BuildStarted { build: BuildHandle },
    Published(PublishReceipt),
}

/// Carries out [`Action`]s against the configured ports.
///
/// Ports a side never uses may be left unset; an action that needs a missing
/// port fails with [`RelayError::ConfigurationError`].
#[derive(Clone, Default)]
pub struct Executor {
    launcher: Option<Arc<dyn TaskLauncher>>,
    builds: Option<Arc<dyn BuildStarter>>,
    bus: Option<Arc<dyn EventBusPublisher>>,
    topics: Option<Arc<dyn TopicPublisher>>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("launcher", &self.launcher.is_some())
            .field("builds", &self.builds.is_some())
            .field("bus", &self.bus.is_some())
            .field("topics", &self.topics.is_some())
            .finish()
    }
}

impl Executor {
    /// An executor with no ports; add them with the `with_*` methods.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn TaskLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_build_starter(mut self, builds: Arc<dyn BuildStarter>) -> Self {
        self.builds = Some(builds);
        self
    }

    pub fn with_bus(mut self, bus: Arc<dyn EventBusPublisher>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_topics(mut self, topics: Arc<dyn TopicPublisher>) -> Self {
        self.topics = Some(topics);
        self
    }

    /// Performs `action` with a single call to the matching port.
    pub async fn execute(&self, action: &Action) -> Result<ActionOutcome, RelayError> {
        let result = match action {
            Action::LaunchTask(request) => {
                let launcher = require(&self.launcher, "task launcher")?;
                launcher.launch(request).await.map(ActionOutcome::Launched)
            }
            Action::StartBuild(trigger) => {
                let builds = require(&self.builds, "build starter")?;
                builds
                    .start_build(trigger)
                    .await
                    .map(|build| ActionOutcome::BuildStarted { build })
            }
            Action::PublishToBus { target, event } => {
                let bus = require(&self.bus, "event bus publisher")?;
                bus.put_event(target, event).await.map(ActionOutcome::Published)
            }
            Action::PublishToTopic { topic, event } => {
                let topics = require(&self.topics, "topic publisher")?;
                topics.publish(topic, event).await.map(ActionOutcome::Published)
            }
        };

        match &result {
            Ok(outcome) => info!(action = action.kind(), ?outcome, "Action completed"),
            Err(e) => error!(action = action.kind(), error = %e, "Action failed"),
        }
        result
    }
}

fn require<'a, T: ?Sized>(
    port: &'a Option<Arc<T>>,
    what: &str,
) -> Result<&'a Arc<T>, RelayError> {
    port.as_ref()
        .ok_or_else(|| RelayError::configuration(format!("no {what} configured on this side")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::fakes::{
        build_envelope, consumer_config, launch_config, release, RecordingBusPublisher,
        RecordingTaskLauncher, CONSUMER,
    };
    use pipeline::launch_request;

    #[tokio::test]
    async fn launch_action_calls_launcher_once() {
        let launcher = Arc::new(RecordingTaskLauncher::new());
        let executor = Executor::new().with_launcher(launcher.clone());
        let request = launch_request(&release("shared", "3.0.0"), &launch_config()).unwrap();

        let outcome = executor
            .execute(&Action::LaunchTask(request.clone()))
            .await
            .unwrap();

        assert!(matches!(outcome, ActionOutcome::Launched(_)));
        assert_eq!(launcher.requests(), vec![request]);
    }

    #[tokio::test]
    async fn rejected_launch_surfaces_launch_failed() {
        let launcher = Arc::new(RecordingTaskLauncher::rejecting("quota exceeded"));
        let executor = Executor::new().with_launcher(launcher.clone());
        let request = launch_request(&release("shared", "3.0.0"), &launch_config()).unwrap();

        let err = executor.execute(&Action::LaunchTask(request)).await.unwrap_err();

        assert_eq!(
            err,
            RelayError::LaunchFailed {
                reason: "quota exceeded".to_string()
            }
        );
        assert_eq!(launcher.requests().len(), 1, "no retry expected");
    }

    #[tokio::test]
    async fn missing_port_is_a_configuration_error() {
        let action = Action::PublishToBus {
            target: consumer_config().peer_bus(),
            event: build_envelope("FAILED", CONSUMER),
        };

        let err = Executor::new().execute(&action).await.unwrap_err();

        assert!(matches!(err, RelayError::ConfigurationError { .. }));
    }

    #[tokio::test]
    async fn bus_publish_passes_event_through() {
        let bus = Arc::new(RecordingBusPublisher::new());
        let executor = Executor::new().with_bus(bus.clone());
        let target = consumer_config().peer_bus();
        let event = build_envelope("FAILED", CONSUMER);

        executor
            .execute(&Action::PublishToBus {
                target: target.clone(),
                event: event.clone(),
            })
            .await
            .unwrap();

        assert_eq!(bus.published(), vec![(target, event)]);
    }
}
