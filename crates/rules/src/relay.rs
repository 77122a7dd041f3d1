//! The relay: bridge admission, rule evaluation and action execution for each
//! inbound event.
//!
//! Every event is handled on its own task with its own span. A failure while
//! handling one event is reported for that event and never affects another;
//! the only state shared between invocations is the immutable rule set and the
//! ports.

use std::sync::Arc;

use pipeline::{
    Bridge, EventEnvelope, EventId, EventSource, InvocationId, RelayConfig, RelayError, RuleSet,
};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::executor::{ActionOutcome, Executor};

/// Result of one matched rule's action.
#[derive(Debug, Clone, Serialize)]
pub struct RuleOutcome {
    pub rule: &'static str,
    pub action: &'static str,
    pub result: Result<ActionOutcome, RelayError>,
}

/// Everything that happened because of one inbound event.
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub invocation_id: InvocationId,
    pub event_id: Option<EventId>,
    /// `false` if the bridge dropped the event before any rule ran.
    pub admitted: bool,
    /// One entry per matched rule, in rule order. Empty if nothing matched.
    pub outcomes: Vec<RuleOutcome>,
}

impl EventReport {
    /// Number of actions that failed.
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }
}

/// Totals over a whole event source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub events: usize,
    pub dropped: usize,
    pub actions_succeeded: usize,
    pub actions_failed: usize,
    /// Event handlers that panicked. Always zero unless a port panics.
    pub handler_panics: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &EventReport) {
        self.events += 1;
        if !report.admitted {
            self.dropped += 1;
        }
        let failed = report.failures();
        self.actions_failed += failed;
        self.actions_succeeded += report.outcomes.len() - failed;
    }
}

/// Applies one side's rules to inbound events.
#[derive(Debug)]
pub struct Relay {
    bridge: Bridge,
    rules: RuleSet,
    executor: Executor,
}

impl Relay {
    /// Builds the relay for the side `config` describes.
    pub fn new(config: &RelayConfig, executor: Executor) -> Self {
        Self::from_parts(config.bridge(), RuleSet::for_config(config), executor)
    }

    pub fn from_parts(bridge: Bridge, rules: RuleSet, executor: Executor) -> Self {
        Self {
            bridge,
            rules,
            executor,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Handles one event: unwrapping, admission, every matching rule, every
    /// resulting action.
    pub async fn handle(&self, envelope: EventEnvelope) -> EventReport {
        let invocation_id = InvocationId::new_random();
        let span = info_span!(
            "relay_event",
            %invocation_id,
            event_id = envelope.id_for_log(),
            source = %envelope.source,
            detail_type = %envelope.detail_type,
        );
        self.handle_inner(invocation_id, envelope)
            .instrument(span)
            .await
    }

    async fn handle_inner(&self, invocation_id: InvocationId, envelope: EventEnvelope) -> EventReport {
        let mut report = EventReport {
            invocation_id,
            event_id: envelope.id.clone(),
            admitted: false,
            outcomes: Vec::new(),
        };

        // A wrapper is judged by the envelope it carries.
        let envelope = match envelope.unwrap_forwarded() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Dropping forwarded event");
                return report;
            }
        };

        if !self.bridge.admits(&envelope) {
            return report;
        }
        report.admitted = true;

        let matches = self.rules.evaluate(&envelope);
        if matches.is_empty() {
            debug!("No rule matched");
            return report;
        }

        for matched in matches {
            info!(rule = matched.rule, action = matched.action.kind(), "Rule matched");
            let result = self.executor.execute(&matched.action).await;
            report.outcomes.push(RuleOutcome {
                rule: matched.rule,
                action: matched.action.kind(),
                result,
            });
        }
        report
    }

    /// Drains `source`, handling every event concurrently on its own task.
    ///
    /// Returns once the source is exhausted and every in-flight event has
    /// been handled. `on_report` sees each report as it completes, in
    /// completion order.
    pub async fn run<S, F>(self: Arc<Self>, mut source: S, mut on_report: F) -> RunSummary
    where
        S: EventSource,
        F: FnMut(&EventReport),
    {
        info!(side = %self.rules.side(), rules = ?self.rules.rule_names(), "Relay started");

        let mut summary = RunSummary::default();
        let mut in_flight = JoinSet::new();

        while let Some(envelope) = source.next_event().await {
            let relay = Arc::clone(&self);
            in_flight.spawn(async move { relay.handle(envelope).await });

            // Reap finished handlers so a long-lived source does not accumulate them.
            while let Some(joined) = in_flight.try_join_next() {
                Self::collect(joined, &mut summary, &mut on_report);
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            Self::collect(joined, &mut summary, &mut on_report);
        }

        info!(
            events = summary.events,
            dropped = summary.dropped,
            actions_succeeded = summary.actions_succeeded,
            actions_failed = summary.actions_failed,
            "Event source exhausted"
        );
        summary
    }

    fn collect<F: FnMut(&EventReport)>(
        joined: Result<EventReport, tokio::task::JoinError>,
        summary: &mut RunSummary,
        on_report: &mut F,
    ) {
        match joined {
            Ok(report) => {
                summary.absorb(&report);
                on_report(&report);
            }
            Err(e) => {
                summary.events += 1;
                summary.handler_panics += 1;
                error!(error = %e, "Event handler did not complete");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::fakes::{
        build_envelope, consumer_config, producer_config, release_envelope,
        RecordingBusPublisher, RecordingTaskLauncher, RecordingTopicPublisher, VecEventSource,
        CONSUMER, PRODUCER,
    };

    #[tokio::test]
    async fn untrusted_origin_is_dropped_before_rules() {
        let launcher = Arc::new(RecordingTaskLauncher::new());
        let relay = Relay::new(&consumer_config(), Executor::new().with_launcher(launcher.clone()));

        let mut envelope = release_envelope("com.acme", "shared", "3.0.0");
        envelope.account = Some("333333333333".to_string());

        let report = relay.handle(envelope).await;

        assert!(!report.admitted);
        assert!(report.outcomes.is_empty());
        assert!(launcher.requests().is_empty());
    }

    #[tokio::test]
    async fn forwarded_release_is_unwrapped_before_rules() {
        let launcher = Arc::new(RecordingTaskLauncher::new());
        let relay = Relay::new(&consumer_config(), Executor::new().with_launcher(launcher.clone()));
        let wrapped = release_envelope("com.acme", "shared", "3.0.0")
            .wrap_forwarded()
            .unwrap();

        let report = relay.handle(wrapped).await;

        assert!(report.admitted);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].rule, "library-release");
        assert_eq!(launcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn wrapper_claiming_another_origin_is_dropped() {
        let launcher = Arc::new(RecordingTaskLauncher::new());
        let relay = Relay::new(&consumer_config(), Executor::new().with_launcher(launcher.clone()));
        let mut wrapped = release_envelope("com.acme", "shared", "3.0.0")
            .wrap_forwarded()
            .unwrap();
        wrapped.account = Some(CONSUMER.to_string());

        let report = relay.handle(wrapped).await;

        assert!(!report.admitted);
        assert!(launcher.requests().is_empty());
    }

    #[tokio::test]
    async fn consumer_does_not_forward_failures_stamped_with_producer() {
        let bus = Arc::new(RecordingBusPublisher::new());
        let relay = Relay::new(&consumer_config(), Executor::new().with_bus(bus.clone()));

        let report = relay.handle(build_envelope("FAILED", PRODUCER)).await;

        assert!(report.admitted);
        assert!(report.outcomes.is_empty());
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn unmatched_event_produces_empty_report() {
        let relay = Relay::new(&consumer_config(), Executor::new());

        let report = relay.handle(build_envelope("SUCCEEDED", CONSUMER)).await;

        assert!(report.admitted);
        assert!(report.outcomes.is_empty());
        assert_eq!(report.failures(), 0);
    }

    #[tokio::test]
    async fn producer_alerts_on_forwarded_failure() {
        let topics = Arc::new(RecordingTopicPublisher::new());
        let relay = Relay::new(&producer_config(), Executor::new().with_topics(topics.clone()));

        let report = relay.handle(build_envelope("FAILED", CONSUMER)).await;

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].rule, "broken-build-alert");
        assert!(report.outcomes[0].result.is_ok());
        assert_eq!(topics.published().len(), 1);
    }

    #[tokio::test]
    async fn one_failing_event_does_not_affect_others() {
        let bus = Arc::new(RecordingBusPublisher::rejecting("AccessDeniedException"));
        let launcher = Arc::new(RecordingTaskLauncher::new());
        let relay = Arc::new(Relay::new(
            &consumer_config(),
            Executor::new()
                .with_bus(bus.clone())
                .with_launcher(launcher.clone()),
        ));
        let source = VecEventSource::new([
            build_envelope("FAILED", CONSUMER),
            release_envelope("com.acme", "shared", "3.0.0"),
            release_envelope("com.acme", "shared", "3.1.0"),
        ]);

        let summary = relay.run(source, |_| {}).await;

        assert_eq!(summary.events, 3);
        assert_eq!(summary.actions_failed, 1);
        assert_eq!(summary.actions_succeeded, 2);
        assert_eq!(bus.published().len(), 1);
        assert_eq!(launcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn run_reports_every_event() {
        let relay = Arc::new(Relay::new(&producer_config(), Executor::new()));
        let source = VecEventSource::new([
            build_envelope("SUCCEEDED", CONSUMER),
            build_envelope("SUCCEEDED", PRODUCER),
        ]);
        let mut seen = 0;

        let summary = relay.run(source, |_| seen += 1).await;

        assert_eq!(seen, 2);
        assert_eq!(summary.events, 2);
        assert_eq!(summary.dropped, 0);
    }
}
