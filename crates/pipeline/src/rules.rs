//! Routing rules: pure functions from an event to at most one action.
//!
//! Each rule pairs a filter with the action its matches produce. Rules never
//! perform I/O; the `rules` crate's executor carries out the returned
//! [`Action`]s. One event may match several rules in a set; each match is an
//! independent action.

use serde::{Deserialize, Serialize};

use crate::bridge::BusAddress;
use crate::config::SideSettings;
use crate::decision::{decide, LaunchDecision};
use crate::filters::{BuildTrigger, BuildTriggerFilter, FailureFilter, ReleaseFilter};
use crate::{
    AccountId, DeploymentSide, EventEnvelope, LaunchConfig, LaunchRequest, RelayConfig, TopicRef,
};

/// The effects a rule can ask for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Launch the update task.
    LaunchTask(LaunchRequest),
    /// Build the update pull request.
    StartBuild(BuildTrigger),
    /// Put `event` unchanged onto the bus at `target`.
    PublishToBus {
        target: BusAddress,
        event: EventEnvelope,
    },
    /// Publish `event` unchanged to the alert topic.
    PublishToTopic {
        topic: TopicRef,
        event: EventEnvelope,
    },
}

impl Action {
    /// Short label for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LaunchTask(_) => "launch_task",
            Self::StartBuild(_) => "start_build",
            Self::PublishToBus { .. } => "publish_to_bus",
            Self::PublishToTopic { .. } => "publish_to_topic",
        }
    }
}

/// A named, pure routing rule.
pub trait Rule: Send + Sync + std::fmt::Debug {
    /// Stable name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Returns the action `envelope` calls for, or `None` if it does not match.
    fn evaluate(&self, envelope: &EventEnvelope) -> Option<Action>;
}

// ---------------------------------------------------------------------------
// Consumer rules
// ---------------------------------------------------------------------------

/// Published release → launch the update task (snapshots skipped).
#[derive(Debug, Clone)]
pub struct LibraryReleaseRule {
    filter: ReleaseFilter,
    launch: LaunchConfig,
}

impl LibraryReleaseRule {
    pub fn new(filter: ReleaseFilter, launch: LaunchConfig) -> Self {
        Self { filter, launch }
    }
}

impl Rule for LibraryReleaseRule {
    fn name(&self) -> &'static str {
        "library-release"
    }

    fn evaluate(&self, envelope: &EventEnvelope) -> Option<Action> {
        let release = self.filter.evaluate(envelope)?;
        match decide(&release, &self.launch) {
            LaunchDecision::Go(request) => Some(Action::LaunchTask(request)),
            LaunchDecision::Skip { .. } => None,
        }
    }
}

/// Update pull request created against trunk → build it.
#[derive(Debug, Clone)]
pub struct PullRequestCreatedRule {
    filter: BuildTriggerFilter,
}

impl PullRequestCreatedRule {
    pub fn new(filter: BuildTriggerFilter) -> Self {
        Self { filter }
    }
}

impl Rule for PullRequestCreatedRule {
    fn name(&self) -> &'static str {
        "pull-request-created"
    }

    fn evaluate(&self, envelope: &EventEnvelope) -> Option<Action> {
        self.filter.evaluate(envelope).map(Action::StartBuild)
    }
}

/// Failed build in the consumer account → forward to the producer account's
/// bus.
#[derive(Debug, Clone)]
pub struct BrokenBuildForwardRule {
    filter: FailureFilter,
    target: BusAddress,
}

impl BrokenBuildForwardRule {
    pub fn new(consumer_account: AccountId, target: BusAddress) -> Self {
        Self {
            filter: FailureFilter::from_account(consumer_account),
            target,
        }
    }
}

impl Rule for BrokenBuildForwardRule {
    fn name(&self) -> &'static str {
        "broken-build"
    }

    fn evaluate(&self, envelope: &EventEnvelope) -> Option<Action> {
        self.filter.matches(envelope).then(|| Action::PublishToBus {
            target: self.target.clone(),
            event: envelope.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Producer rules
// ---------------------------------------------------------------------------

/// Published release in the shared repository → forward to the consumer
/// account's bus.
#[derive(Debug, Clone)]
pub struct ReleaseForwardRule {
    filter: ReleaseFilter,
    target: BusAddress,
}

impl ReleaseForwardRule {
    pub fn new(filter: ReleaseFilter, target: BusAddress) -> Self {
        Self { filter, target }
    }
}

impl Rule for ReleaseForwardRule {
    fn name(&self) -> &'static str {
        "library-release-forward"
    }

    fn evaluate(&self, envelope: &EventEnvelope) -> Option<Action> {
        self.filter.evaluate(envelope)?;
        Some(Action::PublishToBus {
            target: self.target.clone(),
            event: envelope.clone(),
        })
    }
}

/// Failed build from the consumer account → alert topic.
#[derive(Debug, Clone)]
pub struct BrokenBuildAlertRule {
    filter: FailureFilter,
    topic: TopicRef,
}

impl BrokenBuildAlertRule {
    pub fn new(filter: FailureFilter, topic: TopicRef) -> Self {
        Self { filter, topic }
    }
}

impl Rule for BrokenBuildAlertRule {
    fn name(&self) -> &'static str {
        "broken-build-alert"
    }

    fn evaluate(&self, envelope: &EventEnvelope) -> Option<Action> {
        self.filter.matches(envelope).then(|| Action::PublishToTopic {
            topic: self.topic.clone(),
            event: envelope.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Rule sets
// ---------------------------------------------------------------------------

/// A rule that matched, with the action it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub action: Action,
}

/// The rules one relay instance applies to every admitted event.
#[derive(Debug)]
pub struct RuleSet {
    side: DeploymentSide,
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    /// Creates a rule set from explicit rules.
    pub fn new(side: DeploymentSide, rules: Vec<Box<dyn Rule>>) -> Self {
        Self { side, rules }
    }

    /// Builds the rule set for the side `config` describes.
    pub fn for_config(config: &RelayConfig) -> Self {
        match config.settings() {
            SideSettings::Consumer(consumer) => Self::new(
                DeploymentSide::Consumer,
                vec![
                    Box::new(LibraryReleaseRule::new(
                        ReleaseFilter::new(config.producer_account().clone()),
                        consumer.launch.clone(),
                    )),
                    Box::new(PullRequestCreatedRule::new(BuildTriggerFilter::new(
                        consumer.repository.clone(),
                        consumer.build_project.clone(),
                    ))),
                    Box::new(BrokenBuildForwardRule::new(
                        config.consumer_account().clone(),
                        config.peer_bus(),
                    )),
                ],
            ),
            SideSettings::Producer(producer) => Self::new(
                DeploymentSide::Producer,
                vec![
                    Box::new(ReleaseForwardRule::new(
                        ReleaseFilter::new(config.producer_account().clone())
                            .restricted_to(&producer.domain_name, &producer.repository_name),
                        config.peer_bus(),
                    )),
                    Box::new(BrokenBuildAlertRule::new(
                        FailureFilter::from_account(config.consumer_account().clone()),
                        producer.alert_topic.clone(),
                    )),
                ],
            ),
        }
    }

    pub fn side(&self) -> DeploymentSide {
        self.side
    }

    /// Names of the rules in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Evaluates every rule against `envelope`, in order.
    pub fn evaluate(&self, envelope: &EventEnvelope) -> Vec<RuleMatch> {
        self.rules
            .iter()
            .filter_map(|rule| {
                rule.evaluate(envelope).map(|action| RuleMatch {
                    rule: rule.name(),
                    action,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{
        build_envelope, consumer_config, producer_config, pull_request_envelope,
        release_envelope, ALERT_TOPIC, CONSUMER, PRODUCER,
    };

    #[test]
    fn consumer_rule_names() {
        let rules = RuleSet::for_config(&consumer_config());
        assert_eq!(rules.side(), DeploymentSide::Consumer);
        assert_eq!(
            rules.rule_names(),
            vec!["library-release", "pull-request-created", "broken-build"]
        );
    }

    #[test]
    fn producer_rule_names() {
        let rules = RuleSet::for_config(&producer_config());
        assert_eq!(rules.side(), DeploymentSide::Producer);
        assert_eq!(rules.rule_names(), vec!["library-release-forward", "broken-build-alert"]);
    }

    #[test]
    fn consumer_launches_task_for_release() {
        let rules = RuleSet::for_config(&consumer_config());
        let matches = rules.evaluate(&release_envelope("com.acme", "shared", "3.0.0"));

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule, "library-release");
        let Action::LaunchTask(request) = &matches[0].action else {
            panic!("expected a launch, got {:?}", matches[0].action);
        };
        assert_eq!(request.env("ARTIFACT_VERSION"), Some("3.0.0"));
        assert_eq!(request.env("ARTIFACT_ID"), Some("shared"));
    }

    #[test]
    fn consumer_skips_snapshot_release() {
        let rules = RuleSet::for_config(&consumer_config());
        let matches = rules.evaluate(&release_envelope("com.acme", "shared", "3.0.0-SNAPSHOT"));
        assert!(matches.is_empty());
    }

    #[test]
    fn consumer_builds_update_pull_request() {
        let rules = RuleSet::for_config(&consumer_config());
        let matches = rules.evaluate(&pull_request_envelope(
            "refs/heads/library_update_3.0.0",
            "refs/heads/main",
        ));

        assert_eq!(matches.len(), 1);
        let Action::StartBuild(trigger) = &matches[0].action else {
            panic!("expected a build start");
        };
        assert_eq!(trigger.source_version.as_str(), "refs/heads/library_update_3.0.0");
    }

    #[test]
    fn consumer_forwards_failed_build_unchanged_to_producer() {
        let rules = RuleSet::for_config(&consumer_config());
        let envelope = build_envelope("FAILED", CONSUMER);

        let matches = rules.evaluate(&envelope);

        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].action,
            Action::PublishToBus {
                target: consumer_config().peer_bus(),
                event: envelope,
            }
        );
        let Action::PublishToBus { target, .. } = &matches[0].action else {
            unreachable!()
        };
        assert_eq!(target.account.as_str(), PRODUCER);
    }

    #[test]
    fn consumer_does_not_echo_producer_failures_back() {
        let rules = RuleSet::for_config(&consumer_config());

        assert!(rules.evaluate(&build_envelope("FAILED", PRODUCER)).is_empty());
    }

    #[test]
    fn consumer_ignores_successful_build() {
        let rules = RuleSet::for_config(&consumer_config());
        assert!(rules.evaluate(&build_envelope("SUCCEEDED", CONSUMER)).is_empty());
    }

    #[test]
    fn producer_forwards_release_including_snapshots() {
        let rules = RuleSet::for_config(&producer_config());
        let envelope = release_envelope("com.acme", "shared", "3.0.0-SNAPSHOT");

        let matches = rules.evaluate(&envelope);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].rule, "library-release-forward");
        let Action::PublishToBus { target, event } = &matches[0].action else {
            panic!("expected a bus publish");
        };
        assert_eq!(target.account.as_str(), CONSUMER);
        assert_eq!(event, &envelope);
    }

    #[test]
    fn producer_alerts_on_consumer_failures_only() {
        let rules = RuleSet::for_config(&producer_config());

        let matches = rules.evaluate(&build_envelope("FAILED", CONSUMER));
        assert_eq!(matches.len(), 1);
        let Action::PublishToTopic { topic, .. } = &matches[0].action else {
            panic!("expected a topic publish");
        };
        assert_eq!(topic.as_str(), ALERT_TOPIC);

        assert!(rules.evaluate(&build_envelope("FAILED", PRODUCER)).is_empty());
        assert!(rules.evaluate(&build_envelope("SUCCEEDED", CONSUMER)).is_empty());
    }

    #[test]
    fn producer_does_not_launch_or_build() {
        let rules = RuleSet::for_config(&producer_config());
        let pr = pull_request_envelope("refs/heads/library_update_3.0.0", "refs/heads/main");
        assert!(rules.evaluate(&pr).is_empty());
    }
}
