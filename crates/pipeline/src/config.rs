//! Immutable relay configuration.
//!
//! Built once at process start (see the `cli` crate for loading) and shared by
//! reference with every rule and executor. Nothing in the relay mutates it.

use crate::bridge::{Bridge, BusAddress, CrossAccountPermission};
use crate::{
    AccountId, DeploymentSide, EventBusName, LaunchConfig, ProjectName, Region, RelayError,
    RepositoryId, TopicRef,
};

/// Settings only the consumer side needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// How update tasks are launched.
    pub launch: LaunchConfig,
    /// The dependent repository whose pull requests are built.
    pub repository: RepositoryId,
    /// The build project that builds update pull requests.
    pub build_project: ProjectName,
}

/// Settings only the producer side needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerSettings {
    /// Artifact repository domain whose releases are forwarded.
    pub domain_name: String,
    /// Artifact repository (within the domain) whose releases are forwarded.
    pub repository_name: String,
    /// Topic broken-build alerts are published to.
    pub alert_topic: TopicRef,
}

/// Side-specific part of [`RelayConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideSettings {
    Producer(ProducerSettings),
    Consumer(ConsumerSettings),
}

/// Validated configuration of one relay instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    producer_account: AccountId,
    consumer_account: AccountId,
    region: Region,
    bus_name: EventBusName,
    settings: SideSettings,
}

impl RelayConfig {
    /// Creates a configuration, checking the invariants that span fields.
    ///
    /// # Errors
    ///
    /// [`RelayError::ConfigurationError`] if both accounts are the same (a
    /// relay forwarding to its own bus would re-receive its own output), or if
    /// the consumer launch configuration lists no subnets.
    pub fn new(
        producer_account: AccountId,
        consumer_account: AccountId,
        region: Region,
        bus_name: EventBusName,
        settings: SideSettings,
    ) -> Result<Self, RelayError> {
        if producer_account == consumer_account {
            return Err(RelayError::configuration(format!(
                "producer and consumer account must differ (both are {producer_account})"
            )));
        }
        if let SideSettings::Consumer(consumer) = &settings {
            if consumer.launch.subnets.is_empty() {
                return Err(RelayError::configuration(
                    "launch configuration must list at least one subnet",
                ));
            }
        }
        Ok(Self {
            producer_account,
            consumer_account,
            region,
            bus_name,
            settings,
        })
    }

    pub fn side(&self) -> DeploymentSide {
        match self.settings {
            SideSettings::Producer(_) => DeploymentSide::Producer,
            SideSettings::Consumer(_) => DeploymentSide::Consumer,
        }
    }

    pub fn producer_account(&self) -> &AccountId {
        &self.producer_account
    }

    pub fn consumer_account(&self) -> &AccountId {
        &self.consumer_account
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn bus_name(&self) -> &EventBusName {
        &self.bus_name
    }

    pub fn settings(&self) -> &SideSettings {
        &self.settings
    }

    /// The account this relay runs in.
    pub fn local_account(&self) -> &AccountId {
        match self.side() {
            DeploymentSide::Producer => &self.producer_account,
            DeploymentSide::Consumer => &self.consumer_account,
        }
    }

    /// The account on the other end of the bridge.
    pub fn peer_account(&self) -> &AccountId {
        match self.side() {
            DeploymentSide::Producer => &self.consumer_account,
            DeploymentSide::Consumer => &self.producer_account,
        }
    }

    /// Address of the peer account's bus, in the shared region.
    pub fn peer_bus(&self) -> BusAddress {
        BusAddress::new(
            self.region.clone(),
            self.peer_account().clone(),
            self.bus_name.clone(),
        )
    }

    /// The local end of the bridge: the peer may put events on our bus.
    pub fn bridge(&self) -> Bridge {
        Bridge::new(
            self.local_account().clone(),
            vec![CrossAccountPermission::put_events(
                self.peer_account().clone(),
                self.local_account().clone(),
            )],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{consumer_config, producer_config, CONSUMER, PRODUCER};

    #[test]
    fn consumer_config_points_at_producer_bus() {
        let config = consumer_config();

        assert_eq!(config.side(), DeploymentSide::Consumer);
        assert_eq!(config.local_account().as_str(), CONSUMER);
        assert_eq!(
            config.peer_bus().arn(),
            format!("arn:aws:events:eu-west-1:{PRODUCER}:event-bus/default")
        );
        assert!(config.bridge().admits_origin(PRODUCER));
    }

    #[test]
    fn producer_config_points_at_consumer_bus() {
        let config = producer_config();

        assert_eq!(config.side(), DeploymentSide::Producer);
        assert_eq!(config.peer_account().as_str(), CONSUMER);
        assert!(config.bridge().admits_origin(CONSUMER));
        assert!(!config.bridge().admits_origin("333333333333"));
    }

    #[test]
    fn identical_accounts_are_rejected() {
        let base = producer_config();
        let err = RelayConfig::new(
            base.producer_account().clone(),
            base.producer_account().clone(),
            base.region().clone(),
            base.bus_name().clone(),
            base.settings().clone(),
        )
        .unwrap_err();

        assert!(matches!(err, RelayError::ConfigurationError { .. }));
    }

    #[test]
    fn consumer_without_subnets_is_rejected() {
        let base = consumer_config();
        let SideSettings::Consumer(mut consumer) = base.settings().clone() else {
            panic!("expected consumer settings");
        };
        consumer.launch.subnets.clear();

        let result = RelayConfig::new(
            base.producer_account().clone(),
            base.consumer_account().clone(),
            base.region().clone(),
            base.bus_name().clone(),
            SideSettings::Consumer(consumer),
        );

        assert!(result.is_err());
    }
}
