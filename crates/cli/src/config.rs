//! Configuration loading.
//!
//! The TOML file maps directly onto [`FileConfig`]. Command-line flags and
//! their environment variables ([`Overrides`]) take precedence over file
//! values. [`resolve`] turns the merged values into a validated
//! [`RelayConfig`] plus the infrastructure settings the composition root
//! needs; any missing or malformed value stops the process before a single
//! event is read.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use pipeline::{
    AccountId, ClusterRef, ConsumerSettings, ContainerName, DeploymentSide, EventBusName,
    LaunchConfig, ProducerSettings, ProjectName, Region, RelayConfig, RelayError, RepositoryId,
    SharedSecret, SideSettings, SubnetId, TaskDefinitionRef, TopicRef,
};
use serde::Deserialize;
use thiserror::Error;

use crate::telemetry::TelemetryConfig;

pub const DEFAULT_BUS_NAME: &str = "default";
pub const DEFAULT_DOMAIN_NAME: &str = "codeartifact-domain";
pub const DEFAULT_REPOSITORY_NAME: &str = "codeartifact";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Invalid(#[from] RelayError),
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// Root of the TOML configuration file. Every section is optional in the
/// file; which ones are required depends on the deployment side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub side: Option<DeploymentSide>,
    #[serde(default)]
    pub accounts: AccountsSection,
    pub launch: Option<LaunchSection>,
    pub build: Option<BuildSection>,
    #[serde(default)]
    pub bus: BusSection,
    #[serde(default)]
    pub release: ReleaseSection,
    pub alerts: Option<AlertsSection>,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountsSection {
    pub producer: Option<String>,
    pub consumer: Option<String>,
    pub region: Option<String>,
}

/// `[launch]`: how the consumer starts update tasks.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchSection {
    pub task_definition: String,
    pub cluster: String,
    pub subnets: Vec<String>,
    pub container_name: String,
    pub repo_url: String,
    pub repo_name: String,
    /// Defaults to the relay's region.
    pub repo_region: Option<String>,
}

/// `[build]`: which pull requests the consumer builds, and with what.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    pub repository: String,
    pub project: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusTransport {
    /// Signed `PutEvents` calls against the peer account's bus.
    #[default]
    EventBridge,
    /// `POST /events` against a peer relay's webhook.
    Http,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusSection {
    /// Name of the bus in both accounts; `default` if unset.
    pub name: Option<String>,
    #[serde(default)]
    pub transport: BusTransport,
    /// Base URL of the peer relay; required with `transport = "http"`.
    pub peer_url: Option<String>,
    /// Secret both relays sign and verify webhook deliveries with; required
    /// with `transport = "http"` and to serve the webhook.
    pub shared_secret: Option<String>,
}

/// `[release]`: which artifact repository the producer forwards releases from.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseSection {
    #[serde(default = "default_domain_name")]
    pub domain_name: String,
    #[serde(default = "default_repository_name")]
    pub repository_name: String,
}

impl Default for ReleaseSection {
    fn default() -> Self {
        Self {
            domain_name: default_domain_name(),
            repository_name: default_repository_name(),
        }
    }
}

fn default_domain_name() -> String {
    DEFAULT_DOMAIN_NAME.to_string()
}

fn default_repository_name() -> String {
    DEFAULT_REPOSITORY_NAME.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertsSection {
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
    /// Overrides the regional AWS endpoints (local emulators).
    pub aws_endpoint: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            aws_endpoint: None,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl FileConfig {
    /// Reads and parses `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path` if given, otherwise starts from an empty configuration.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub side: Option<DeploymentSide>,
    pub producer_account: Option<String>,
    pub consumer_account: Option<String>,
    pub region: Option<String>,
    pub listen: Option<SocketAddr>,
    pub aws_endpoint: Option<String>,
    pub shared_secret: Option<String>,
}

/// Everything the composition root needs, fully validated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub relay: RelayConfig,
    pub bus_transport: BusTransport,
    pub peer_url: Option<String>,
    pub shared_secret: Option<SharedSecret>,
    pub listen: SocketAddr,
    pub aws_endpoint: Option<String>,
}

impl Settings {
    /// The secret the webhook verifies deliveries with.
    pub fn webhook_secret(&self) -> Result<SharedSecret, ConfigError> {
        self.shared_secret.clone().ok_or_else(|| {
            RelayError::configuration(
                "bus.shared_secret is required to serve the webhook (--shared-secret)",
            )
            .into()
        })
    }
}

fn required(value: Option<String>, what: &str) -> Result<String, RelayError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RelayError::configuration(format!("{what} is required")))
}

fn account(value: Option<String>, what: &str) -> Result<AccountId, RelayError> {
    let raw = required(value, what)?;
    AccountId::new(raw.trim()).ok_or_else(|| {
        RelayError::configuration(format!("{what} '{raw}' is not a 12-digit account id"))
    })
}

/// Wraps `T::new`-style constructors that reject empty values.
fn parsed<T>(value: String, what: &str, new: impl FnOnce(String) -> Option<T>) -> Result<T, RelayError> {
    new(value).ok_or_else(|| RelayError::configuration(format!("{what} must not be empty")))
}

fn consumer_settings(
    file: &FileConfig,
    region: &Region,
) -> Result<ConsumerSettings, RelayError> {
    let launch = file
        .launch
        .as_ref()
        .ok_or_else(|| RelayError::configuration("[launch] section is required on the consumer side"))?;
    let build = file
        .build
        .as_ref()
        .ok_or_else(|| RelayError::configuration("[build] section is required on the consumer side"))?;

    let subnets = launch
        .subnets
        .iter()
        .map(|s| parsed(s.trim().to_string(), "launch.subnets entry", SubnetId::new))
        .collect::<Result<Vec<_>, _>>()?;
    let repo_region = match &launch.repo_region {
        Some(r) => parsed(r.clone(), "launch.repo_region", Region::new)?,
        None => region.clone(),
    };

    Ok(ConsumerSettings {
        launch: LaunchConfig {
            task_definition: parsed(
                launch.task_definition.clone(),
                "launch.task_definition",
                TaskDefinitionRef::new,
            )?,
            cluster: parsed(launch.cluster.clone(), "launch.cluster", ClusterRef::new)?,
            subnets,
            container_name: parsed(
                launch.container_name.clone(),
                "launch.container_name",
                ContainerName::new,
            )?,
            repo_url: required(Some(launch.repo_url.clone()), "launch.repo_url")?,
            repo_name: required(Some(launch.repo_name.clone()), "launch.repo_name")?,
            repo_region,
        },
        repository: parsed(build.repository.clone(), "build.repository", RepositoryId::new)?,
        build_project: parsed(build.project.clone(), "build.project", ProjectName::new)?,
    })
}

fn producer_settings(file: &FileConfig) -> Result<ProducerSettings, RelayError> {
    let alerts = file
        .alerts
        .as_ref()
        .ok_or_else(|| RelayError::configuration("[alerts] section is required on the producer side"))?;
    Ok(ProducerSettings {
        domain_name: required(Some(file.release.domain_name.clone()), "release.domain_name")?,
        repository_name: required(
            Some(file.release.repository_name.clone()),
            "release.repository_name",
        )?,
        alert_topic: parsed(alerts.topic.clone(), "alerts.topic", TopicRef::new)?,
    })
}

/// Merges `overrides` over `file` and validates the result.
pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Settings, ConfigError> {
    let side = overrides.side.or(file.side).ok_or_else(|| {
        RelayError::configuration("deployment side is required (--side producer|consumer)")
    })?;
    let producer = account(
        overrides.producer_account.or(file.accounts.producer.clone()),
        "producer account",
    )?;
    let consumer = account(
        overrides.consumer_account.or(file.accounts.consumer.clone()),
        "consumer account",
    )?;
    let region = parsed(
        required(overrides.region.or(file.accounts.region.clone()), "region")?,
        "region",
        Region::new,
    )?;
    let bus_name = parsed(
        file.bus
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_BUS_NAME.to_string()),
        "bus.name",
        EventBusName::new,
    )?;

    let settings = match side {
        DeploymentSide::Consumer => SideSettings::Consumer(consumer_settings(&file, &region)?),
        DeploymentSide::Producer => SideSettings::Producer(producer_settings(&file)?),
    };

    let shared_secret = overrides
        .shared_secret
        .or(file.bus.shared_secret)
        .and_then(SharedSecret::new);
    if file.bus.transport == BusTransport::Http {
        if file.bus.peer_url.is_none() {
            return Err(RelayError::configuration("bus.peer_url is required with transport = \"http\"").into());
        }
        if shared_secret.is_none() {
            return Err(RelayError::configuration(
                "bus.shared_secret is required with transport = \"http\"",
            )
            .into());
        }
    }

    Ok(Settings {
        relay: RelayConfig::new(producer, consumer, region, bus_name, settings)?,
        bus_transport: file.bus.transport,
        peer_url: file.bus.peer_url,
        shared_secret,
        listen: overrides.listen.unwrap_or(file.server.listen),
        aws_endpoint: overrides.aws_endpoint.or(file.server.aws_endpoint),
    })
}
