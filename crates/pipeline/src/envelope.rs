//! The event-bus envelope every inbound and forwarded event travels in.
//!
//! Field names follow the bus wire format exactly (`detail-type` is
//! hyphenated). The `detail` payload is kept as raw JSON: filters read the
//! handful of fields they care about and forwarding rules pass the envelope on
//! without transformation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EventId, RelayError, Timestamp};

/// `source` values of the managed services whose events the pipeline consumes.
pub mod sources {
    /// The artifact repository.
    pub const ARTIFACT_REPOSITORY: &str = "aws.codeartifact";
    /// The source-control host.
    pub const SOURCE_CONTROL: &str = "aws.codecommit";
    /// The build runner.
    pub const BUILD_SYSTEM: &str = "aws.codebuild";
    /// A relay re-publishing another account's managed-service event; the
    /// original envelope is the `detail`.
    pub const FORWARDED: &str = "librelay.forward";

    /// Namespace only the managed services themselves may publish under.
    pub const RESERVED_PREFIX: &str = "aws.";
}

/// `detail-type` values of the events the pipeline consumes.
pub mod detail_types {
    /// A package version changed state in the artifact repository.
    pub const PACKAGE_VERSION_STATE_CHANGE: &str = "CodeArtifact Package Version State Change";
    /// A pull request changed state in the source-control host.
    pub const PULL_REQUEST_STATE_CHANGE: &str = "CodeCommit Pull Request State Change";
    /// A build changed state in the build runner.
    pub const BUILD_STATE_CHANGE: &str = "CodeBuild Build State Change";
}

fn default_version() -> String {
    "0".to_string()
}

/// One event as delivered by (or published to) an event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Envelope schema version; always `"0"` today.
    #[serde(default = "default_version")]
    pub version: String,

    /// Identifier assigned by the delivering bus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,

    /// Human-readable event type, e.g. `"CodeBuild Build State Change"`.
    #[serde(rename = "detail-type")]
    pub detail_type: String,

    /// Service that emitted the event, e.g. `"aws.codebuild"`.
    pub source: String,

    /// Account the event originated in.
    ///
    /// Kept as the raw wire string; filters compare it against configured
    /// [`crate::AccountId`] values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// ARNs of the resources the event concerns.
    #[serde(default)]
    pub resources: Vec<String>,

    /// Service-specific payload.
    #[serde(default)]
    pub detail: Value,
}

impl EventEnvelope {
    /// Creates an envelope with the given source, detail type and detail and
    /// no origin metadata.
    pub fn new(source: impl Into<String>, detail_type: impl Into<String>, detail: Value) -> Self {
        Self {
            version: default_version(),
            id: None,
            detail_type: detail_type.into(),
            source: source.into(),
            account: None,
            time: None,
            region: None,
            resources: Vec::new(),
            detail,
        }
    }

    /// Sets the originating account.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Sets the bus-assigned event identifier.
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the originating region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Appends a resource ARN.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }

    /// Decodes an envelope from its JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, RelayError> {
        serde_json::from_str(raw).map_err(|e| RelayError::MalformedEvent {
            reason: e.to_string(),
        })
    }

    /// Returns `true` if the envelope has the given source and detail type.
    pub fn is(&self, source: &str, detail_type: &str) -> bool {
        self.source == source && self.detail_type == detail_type
    }

    /// Returns `detail[field]` if it is present and a JSON string.
    ///
    /// Fields that are missing, `null`, or of any other JSON type yield
    /// `None`, so a filter comparing against them never matches.
    pub fn detail_str(&self, field: &str) -> Option<&str> {
        self.detail.get(field).and_then(Value::as_str)
    }

    /// Returns `true` if only the emitting managed service may put this
    /// envelope on a bus.
    pub fn has_reserved_source(&self) -> bool {
        self.source.starts_with(sources::RESERVED_PREFIX)
    }

    pub fn is_forwarded(&self) -> bool {
        self.source == sources::FORWARDED
    }

    /// Wraps the envelope so it can be put on a bus under
    /// [`sources::FORWARDED`].
    ///
    /// The whole envelope becomes the wrapper's `detail`; `detail-type`,
    /// `account`, `region`, `resources` and `time` are copied so bus rules
    /// and logs still see them.
    pub fn wrap_forwarded(&self) -> Result<Self, RelayError> {
        let detail = serde_json::to_value(self).map_err(|e| RelayError::MalformedEvent {
            reason: format!("cannot wrap envelope: {e}"),
        })?;
        Ok(Self {
            version: self.version.clone(),
            id: None,
            detail_type: self.detail_type.clone(),
            source: sources::FORWARDED.to_string(),
            account: self.account.clone(),
            time: self.time,
            region: self.region.clone(),
            resources: self.resources.clone(),
            detail,
        })
    }

    /// Returns the envelope a forwarded wrapper carries. Any other envelope
    /// is returned unchanged.
    ///
    /// # Errors
    ///
    /// [`RelayError::MalformedEvent`] if the wrapper's detail is not an
    /// envelope, or if the carried envelope names a different origin account
    /// than the one that delivered the wrapper.
    pub fn unwrap_forwarded(self) -> Result<Self, RelayError> {
        if !self.is_forwarded() {
            return Ok(self);
        }
        let inner: Self =
            serde_json::from_value(self.detail).map_err(|e| RelayError::MalformedEvent {
                reason: format!("forwarded detail is not an envelope: {e}"),
            })?;
        if let Some(delivered_by) = &self.account {
            if inner.account.as_deref() != Some(delivered_by.as_str()) {
                return Err(RelayError::MalformedEvent {
                    reason: format!(
                        "forwarded envelope claims origin '{}' but was delivered by '{delivered_by}'",
                        inner.account.as_deref().unwrap_or("-")
                    ),
                });
            }
        }
        Ok(inner)
    }

    /// Returns the event id as a string for logging, or `"-"` if absent.
    pub fn id_for_log(&self) -> &str {
        self.id.as_ref().map_or("-", EventId::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_bus_wire_format() {
        let raw = r#"{
            "version": "0",
            "id": "6a7e8feb-b491-4cf7-a9f1-bf3703467718",
            "detail-type": "CodeBuild Build State Change",
            "source": "aws.codebuild",
            "account": "222222222222",
            "time": "2021-03-01T12:00:00Z",
            "region": "eu-west-1",
            "resources": ["arn:aws:codebuild:eu-west-1:222222222222:build/p:1"],
            "detail": { "build-status": "FAILED", "project-name": "p" }
        }"#;

        let envelope = EventEnvelope::from_json(raw).unwrap();

        assert_eq!(envelope.detail_type, detail_types::BUILD_STATE_CHANGE);
        assert_eq!(envelope.source, sources::BUILD_SYSTEM);
        assert_eq!(envelope.account.as_deref(), Some("222222222222"));
        assert_eq!(envelope.detail_str("build-status"), Some("FAILED"));
        assert_eq!(envelope.resources.len(), 1);
        assert!(envelope.time.is_some());
    }

    #[test]
    fn missing_optional_fields_default() {
        let envelope =
            EventEnvelope::from_json(r#"{"detail-type": "x", "source": "y"}"#).unwrap();

        assert_eq!(envelope.version, "0");
        assert!(envelope.id.is_none());
        assert!(envelope.resources.is_empty());
        assert!(envelope.detail.is_null());
        assert_eq!(envelope.id_for_log(), "-");
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = EventEnvelope::from_json("{not json").unwrap_err();
        assert!(matches!(err, RelayError::MalformedEvent { .. }));
    }

    #[test]
    fn detail_str_ignores_non_string_values() {
        let envelope = EventEnvelope::new("s", "t", json!({ "n": 5, "s": "v", "z": null }));

        assert_eq!(envelope.detail_str("s"), Some("v"));
        assert_eq!(envelope.detail_str("n"), None);
        assert_eq!(envelope.detail_str("z"), None);
        assert_eq!(envelope.detail_str("absent"), None);
    }

    fn codebuild_failure() -> EventEnvelope {
        EventEnvelope::new(
            sources::BUILD_SYSTEM,
            detail_types::BUILD_STATE_CHANGE,
            json!({ "build-status": "FAILED" }),
        )
        .with_account("222222222222")
        .with_id(EventId::new("6a7e8feb").unwrap())
        .with_resource("arn:aws:codebuild:eu-west-1:222222222222:build/p:1")
    }

    #[test]
    fn managed_service_sources_are_reserved() {
        assert!(codebuild_failure().has_reserved_source());
        assert!(!EventEnvelope::new("acme.relay", "t", json!({})).has_reserved_source());
    }

    #[test]
    fn wrapped_envelope_leaves_the_reserved_namespace() {
        let original = codebuild_failure();

        let wrapped = original.wrap_forwarded().unwrap();

        assert_eq!(wrapped.source, sources::FORWARDED);
        assert!(!wrapped.has_reserved_source());
        assert_eq!(wrapped.detail_type, original.detail_type);
        assert_eq!(wrapped.account, original.account);
        assert_eq!(wrapped.resources, original.resources);
        assert_eq!(wrapped.detail["source"], sources::BUILD_SYSTEM);
        assert_eq!(wrapped.unwrap_forwarded().unwrap(), original);
    }

    #[test]
    fn unwrap_survives_the_bus_restamping_the_wrapper() {
        let original = codebuild_failure();
        let mut delivered = original.wrap_forwarded().unwrap();
        delivered.id = Some(EventId::new("assigned-by-bus").unwrap());
        delivered.detail = serde_json::from_str(&delivered.detail.to_string()).unwrap();

        assert_eq!(delivered.unwrap_forwarded().unwrap(), original);
    }

    #[test]
    fn plain_envelope_is_not_unwrapped() {
        let original = codebuild_failure();

        assert_eq!(original.clone().unwrap_forwarded().unwrap(), original);
    }

    #[test]
    fn wrapper_from_another_account_is_refused() {
        let mut delivered = codebuild_failure().wrap_forwarded().unwrap();
        delivered.account = Some("111111111111".to_string());

        let err = delivered.unwrap_forwarded().unwrap_err();

        assert!(matches!(err, RelayError::MalformedEvent { .. }));
        assert!(err.to_string().contains("delivered by '111111111111'"), "{err}");
    }

    #[test]
    fn wrapper_without_envelope_detail_is_malformed() {
        let wrapper = EventEnvelope::new(sources::FORWARDED, "t", json!({ "k": "v" }));

        assert!(matches!(
            wrapper.unwrap_forwarded(),
            Err(RelayError::MalformedEvent { .. })
        ));
    }

    #[test]
    fn serialises_with_hyphenated_detail_type() {
        let envelope = EventEnvelope::new("aws.codebuild", "CodeBuild Build State Change", json!({}));
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["detail-type"], "CodeBuild Build State Change");
        assert!(value.get("detail_type").is_none());
        assert!(value.get("account").is_none());
    }
}
