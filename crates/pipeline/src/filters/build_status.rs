//! Failed build filter.

use crate::envelope::{detail_types, sources};
use crate::{AccountId, BuildStatus, BuildStatusEvent, EventEnvelope};

const FAILED: &str = "FAILED";

/// Matches build state changes whose status is `FAILED`.
///
/// Both sides only act on builds that ran in the consumer account: the
/// consumer forwards them, the producer alerts on them. A failed build
/// stamped with any other account, or with none, never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureFilter {
    origin: AccountId,
}

impl FailureFilter {
    /// Matches failed builds that ran in `account` only.
    pub fn from_account(account: AccountId) -> Self {
        Self { origin: account }
    }

    /// Returns `true` if `envelope` is a failed build event this filter
    /// accepts. The envelope is forwarded as-is, so nothing is extracted.
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        if !envelope.is(sources::BUILD_SYSTEM, detail_types::BUILD_STATE_CHANGE) {
            return false;
        }
        if envelope.detail_str("build-status") != Some(FAILED) {
            return false;
        }
        envelope.account.as_deref() == Some(self.origin.as_str())
    }

    /// Returns `true` if the typed `event` would be accepted.
    pub fn accepts(&self, event: &BuildStatusEvent) -> bool {
        event.status == BuildStatus::Failed && event.origin_account == self.origin
    }
}
