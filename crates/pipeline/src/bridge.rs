//! Cross-account event bus bridge.
//!
//! Each account's bus accepts events from the other account through a
//! standing [`CrossAccountPermission`] granted once at setup. The permission
//! itself is enforced by the platform; the relay only needs to know which
//! origins it should admit and where the opposite account's bus lives.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{AccountId, EventBusName, EventEnvelope, Region};

/// The only action a bridge permission grants.
pub const PUT_EVENTS: &str = "events:PutEvents";

/// Address of an event bus: region, owning account and bus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusAddress {
    pub region: Region,
    pub account: AccountId,
    pub bus_name: EventBusName,
}

impl BusAddress {
    pub fn new(region: Region, account: AccountId, bus_name: EventBusName) -> Self {
        Self {
            region,
            account,
            bus_name,
        }
    }

    /// Renders the bus ARN, the form cross-account publishers address it by.
    pub fn arn(&self) -> String {
        format!(
            "arn:aws:events:{}:{}:event-bus/{}",
            self.region, self.account, self.bus_name
        )
    }
}

impl std::fmt::Display for BusAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.arn())
    }
}

/// A standing trust relation: `principal` may perform `action` on the bus
/// owned by `destination`.
///
/// Created once, never mutated, never renewed per event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CrossAccountPermission {
    pub principal: AccountId,
    pub destination: AccountId,
    pub action: String,
}

impl CrossAccountPermission {
    /// Grants `principal` permission to put events on `destination`'s bus.
    pub fn put_events(principal: AccountId, destination: AccountId) -> Self {
        Self {
            principal,
            destination,
            action: PUT_EVENTS.to_string(),
        }
    }
}

/// The local end of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    local_account: AccountId,
    permissions: Vec<CrossAccountPermission>,
}

impl Bridge {
    pub fn new(local_account: AccountId, permissions: Vec<CrossAccountPermission>) -> Self {
        Self {
            local_account,
            permissions,
        }
    }

    /// The account this end of the bridge belongs to.
    pub fn local_account(&self) -> &AccountId {
        &self.local_account
    }

    /// Returns `true` if events originating in `account` may enter the local bus.
    pub fn admits_origin(&self, account: &str) -> bool {
        account == self.local_account.as_str()
            || self.permissions.iter().any(|p| {
                p.action == PUT_EVENTS
                    && p.destination == self.local_account
                    && p.principal.as_str() == account
            })
    }

    /// Returns `true` if `envelope` may be processed by the local relay.
    ///
    /// Events without an origin account are rejected: nothing on a real bus
    /// arrives without one, so their provenance cannot be established.
    pub fn admits(&self, envelope: &EventEnvelope) -> bool {
        let admitted = envelope
            .account
            .as_deref()
            .is_some_and(|account| self.admits_origin(account));
        if !admitted {
            warn!(
                event_id = envelope.id_for_log(),
                origin = envelope.account.as_deref().unwrap_or("-"),
                local_account = %self.local_account,
                "Event origin is not trusted by the bridge; dropping"
            );
        }
        admitted
    }
}
