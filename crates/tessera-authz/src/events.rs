//! Typed audit events

use tessera_core::Event;

/// Event type of [`EventGrant`]
pub const EVENT_GRANT: &str = "tessera.authz.v1.EventGrant";
/// Event type of [`EventRevoke`]
pub const EVENT_REVOKE: &str = "tessera.authz.v1.EventRevoke";
/// Event type of [`EventPruneExpiredGrants`]
pub const EVENT_PRUNE_EXPIRED_GRANTS: &str = "tessera.authz.v1.EventPruneExpiredGrants";

/// A grant was created or replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventGrant {
    /// Governed message type
    pub msg_type_url: String,
    /// Granter address string
    pub granter: String,
    /// Grantee address string
    pub grantee: String,
}

impl From<EventGrant> for Event {
    fn from(e: EventGrant) -> Self {
        Event::new(EVENT_GRANT)
            .with_attribute("msg_type_url", e.msg_type_url)
            .with_attribute("granter", e.granter)
            .with_attribute("grantee", e.grantee)
    }
}

/// A grant was revoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRevoke {
    /// Governed message type
    pub msg_type_url: String,
    /// Granter address string
    pub granter: String,
    /// Grantee address string
    pub grantee: String,
}

impl From<EventRevoke> for Event {
    fn from(e: EventRevoke) -> Self {
        Event::new(EVENT_REVOKE)
            .with_attribute("msg_type_url", e.msg_type_url)
            .with_attribute("granter", e.granter)
            .with_attribute("grantee", e.grantee)
    }
}

/// Expired grants were removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventPruneExpiredGrants {
    /// Account that requested the prune, if any
    pub pruner: Option<String>,
    /// Number of grants removed
    pub pruned: u64,
}

impl From<EventPruneExpiredGrants> for Event {
    fn from(e: EventPruneExpiredGrants) -> Self {
        let event = Event::new(EVENT_PRUNE_EXPIRED_GRANTS);
        let event = match e.pruner {
            Some(pruner) => event.with_attribute("pruner", pruner),
            None => event,
        };
        event.with_attribute("pruned", e.pruned.to_string())
    }
}
