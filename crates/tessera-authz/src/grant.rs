//! Grants: a capability plus its optional expiration

use crate::authorization::{pack, Authorization, AuthorizationRegistry};
use serde::{Deserialize, Serialize};
use tessera_core::codec::{self, Any};
use tessera_core::{Msg, Result, Timestamp};

/// Message types that manage grants. They can be neither granted nor
/// executed on someone else's behalf.
pub const GRANT_MANAGEMENT_MSG_TYPE_URLS: [&str; 3] = [
    crate::msgs::MSG_GRANT_TYPE_URL,
    crate::msgs::MSG_REVOKE_TYPE_URL,
    crate::msgs::MSG_REVOKE_ALL_TYPE_URL,
];

/// Whether `msg_type_url` names a grant-management message
pub fn is_grant_management(msg_type_url: &str) -> bool {
    GRANT_MANAGEMENT_MSG_TYPE_URLS.contains(&msg_type_url)
}

/// A stored capability
#[derive(Debug, Clone)]
pub struct Grant {
    /// The capability
    pub authorization: Box<dyn Authorization>,
    /// Instant after which the grant is void; `None` never expires
    pub expiration: Option<Timestamp>,
}

impl Grant {
    /// Create a grant
    pub fn new(authorization: Box<dyn Authorization>, expiration: Option<Timestamp>) -> Self {
        Self {
            authorization,
            expiration,
        }
    }

    /// Whether the grant is void at `now`; expiry is inclusive of the
    /// expiration instant
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiration.is_some_and(|exp| exp <= now)
    }

    /// Present `msg` to the capability
    pub fn accept(&self, msg: &dyn Msg) -> Result<crate::AcceptResponse> {
        self.authorization.accept(msg)
    }

    /// Envelope form of the capability
    pub fn authorization_any(&self) -> Result<Any> {
        pack(self.authorization.as_ref())
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(&GrantRecord {
            authorization: self.authorization_any()?,
            expiration: self.expiration,
        })
    }

    pub(crate) fn decode(bytes: &[u8], registry: &AuthorizationRegistry) -> Result<Self> {
        let record: GrantRecord = codec::decode(bytes)?;
        Ok(Self::new(
            registry.unpack(&record.authorization)?,
            record.expiration,
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct GrantRecord {
    authorization: Any,
    expiration: Option<Timestamp>,
}
