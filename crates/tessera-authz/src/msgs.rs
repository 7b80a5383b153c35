//! Grant manager request messages
//!
//! Requests carry addresses as strings; the keeper decodes them through the
//! configured [`AddressCodec`](tessera_core::AddressCodec).

use crate::authorization::{pack, Authorization};
use serde::{Deserialize, Serialize};
use std::any::Any as StdAny;
use tessera_core::{Any, Msg, MsgResponse, Result, TesseraError, Timestamp};

/// Type URL of [`MsgGrant`]
pub const MSG_GRANT_TYPE_URL: &str = "/tessera.authz.v1.MsgGrant";
/// Type URL of [`MsgRevoke`]
pub const MSG_REVOKE_TYPE_URL: &str = "/tessera.authz.v1.MsgRevoke";
/// Type URL of [`MsgRevokeAll`]
pub const MSG_REVOKE_ALL_TYPE_URL: &str = "/tessera.authz.v1.MsgRevokeAll";
/// Type URL of [`MsgExec`]
pub const MSG_EXEC_TYPE_URL: &str = "/tessera.authz.v1.MsgExec";
/// Type URL of [`MsgPruneExpiredGrants`]
pub const MSG_PRUNE_EXPIRED_GRANTS_TYPE_URL: &str = "/tessera.authz.v1.MsgPruneExpiredGrants";

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TesseraError::invalid_address(format!(
            "invalid {field} address: empty address string is not allowed"
        )));
    }
    Ok(())
}

/// Grant a capability to a grantee
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgGrant {
    /// Account delegating authority, and the signer
    pub granter: String,
    /// Account receiving authority
    pub grantee: String,
    /// Packed capability; `None` is rejected
    pub authorization: Option<Any>,
    /// Optional expiration
    pub expiration: Option<Timestamp>,
}

impl MsgGrant {
    /// Pack `authorization` into a grant request
    pub fn new(
        granter: impl Into<String>,
        grantee: impl Into<String>,
        authorization: &dyn Authorization,
        expiration: Option<Timestamp>,
    ) -> Result<Self> {
        Ok(Self {
            granter: granter.into(),
            grantee: grantee.into(),
            authorization: Some(pack(authorization)?),
            expiration,
        })
    }
}

impl Msg for MsgGrant {
    fn type_url(&self) -> &'static str {
        MSG_GRANT_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.granter
    }

    fn validate_basic(&self) -> Result<()> {
        require("granter", &self.granter)?;
        require("grantee", &self.grantee)?;
        if self.granter == self.grantee {
            return Err(TesseraError::invalid_grantee(
                "grantee and granter should be different",
            ));
        }
        if self.authorization.is_none() {
            return Err(TesseraError::validation_failed(
                "authorization is nil: invalid type",
            ));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

/// Revoke one capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgRevoke {
    /// Account that issued the grant, and the signer
    pub granter: String,
    /// Account holding the grant
    pub grantee: String,
    /// Message type of the grant
    pub msg_type_url: String,
}

impl MsgRevoke {
    /// Create a revoke request
    pub fn new(
        granter: impl Into<String>,
        grantee: impl Into<String>,
        msg_type_url: impl Into<String>,
    ) -> Self {
        Self {
            granter: granter.into(),
            grantee: grantee.into(),
            msg_type_url: msg_type_url.into(),
        }
    }
}

impl Msg for MsgRevoke {
    fn type_url(&self) -> &'static str {
        MSG_REVOKE_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.granter
    }

    fn validate_basic(&self) -> Result<()> {
        require("granter", &self.granter)?;
        require("grantee", &self.grantee)?;
        if self.granter == self.grantee {
            return Err(TesseraError::invalid_grantee(
                "grantee and granter should be different",
            ));
        }
        if self.msg_type_url.trim().is_empty() {
            return Err(TesseraError::invalid_request("missing msg method name"));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

/// Revoke every capability a granter has issued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgRevokeAll {
    /// Account whose grants are revoked, and the signer
    pub granter: String,
}

impl MsgRevokeAll {
    /// Create a revoke-all request
    pub fn new(granter: impl Into<String>) -> Self {
        Self {
            granter: granter.into(),
        }
    }
}

impl Msg for MsgRevokeAll {
    fn type_url(&self) -> &'static str {
        MSG_REVOKE_ALL_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.granter
    }

    fn validate_basic(&self) -> Result<()> {
        require("granter", &self.granter)
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

/// Execute messages on behalf of their signers
#[derive(Debug)]
pub struct MsgExec {
    /// Account exercising the grants, and the signer
    pub grantee: String,
    /// Messages to run, each signed (nominally) by its granter
    pub msgs: Vec<Box<dyn Msg>>,
}

impl MsgExec {
    /// Create an exec request
    pub fn new(grantee: impl Into<String>, msgs: Vec<Box<dyn Msg>>) -> Self {
        Self {
            grantee: grantee.into(),
            msgs,
        }
    }
}

impl Msg for MsgExec {
    fn type_url(&self) -> &'static str {
        MSG_EXEC_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.grantee
    }

    fn validate_basic(&self) -> Result<()> {
        if self.grantee.trim().is_empty() {
            return Err(TesseraError::empty_grantee("grantee cannot be empty"));
        }
        if self.msgs.is_empty() {
            return Err(TesseraError::empty_messages("messages cannot be empty"));
        }
        for msg in &self.msgs {
            msg.validate_basic()?;
        }
        Ok(())
    }

    fn nested_msgs(&self) -> &[Box<dyn Msg>] {
        &self.msgs
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

/// Handler results of the messages run by a [`MsgExec`], in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgExecResponse {
    /// One response per executed message
    pub results: Vec<MsgResponse>,
}

/// Remove expired grants; anyone may submit this
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgPruneExpiredGrants {
    /// Submitting account, and the signer
    pub pruner: String,
}

impl MsgPruneExpiredGrants {
    /// Create a prune request
    pub fn new(pruner: impl Into<String>) -> Self {
        Self {
            pruner: pruner.into(),
        }
    }
}

impl Msg for MsgPruneExpiredGrants {
    fn type_url(&self) -> &'static str {
        MSG_PRUNE_EXPIRED_GRANTS_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.pruner
    }

    fn validate_basic(&self) -> Result<()> {
        require("pruner", &self.pruner)
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::GenericAuthorization;
    use tessera_core::msgs::MsgSend;
    use tessera_core::Coins;

    #[test]
    fn grant_requires_distinct_parties_and_capability() {
        let auth = GenericAuthorization::new("/m");
        let ok = MsgGrant::new("a", "b", &auth, None).unwrap();
        assert!(ok.validate_basic().is_ok());

        let same = MsgGrant::new("a", "a", &auth, None).unwrap();
        assert!(matches!(
            same.validate_basic(),
            Err(TesseraError::InvalidGrantee { .. })
        ));

        let nil = MsgGrant {
            authorization: None,
            ..ok
        };
        assert!(matches!(
            nil.validate_basic(),
            Err(TesseraError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn exec_reports_empty_fields() {
        let empty = MsgExec::new("", vec![Box::new(MsgSend::new("a", "b", Coins::empty()))]);
        assert!(matches!(
            empty.validate_basic(),
            Err(TesseraError::EmptyGrantee { .. })
        ));
        assert!(matches!(
            MsgExec::new("g", Vec::new()).validate_basic(),
            Err(TesseraError::EmptyMessages { .. })
        ));
    }

    #[test]
    fn revoke_requires_method_name() {
        let err = MsgRevoke::new("a", "b", "").validate_basic().unwrap_err();
        assert_eq!(err.message(), "missing msg method name");
    }
}
