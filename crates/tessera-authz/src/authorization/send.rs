//! Spend-limited transfer capability

use super::{AcceptResponse, Authorization, AuthorizationType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tessera_core::codec;
use tessera_core::msgs::bank::{MsgSend, MSG_SEND_TYPE_URL};
use tessera_core::{downcast_msg, Coins, Msg, Result, TesseraError};

/// Type tag of [`SendAuthorization`]
pub const SEND_AUTHORIZATION_TYPE_URL: &str = "/tessera.bank.v1.SendAuthorization";

/// Allows transfers out of the granter's account up to a cumulative limit,
/// optionally only to listed recipients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAuthorization {
    /// Remaining amount the grantee may move
    pub spend_limit: Coins,
    /// Allowed recipients; empty means any recipient
    pub allow_list: Vec<String>,
}

impl SendAuthorization {
    /// Create a send capability
    pub fn new(spend_limit: Coins, allow_list: Vec<String>) -> Self {
        Self {
            spend_limit,
            allow_list,
        }
    }
}

impl Authorization for SendAuthorization {
    fn type_url(&self) -> &'static str {
        SEND_AUTHORIZATION_TYPE_URL
    }

    fn msg_type_url(&self) -> &str {
        MSG_SEND_TYPE_URL
    }

    fn validate_basic(&self) -> Result<()> {
        if self.spend_limit.is_empty() || !self.spend_limit.is_valid() {
            return Err(TesseraError::validation_failed(
                "spend limit must be positive",
            ));
        }
        let mut seen = BTreeSet::new();
        for address in &self.allow_list {
            if address.trim().is_empty() {
                return Err(TesseraError::validation_failed(
                    "allow list contains an empty address",
                ));
            }
            if !seen.insert(address.as_str()) {
                return Err(TesseraError::validation_failed(format!(
                    "all allow list addresses must be unique, duplicate {address}"
                )));
            }
        }
        Ok(())
    }

    fn accept(&self, msg: &dyn Msg) -> Result<AcceptResponse> {
        let send = downcast_msg::<MsgSend>(msg).ok_or_else(|| {
            TesseraError::invalid_request(format!(
                "type mismatch: send authorization cannot accept {}",
                msg.type_url()
            ))
        })?;

        let Some(limit_left) = self.spend_limit.checked_sub(&send.amount) else {
            return Ok(AcceptResponse::deny(
                "requested amount is more than spend limit",
            ));
        };

        if !self.allow_list.is_empty() && !self.allow_list.contains(&send.to_address) {
            return Ok(AcceptResponse::deny(format!(
                "cannot send to {} address",
                send.to_address
            )));
        }

        if limit_left.is_zero() {
            return Ok(AcceptResponse::allow_and_consume());
        }
        Ok(AcceptResponse::allow_with_update(Box::new(Self {
            spend_limit: limit_left,
            allow_list: self.allow_list.clone(),
        })))
    }

    fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    fn clone_box(&self) -> Box<dyn Authorization> {
        Box::new(self.clone())
    }
}

impl AuthorizationType for SendAuthorization {
    const TYPE_URL: &'static str = SEND_AUTHORIZATION_TYPE_URL;
}
