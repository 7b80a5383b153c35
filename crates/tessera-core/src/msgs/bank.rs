//! Bank message shapes

use super::require_address;
use crate::coins::Coins;
use crate::errors::{Result, TesseraError};
use crate::msg::Msg;
use serde::{Deserialize, Serialize};
use std::any::Any as StdAny;

/// Type URL of [`MsgSend`]
pub const MSG_SEND_TYPE_URL: &str = "/tessera.bank.v1.MsgSend";

/// Transfer coins between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    /// Sender, and the required signer
    pub from_address: String,
    /// Recipient
    pub to_address: String,
    /// Coins to move
    pub amount: Coins,
}

impl MsgSend {
    /// Create a send message
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Coins) -> Self {
        Self {
            from_address: from.into(),
            to_address: to.into(),
            amount,
        }
    }
}

impl Msg for MsgSend {
    fn type_url(&self) -> &'static str {
        MSG_SEND_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.from_address
    }

    fn validate_basic(&self) -> Result<()> {
        require_address("from_address", &self.from_address)?;
        require_address("to_address", &self.to_address)?;
        if self.amount.is_empty() {
            return Err(TesseraError::invalid_request("send amount cannot be empty"));
        }
        self.amount.validate()
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}
