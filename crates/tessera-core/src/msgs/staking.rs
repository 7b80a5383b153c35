//! Staking message shapes

use super::require_address;
use crate::coins::{validate_denom, Coin};
use crate::errors::{Result, TesseraError};
use crate::msg::Msg;
use serde::{Deserialize, Serialize};
use std::any::Any as StdAny;

/// Type URL of [`MsgDelegate`]
pub const MSG_DELEGATE_TYPE_URL: &str = "/tessera.staking.v1.MsgDelegate";
/// Type URL of [`MsgUndelegate`]
pub const MSG_UNDELEGATE_TYPE_URL: &str = "/tessera.staking.v1.MsgUndelegate";
/// Type URL of [`MsgBeginRedelegate`]
pub const MSG_BEGIN_REDELEGATE_TYPE_URL: &str = "/tessera.staking.v1.MsgBeginRedelegate";

fn validate_stake_amount(amount: &Coin) -> Result<()> {
    validate_denom(&amount.denom)?;
    if amount.is_zero() {
        return Err(TesseraError::invalid_request(
            "stake amount must be positive",
        ));
    }
    Ok(())
}

/// Bond tokens to a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    /// Delegator, and the required signer
    pub delegator_address: String,
    /// Validator receiving the bond
    pub validator_address: String,
    /// Amount to bond
    pub amount: Coin,
}

impl Msg for MsgDelegate {
    fn type_url(&self) -> &'static str {
        MSG_DELEGATE_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.delegator_address
    }

    fn validate_basic(&self) -> Result<()> {
        require_address("delegator_address", &self.delegator_address)?;
        require_address("validator_address", &self.validator_address)?;
        validate_stake_amount(&self.amount)
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

/// Unbond tokens from a validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUndelegate {
    /// Delegator, and the required signer
    pub delegator_address: String,
    /// Validator holding the bond
    pub validator_address: String,
    /// Amount to unbond
    pub amount: Coin,
}

impl Msg for MsgUndelegate {
    fn type_url(&self) -> &'static str {
        MSG_UNDELEGATE_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.delegator_address
    }

    fn validate_basic(&self) -> Result<()> {
        require_address("delegator_address", &self.delegator_address)?;
        require_address("validator_address", &self.validator_address)?;
        validate_stake_amount(&self.amount)
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}

/// Move a bond from one validator to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    /// Delegator, and the required signer
    pub delegator_address: String,
    /// Validator currently holding the bond
    pub validator_src_address: String,
    /// Validator receiving the bond
    pub validator_dst_address: String,
    /// Amount to move
    pub amount: Coin,
}

impl Msg for MsgBeginRedelegate {
    fn type_url(&self) -> &'static str {
        MSG_BEGIN_REDELEGATE_TYPE_URL
    }

    fn signer(&self) -> &str {
        &self.delegator_address
    }

    fn validate_basic(&self) -> Result<()> {
        require_address("delegator_address", &self.delegator_address)?;
        require_address("validator_src_address", &self.validator_src_address)?;
        require_address("validator_dst_address", &self.validator_dst_address)?;
        validate_stake_amount(&self.amount)
    }

    fn as_any(&self) -> &dyn StdAny {
        self
    }
}
