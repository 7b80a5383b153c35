//! Message shapes owned by other modules
//!
//! Only the shapes live here. Balances and delegations are executed by the
//! modules behind the [`MsgRouter`](crate::msg::MsgRouter); capabilities
//! such as spend limits need the shapes to inspect amounts and recipients.

pub mod bank;
pub mod staking;

pub use bank::MsgSend;
pub use staking::{MsgBeginRedelegate, MsgDelegate, MsgUndelegate};

use crate::errors::{Result, TesseraError};

fn require_address(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TesseraError::invalid_address(format!(
            "{field}: empty address string is not allowed"
        )));
    }
    Ok(())
}
