//! Messages, transactions and the message router seam

use crate::address::Address;
use crate::coins::Coins;
use crate::context::Context;
use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::any::Any as StdAny;
use std::fmt;

/// A state transition request carried by a transaction
pub trait Msg: fmt::Debug + Send + Sync + 'static {
    /// Fully qualified message type, e.g. `/tessera.bank.v1.MsgSend`
    fn type_url(&self) -> &'static str;

    /// Address string of the account that must authorize this message
    fn signer(&self) -> &str;

    /// Stateless validation
    fn validate_basic(&self) -> Result<()> {
        Ok(())
    }

    /// Messages this one dispatches on another account's behalf
    fn nested_msgs(&self) -> &[Box<dyn Msg>] {
        &[]
    }

    /// Downcast support for capabilities inspecting concrete messages
    fn as_any(&self) -> &dyn StdAny;
}

/// Downcast a message to its concrete type
pub fn downcast_msg<T: Msg>(msg: &dyn Msg) -> Option<&T> {
    msg.as_any().downcast_ref::<T>()
}

/// Opaque response returned by a message handler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgResponse {
    /// Encoded handler response
    pub data: Vec<u8>,
}

impl MsgResponse {
    /// Wrap handler response bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

/// Routes a message to the module that executes it
pub trait MsgRouter: Send + Sync {
    /// Execute `msg` against `ctx`
    fn dispatch(&self, ctx: &mut Context<'_>, msg: &dyn Msg) -> Result<MsgResponse>;
}

/// A transaction as seen by the pre-execution chain
pub trait Tx {
    /// Messages in execution order
    fn msgs(&self) -> &[Box<dyn Msg>];

    /// Fee fields, if the transaction carries them
    fn fee_tx(&self) -> Option<&dyn FeeTx> {
        None
    }
}

/// Fee-carrying fields of a transaction
pub trait FeeTx {
    /// Gas limit
    fn gas(&self) -> u64;

    /// Stated fee
    fn fee(&self) -> &Coins;

    /// Account paying the fee: the explicit payer, else the first signer
    fn fee_payer(&self) -> Option<&Address>;

    /// Account whose fee allowance pays on the payer's behalf
    fn fee_granter(&self) -> Option<&Address>;
}

/// Fee section of a standard transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Offered fee
    pub amount: Coins,
    /// Gas limit
    pub gas_limit: u64,
    /// Explicit payer; defaults to the first signer
    pub payer: Option<Address>,
    /// Fee granter
    pub granter: Option<Address>,
}

/// Standard transaction: messages, fee and signer list
#[derive(Debug, Default)]
pub struct StdTx {
    /// Messages in execution order
    pub msgs: Vec<Box<dyn Msg>>,
    /// Fee section
    pub fee: Fee,
    /// Signers in signature order
    pub signers: Vec<Address>,
}

impl StdTx {
    /// Create a transaction
    pub fn new(msgs: Vec<Box<dyn Msg>>, fee: Fee, signers: Vec<Address>) -> Self {
        Self { msgs, fee, signers }
    }
}

impl Tx for StdTx {
    fn msgs(&self) -> &[Box<dyn Msg>] {
        &self.msgs
    }

    fn fee_tx(&self) -> Option<&dyn FeeTx> {
        Some(self)
    }
}

impl FeeTx for StdTx {
    fn gas(&self) -> u64 {
        self.fee.gas_limit
    }

    fn fee(&self) -> &Coins {
        &self.fee.amount
    }

    fn fee_payer(&self) -> Option<&Address> {
        self.fee.payer.as_ref().or_else(|| self.signers.first())
    }

    fn fee_granter(&self) -> Option<&Address> {
        self.fee.granter.as_ref()
    }
}
