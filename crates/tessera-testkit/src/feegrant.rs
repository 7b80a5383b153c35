//! Store-backed fee allowances

use serde::{Deserialize, Serialize};
use tessera_ante::FeeGrantKeeper;
use tessera_core::codec;
use tessera_core::{Address, Coins, Context, KvStore, Msg, Result, TesseraError};
use tracing::debug;

/// Prefix of allowance records: `0x11 | len(granter) | granter | len(grantee) | grantee`
pub const ALLOWANCE_PREFIX: u8 = 0x11;

fn allowance_key(granter: &Address, grantee: &Address) -> Result<Vec<u8>> {
    let mut key = vec![ALLOWANCE_PREFIX];
    granter.write_length_prefixed(&mut key)?;
    grantee.write_length_prefixed(&mut key)?;
    Ok(key)
}

/// A basic fee allowance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allowance {
    /// Remaining fees the granter will cover; `None` is unlimited
    pub spend_limit: Option<Coins>,
    /// Message types the allowance may pay for; empty allows all
    pub allowed_messages: Vec<String>,
}

impl Allowance {
    /// Unlimited allowance for any message
    pub fn unlimited() -> Self {
        Self {
            spend_limit: None,
            allowed_messages: Vec::new(),
        }
    }

    /// Allowance capped at `limit`
    pub fn limited(limit: Coins) -> Self {
        Self {
            spend_limit: Some(limit),
            allowed_messages: Vec::new(),
        }
    }
}

/// Fee allowances kept in the ambient store
#[derive(Debug, Clone, Copy, Default)]
pub struct TestFeeGrantKeeper;

impl TestFeeGrantKeeper {
    /// Store an allowance from `granter` to `grantee`
    pub fn grant_allowance(
        &self,
        store: &mut dyn KvStore,
        granter: &Address,
        grantee: &Address,
        allowance: &Allowance,
    ) -> Result<()> {
        store.set(allowance_key(granter, grantee)?, codec::encode(allowance)?);
        Ok(())
    }

    /// Load an allowance
    pub fn allowance(
        &self,
        store: &dyn KvStore,
        granter: &Address,
        grantee: &Address,
    ) -> Result<Option<Allowance>> {
        store
            .get(&allowance_key(granter, grantee)?)
            .map(|bytes| codec::decode(&bytes))
            .transpose()
    }
}

impl FeeGrantKeeper for TestFeeGrantKeeper {
    fn use_granted_fees(
        &self,
        ctx: &mut Context<'_>,
        granter: &Address,
        grantee: &Address,
        fee: &Coins,
        msgs: &[Box<dyn Msg>],
    ) -> Result<()> {
        let key = allowance_key(granter, grantee)?;
        let mut allowance = self
            .allowance(ctx.store(), granter, grantee)?
            .ok_or_else(|| TesseraError::not_found("fee-grant not found"))?;

        if !allowance.allowed_messages.is_empty() {
            if let Some(msg) = msgs
                .iter()
                .find(|m| !allowance.allowed_messages.iter().any(|t| t == m.type_url()))
            {
                return Err(TesseraError::denied(format!(
                    "message does not exist in allowed messages: {}",
                    msg.type_url()
                )));
            }
        }

        if let Some(limit) = &allowance.spend_limit {
            let left = limit
                .checked_sub(fee)
                .ok_or_else(|| TesseraError::denied("fee limit exceeded"))?;
            if left.is_empty() {
                ctx.store_mut().delete(&key);
                debug!(granter = %granter, grantee = %grantee, "Fee allowance exhausted");
                return Ok(());
            }
            allowance.spend_limit = Some(left);
        }
        ctx.store_mut().set(key, codec::encode(&allowance)?);
        Ok(())
    }
}
