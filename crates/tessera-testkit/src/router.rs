//! Message router over the test bank, a toy staking module and the grant
//! manager

use crate::accounts::BONDED_POOL;
use crate::bank::StoreBank;
use std::fmt;
use std::sync::Arc;
use tessera_authz::Keeper;
use tessera_core::msgs::bank::MSG_SEND_TYPE_URL;
use tessera_core::msgs::staking::{
    MSG_BEGIN_REDELEGATE_TYPE_URL, MSG_DELEGATE_TYPE_URL, MSG_UNDELEGATE_TYPE_URL,
};
use tessera_core::msgs::{MsgBeginRedelegate, MsgDelegate, MsgSend, MsgUndelegate};
use tessera_core::{
    downcast_msg, Address, AddressCodec, Coins, Context, Event, KvStore, Msg, MsgResponse,
    MsgRouter, Result, TesseraError,
};

/// Prefix of delegation records: `0x12 | len(delegator) | delegator | validator`
pub const DELEGATION_PREFIX: u8 = 0x12;

fn delegation_key(delegator: &Address, validator: &str) -> Result<Vec<u8>> {
    let mut key = vec![DELEGATION_PREFIX];
    delegator.write_length_prefixed(&mut key)?;
    key.extend_from_slice(validator.as_bytes());
    Ok(key)
}

fn expect<T: Msg>(msg: &dyn Msg) -> Result<&T> {
    downcast_msg::<T>(msg)
        .ok_or_else(|| TesseraError::internal(format!("unexpected shape for {}", msg.type_url())))
}

/// Routes bank, staking and grant manager messages
#[derive(Clone)]
pub struct TestRouter {
    codec: Arc<dyn AddressCodec>,
    bank: StoreBank,
    authz: Option<Keeper>,
    bonded_pool: Address,
}

impl fmt::Debug for TestRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRouter")
            .field("authz", &self.authz.is_some())
            .finish_non_exhaustive()
    }
}

impl TestRouter {
    /// Router without the grant manager
    pub fn new(codec: Arc<dyn AddressCodec>) -> Self {
        Self {
            codec,
            bank: StoreBank,
            authz: None,
            bonded_pool: Address::module(BONDED_POOL),
        }
    }

    /// Route grant manager messages to `keeper`
    pub fn with_authz(mut self, keeper: Keeper) -> Self {
        self.authz = Some(keeper);
        self
    }

    /// Bonded amount from `delegator` to `validator`
    pub fn delegation(&self, store: &dyn KvStore, delegator: &Address, validator: &str) -> Result<u128> {
        match store.get(&delegation_key(delegator, validator)?) {
            Some(bytes) => {
                let raw: [u8; 16] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| TesseraError::storage("delegation record must be 16 bytes"))?;
                Ok(u128::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn set_delegation(
        &self,
        store: &mut dyn KvStore,
        delegator: &Address,
        validator: &str,
        amount: u128,
    ) -> Result<()> {
        let key = delegation_key(delegator, validator)?;
        if amount == 0 {
            store.delete(&key);
        } else {
            store.set(key, amount.to_be_bytes().to_vec());
        }
        Ok(())
    }

    fn unbond(
        &self,
        store: &mut dyn KvStore,
        delegator: &Address,
        validator: &str,
        amount: u128,
    ) -> Result<()> {
        let bonded = self.delegation(store, delegator, validator)?;
        let left = bonded.checked_sub(amount).ok_or_else(|| {
            TesseraError::insufficient_funds(format!(
                "delegation {bonded} to {validator} is smaller than {amount}"
            ))
        })?;
        self.set_delegation(store, delegator, validator, left)
    }

    fn send(&self, ctx: &mut Context<'_>, msg: &MsgSend) -> Result<MsgResponse> {
        let from = self.codec.string_to_bytes(&msg.from_address)?;
        let to = self.codec.string_to_bytes(&msg.to_address)?;
        self.bank.send(ctx.store_mut(), &from, &to, &msg.amount)?;
        ctx.emit(
            Event::new("transfer")
                .with_attribute("sender", msg.from_address.clone())
                .with_attribute("recipient", msg.to_address.clone())
                .with_attribute("amount", msg.amount.to_string()),
        );
        Ok(MsgResponse::default())
    }

    fn delegate(&self, ctx: &mut Context<'_>, msg: &MsgDelegate) -> Result<MsgResponse> {
        let delegator = self.codec.string_to_bytes(&msg.delegator_address)?;
        let amount = Coins::from(msg.amount.clone());
        self.bank
            .send(ctx.store_mut(), &delegator, &self.bonded_pool, &amount)?;
        let bonded = self.delegation(ctx.store(), &delegator, &msg.validator_address)?;
        let total = bonded
            .checked_add(msg.amount.amount)
            .ok_or_else(|| TesseraError::internal("delegation overflow"))?;
        self.set_delegation(ctx.store_mut(), &delegator, &msg.validator_address, total)?;
        Ok(MsgResponse::default())
    }

    fn undelegate(&self, ctx: &mut Context<'_>, msg: &MsgUndelegate) -> Result<MsgResponse> {
        let delegator = self.codec.string_to_bytes(&msg.delegator_address)?;
        self.unbond(
            ctx.store_mut(),
            &delegator,
            &msg.validator_address,
            msg.amount.amount,
        )?;
        let amount = Coins::from(msg.amount.clone());
        self.bank
            .send(ctx.store_mut(), &self.bonded_pool, &delegator, &amount)?;
        Ok(MsgResponse::default())
    }

    fn redelegate(&self, ctx: &mut Context<'_>, msg: &MsgBeginRedelegate) -> Result<MsgResponse> {
        let delegator = self.codec.string_to_bytes(&msg.delegator_address)?;
        self.unbond(
            ctx.store_mut(),
            &delegator,
            &msg.validator_src_address,
            msg.amount.amount,
        )?;
        let bonded = self.delegation(ctx.store(), &delegator, &msg.validator_dst_address)?;
        let total = bonded
            .checked_add(msg.amount.amount)
            .ok_or_else(|| TesseraError::internal("delegation overflow"))?;
        self.set_delegation(ctx.store_mut(), &delegator, &msg.validator_dst_address, total)?;
        Ok(MsgResponse::default())
    }
}

impl MsgRouter for TestRouter {
    fn dispatch(&self, ctx: &mut Context<'_>, msg: &dyn Msg) -> Result<MsgResponse> {
        if Keeper::handles(msg.type_url()) {
            let keeper = self.authz.as_ref().ok_or_else(|| {
                TesseraError::invalid_request(format!("no handler for {}", msg.type_url()))
            })?;
            return keeper.handle(ctx, self, msg);
        }
        match msg.type_url() {
            MSG_SEND_TYPE_URL => self.send(ctx, expect(msg)?),
            MSG_DELEGATE_TYPE_URL => self.delegate(ctx, expect(msg)?),
            MSG_UNDELEGATE_TYPE_URL => self.undelegate(ctx, expect(msg)?),
            MSG_BEGIN_REDELEGATE_TYPE_URL => self.redelegate(ctx, expect(msg)?),
            other => Err(TesseraError::invalid_request(format!(
                "unrecognized message type {other}"
            ))),
        }
    }
}
