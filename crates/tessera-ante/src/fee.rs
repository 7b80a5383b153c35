//! Fee mediation
//!
//! [`DeductFeeDecorator`] resolves the effective fee and priority, decides
//! which account pays (the payer, or a fee granter through its allowance),
//! moves the fee to the fee collector and records a `tx` event.

use crate::decorator::{AnteDecorator, Next};
use crate::expected_keepers::{AccountKeeper, BankKeeper, FeeGrantKeeper};
use std::fmt;
use std::sync::Arc;
use tessera_core::config::{AnteConfig, DEFAULT_FEE_COLLECTOR};
use tessera_core::{
    Address, Coin, Coins, Context, Event, ExecMode, FeeTx, Result, TesseraError, Tx,
};
use tracing::{debug, warn};

/// Event type emitted after fee deduction
pub const EVENT_TYPE_TX: &str = "tx";
/// Attribute holding the deducted fee
pub const ATTRIBUTE_KEY_FEE: &str = "fee";
/// Attribute holding the account that paid
pub const ATTRIBUTE_KEY_FEE_PAYER: &str = "fee_payer";

/// Fee policy: returns the fee to deduct and the transaction priority
pub type TxFeeChecker = Arc<dyn Fn(&Context<'_>, &dyn Tx) -> Result<(Coins, i64)> + Send + Sync>;

fn fee_tx(tx: &dyn Tx) -> Result<&dyn FeeTx> {
    tx.fee_tx()
        .ok_or_else(|| TesseraError::malformed_tx("Tx must implement the FeeTx interface"))
}

/// Default fee policy.
///
/// During mempool checks the fee must reach `ceil(gas × price)` in at least
/// one denomination of the node's minimum gas prices. Block execution skips
/// the floor: minimum gas prices are node-local and would make validators
/// disagree.
pub fn check_tx_fee_with_min_gas_prices(ctx: &Context<'_>, tx: &dyn Tx) -> Result<(Coins, i64)> {
    let fee_tx = fee_tx(tx)?;
    let fee = fee_tx.fee();
    let gas = fee_tx.gas();

    if ctx.is_check_tx() && !ctx.min_gas_prices().is_empty() {
        let required = ctx
            .min_gas_prices()
            .as_slice()
            .iter()
            .map(|price| {
                price
                    .amount
                    .mul_int_ceil(gas)
                    .map(|amount| Coin::new(price.denom.clone(), amount))
                    .ok_or_else(|| TesseraError::invalid_fee("required fee overflows"))
            })
            .collect::<Result<Vec<_>>>()?;
        let required = Coins::new(required)?;
        if !required.is_empty() && !fee.is_any_gte(&required) {
            return Err(TesseraError::insufficient_fee(format!(
                "insufficient fees; got: {fee} required: {required}"
            )));
        }
    }

    Ok((fee.clone(), get_tx_priority(fee, gas)))
}

/// Priority of a transaction: the smallest per-denomination gas price it
/// pays, saturating at `i64::MAX`. Zero when no gas is declared.
pub fn get_tx_priority(fee: &Coins, gas: u64) -> i64 {
    if gas == 0 {
        return 0;
    }
    fee.as_slice()
        .iter()
        .map(|coin| i64::try_from(coin.amount / u128::from(gas)).unwrap_or(i64::MAX))
        .min()
        .unwrap_or(0)
}

/// Move `fees` from `payer` to `collector`
pub fn deduct_fees(
    bank: &dyn BankKeeper,
    ctx: &mut Context<'_>,
    payer: &Address,
    collector: &Address,
    fees: &Coins,
) -> Result<()> {
    if !fees.is_valid() {
        return Err(TesseraError::invalid_fee(format!(
            "invalid fee amount: {fees}"
        )));
    }
    bank.send_coins(ctx, payer, collector, fees)
        .map_err(|err| err.wrap("failed to deduct fees"))
}

/// Deducts the transaction fee from the payer or fee granter
pub struct DeductFeeDecorator {
    account_keeper: Arc<dyn AccountKeeper>,
    bank_keeper: Arc<dyn BankKeeper>,
    fee_grant_keeper: Option<Arc<dyn FeeGrantKeeper>>,
    tx_fee_checker: TxFeeChecker,
    fee_collector: String,
}

impl fmt::Debug for DeductFeeDecorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeductFeeDecorator")
            .field("fee_grants_enabled", &self.fee_grant_keeper.is_some())
            .field("fee_collector", &self.fee_collector)
            .finish_non_exhaustive()
    }
}

impl DeductFeeDecorator {
    /// Create the decorator with the default fee policy; fee grants are
    /// disabled when `fee_grant_keeper` is `None`
    pub fn new(
        account_keeper: Arc<dyn AccountKeeper>,
        bank_keeper: Arc<dyn BankKeeper>,
        fee_grant_keeper: Option<Arc<dyn FeeGrantKeeper>>,
    ) -> Self {
        Self {
            account_keeper,
            bank_keeper,
            fee_grant_keeper,
            tx_fee_checker: Arc::new(check_tx_fee_with_min_gas_prices),
            fee_collector: DEFAULT_FEE_COLLECTOR.to_string(),
        }
    }

    /// Replace the fee policy
    pub fn with_fee_checker(mut self, checker: TxFeeChecker) -> Self {
        self.tx_fee_checker = checker;
        self
    }

    /// Apply node configuration
    pub fn with_config(mut self, config: &AnteConfig) -> Self {
        self.fee_collector = config.fee_collector.clone();
        self
    }

    fn check_deduct_fee(&self, ctx: &mut Context<'_>, tx: &dyn Tx, fee: &Coins) -> Result<()> {
        let fee_tx = fee_tx(tx)?;
        let collector = self
            .account_keeper
            .module_address(&self.fee_collector)
            .ok_or_else(|| {
                TesseraError::internal(format!(
                    "fee collector module account ({}) has not been set",
                    self.fee_collector
                ))
            })?;
        let payer = fee_tx
            .fee_payer()
            .ok_or_else(|| TesseraError::malformed_tx("transaction has no fee payer"))?;

        let mut deduct_from = payer;
        if let Some(granter) = fee_tx.fee_granter().filter(|granter| *granter != payer) {
            let fee_grants = self
                .fee_grant_keeper
                .as_ref()
                .ok_or_else(|| TesseraError::grants_disabled("fee grants are not enabled"))?;
            fee_grants
                .use_granted_fees(ctx, granter, payer, fee, tx.msgs())
                .map_err(|err| {
                    warn!(granter = %granter, payer = %payer, error = %err, "Fee allowance refused");
                    TesseraError::fee_grant_denied(format!(
                        "{granter} does not allow to pay fees for {payer}: {}",
                        err.message()
                    ))
                })?;
            deduct_from = granter;
        }

        if !fee.is_zero() {
            deduct_fees(self.bank_keeper.as_ref(), ctx, deduct_from, &collector, fee)?;
        }

        let fee_payer = self.account_keeper.address_codec().bytes_to_string(deduct_from)?;
        ctx.emit(
            Event::new(EVENT_TYPE_TX)
                .with_attribute(ATTRIBUTE_KEY_FEE, fee.to_string())
                .with_attribute(ATTRIBUTE_KEY_FEE_PAYER, fee_payer),
        );
        Ok(())
    }
}

impl AnteDecorator for DeductFeeDecorator {
    fn name(&self) -> &'static str {
        "deduct_fee"
    }

    fn ante_handle(
        &self,
        ctx: &mut Context<'_>,
        tx: &dyn Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<()> {
        let fee_tx = fee_tx(tx)?;
        let simulate = simulate || ctx.exec_mode() == ExecMode::Simulate;

        if !simulate && ctx.block_height() > 0 && fee_tx.gas() == 0 {
            return Err(TesseraError::invalid_gas_limit("must provide positive gas"));
        }

        let (fee, priority) = if simulate {
            (fee_tx.fee().clone(), 0)
        } else {
            (self.tx_fee_checker)(ctx, tx)?
        };
        ctx.branch(|ctx| self.check_deduct_fee(ctx, tx, &fee))?;

        debug!(fee = %fee, priority, "Fee deducted");
        ctx.set_priority(priority);
        next.run(ctx, tx, simulate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tessera_core::{BlockHeader, DecCoins, Fee, MemoryStore, StdTx, Timestamp};

    fn coins(amount: u128) -> Coins {
        Coins::new(vec![Coin::new("stake", amount)]).unwrap()
    }

    fn tx(fee: Coins, gas: u64) -> StdTx {
        StdTx::new(
            Vec::new(),
            Fee {
                amount: fee,
                gas_limit: gas,
                ..Fee::default()
            },
            vec![Address::new(vec![1; 20])],
        )
    }

    fn check_ctx<'s>(store: &'s mut MemoryStore, mode: ExecMode, prices: &str) -> Context<'s> {
        Context::new(store, BlockHeader::new("c", 3, Timestamp::from_secs(9)))
            .with_exec_mode(mode)
            .with_min_gas_prices(prices.parse::<DecCoins>().unwrap())
    }

    #[test]
    fn floor_applies_only_during_check() {
        let mut store = MemoryStore::new();
        let low = tx(coins(99), 4_000);

        let ctx = check_ctx(&mut store, ExecMode::Check, "0.025stake");
        let err = check_tx_fee_with_min_gas_prices(&ctx, &low).unwrap_err();
        assert!(matches!(err, TesseraError::InsufficientFee { .. }));
        drop(ctx);

        let ctx = check_ctx(&mut store, ExecMode::Check, "0.025stake");
        assert!(check_tx_fee_with_min_gas_prices(&ctx, &tx(coins(100), 4_000)).is_ok());
        drop(ctx);

        let ctx = check_ctx(&mut store, ExecMode::Finalize, "0.025stake");
        assert!(check_tx_fee_with_min_gas_prices(&ctx, &low).is_ok());
    }

    #[test]
    fn floor_rounds_up() {
        let mut store = MemoryStore::new();
        let ctx = check_ctx(&mut store, ExecMode::ReCheck, "0.5stake");
        // 3 gas at 0.5 requires ceil(1.5) = 2
        assert!(check_tx_fee_with_min_gas_prices(&ctx, &tx(coins(1), 3)).is_err());
        assert!(check_tx_fee_with_min_gas_prices(&ctx, &tx(coins(2), 3)).is_ok());
    }

    #[test]
    fn any_configured_denomination_satisfies_the_floor() {
        let mut store = MemoryStore::new();
        let ctx = check_ctx(&mut store, ExecMode::Check, "1atom,1stake");
        assert!(check_tx_fee_with_min_gas_prices(&ctx, &tx(coins(10), 10)).is_ok());
    }

    #[test]
    fn priority_is_the_cheapest_gas_price() {
        let fee = Coins::new(vec![Coin::new("atom", 500), Coin::new("stake", 2_000)]).unwrap();
        assert_eq!(get_tx_priority(&fee, 100), 5);
        assert_eq!(get_tx_priority(&fee, 0), 0);
        assert_eq!(get_tx_priority(&Coins::empty(), 10), 0);
        assert_eq!(get_tx_priority(&coins(u128::MAX), 1), i64::MAX);
    }

    proptest! {
        #[test]
        fn priority_never_exceeds_any_coin_price(a in 0u128..u128::MAX / 2, b in 0u128..u128::MAX / 2, gas in 1u64..) {
            let fee = Coins::new(vec![Coin::new("atom", a), Coin::new("stake", b)]).unwrap();
            let p = get_tx_priority(&fee, gas);
            prop_assert!(p >= 0);
            for coin in fee.as_slice() {
                prop_assert!(p as u128 <= coin.amount / u128::from(gas));
            }
        }
    }
}
