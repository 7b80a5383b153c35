//! Fee policy and payer resolution through the full ante chain

use std::sync::Arc;
use tessera_ante::fee::{ATTRIBUTE_KEY_FEE, ATTRIBUTE_KEY_FEE_PAYER, EVENT_TYPE_TX};
use tessera_ante::{AnteChain, AnteDecorator, StoreCircuitBreaker};
use tessera_core::config::DEFAULT_FEE_COLLECTOR;
use tessera_core::msgs::bank::MSG_SEND_TYPE_URL;
use tessera_core::msgs::MsgSend;
use tessera_core::{
    Address, Coin, Coins, Context, DecCoins, ExecMode, Fee, Msg, Result, StdTx, TesseraError, Tx,
};
use tessera_testkit::{
    create_incremental_accounts, init_test_tracing, Allowance, TestAccountKeeper, TestApp,
    TestEnv,
};

fn stake(amount: u128) -> Coins {
    Coins::new(vec![Coin::new("stake", amount)]).unwrap()
}

fn collector() -> Address {
    Address::module(DEFAULT_FEE_COLLECTOR)
}

struct Fixture {
    env: TestEnv,
    payer: Address,
    granter: Address,
    recipient: Address,
}

impl Fixture {
    fn new() -> Self {
        Self::with_env(TestEnv::new().at_height(5))
    }

    fn with_env(mut env: TestEnv) -> Self {
        init_test_tracing();
        let addrs = create_incremental_accounts(3);
        env.fund(&addrs[0], &stake(1_000));
        env.fund(&addrs[1], &stake(1_000));
        Self {
            env,
            payer: addrs[0].clone(),
            granter: addrs[1].clone(),
            recipient: addrs[2].clone(),
        }
    }

    fn send(&self, amount: u128) -> Box<dyn Msg> {
        Box::new(MsgSend::new(
            self.env.app.addr(&self.payer),
            self.env.app.addr(&self.recipient),
            stake(amount),
        ))
    }

    fn tx(&self, fee: u128, gas: u64, granter: Option<&Address>) -> StdTx {
        StdTx::new(
            vec![self.send(1)],
            Fee {
                amount: stake(fee),
                gas_limit: gas,
                payer: None,
                granter: granter.cloned(),
            },
            vec![self.payer.clone()],
        )
    }

    /// Run the standard chain; returns the outcome and the priority
    fn ante(&mut self, tx: &dyn Tx, simulate: bool, fee_grants: bool) -> (Result<()>, i64) {
        self.env.with_ctx(|ctx, app| {
            let result = app.ante_chain(fee_grants).handle(ctx, tx, simulate);
            (result, ctx.priority())
        })
    }

    fn grant_allowance(&mut self, allowance: Allowance) {
        let (granter, payer) = (self.granter.clone(), self.payer.clone());
        self.env.with_ctx(|ctx, app| {
            app.fee_grants
                .grant_allowance(ctx.store_mut(), &granter, &payer, &allowance)
                .unwrap();
        });
    }
}

#[test]
fn zero_gas_is_rejected_after_genesis() {
    let mut f = Fixture::new();
    let tx = f.tx(0, 0, None);
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::InvalidGasLimit { .. }));
    assert_eq!(err.message(), "must provide positive gas");
}

#[test]
fn zero_gas_is_allowed_at_genesis_and_in_simulation() {
    let mut genesis = Fixture::with_env(TestEnv::new().at_height(0));
    let tx = genesis.tx(0, 0, None);
    genesis.ante(&tx, false, true).0.unwrap();

    let mut f = Fixture::new();
    let tx = f.tx(0, 0, None);
    let (result, priority) = f.ante(&tx, true, true);
    result.unwrap();
    assert_eq!(priority, 0);
}

#[test]
fn fee_moves_to_collector_and_sets_priority() {
    let mut f = Fixture::new();
    let tx = f.tx(100, 10, None);
    let (outcome, events) = f.env.with_ctx(|ctx, app| {
        let result = app.ante_chain(true).handle(ctx, &tx, false);
        (result.map(|()| ctx.priority()), ctx.events().events().to_vec())
    });
    assert_eq!(outcome.unwrap(), 10);
    assert_eq!(f.env.balance(&f.payer, "stake"), 900);
    assert_eq!(f.env.balance(&collector(), "stake"), 100);

    let event = events.iter().find(|e| e.kind == EVENT_TYPE_TX).unwrap();
    assert_eq!(event.attribute(ATTRIBUTE_KEY_FEE), Some("100stake"));
    let payer = f.env.app.addr(&f.payer);
    assert_eq!(event.attribute(ATTRIBUTE_KEY_FEE_PAYER), Some(payer.as_str()));
}

#[test]
fn simulation_charges_the_stated_fee_at_zero_priority() {
    let mut f = Fixture::new();
    f.env.min_gas_prices = "100stake".parse::<DecCoins>().unwrap();
    f.env.exec_mode = ExecMode::Check;
    let tx = f.tx(30, 10, None);
    let (result, priority) = f.ante(&tx, true, true);
    result.unwrap();
    assert_eq!(priority, 0);
    assert_eq!(f.env.balance(&f.payer, "stake"), 970);
}

#[test]
fn payer_without_funds_is_rejected() {
    let mut f = Fixture::new();
    let tx = f.tx(5_000, 10, None);
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::InsufficientFunds { .. }));
    assert!(err.message().starts_with("failed to deduct fees"));
    assert_eq!(f.env.balance(&f.payer, "stake"), 1_000);
}

#[test]
fn min_gas_prices_apply_only_to_mempool_checks() {
    let mut f = Fixture::new();
    f.env.min_gas_prices = "1stake".parse::<DecCoins>().unwrap();
    let tx = f.tx(5, 10, None);

    f.env.exec_mode = ExecMode::Check;
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::InsufficientFee { .. }));
    assert!(err.message().contains("insufficient fees"));

    f.env.exec_mode = ExecMode::Finalize;
    f.ante(&tx, false, true).0.unwrap();
    assert_eq!(f.env.balance(&f.payer, "stake"), 995);
}

#[test]
fn granter_equal_to_payer_pays_directly() {
    let mut f = Fixture::new();
    let payer = f.payer.clone();
    let tx = f.tx(100, 10, Some(&payer));
    // fee grants disabled: no collaborator may be consulted
    f.ante(&tx, false, false).0.unwrap();
    assert_eq!(f.env.balance(&f.payer, "stake"), 900);
}

#[test]
fn foreign_granter_requires_fee_grants() {
    let mut f = Fixture::new();
    let granter = f.granter.clone();
    let tx = f.tx(100, 10, Some(&granter));
    let err = f.ante(&tx, false, false).0.unwrap_err();
    assert!(matches!(err, TesseraError::GrantsDisabled { .. }));
}

#[test]
fn allowance_pays_on_behalf_of_the_payer() {
    let mut f = Fixture::new();
    f.grant_allowance(Allowance::limited(stake(150)));
    let granter = f.granter.clone();

    let tx = f.tx(100, 10, Some(&granter));
    let (outcome, events) = f.env.with_ctx(|ctx, app| {
        let result = app.ante_chain(true).handle(ctx, &tx, false);
        (result, ctx.events().events().to_vec())
    });
    outcome.unwrap();
    assert_eq!(f.env.balance(&f.granter, "stake"), 900);
    assert_eq!(f.env.balance(&f.payer, "stake"), 1_000);
    let event = events.iter().find(|e| e.kind == EVENT_TYPE_TX).unwrap();
    let granter_str = f.env.app.addr(&f.granter);
    assert_eq!(
        event.attribute(ATTRIBUTE_KEY_FEE_PAYER),
        Some(granter_str.as_str())
    );

    // 50 left on the allowance
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::FeeGrantDenied { .. }));
    assert!(err.message().contains("does not allow to pay fees for"));
    assert_eq!(f.env.balance(&f.granter, "stake"), 900);
}

#[test]
fn missing_allowance_is_a_fee_grant_denial() {
    let mut f = Fixture::new();
    let granter = f.granter.clone();
    let tx = f.tx(100, 10, Some(&granter));
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::FeeGrantDenied { .. }));
}

#[test]
fn allowance_restricted_to_other_messages_is_refused() {
    let mut f = Fixture::new();
    f.grant_allowance(Allowance {
        spend_limit: None,
        allowed_messages: vec!["/tessera.staking.v1.MsgDelegate".into()],
    });
    let granter = f.granter.clone();
    let tx = f.tx(100, 10, Some(&granter));
    assert!(matches!(
        f.ante(&tx, false, true).0,
        Err(TesseraError::FeeGrantDenied { .. })
    ));
}

#[test]
fn missing_fee_collector_is_an_internal_error() {
    let app = TestApp::with_accounts(TestAccountKeeper::new().without_module(DEFAULT_FEE_COLLECTOR));
    let mut f = Fixture::with_env(TestEnv::with_app(app).at_height(5));
    let tx = f.tx(100, 10, None);
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::Internal { .. }));
    assert_eq!(
        err.message(),
        "fee collector module account (fee_collector) has not been set"
    );
}

#[test]
fn transactions_without_fee_fields_are_malformed() {
    struct BareTx(Vec<Box<dyn Msg>>);
    impl Tx for BareTx {
        fn msgs(&self) -> &[Box<dyn Msg>] {
            &self.0
        }
    }

    let mut f = Fixture::new();
    let tx = BareTx(vec![f.send(1)]);
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::MalformedTx { .. }));
}

fn flat_fee(_: &Context<'_>, _: &dyn Tx) -> Result<(Coins, i64)> {
    Ok((stake(7), 42))
}

#[test]
fn custom_fee_checker_replaces_the_default_policy() {
    let mut f = Fixture::new();
    let tx = f.tx(100, 10, None);
    let (result, priority) = f.env.with_ctx(|ctx, app| {
        let decorator = app
            .deduct_fee_decorator(true)
            .with_fee_checker(Arc::new(flat_fee));
        let result = AnteChain::new().with(decorator).handle(ctx, &tx, false);
        (result, ctx.priority())
    });
    result.unwrap();
    assert_eq!(priority, 42);
    assert_eq!(f.env.balance(&collector(), "stake"), 7);
}

#[test]
fn circuit_breaker_blocks_disabled_messages_before_fees() {
    let mut f = Fixture::new();
    f.env
        .with_ctx(|ctx, _| StoreCircuitBreaker.disable_msg(ctx, MSG_SEND_TYPE_URL));
    let tx = f.tx(100, 10, None);
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::Denied { .. }));
    assert_eq!(f.env.balance(&f.payer, "stake"), 1_000);

    f.env
        .with_ctx(|ctx, _| StoreCircuitBreaker.enable_msg(ctx, MSG_SEND_TYPE_URL));
    f.ante(&tx, false, true).0.unwrap();
}

#[test]
fn circuit_breaker_sees_messages_nested_in_exec() {
    use tessera_authz::MsgExec;

    let mut f = Fixture::new();
    f.env
        .with_ctx(|ctx, _| StoreCircuitBreaker.disable_msg(ctx, MSG_SEND_TYPE_URL));
    let mut tx = f.tx(100, 10, None);
    let inner = f.send(50);
    tx.msgs = vec![Box::new(MsgExec::new(f.env.app.addr(&f.payer), vec![inner]))];

    let runner = f.env.app.runner(true);
    let err = f
        .env
        .with_ctx(|ctx, _| runner.deliver(ctx, &tx, false))
        .unwrap_err();
    assert!(matches!(err, TesseraError::Denied { .. }));
    assert_eq!(f.env.balance(&f.payer, "stake"), 1_000);
    assert_eq!(f.env.balance(&f.recipient, "stake"), 0);
}

#[test]
fn malformed_fee_coins_are_rejected_before_any_transfer() {
    let mut f = Fixture::new();
    for amount in [
        vec![Coin::new("stake", 5), Coin::new("stake", 5)],
        vec![Coin::new("atom", 0), Coin::new("stake", 5)],
    ] {
        let mut tx = f.tx(5, 10, None);
        tx.fee.amount = Coins::from_unchecked(amount);
        let err = f.ante(&tx, false, true).0.unwrap_err();
        assert!(matches!(err, TesseraError::InvalidFee { .. }));
        assert_eq!(f.env.balance(&f.payer, "stake"), 1_000);
        assert_eq!(f.env.balance(&collector(), "stake"), 0);
    }
}

#[test]
fn empty_transactions_fail_validation_except_on_recheck() {
    let mut f = Fixture::new();
    let mut tx = f.tx(100, 10, None);
    tx.msgs.clear();
    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::InvalidRequest { .. }));

    f.env.exec_mode = ExecMode::ReCheck;
    f.ante(&tx, false, true).0.unwrap();
}

#[test]
fn failed_messages_still_pay_the_fee() {
    let mut f = Fixture::new();
    let mut tx = f.tx(100, 10, None);
    tx.msgs = vec![f.send(5_000)];

    let runner = f.env.app.runner(true);
    let (result, priority) = f.env.with_ctx(|ctx, _| {
        let result = runner.deliver(ctx, &tx, false);
        (result, ctx.priority())
    });
    assert!(matches!(result, Err(TesseraError::InsufficientFunds { .. })));
    assert_eq!(priority, 10);
    assert_eq!(f.env.balance(&f.payer, "stake"), 900);
    assert_eq!(f.env.balance(&f.recipient, "stake"), 0);
}

#[test]
fn decorator_names_are_stable() {
    let app = TestApp::new();
    assert_eq!(app.deduct_fee_decorator(true).name(), "deduct_fee");
    assert_eq!(app.ante_chain(true).len(), 3);
}

#[test]
fn grantee_pays_the_fee_for_an_exec_transaction() {
    use tessera_authz::{MsgExec, SendAuthorization};

    let mut f = Fixture::new();
    // payer acts as grantee of the granter's funds
    let (granter, grantee) = (f.granter.clone(), f.payer.clone());
    f.env
        .with_ctx(|ctx, app| {
            app.keeper.grant(
                ctx,
                &granter,
                &grantee,
                Box::new(SendAuthorization::new(stake(10), Vec::new())),
                None,
            )
        })
        .unwrap();

    let send: Box<dyn Msg> = Box::new(MsgSend::new(
        f.env.app.addr(&granter),
        f.env.app.addr(&f.recipient),
        stake(10),
    ));
    let mut tx = f.tx(100, 10, None);
    tx.msgs = vec![Box::new(MsgExec::new(f.env.app.addr(&grantee), vec![send]))];

    let runner = f.env.app.runner(true);
    f.env
        .with_ctx(|ctx, _| runner.deliver(ctx, &tx, false))
        .unwrap();
    assert_eq!(f.env.balance(&grantee, "stake"), 900);
    assert_eq!(f.env.balance(&granter, "stake"), 990);
    assert_eq!(f.env.balance(&f.recipient, "stake"), 10);
    assert_eq!(f.env.grant_count(), 0);
}

#[test]
fn failed_deduction_leaves_the_allowance_untouched() {
    let mut f = Fixture::new();
    f.grant_allowance(Allowance::limited(stake(5_000)));
    let granter = f.granter.clone();
    let tx = f.tx(2_000, 10, Some(&granter));

    let err = f.ante(&tx, false, true).0.unwrap_err();
    assert!(matches!(err, TesseraError::InsufficientFunds { .. }));
    let allowance = f
        .env
        .app
        .fee_grants
        .allowance(&f.env.store, &f.granter, &f.payer)
        .unwrap()
        .unwrap();
    assert_eq!(allowance.spend_limit, Some(stake(5_000)));
}
