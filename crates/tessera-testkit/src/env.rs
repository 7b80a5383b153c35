//! Ready-made environment wiring every collaborator together

use crate::accounts::{test_codec, TestAccountKeeper};
use crate::bank::StoreBank;
use crate::feegrant::TestFeeGrantKeeper;
use crate::router::TestRouter;
use crate::runner::TxRunner;
use std::sync::Arc;
use tessera_ante::{
    AnteChain, CircuitBreakerDecorator, DeductFeeDecorator, FeeGrantKeeper, StoreCircuitBreaker,
    ValidateBasicDecorator,
};
use tessera_authz::{AuthorizationRegistry, GrantStore, Keeper};
use tessera_core::{
    Address, AddressCodec, BlockHeader, Coins, Context, DecCoins, ExecMode, MemoryStore,
    Timestamp,
};

/// Block time of a fresh [`TestEnv`]
pub const GENESIS_TIME: Timestamp = Timestamp::from_secs(1_700_000_000);

/// Collaborators shared by every context of a [`TestEnv`]
#[derive(Clone)]
pub struct TestApp {
    /// Address codec
    pub codec: Arc<dyn AddressCodec>,
    /// Module accounts
    pub accounts: Arc<TestAccountKeeper>,
    /// Balances
    pub bank: StoreBank,
    /// Fee allowances
    pub fee_grants: TestFeeGrantKeeper,
    /// Grant manager
    pub keeper: Keeper,
    /// Message router with the grant manager attached
    pub router: TestRouter,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Wire the default collaborators
    pub fn new() -> Self {
        Self::with_accounts(TestAccountKeeper::new())
    }

    /// Wire the default collaborators around a custom account keeper
    pub fn with_accounts(accounts: TestAccountKeeper) -> Self {
        let codec = test_codec();
        let keeper = Keeper::new(AuthorizationRegistry::with_defaults(), Arc::clone(&codec));
        let router = TestRouter::new(Arc::clone(&codec)).with_authz(keeper.clone());
        Self {
            codec,
            accounts: Arc::new(accounts),
            bank: StoreBank,
            fee_grants: TestFeeGrantKeeper,
            keeper,
            router,
        }
    }

    /// String form of `address`
    pub fn addr(&self, address: &Address) -> String {
        self.codec
            .bytes_to_string(address)
            .unwrap_or_else(|e| panic!("test address must encode: {e}"))
    }

    /// Grant store of the keeper
    pub fn grants(&self) -> &GrantStore {
        self.keeper.grant_store()
    }

    /// Fee decorator over the test collaborators
    pub fn deduct_fee_decorator(&self, fee_grants_enabled: bool) -> DeductFeeDecorator {
        let fee_grants: Option<Arc<dyn FeeGrantKeeper>> =
            fee_grants_enabled.then(|| Arc::new(self.fee_grants) as Arc<dyn FeeGrantKeeper>);
        DeductFeeDecorator::new(self.accounts.clone(), Arc::new(self.bank), fee_grants)
    }

    /// The standard chain: validation, circuit breaker, fees
    pub fn ante_chain(&self, fee_grants_enabled: bool) -> AnteChain {
        AnteChain::new()
            .with(ValidateBasicDecorator)
            .with(CircuitBreakerDecorator::new(Arc::new(StoreCircuitBreaker)))
            .with(self.deduct_fee_decorator(fee_grants_enabled))
    }

    /// Runner over the standard chain and the router
    pub fn runner(&self, fee_grants_enabled: bool) -> TxRunner {
        TxRunner::new(
            self.ante_chain(fee_grants_enabled),
            Arc::new(self.router.clone()),
        )
    }
}

/// An in-memory chain: store, current block and collaborators
pub struct TestEnv {
    /// Backing store
    pub store: MemoryStore,
    /// Current block
    pub header: BlockHeader,
    /// Execution mode for new contexts
    pub exec_mode: ExecMode,
    /// Node minimum gas prices for new contexts
    pub min_gas_prices: DecCoins,
    /// Collaborators
    pub app: TestApp,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Fresh environment at height 1
    pub fn new() -> Self {
        Self::with_app(TestApp::new())
    }

    /// Fresh environment over custom collaborators
    pub fn with_app(app: TestApp) -> Self {
        Self {
            store: MemoryStore::new(),
            header: BlockHeader::new("tessera-test", 1, GENESIS_TIME),
            exec_mode: ExecMode::Finalize,
            min_gas_prices: DecCoins::default(),
            app,
        }
    }

    /// Move to another height
    pub fn at_height(mut self, height: u64) -> Self {
        self.header.height = height;
        self
    }

    /// Advance block time and height
    pub fn advance(&mut self, secs: u64) {
        self.header.height += 1;
        self.header.time = self.header.time.saturating_add_secs(secs);
    }

    /// Block time
    pub fn now(&self) -> Timestamp {
        self.header.time
    }

    /// Run `f` with a context over the store
    pub fn with_ctx<T>(&mut self, f: impl FnOnce(&mut Context<'_>, &TestApp) -> T) -> T {
        let mut ctx = Context::new(&mut self.store, self.header.clone())
            .with_exec_mode(self.exec_mode)
            .with_min_gas_prices(self.min_gas_prices.clone());
        f(&mut ctx, &self.app)
    }

    /// Credit `amount` to `address`
    pub fn fund(&mut self, address: &Address, amount: &Coins) {
        self.app
            .bank
            .mint(&mut self.store, address, amount)
            .unwrap_or_else(|e| panic!("funding failed: {e}"));
    }

    /// Balance of `address` in `denom`
    pub fn balance(&self, address: &Address, denom: &str) -> u128 {
        self.app
            .bank
            .balance_of(&self.store, address, denom)
            .unwrap_or_else(|e| panic!("balance read failed: {e}"))
    }

    /// Number of stored grants
    pub fn grant_count(&self) -> usize {
        self.app.grants().iter_all(&self.store).count()
    }
}
