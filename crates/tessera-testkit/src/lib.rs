//! Tessera Testing Infrastructure
//!
//! In-memory collaborators (bank, fee allowances, module accounts, message
//! router) and a [`TestEnv`] wiring them to the grant manager and the ante
//! chain, so tests can run whole transactions against a [`MemoryStore`].
//!
//! [`MemoryStore`]: tessera_core::MemoryStore

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod accounts;
pub mod bank;
pub mod env;
pub mod feegrant;
pub mod router;
pub mod runner;

pub use accounts::{create_incremental_accounts, test_address, test_codec, TestAccountKeeper};
pub use bank::StoreBank;
pub use env::{TestApp, TestEnv, GENESIS_TIME};
pub use feegrant::{Allowance, TestFeeGrantKeeper};
pub use router::TestRouter;
pub use runner::TxRunner;

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once; honours `RUST_LOG`
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
