//! # Tessera Ante - Pre-execution Chain
//!
//! **Purpose**: Composable checks that run before any message executes.
//!
//! Decorators are chained in continuation-passing style: each one either
//! rejects the transaction or runs the rest of the chain exactly once. The
//! crate ships three links:
//!
//! - [`ValidateBasicDecorator`]: stateless message validation
//! - [`CircuitBreakerDecorator`]: rejects disabled message types
//! - [`DeductFeeDecorator`]: fee policy, payer resolution through fee
//!   grants, fee deduction and transaction priority
//!
//! Collaborators (bank, fee grants, module accounts) are traits in
//! [`expected_keepers`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit;
pub mod decorator;
pub mod expected_keepers;
pub mod fee;
pub mod validate;

pub use circuit::{CircuitBreaker, CircuitBreakerDecorator, StoreCircuitBreaker};
pub use decorator::{AnteChain, AnteDecorator, Next};
pub use expected_keepers::{AccountKeeper, BankKeeper, FeeGrantKeeper};
pub use fee::{
    check_tx_fee_with_min_gas_prices, deduct_fees, get_tx_priority, DeductFeeDecorator,
    TxFeeChecker,
};
pub use validate::ValidateBasicDecorator;
