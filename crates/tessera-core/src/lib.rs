//! # Tessera Core - Foundation
//!
//! **Purpose**: Shared vocabulary for the deterministic state machine.
//!
//! Every validating node must derive byte-identical results from identical
//! inputs, so this crate provides only inputs that are explicit: the block
//! header carried in [`Context`], an ordered [`KvStore`], and a
//! deterministic serializer. There is no clock, randomness or I/O here.
//!
//! ## Core Concepts
//!
//! - **Unified errors**: [`TesseraError`] with an [`ErrorClass`] taxonomy
//! - **Addresses**: raw bytes plus a pluggable [`AddressCodec`]
//! - **Coins**: unsigned [`Coins`] and decimal [`DecCoins`] gas prices
//! - **Store**: [`MemoryStore`] and the discardable [`CacheStore`] overlay
//! - **Context**: block header, execution mode, events, [`Context::branch`]
//! - **Messages**: [`Msg`], [`Tx`], [`FeeTx`] and the [`MsgRouter`] seam
//! - **Configuration**: TOML node configuration with env overrides

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod codec;
pub mod coins;
pub mod config;
pub mod context;
pub mod errors;
pub mod msg;
pub mod msgs;
pub mod store;
pub mod time;

pub use address::{Address, AddressCodec, HexAddressCodec};
pub use codec::Any;
pub use coins::{Coin, Coins, Dec, DecCoin, DecCoins};
pub use config::{ConfigFile, ConfigValidation, TesseraConfig};
pub use context::{BlockHeader, Context, Event, EventManager, ExecMode};
pub use errors::{ErrorClass, Result, TesseraError};
pub use msg::{downcast_msg, Fee, FeeTx, Msg, MsgResponse, MsgRouter, StdTx, Tx};
pub use store::{CacheStore, KvStore, MemoryStore};
pub use time::Timestamp;
