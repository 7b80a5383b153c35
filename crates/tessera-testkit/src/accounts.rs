//! Test addresses and module accounts

use std::collections::BTreeMap;
use std::sync::Arc;
use tessera_ante::AccountKeeper;
use tessera_core::config::DEFAULT_FEE_COLLECTOR;
use tessera_core::{Address, AddressCodec, HexAddressCodec};

/// Module account holding bonded stake
pub const BONDED_POOL: &str = "bonded_tokens_pool";

/// A 20-byte address filled with `seed`
pub fn test_address(seed: u8) -> Address {
    Address::new(vec![seed; 20])
}

/// `n` distinct addresses ending in 1, 2, 3, ...
pub fn create_incremental_accounts(n: usize) -> Vec<Address> {
    (1..=n as u64)
        .map(|i| {
            let mut bytes = vec![0u8; 12];
            bytes.extend_from_slice(&i.to_be_bytes());
            Address::new(bytes)
        })
        .collect()
}

/// The codec used throughout the test kit
pub fn test_codec() -> Arc<dyn AddressCodec> {
    Arc::new(HexAddressCodec::default())
}

/// Account keeper knowing a fixed set of module accounts
#[derive(Debug, Clone)]
pub struct TestAccountKeeper {
    codec: HexAddressCodec,
    modules: BTreeMap<String, Address>,
}

impl Default for TestAccountKeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAccountKeeper {
    /// Keeper with the fee collector and bonded pool set up
    pub fn new() -> Self {
        Self {
            codec: HexAddressCodec::default(),
            modules: BTreeMap::new(),
        }
        .with_module(DEFAULT_FEE_COLLECTOR)
        .with_module(BONDED_POOL)
    }

    /// Register a module account
    pub fn with_module(mut self, name: &str) -> Self {
        self.modules.insert(name.to_string(), Address::module(name));
        self
    }

    /// Forget a module account
    pub fn without_module(mut self, name: &str) -> Self {
        self.modules.remove(name);
        self
    }
}

impl AccountKeeper for TestAccountKeeper {
    fn module_address(&self, name: &str) -> Option<Address> {
        self.modules.get(name).cloned()
    }

    fn address_codec(&self) -> &dyn AddressCodec {
        &self.codec
    }
}
