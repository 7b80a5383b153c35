//! Store-backed balances

use tessera_ante::BankKeeper;
use tessera_core::{Address, Coin, Coins, Context, KvStore, Result, TesseraError};
use tracing::trace;

/// Prefix of balance records: `0x10 | len(addr) | addr | denom`
pub const BALANCE_PREFIX: u8 = 0x10;

fn account_prefix(address: &Address) -> Result<Vec<u8>> {
    let mut key = vec![BALANCE_PREFIX];
    address.write_length_prefixed(&mut key)?;
    Ok(key)
}

fn balance_key(address: &Address, denom: &str) -> Result<Vec<u8>> {
    let mut key = account_prefix(address)?;
    key.extend_from_slice(denom.as_bytes());
    Ok(key)
}

fn decode_amount(bytes: &[u8]) -> Result<u128> {
    let raw: [u8; 16] = bytes
        .try_into()
        .map_err(|_| TesseraError::storage("balance record must be 16 bytes"))?;
    Ok(u128::from_be_bytes(raw))
}

/// Balances kept in the ambient store
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreBank;

impl StoreBank {
    /// Every balance of `address`
    pub fn balance(&self, store: &dyn KvStore, address: &Address) -> Result<Coins> {
        let prefix = account_prefix(address)?;
        let coins = store
            .prefix_iter(&prefix)
            .map(|(key, value)| -> Result<Coin> {
                let denom = String::from_utf8(key[prefix.len()..].to_vec())
                    .map_err(|e| TesseraError::storage(format!("balance denom: {e}")))?;
                Ok(Coin::new(denom, decode_amount(&value)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Coins::new(coins)
    }

    /// Balance of `address` in `denom`
    pub fn balance_of(&self, store: &dyn KvStore, address: &Address, denom: &str) -> Result<u128> {
        store
            .get(&balance_key(address, denom)?)
            .map_or(Ok(0), |bytes| decode_amount(&bytes))
    }

    fn set_amount(
        &self,
        store: &mut dyn KvStore,
        address: &Address,
        denom: &str,
        amount: u128,
    ) -> Result<()> {
        let key = balance_key(address, denom)?;
        if amount == 0 {
            store.delete(&key);
        } else {
            store.set(key, amount.to_be_bytes().to_vec());
        }
        Ok(())
    }

    /// Add `amount` to `address`
    pub fn mint(&self, store: &mut dyn KvStore, address: &Address, amount: &Coins) -> Result<()> {
        for coin in amount.as_slice() {
            let current = self.balance_of(store, address, &coin.denom)?;
            let next = current
                .checked_add(coin.amount)
                .ok_or_else(|| TesseraError::internal("balance overflow"))?;
            self.set_amount(store, address, &coin.denom, next)?;
        }
        Ok(())
    }

    /// Move `amount` from `from` to `to`
    pub fn send(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<()> {
        for coin in amount.as_slice() {
            let have = self.balance_of(store, from, &coin.denom)?;
            if have < coin.amount {
                return Err(TesseraError::insufficient_funds(format!(
                    "spendable balance {have}{} is smaller than {coin}",
                    coin.denom
                )));
            }
        }
        for coin in amount.as_slice() {
            let have = self.balance_of(store, from, &coin.denom)?;
            self.set_amount(store, from, &coin.denom, have - coin.amount)?;
        }
        self.mint(store, to, amount)?;
        trace!(from = %from, to = %to, amount = %amount, "coins moved");
        Ok(())
    }
}

impl BankKeeper for StoreBank {
    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<()> {
        self.send(ctx.store_mut(), from, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::test_address;
    use proptest::prelude::*;
    use tessera_core::MemoryStore;

    #[test]
    fn send_moves_exact_amounts_or_nothing() {
        let bank = StoreBank;
        let mut store = MemoryStore::new();
        let (a, b) = (test_address(1), test_address(2));
        let funds = Coins::new(vec![Coin::new("atom", 5), Coin::new("stake", 10)]).unwrap();
        bank.mint(&mut store, &a, &funds).unwrap();

        let too_much = Coins::new(vec![Coin::new("atom", 1), Coin::new("stake", 11)]).unwrap();
        assert!(matches!(
            bank.send(&mut store, &a, &b, &too_much),
            Err(TesseraError::InsufficientFunds { .. })
        ));
        assert_eq!(bank.balance(&store, &a).unwrap(), funds);

        let part = Coins::new(vec![Coin::new("stake", 10)]).unwrap();
        bank.send(&mut store, &a, &b, &part).unwrap();
        assert_eq!(bank.balance_of(&store, &a, "stake").unwrap(), 0);
        assert_eq!(bank.balance(&store, &b).unwrap(), part);
    }

    proptest! {
        #[test]
        fn transfers_conserve_supply(
            transfers in prop::collection::vec((0u8..3, 0u8..3, 1u128..400), 0..20),
        ) {
            let bank = StoreBank;
            let mut store = MemoryStore::new();
            let accounts: Vec<_> = (1..=3).map(test_address).collect();
            let seed = Coins::new(vec![Coin::new("stake", 500)]).unwrap();
            for account in &accounts {
                bank.mint(&mut store, account, &seed).unwrap();
            }
            for (from, to, amount) in transfers {
                let amount = Coins::new(vec![Coin::new("stake", amount)]).unwrap();
                let _ = bank.send(
                    &mut store,
                    &accounts[usize::from(from)],
                    &accounts[usize::from(to)],
                    &amount,
                );
            }
            let total: u128 = accounts
                .iter()
                .map(|a| bank.balance_of(&store, a, "stake").unwrap())
                .sum();
            prop_assert_eq!(total, 1_500);
        }
    }
}
