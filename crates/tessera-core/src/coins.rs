//! Coin amounts and decimal gas prices
//!
//! Amounts are unsigned integers, so a negative balance or fee cannot be
//! represented at all. A coin set is *valid* when every denomination is well
//! formed, every amount is positive, and denominations are strictly sorted
//! (which also makes them unique).

use crate::errors::{Result, TesseraError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits carried by [`Dec`]
pub const DEC_PRECISION: u32 = 18;

const DEC_ONE: u128 = 10u128.pow(DEC_PRECISION);

/// Check that a denomination is 3..=128 chars, starts with a letter, and
/// uses only `[A-Za-z0-9/:._-]`
pub fn validate_denom(denom: &str) -> Result<()> {
    let mut chars = denom.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));
    if !first_ok || !rest_ok || !(3..=128).contains(&denom.len()) {
        return Err(TesseraError::invalid_request(format!(
            "invalid denom: {denom:?}"
        )));
    }
    Ok(())
}

/// A single denomination and amount
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination
    pub denom: String,
    /// Amount in base units
    pub amount: u128,
}

impl Coin {
    /// Create a coin
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Whether the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// An ordered set of coins
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Build a sanitized coin set: zero amounts dropped, sorted by
    /// denomination, duplicates and malformed denominations rejected
    pub fn new(coins: impl IntoIterator<Item = Coin>) -> Result<Self> {
        let mut coins: Vec<Coin> = coins.into_iter().filter(|c| !c.is_zero()).collect();
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        let coins = Self(coins);
        coins.validate()?;
        Ok(coins)
    }

    /// Wrap coins exactly as given, without sanitizing; used for values
    /// taken verbatim from a transaction
    pub fn from_unchecked(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    /// An empty set
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Coins in the set
    pub fn as_slice(&self) -> &[Coin] {
        &self.0
    }

    /// Number of denominations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every amount in the set is zero (true for the empty set)
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Coin::is_zero)
    }

    /// Validate denominations, positivity and strict ordering
    pub fn validate(&self) -> Result<()> {
        for coin in &self.0 {
            validate_denom(&coin.denom)?;
            if coin.is_zero() {
                return Err(TesseraError::invalid_request(format!(
                    "coin {coin} amount is not positive"
                )));
            }
        }
        for pair in self.0.windows(2) {
            match pair[0].denom.cmp(&pair[1].denom) {
                Ordering::Less => {}
                Ordering::Equal => {
                    return Err(TesseraError::invalid_request(format!(
                        "duplicate denomination {}",
                        pair[0].denom
                    )))
                }
                Ordering::Greater => {
                    return Err(TesseraError::invalid_request(format!(
                        "denomination {} is not sorted",
                        pair[1].denom
                    )))
                }
            }
        }
        Ok(())
    }

    /// Whether [`Coins::validate`] passes
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Amount held of `denom`
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map_or(0, |c| c.amount)
    }

    /// `self - other`, or `None` if any denomination would go negative.
    /// Zero results are dropped from the returned set.
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        for coin in &other.0 {
            if self.amount_of(&coin.denom) < coin.amount {
                return None;
            }
        }
        let remaining = self
            .0
            .iter()
            .map(|c| Coin::new(c.denom.clone(), c.amount - other.amount_of(&c.denom)))
            .filter(|c| !c.is_zero())
            .collect();
        Some(Coins(remaining))
    }

    /// `self + other`, or `None` on overflow
    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        let mut merged = self.0.clone();
        for coin in &other.0 {
            match merged.iter_mut().find(|c| c.denom == coin.denom) {
                Some(existing) => existing.amount = existing.amount.checked_add(coin.amount)?,
                None => merged.push(coin.clone()),
            }
        }
        merged.retain(|c| !c.is_zero());
        merged.sort_by(|a, b| a.denom.cmp(&b.denom));
        Some(Coins(merged))
    }

    /// Whether `self` holds at least `other` in every denomination of `other`
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other
            .0
            .iter()
            .all(|c| self.amount_of(&c.denom) >= c.amount)
    }

    /// Whether `self` meets `other` in at least one denomination of `other`
    pub fn is_any_gte(&self, other: &Coins) -> bool {
        other
            .0
            .iter()
            .any(|c| self.amount_of(&c.denom) >= c.amount)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(Coin::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl From<Coin> for Coins {
    fn from(coin: Coin) -> Self {
        if coin.is_zero() {
            Self::empty()
        } else {
            Self(vec![coin])
        }
    }
}

/// Non-negative fixed point decimal with 18 fractional digits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dec(u128);

impl Dec {
    /// Zero
    pub const ZERO: Dec = Dec(0);

    /// Build from raw 10^-18 units
    pub fn from_atto(atto: u128) -> Self {
        Self(atto)
    }

    /// Build from an integer
    pub fn from_int(value: u64) -> Self {
        Self(u128::from(value) * DEC_ONE)
    }

    /// Raw 10^-18 units
    pub fn atto(self) -> u128 {
        self.0
    }

    /// Whether the value is zero
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `ceil(self * factor)` as an integer, `None` on overflow
    pub fn mul_int_ceil(self, factor: u64) -> Option<u128> {
        let product = self.0.checked_mul(u128::from(factor))?;
        Some(product.div_ceil(DEC_ONE))
    }
}

impl FromStr for Dec {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TesseraError::invalid_request(format!("invalid decimal: {s:?}"));
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || frac_part.len() > DEC_PRECISION as usize
        {
            return Err(invalid());
        }
        let int: u128 = int_part.parse().map_err(|_| invalid())?;
        let frac: u128 = if frac_part.is_empty() {
            0
        } else {
            let scale = 10u128.pow(DEC_PRECISION - frac_part.len() as u32);
            frac_part.parse::<u128>().map_err(|_| invalid())? * scale
        };
        int.checked_mul(DEC_ONE)
            .and_then(|v| v.checked_add(frac))
            .map(Dec)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / DEC_ONE;
        let frac = self.0 % DEC_ONE;
        if frac == 0 {
            return write!(f, "{int}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{int}.{}", digits.trim_end_matches('0'))
    }
}

/// A decimal amount of one denomination, used for gas prices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecCoin {
    /// Denomination
    pub denom: String,
    /// Decimal amount
    pub amount: Dec,
}

impl DecCoin {
    /// Create a decimal coin
    pub fn new(denom: impl Into<String>, amount: Dec) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl FromStr for DecCoin {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_alphabetic())
            .ok_or_else(|| TesseraError::invalid_request(format!("invalid decimal coin: {s:?}")))?;
        let (amount, denom) = s.split_at(split);
        validate_denom(denom)?;
        Ok(Self::new(denom, amount.parse()?))
    }
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Set of decimal coins, serialized as a comma separated string such as
/// `"0.025stake,1atom"`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DecCoins(Vec<DecCoin>);

impl DecCoins {
    /// Build a set, dropping zero entries and sorting by denomination
    pub fn new(coins: impl IntoIterator<Item = DecCoin>) -> Result<Self> {
        let mut coins: Vec<DecCoin> = coins.into_iter().filter(|c| !c.amount.is_zero()).collect();
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        if let Some(pair) = coins.windows(2).find(|p| p[0].denom == p[1].denom) {
            return Err(TesseraError::invalid_request(format!(
                "duplicate denomination {}",
                pair[0].denom
            )));
        }
        Ok(Self(coins))
    }

    /// Entries of the set
    pub fn as_slice(&self) -> &[DecCoin] {
        &self.0
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for DecCoins {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let coins = s
            .split(',')
            .map(str::parse::<DecCoin>)
            .collect::<Result<Vec<_>>>()?;
        Self::new(coins)
    }
}

impl TryFrom<String> for DecCoins {
    type Error = TesseraError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DecCoins> for String {
    fn from(coins: DecCoins) -> Self {
        coins.to_string()
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(DecCoin::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(list: &[(&str, u128)]) -> Coins {
        Coins::new(list.iter().map(|(d, a)| Coin::new(*d, *a))).unwrap()
    }

    #[test]
    fn new_sanitizes_and_rejects_duplicates() {
        let set = coins(&[("steak", 10), ("atom", 0), ("atom", 5)]);
        assert_eq!(set.to_string(), "5atom,10steak");
        assert!(Coins::new(vec![Coin::new("steak", 1), Coin::new("steak", 2)]).is_err());
        assert!(Coins::new(vec![Coin::new("1bad", 1)]).is_err());
    }

    #[test]
    fn unchecked_sets_are_validated_on_demand() {
        let unsorted = Coins::from_unchecked(vec![Coin::new("steak", 1), Coin::new("atom", 1)]);
        assert!(!unsorted.is_valid());
        let zero = Coins::from_unchecked(vec![Coin::new("steak", 0)]);
        assert!(zero.is_zero());
        assert!(!zero.is_valid());
    }

    #[test]
    fn checked_sub_drops_zero_and_refuses_negative() {
        let limit = coins(&[("steak", 10)]);
        assert_eq!(limit.checked_sub(&coins(&[("steak", 10)])), Some(Coins::empty()));
        assert_eq!(limit.checked_sub(&coins(&[("steak", 4)])), Some(coins(&[("steak", 6)])));
        assert_eq!(limit.checked_sub(&coins(&[("steak", 11)])), None);
        assert_eq!(limit.checked_sub(&coins(&[("atom", 1)])), None);
    }

    #[test]
    fn dec_parses_and_multiplies_with_ceiling() {
        let price: Dec = "0.025".parse().unwrap();
        assert_eq!(price.to_string(), "0.025");
        assert_eq!(price.mul_int_ceil(100), Some(3));
        assert_eq!(price.mul_int_ceil(200), Some(5));
        assert_eq!(Dec::from_int(2).mul_int_ceil(7), Some(14));
        assert!("1.".parse::<Dec>().is_ok());
        assert!(".5".parse::<Dec>().is_err());
        assert!("-1".parse::<Dec>().is_err());
    }

    #[test]
    fn dec_coins_parse_from_config_strings() {
        let prices: DecCoins = "1atom, 0.025stake".parse().unwrap();
        assert_eq!(prices.as_slice().len(), 2);
        assert_eq!(prices.as_slice()[0].denom, "atom");
        assert_eq!(prices.to_string(), "1atom,0.025stake");
        assert!("".parse::<DecCoins>().unwrap().is_empty());
        assert!("0.1".parse::<DecCoins>().is_err());
    }
}
