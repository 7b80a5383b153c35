//! Account addresses and their string codec
//!
//! Addresses are opaque byte strings. Human readable forms go through an
//! [`AddressCodec`]; state keys always use the raw bytes with a one byte
//! length prefix so that variable length addresses never collide.

use crate::errors::{Result, TesseraError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length of addresses derived for module accounts
pub const MODULE_ADDRESS_LEN: usize = 20;

/// Maximum address length that fits a single byte length prefix
pub const MAX_ADDRESS_LEN: usize = 255;

/// Raw account address
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(Vec<u8>);

impl Address {
    /// Wrap raw address bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Derive the deterministic address of a named module account
    pub fn module(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        Self(digest[..MODULE_ADDRESS_LEN].to_vec())
    }

    /// Raw bytes of the address
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the address has no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Verify the address can be used in state keys
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(TesseraError::invalid_address("address is empty"));
        }
        if self.0.len() > MAX_ADDRESS_LEN {
            return Err(TesseraError::invalid_address(format!(
                "address length {} exceeds maximum {MAX_ADDRESS_LEN}",
                self.0.len()
            )));
        }
        Ok(())
    }

    /// Append the length-prefixed address bytes to `out`
    pub fn write_length_prefixed(&self, out: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        // validate() bounds the length to a single byte
        out.push(self.0.len() as u8);
        out.extend_from_slice(&self.0);
        Ok(())
    }

    /// Read a length-prefixed address from the front of `bytes`, returning
    /// the address and the remaining bytes
    pub fn read_length_prefixed(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (&len, rest) = bytes
            .split_first()
            .ok_or_else(|| TesseraError::storage("truncated address length prefix"))?;
        let len = usize::from(len);
        if rest.len() < len {
            return Err(TesseraError::storage(format!(
                "truncated address: expected {len} bytes, found {}",
                rest.len()
            )));
        }
        let (addr, rest) = rest.split_at(len);
        Ok((Self(addr.to_vec()), rest))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(&self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl From<&[u8]> for Address {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Converts between raw addresses and their string form
pub trait AddressCodec: Send + Sync {
    /// Decode an address string
    fn string_to_bytes(&self, text: &str) -> Result<Address>;

    /// Encode an address
    fn bytes_to_string(&self, address: &Address) -> Result<String>;
}

/// Codec producing `<prefix>1<hex>` strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexAddressCodec {
    prefix: String,
}

impl HexAddressCodec {
    /// Create a codec for the given human readable prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Human readable prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for HexAddressCodec {
    fn default() -> Self {
        Self::new("tess")
    }
}

impl AddressCodec for HexAddressCodec {
    fn string_to_bytes(&self, text: &str) -> Result<Address> {
        if text.trim().is_empty() {
            return Err(TesseraError::invalid_address(
                "empty address string is not allowed",
            ));
        }
        let data = text
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('1'))
            .ok_or_else(|| {
                TesseraError::invalid_address(format!(
                    "invalid address string {text:?}: expected prefix {}",
                    self.prefix
                ))
            })?;
        let bytes = hex::decode(data).map_err(|e| {
            TesseraError::invalid_address(format!("invalid address string {text:?}: {e}"))
        })?;
        let address = Address(bytes);
        address.validate()?;
        Ok(address)
    }

    fn bytes_to_string(&self, address: &Address) -> Result<String> {
        address.validate()?;
        Ok(format!("{}1{}", self.prefix, hex::encode(address.as_bytes())))
    }
}
