//! Ambient serializer
//!
//! All persisted values go through `bincode` with its default (fixed,
//! little-endian) configuration, which is deterministic across nodes.
//! Polymorphic values are wrapped in an [`Any`] envelope that names its
//! concrete type.

use crate::errors::{Result, TesseraError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Encode a value with the ambient serializer
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| TesseraError::serialization(e.to_string()))
}

/// Decode a value with the ambient serializer
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| TesseraError::serialization(e.to_string()))
}

/// Self-describing envelope: a type tag plus that type's encoded payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Any {
    /// Type tag of the payload
    pub type_url: String,
    /// Encoded payload
    pub value: Vec<u8>,
}

impl Any {
    /// Wrap an already encoded payload
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }

    /// Encode `payload` and wrap it under `type_url`
    pub fn pack<T: Serialize>(type_url: impl Into<String>, payload: &T) -> Result<Self> {
        Ok(Self::new(type_url, encode(payload)?))
    }

    /// Decode the payload, checking the tag first
    pub fn unpack<T: DeserializeOwned>(&self, expected_type_url: &str) -> Result<T> {
        if self.type_url != expected_type_url {
            return Err(TesseraError::serialization(format!(
                "expected {expected_type_url}, found {}",
                self.type_url
            )));
        }
        decode(&self.value)
    }
}
