//! Node configuration
//!
//! Everything here is node-local. Values that differ between validators
//! (minimum gas prices) may only influence mempool admission, never block
//! execution.

mod traits;

pub use traits::{ConfigFile, ConfigValidation, ENV_PREFIX};

use crate::coins::DecCoins;
use crate::errors::{Result, TesseraError};
use serde::{Deserialize, Serialize};

/// Default module account collecting transaction fees
pub const DEFAULT_FEE_COLLECTOR: &str = "fee_collector";

/// Top-level node configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesseraConfig {
    /// Pre-execution chain settings
    pub ante: AnteConfig,
    /// Read surface settings
    pub query: QueryConfig,
}

/// Settings for the pre-execution chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnteConfig {
    /// Minimum gas prices accepted into the mempool
    pub min_gas_prices: DecCoins,
    /// Name of the module account receiving fees
    pub fee_collector: String,
}

impl Default for AnteConfig {
    fn default() -> Self {
        Self {
            min_gas_prices: DecCoins::default(),
            fee_collector: DEFAULT_FEE_COLLECTOR.to_string(),
        }
    }
}

/// Pagination limits for grant queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Page size when a request does not name one
    pub default_page_limit: u64,
    /// Upper bound on requested page sizes
    pub max_page_limit: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_limit: 100,
            max_page_limit: 1_000,
        }
    }
}

impl ConfigValidation for QueryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_page_limit == 0 {
            return Err(TesseraError::config("query.max_page_limit must be positive"));
        }
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            return Err(TesseraError::config(format!(
                "query.default_page_limit must be between 1 and {}",
                self.max_page_limit
            )));
        }
        Ok(())
    }
}

impl ConfigValidation for TesseraConfig {
    fn validate(&self) -> Result<()> {
        if self.ante.fee_collector.trim().is_empty() {
            return Err(TesseraError::config("ante.fee_collector must not be empty"));
        }
        self.query.validate()
    }
}

impl ConfigFile for TesseraConfig {
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        let parse_u64 = |v: &str| {
            v.parse::<u64>()
                .map_err(|e| TesseraError::config(format!("{key}: {e}")))
        };
        match key {
            "ante.min_gas_prices" => {
                self.ante.min_gas_prices = value
                    .parse()
                    .map_err(|e: TesseraError| TesseraError::config(format!("{key}: {e}")))?;
            }
            "ante.fee_collector" => self.ante.fee_collector = value.to_string(),
            "query.default_page_limit" => self.query.default_page_limit = parse_u64(value)?,
            "query.max_page_limit" => self.query.max_page_limit = parse_u64(value)?,
            other => {
                return Err(TesseraError::config(format!(
                    "unknown configuration key {other:?}"
                )))
            }
        }
        Ok(())
    }
}
