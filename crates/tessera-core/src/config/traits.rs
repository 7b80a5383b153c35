//! Core configuration traits for the Tessera configuration system

use crate::errors::{Result, TesseraError};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Prefix of environment variables that override configuration keys
pub const ENV_PREFIX: &str = "TESSERA_";

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;
}

/// Configuration loaded from TOML and overridable key by key
pub trait ConfigFile: Sized + Default + DeserializeOwned + ConfigValidation {
    /// Set a configuration value from a dotted key such as `ante.min_gas_prices`
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Parse and validate a TOML document
    fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| TesseraError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TesseraError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply overrides from `(name, value)` pairs; `TESSERA_ANTE__FEE_COLLECTOR`
    /// maps to `ante.fee_collector`. Names without the prefix are ignored.
    fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            if let Some(rest) = name.as_ref().strip_prefix(ENV_PREFIX) {
                let key = rest.to_lowercase().replace("__", ".");
                self.set_from_string(&key, value.as_ref())?;
            }
        }
        self.validate()
    }

    /// Apply overrides from the process environment
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }
}
