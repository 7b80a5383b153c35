//! Genesis import and export

use crate::keeper::Keeper;
use crate::query::GrantAuthorization;
use serde::{Deserialize, Serialize};
use tessera_core::{Context, Result, TesseraError};
use tracing::info;

/// Grant state carried across chain restarts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Every stored grant
    pub authorization: Vec<GrantAuthorization>,
}

impl GenesisState {
    /// Parse a genesis document
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| TesseraError::serialization(format!("invalid authz genesis: {e}")))
    }

    /// Render as a pretty-printed genesis document
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TesseraError::serialization(format!("authz genesis encoding: {e}")))
    }
}

impl Keeper {
    /// Load genesis grants, skipping any already expired at the genesis
    /// block time
    pub fn init_genesis(&self, ctx: &mut Context<'_>, state: &GenesisState) -> Result<()> {
        let now = ctx.block_time();
        let loaded = ctx.branch(|ctx| {
            let mut loaded = 0usize;
            for entry in &state.authorization {
                if entry.expiration.is_some_and(|exp| exp <= now) {
                    continue;
                }
                let granter = self.codec().string_to_bytes(&entry.granter)?;
                let grantee = self.codec().string_to_bytes(&entry.grantee)?;
                let authorization = self.grant_store().registry().unpack(&entry.authorization)?;
                self.grant(ctx, &granter, &grantee, authorization, entry.expiration)?;
                loaded += 1;
            }
            Ok(loaded)
        })?;
        info!(loaded, skipped = state.authorization.len() - loaded, "Genesis grants loaded");
        Ok(())
    }

    /// Export every stored grant, expired or not
    pub fn export_genesis(&self, ctx: &Context<'_>) -> Result<GenesisState> {
        let authorization = self
            .grant_store()
            .iter_all(ctx.store())
            .map(|entry| entry.and_then(|(key, grant)| self.view(&key, &grant)))
            .collect::<Result<_>>()?;
        Ok(GenesisState { authorization })
    }
}
