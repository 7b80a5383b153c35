//! Stateless message validation

use crate::decorator::{AnteDecorator, Next};
use tessera_core::{Context, ExecMode, Result, TesseraError, Tx};

/// Runs every message's `validate_basic`; skipped on mempool re-check
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateBasicDecorator;

impl AnteDecorator for ValidateBasicDecorator {
    fn name(&self) -> &'static str {
        "validate_basic"
    }

    fn ante_handle(
        &self,
        ctx: &mut Context<'_>,
        tx: &dyn Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<()> {
        if ctx.exec_mode() != ExecMode::ReCheck {
            if tx.msgs().is_empty() {
                return Err(TesseraError::invalid_request("must contain at least one message"));
            }
            for msg in tx.msgs() {
                msg.validate_basic()?;
            }
        }
        next.run(ctx, tx, simulate)
    }
}
