//! Transaction runner: ante chain, then message dispatch

use std::sync::Arc;
use tessera_ante::AnteChain;
use tessera_core::{Context, MsgResponse, MsgRouter, Result, Tx};
use tracing::debug;

/// Applies a transaction the way block execution does.
///
/// Ante effects (fee deduction) commit on their own branch before any
/// message runs, so a transaction whose messages fail still pays its fee.
/// Message effects commit only if every message succeeds.
pub struct TxRunner {
    ante: AnteChain,
    router: Arc<dyn MsgRouter>,
}

impl TxRunner {
    /// Create a runner
    pub fn new(ante: AnteChain, router: Arc<dyn MsgRouter>) -> Self {
        Self { ante, router }
    }

    /// Run only the ante chain, as mempool admission does
    pub fn check(&self, ctx: &mut Context<'_>, tx: &dyn Tx) -> Result<()> {
        self.ante_branch(ctx, tx, false)
    }

    fn ante_branch(&self, ctx: &mut Context<'_>, tx: &dyn Tx, simulate: bool) -> Result<()> {
        let priority = ctx.branch(|ctx| {
            self.ante.handle(ctx, tx, simulate)?;
            Ok(ctx.priority())
        })?;
        ctx.set_priority(priority);
        Ok(())
    }

    /// Run the ante chain and then every message
    pub fn deliver(
        &self,
        ctx: &mut Context<'_>,
        tx: &dyn Tx,
        simulate: bool,
    ) -> Result<Vec<MsgResponse>> {
        self.ante_branch(ctx, tx, simulate)?;
        let responses = ctx.branch(|ctx| {
            tx.msgs()
                .iter()
                .map(|msg| self.router.dispatch(ctx, msg.as_ref()))
                .collect::<Result<Vec<_>>>()
        });
        debug!(ok = responses.is_ok(), priority = ctx.priority(), "Transaction delivered");
        responses
    }
}
