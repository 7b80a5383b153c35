//! Decorator chain
//!
//! Each decorator either rejects the transaction or hands it to the rest of
//! the chain through [`Next`]. `Next` is consumed by value, so a decorator
//! can continue the chain at most once.

use std::fmt;
use tessera_core::{Context, Result, Tx};
use tracing::trace;

/// One link of the pre-execution chain
pub trait AnteDecorator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Check `tx`, then call `next` to continue or return an error to stop
    fn ante_handle(
        &self,
        ctx: &mut Context<'_>,
        tx: &dyn Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<()>;
}

/// The remainder of the chain after the current decorator
pub struct Next<'a> {
    rest: &'a [Box<dyn AnteDecorator>],
}

impl<'a> Next<'a> {
    /// A continuation that accepts immediately
    pub fn terminal() -> Self {
        Self { rest: &[] }
    }

    /// Run the remaining decorators
    pub fn run(self, ctx: &mut Context<'_>, tx: &dyn Tx, simulate: bool) -> Result<()> {
        match self.rest.split_first() {
            Some((decorator, rest)) => {
                trace!(decorator = decorator.name(), "ante step");
                decorator.ante_handle(ctx, tx, simulate, Next { rest })
            }
            None => Ok(()),
        }
    }
}

/// Ordered decorator chain
#[derive(Default)]
pub struct AnteChain {
    decorators: Vec<Box<dyn AnteDecorator>>,
}

impl fmt::Debug for AnteChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.decorators.iter().map(|d| d.name()))
            .finish()
    }
}

impl AnteChain {
    /// An empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decorator
    pub fn with(mut self, decorator: impl AnteDecorator + 'static) -> Self {
        self.decorators.push(Box::new(decorator));
        self
    }

    /// Number of decorators
    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Run the whole chain against `tx`
    pub fn handle(&self, ctx: &mut Context<'_>, tx: &dyn Tx, simulate: bool) -> Result<()> {
        Next {
            rest: &self.decorators,
        }
        .run(ctx, tx, simulate)
    }
}
