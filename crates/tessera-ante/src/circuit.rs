//! Circuit breaker: reject transactions carrying disabled message types

use crate::decorator::{AnteDecorator, Next};
use std::sync::Arc;
use tessera_core::{Context, KvStore, Msg, Result, TesseraError, Tx};
use tracing::{info, warn};

/// Prefix of disabled message type records
pub const DISABLED_MSG_PREFIX: u8 = 0x03;

fn disabled_key(msg_type_url: &str) -> Vec<u8> {
    let mut key = vec![DISABLED_MSG_PREFIX];
    key.extend_from_slice(msg_type_url.as_bytes());
    key
}

/// Decides whether a message type may currently execute
pub trait CircuitBreaker: Send + Sync {
    /// Whether messages of `msg_type_url` are allowed
    fn is_allowed(&self, store: &dyn KvStore, msg_type_url: &str) -> Result<bool>;
}

/// Circuit breaker persisted in the ambient store
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCircuitBreaker;

impl StoreCircuitBreaker {
    /// Trip the breaker for a message type
    pub fn disable_msg(&self, ctx: &mut Context<'_>, msg_type_url: &str) {
        ctx.store_mut().set(disabled_key(msg_type_url), Vec::new());
        info!(msg_type_url, "Message type disabled");
    }

    /// Reset the breaker for a message type
    pub fn enable_msg(&self, ctx: &mut Context<'_>, msg_type_url: &str) {
        ctx.store_mut().delete(&disabled_key(msg_type_url));
        info!(msg_type_url, "Message type enabled");
    }

    /// Whether a message type is disabled
    pub fn is_msg_disabled(&self, store: &dyn KvStore, msg_type_url: &str) -> bool {
        store.has(&disabled_key(msg_type_url))
    }

    /// Every disabled message type, in order
    pub fn disabled_msgs(&self, store: &dyn KvStore) -> Result<Vec<String>> {
        store
            .prefix_iter(&[DISABLED_MSG_PREFIX])
            .map(|(key, _)| {
                String::from_utf8(key[1..].to_vec())
                    .map_err(|e| TesseraError::storage(format!("disabled message key: {e}")))
            })
            .collect()
    }
}

impl CircuitBreaker for StoreCircuitBreaker {
    fn is_allowed(&self, store: &dyn KvStore, msg_type_url: &str) -> Result<bool> {
        Ok(!self.is_msg_disabled(store, msg_type_url))
    }
}

/// Rejects any transaction with a message whose type is disabled
pub struct CircuitBreakerDecorator {
    breaker: Arc<dyn CircuitBreaker>,
}

impl CircuitBreakerDecorator {
    /// Create the decorator
    pub fn new(breaker: Arc<dyn CircuitBreaker>) -> Self {
        Self { breaker }
    }

    // Exec-wrapped messages reach the router as well.
    fn check_msg(&self, store: &dyn KvStore, msg: &dyn Msg) -> Result<()> {
        if !self.breaker.is_allowed(store, msg.type_url())? {
            warn!(msg_type_url = msg.type_url(), "Circuit breaker rejected message");
            return Err(TesseraError::denied("tx type not allowed"));
        }
        msg.nested_msgs()
            .iter()
            .try_for_each(|inner| self.check_msg(store, inner.as_ref()))
    }
}

impl AnteDecorator for CircuitBreakerDecorator {
    fn name(&self) -> &'static str {
        "circuit_breaker"
    }

    fn ante_handle(
        &self,
        ctx: &mut Context<'_>,
        tx: &dyn Tx,
        simulate: bool,
        next: Next<'_>,
    ) -> Result<()> {
        for msg in tx.msgs() {
            self.check_msg(ctx.store(), msg.as_ref())?;
        }
        next.run(ctx, tx, simulate)
    }
}
