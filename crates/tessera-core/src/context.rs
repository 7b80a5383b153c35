//! Execution context threaded through every state transition
//!
//! The context carries the only sources of environment a handler may
//! consult: the block header (height and time), the execution mode, the
//! node's minimum gas prices, the ambient store and the event buffer.
//! Nothing here reads a process clock.

use crate::coins::DecCoins;
use crate::errors::Result;
use crate::store::{CacheStore, KvStore};
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Block-level inputs supplied by the consensus layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain identifier
    pub chain_id: String,
    /// Block height; zero during genesis
    pub height: u64,
    /// Block time declared by the proposer
    pub time: Timestamp,
}

impl BlockHeader {
    /// Create a header
    pub fn new(chain_id: impl Into<String>, height: u64, time: Timestamp) -> Self {
        Self {
            chain_id: chain_id.into(),
            height,
            time,
        }
    }
}

/// Why a transaction is being executed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecMode {
    /// Mempool admission check
    Check,
    /// Mempool re-check after a block commit
    ReCheck,
    /// Gas estimation; no signature or fee floor enforcement
    Simulate,
    /// Block execution
    #[default]
    Finalize,
}

/// One key/value attribute of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    /// Attribute key
    pub key: String,
    /// Attribute value
    pub value: String,
}

/// Audit record emitted by a state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type
    pub kind: String,
    /// Ordered attributes
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Create an event without attributes
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Value of the first attribute named `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// Ordered buffer of emitted events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventManager {
    events: Vec<Event>,
}

impl EventManager {
    /// Append an event
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events emitted so far
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events of a given type
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    fn extend(&mut self, events: Vec<Event>) {
        self.events.extend(events);
    }
}

/// Execution context for one transaction or block-level call
pub struct Context<'s> {
    store: &'s mut dyn KvStore,
    header: BlockHeader,
    exec_mode: ExecMode,
    priority: i64,
    min_gas_prices: DecCoins,
    events: EventManager,
}

impl<'s> Context<'s> {
    /// Create a context over `store` for the given block
    pub fn new(store: &'s mut dyn KvStore, header: BlockHeader) -> Self {
        Self {
            store,
            header,
            exec_mode: ExecMode::default(),
            priority: 0,
            min_gas_prices: DecCoins::default(),
            events: EventManager::default(),
        }
    }

    /// Set the execution mode
    pub fn with_exec_mode(mut self, exec_mode: ExecMode) -> Self {
        self.exec_mode = exec_mode;
        self
    }

    /// Set the node-local minimum gas prices
    pub fn with_min_gas_prices(mut self, min_gas_prices: DecCoins) -> Self {
        self.min_gas_prices = min_gas_prices;
        self
    }

    /// Attach a transaction priority
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Replace the transaction priority in place
    pub fn set_priority(&mut self, priority: i64) {
        self.priority = priority;
    }

    /// Read access to the ambient store
    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    /// Write access to the ambient store
    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    /// Block header
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Block height
    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    /// Block time
    pub fn block_time(&self) -> Timestamp {
        self.header.time
    }

    /// Execution mode
    pub fn exec_mode(&self) -> ExecMode {
        self.exec_mode
    }

    /// Whether this is a mempool admission check
    pub fn is_check_tx(&self) -> bool {
        matches!(self.exec_mode, ExecMode::Check | ExecMode::ReCheck)
    }

    /// Transaction priority attached by the fee step
    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// Node-local minimum gas prices
    pub fn min_gas_prices(&self) -> &DecCoins {
        &self.min_gas_prices
    }

    /// Emit an event
    pub fn emit(&mut self, event: Event) {
        trace!(kind = %event.kind, "event emitted");
        self.events.emit(event);
    }

    /// Events emitted through this context
    pub fn events(&self) -> &EventManager {
        &self.events
    }

    /// Consume the context, returning its events
    pub fn into_events(self) -> Vec<Event> {
        self.events.events
    }

    /// Run `f` against a discardable branch of this context.
    ///
    /// Writes and events produced inside the branch reach this context only
    /// if `f` returns `Ok`; on error they are dropped and this context is
    /// left exactly as it was.
    pub fn branch<T>(&mut self, f: impl FnOnce(&mut Context<'_>) -> Result<T>) -> Result<T> {
        let mut cache = CacheStore::new(&mut *self.store);
        let mut child = Context {
            store: &mut cache,
            header: self.header.clone(),
            exec_mode: self.exec_mode,
            priority: self.priority,
            min_gas_prices: self.min_gas_prices.clone(),
            events: EventManager::default(),
        };
        let result = f(&mut child);
        let events = std::mem::take(&mut child.events.events);
        drop(child);
        match result {
            Ok(value) => {
                cache.write();
                self.events.extend(events);
                Ok(value)
            }
            Err(err) => {
                trace!(error = %err, "discarding branch");
                Err(err)
            }
        }
    }
}
