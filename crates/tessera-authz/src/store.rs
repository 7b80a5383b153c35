//! Grant persistence over the ambient key/value store
//!
//! Every grant carrying an expiration has exactly one entry in the
//! expiration queue. [`GrantStore::put`] and [`GrantStore::delete`]
//! maintain that pairing.

use crate::authorization::AuthorizationRegistry;
use crate::grant::Grant;
use crate::keys::{
    granter_grantee_prefix, granter_prefix, parse_queue_key, queue_end_inclusive, queue_key,
    GrantKey, GRANT_PREFIX, GRANT_QUEUE_PREFIX,
};
use std::sync::Arc;
use tessera_core::{Address, KvStore, Result, Timestamp};

/// Lazy iterator over decoded grants
pub type GrantIter<'a> = Box<dyn Iterator<Item = Result<(GrantKey, Grant)>> + 'a>;

/// Reads and writes grant records and the expiration queue
#[derive(Debug, Clone)]
pub struct GrantStore {
    registry: Arc<AuthorizationRegistry>,
}

impl GrantStore {
    /// Create a store decoding capabilities through `registry`
    pub fn new(registry: Arc<AuthorizationRegistry>) -> Self {
        Self { registry }
    }

    /// Registry used to decode capabilities
    pub fn registry(&self) -> &AuthorizationRegistry {
        &self.registry
    }

    /// Load a grant
    pub fn get(&self, store: &dyn KvStore, key: &GrantKey) -> Result<Option<Grant>> {
        store
            .get(&key.to_bytes()?)
            .map(|bytes| Grant::decode(&bytes, &self.registry))
            .transpose()
    }

    /// Write a grant, replacing any previous one under the same key
    pub fn put(&self, store: &mut dyn KvStore, key: &GrantKey, grant: &Grant) -> Result<()> {
        if let Some(previous) = self.get(store, key)? {
            if let Some(exp) = previous.expiration {
                self.remove_queue_entry(store, exp, key)?;
            }
        }
        store.set(key.to_bytes()?, grant.encode()?);
        if let Some(exp) = grant.expiration {
            self.insert_queue_entry(store, exp, key)?;
        }
        Ok(())
    }

    /// Delete a grant and its queue entry, returning what was stored
    pub fn delete(&self, store: &mut dyn KvStore, key: &GrantKey) -> Result<Option<Grant>> {
        let Some(previous) = self.get(store, key)? else {
            return Ok(None);
        };
        store.delete(&key.to_bytes()?);
        if let Some(exp) = previous.expiration {
            self.remove_queue_entry(store, exp, key)?;
        }
        Ok(Some(previous))
    }

    /// Index `key` under `expiration`
    pub fn insert_queue_entry(
        &self,
        store: &mut dyn KvStore,
        expiration: Timestamp,
        key: &GrantKey,
    ) -> Result<()> {
        store.set(queue_key(expiration, key)?, Vec::new());
        Ok(())
    }

    /// Drop the index entry of `key` under `expiration`
    pub fn remove_queue_entry(
        &self,
        store: &mut dyn KvStore,
        expiration: Timestamp,
        key: &GrantKey,
    ) -> Result<()> {
        store.delete(&queue_key(expiration, key)?);
        Ok(())
    }

    fn scan<'a>(
        &'a self,
        store: &'a dyn KvStore,
        prefix: &[u8],
        keep: impl Fn(&GrantKey) -> bool + 'a,
    ) -> GrantIter<'a> {
        let registry = &self.registry;
        Box::new(store.prefix_iter(prefix).filter_map(move |(raw_key, value)| {
            let key = match GrantKey::from_bytes(&raw_key) {
                Ok(key) => key,
                Err(err) => return Some(Err(err)),
            };
            if !keep(&key) {
                return None;
            }
            Some(Grant::decode(&value, registry).map(|grant| (key, grant)))
        }))
    }

    /// Every grant, in key order
    pub fn iter_all<'a>(&'a self, store: &'a dyn KvStore) -> GrantIter<'a> {
        self.scan(store, &[GRANT_PREFIX], |_| true)
    }

    /// Grants issued by `granter`
    pub fn iter_by_granter<'a>(
        &'a self,
        store: &'a dyn KvStore,
        granter: &Address,
    ) -> Result<GrantIter<'a>> {
        Ok(self.scan(store, &granter_prefix(granter)?, |_| true))
    }

    /// Grants from `granter` to `grantee`
    pub fn iter_by_pair<'a>(
        &'a self,
        store: &'a dyn KvStore,
        granter: &Address,
        grantee: &Address,
    ) -> Result<GrantIter<'a>> {
        Ok(self.scan(store, &granter_grantee_prefix(granter, grantee)?, |_| true))
    }

    /// Grants received by `grantee`; scans every grant
    pub fn iter_by_grantee<'a>(
        &'a self,
        store: &'a dyn KvStore,
        grantee: &Address,
    ) -> GrantIter<'a> {
        let grantee = grantee.clone();
        self.scan(store, &[GRANT_PREFIX], move |key| key.grantee == grantee)
    }

    /// Queue entries expiring at or before `as_of`, earliest first
    pub fn iter_expiring<'a>(
        &self,
        store: &'a dyn KvStore,
        as_of: Timestamp,
    ) -> impl Iterator<Item = Result<(Timestamp, GrantKey)>> + 'a {
        let end = queue_end_inclusive(as_of);
        store
            .range(&[GRANT_QUEUE_PREFIX], end.as_deref())
            .map(|(key, _)| parse_queue_key(&key))
    }
}
