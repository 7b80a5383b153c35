//! Keyed byte store and the discardable cache overlay
//!
//! The state machine only needs ordered byte keys: point reads and writes
//! plus ascending range scans. [`MemoryStore`] is the reference backing
//! store; [`CacheStore`] layers buffered writes over any parent and either
//! commits them in one step or is dropped without touching the parent.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::ops::Bound;

/// A key/value pair yielded by range scans
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Lazy ascending iterator over a key range
pub type KvIter<'a> = Box<dyn Iterator<Item = KvPair> + 'a>;

/// Ordered keyed byte store
pub trait KvStore {
    /// Read a value
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Whether a value exists
    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Write a value, replacing any previous one
    fn set(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Remove a value; removing a missing key is a no-op
    fn delete(&mut self, key: &[u8]);

    /// Ascending scan over `[start, end)`; `None` means unbounded above
    fn range(&self, start: &[u8], end: Option<&[u8]>) -> KvIter<'_>;

    /// Ascending scan over every key starting with `prefix`
    fn prefix_iter(&self, prefix: &[u8]) -> KvIter<'_> {
        let end = prefix_end(prefix);
        self.range(prefix, end.as_deref())
    }
}

/// Smallest key strictly greater than every key carrying `prefix`, or
/// `None` when the prefix is empty or all `0xff`
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

fn empty_range(start: &[u8], end: Option<&[u8]>) -> bool {
    end.is_some_and(|end| end <= start)
}

/// In-memory ordered store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.data.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.data.remove(key);
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> KvIter<'_> {
        if empty_range(start, end) {
            return Box::new(std::iter::empty());
        }
        let upper = end.map_or(Bound::Unbounded, Bound::Excluded);
        Box::new(
            self.data
                .range::<[u8], _>((Bound::Included(start), upper))
                .map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

/// Buffered write overlay over a parent store
///
/// Reads see the buffered writes first. Nothing reaches the parent until
/// [`CacheStore::write`] is called; dropping the overlay discards it.
pub struct CacheStore<'p> {
    parent: &'p mut dyn KvStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'p> CacheStore<'p> {
    /// Layer an empty overlay over `parent`
    pub fn new(parent: &'p mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Whether any write or delete is buffered
    pub fn is_dirty(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Flush buffered writes into the parent in key order
    pub fn write(self) {
        let Self { parent, writes } = self;
        for (key, value) in writes {
            match value {
                Some(value) => parent.set(key, value),
                None => parent.delete(&key),
            }
        }
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.writes.get(key) {
            Some(buffered) => buffered.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.writes.insert(key, Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> KvIter<'_> {
        if empty_range(start, end) {
            return Box::new(std::iter::empty());
        }
        let upper = end.map_or(Bound::Unbounded, Bound::Excluded);
        let buffered = self
            .writes
            .range::<[u8], _>((Bound::Included(start), upper))
            .map(|(k, v)| (k.clone(), v.clone()));
        Box::new(MergeIter {
            parent: self.parent.range(start, end).peekable(),
            buffered: buffered.peekable(),
        })
    }
}

/// Merges a parent scan with buffered overrides; buffered entries win on
/// equal keys and buffered deletes hide parent entries
struct MergeIter<P, B>
where
    P: Iterator<Item = KvPair>,
    B: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
{
    parent: Peekable<P>,
    buffered: Peekable<B>,
}

impl<P, B> Iterator for MergeIter<P, B>
where
    P: Iterator<Item = KvPair>,
    B: Iterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
{
    type Item = KvPair;

    fn next(&mut self) -> Option<KvPair> {
        loop {
            let order = match (self.parent.peek(), self.buffered.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((parent_key, _)), Some((buffered_key, _))) => parent_key.cmp(buffered_key),
            };
            match order {
                Ordering::Less => return self.parent.next(),
                Ordering::Equal => {
                    self.parent.next();
                }
                Ordering::Greater => {}
            }
            match self.buffered.next() {
                Some((key, Some(value))) => return Some((key, value)),
                // buffered delete shadows the parent entry
                Some((_, None)) => continue,
                None => return None,
            }
        }
    }
}
