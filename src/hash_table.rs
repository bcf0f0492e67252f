//! HashTable: fixed bucket array of collision chains over slot storage.
//!
//! Entries live in a `SlotMap`; each bucket is a chain of slot keys in
//! insertion order. Every entry caches the 32-bit hash it was filed under,
//! so unlinking never calls back into the hash strategy.
//!
//! Invariants
//! - `buckets.len() >= 1` and never changes.
//! - Each live slot key appears in exactly one chain, the one at
//!   `hash % buckets.len()` for the entry's cached hash.
//! - No two entries in a chain are equal under the table's `EqualityStrategy`.
//! - A `Handle` only resolves in the table that issued it.

use crate::config::TableConfig;
use crate::failure::{Result, TableError};
use crate::fnv::{StrKey, StringEq, StringHash};
use crate::hasher::{HasherStrategy, KeyEq};
use crate::pointer::{PointerEq, PointerHash, PtrKey};
use crate::strategy::{EqualityStrategy, HashStrategy};
use core::borrow::Borrow;
use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};
use slotmap::{DefaultKey, SlotMap};
use tracing::{debug, trace};

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable reference to an entry. A handle outlives its entry safely: once
/// the entry is removed the handle resolves to `None`, even if the slot is
/// reused. Handles are table-specific; another table resolves them to `None`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle {
    table: u64,
    slot: DefaultKey,
}

impl Handle {
    pub fn key<'a, K, V, H, E>(&self, table: &'a HashTable<K, V, H, E>) -> Option<&'a K> {
        table.handle_key(*self)
    }

    pub fn value<'a, K, V, H, E>(&self, table: &'a HashTable<K, V, H, E>) -> Option<&'a V> {
        table.handle_value(*self)
    }

    pub fn value_mut<'a, K, V, H, E>(
        &self,
        table: &'a mut HashTable<K, V, H, E>,
    ) -> Option<&'a mut V> {
        table.handle_value_mut(*self)
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u32,
}

/// Chained hash table bound to one hash strategy and one equality strategy.
///
/// Inserting a key that is already present fails with
/// `TableError::DuplicateKey`; use `replace` to overwrite. The bucket count
/// is fixed at construction: the table never resizes, so chains grow
/// linearly once `len()` outpaces `bucket_count()`.
pub struct HashTable<K, V, H, E> {
    id: u64,
    hash: H,
    eq: E,
    buckets: Box<[Vec<DefaultKey>]>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
    load_warn_threshold: f64,
    load_warned: bool,
}

/// String-keyed table (FNV-1a).
pub type StringTable<K, V> = HashTable<K, V, StringHash, StringEq>;

/// Address-keyed table.
pub type PointerTable<V> = HashTable<PtrKey, V, PointerHash, PointerEq>;

/// Table for keys implementing `Hash + Eq`.
pub type HashableTable<K, V> = HashTable<K, V, HasherStrategy, KeyEq>;

impl<K: StrKey, V> HashTable<K, V, StringHash, StringEq> {
    pub fn for_strings(bucket_count: usize) -> Result<Self> {
        Self::with_strategies(bucket_count, StringHash::new(), StringEq)
    }

    pub fn from_config(config: &TableConfig) -> Result<Self> {
        Self::with_config(config, StringHash::with_seed(config.seed), StringEq)
    }
}

impl<V> HashTable<PtrKey, V, PointerHash, PointerEq> {
    pub fn for_pointers(bucket_count: usize) -> Result<Self> {
        Self::with_strategies(bucket_count, PointerHash, PointerEq)
    }
}

impl<K: Hash + Eq, V> HashTable<K, V, HasherStrategy, KeyEq> {
    pub fn for_hashable(bucket_count: usize) -> Result<Self> {
        Self::with_strategies(bucket_count, HasherStrategy::default(), KeyEq)
    }
}

/// Iterator over entries in bucket order, then chain order.
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, Vec<DefaultKey>>,
    chain: core::slice::Iter<'a, DefaultKey>,
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&k) = self.chain.next() {
                if let Some(e) = self.slots.get(k) {
                    self.remaining -= 1;
                    return Some((&e.key, &e.value));
                }
                continue;
            }
            self.chain = self.buckets.next()?.iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over entries with mutable values, in storage order.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, DefaultKey, Entry<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, e)| (&e.key, &mut e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

/// Draining iterator in bucket order. The table is already empty when
/// `drain` returns; dropping or leaking the iterator drops or leaks only the
/// entries it still holds.
pub struct Drain<'a, K, V> {
    entries: std::vec::IntoIter<(K, V)>,
    _table: PhantomData<&'a mut ()>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}

/// Owning iterator in bucket order.
pub struct IntoIter<K, V> {
    order: std::vec::IntoIter<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        for k in self.order.by_ref() {
            if let Some(e) = self.slots.remove(k) {
                return Some((e.key, e.value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

// Accessors that never hash or compare keys.
impl<K, V, H, E> HashTable<K, V, H, E> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.bucket_count() as f64
    }

    /// Number of entries filed in `bucket`, or `None` if out of range.
    pub fn chain_len(&self, bucket: usize) -> Option<usize> {
        self.buckets.get(bucket).map(Vec::len)
    }

    pub fn longest_chain(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn hash_strategy(&self) -> &H {
        &self.hash
    }

    pub fn equality_strategy(&self) -> &E {
        &self.eq
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            chain: <&[DefaultKey]>::default().iter(),
            slots: &self.slots,
            remaining: self.slots.len(),
        }
    }

    /// Mutable iteration. Order follows storage, not buckets.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.slots.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    /// Removes every entry, yielding them in bucket order. The bucket count
    /// is kept and outstanding handles stay invalid.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        let order = self.take_order();
        let mut entries = Vec::with_capacity(order.len());
        for k in order {
            if let Some(e) = self.slots.remove(k) {
                entries.push((e.key, e.value));
            }
        }
        self.load_warned = false;
        Drain {
            entries: entries.into_iter(),
            _table: PhantomData,
        }
    }

    pub fn clear(&mut self) {
        for chain in self.buckets.iter_mut() {
            chain.clear();
        }
        self.slots.clear();
        self.load_warned = false;
    }

    fn take_order(&mut self) -> Vec<DefaultKey> {
        let mut order = Vec::with_capacity(self.slots.len());
        for chain in self.buckets.iter_mut() {
            order.append(chain);
        }
        order
    }

    fn bucket_index(&self, hash: u32) -> usize {
        hash as usize % self.buckets.len()
    }

    fn handle(&self, slot: DefaultKey) -> Handle {
        Handle {
            table: self.id,
            slot,
        }
    }

    /// Slot behind `h`, if `h` was issued by this table.
    fn own_slot(&self, h: Handle) -> Option<DefaultKey> {
        (h.table == self.id).then_some(h.slot)
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&K> {
        self.slots.get(self.own_slot(h)?).map(|e| &e.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        self.slots.get(self.own_slot(h)?).map(|e| &e.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        let k = self.own_slot(h)?;
        self.slots.get_mut(k).map(|e| &mut e.value)
    }

    /// Removes the entry behind `handle`; `None` if it is already gone or
    /// belongs to another table.
    pub fn remove_handle(&mut self, handle: Handle) -> Option<(K, V)> {
        let k = self.own_slot(handle)?;
        let hash = self.slots.get(k)?.hash;

        // Unlink from the chain first, then take the slot.
        let bucket = self.bucket_index(hash);
        let chain = &mut self.buckets[bucket];
        if let Some(pos) = chain.iter().position(|&kk| kk == k) {
            chain.remove(pos);
        }
        self.slots.remove(k).map(|e| (e.key, e.value))
    }
}

impl<K, V, H, E> HashTable<K, V, H, E>
where
    H: HashStrategy<K>,
    E: EqualityStrategy<K>,
{
    /// Builds an empty table with `bucket_count` chains.
    ///
    /// Fails with `InvalidArgument` when `bucket_count` is zero, larger than
    /// a 32-bit hash can address, or cannot be allocated.
    pub fn with_strategies(bucket_count: usize, hash: H, eq: E) -> Result<Self> {
        let config = TableConfig::new(bucket_count);
        Self::with_config(&config, hash, eq)
    }

    /// Builds an empty table from `config`. `config.seed` is only read by
    /// the string constructors; here the strategies are taken as given.
    pub fn with_config(config: &TableConfig, hash: H, eq: E) -> Result<Self> {
        config.validate()?;
        let mut buckets = Vec::new();
        if buckets.try_reserve_exact(config.bucket_count).is_err() {
            debug!(buckets = config.bucket_count, "bucket array allocation failed");
            return Err(TableError::InvalidArgument);
        }
        buckets.resize_with(config.bucket_count, Vec::new);
        debug!(
            buckets = config.bucket_count,
            kind = HashStrategy::<K>::kind(&hash),
            "hash table created"
        );
        Ok(Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            hash,
            eq,
            buckets: buckets.into_boxed_slice(),
            slots: SlotMap::with_key(),
            load_warn_threshold: config.load_warn_threshold,
            load_warned: false,
        })
    }

    /// Position of `q` in the chain of `bucket`, comparing cached hashes first.
    fn position<Q>(&self, bucket: usize, hash: u32, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        E: EqualityStrategy<Q>,
    {
        self.buckets[bucket].iter().position(|&k| {
            self.slots
                .get(k)
                .map(|e| {
                    let key: &Q = e.key.borrow();
                    e.hash == hash && EqualityStrategy::<Q>::equals(&self.eq, key, q)
                })
                .unwrap_or(false)
        })
    }

    fn probe<Q>(&self, q: &Q) -> (usize, Option<DefaultKey>, Option<usize>)
    where
        K: Borrow<Q>,
        Q: ?Sized,
        H: HashStrategy<Q>,
        E: EqualityStrategy<Q>,
    {
        let hash = HashStrategy::<Q>::hash_key(&self.hash, q);
        let bucket = self.bucket_index(hash);
        let pos = self.position(bucket, hash, q);
        (bucket, pos.map(|p| self.buckets[bucket][p]), pos)
    }

    fn link(&mut self, bucket: usize, entry: Entry<K, V>) -> Handle {
        let k = self.slots.insert(entry);
        self.buckets[bucket].push(k);
        if !self.load_warned && self.load_factor() > self.load_warn_threshold {
            self.load_warned = true;
            debug!(
                len = self.len(),
                buckets = self.bucket_count(),
                load_factor = self.load_factor(),
                "load factor above threshold; chains will keep growing"
            );
        }
        self.handle(k)
    }

    /// Inserts `key -> value`. Fails with `DuplicateKey` if an equal key is
    /// present, leaving the table unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<Handle> {
        self.insert_with(key, || value)
    }

    /// Like `insert`, but only calls `default()` when the key is new.
    pub fn insert_with<F>(&mut self, key: K, default: F) -> Result<Handle>
    where
        F: FnOnce() -> V,
    {
        let hash = self.hash.hash_key(&key);
        let bucket = self.bucket_index(hash);
        if self.position(bucket, hash, &key).is_some() {
            trace!(bucket, "duplicate key rejected");
            return Err(TableError::DuplicateKey);
        }
        let value = default();
        Ok(self.link(bucket, Entry { key, value, hash }))
    }

    /// Inserts or overwrites. Returns the previous value if the key was
    /// present; the stored key is kept in that case.
    pub fn replace(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash.hash_key(&key);
        let bucket = self.bucket_index(hash);
        match self.position(bucket, hash, &key) {
            Some(pos) => {
                let k = self.buckets[bucket][pos];
                self.slots
                    .get_mut(k)
                    .map(|e| core::mem::replace(&mut e.value, value))
            }
            None => {
                self.link(bucket, Entry { key, value, hash });
                None
            }
        }
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        H: HashStrategy<Q>,
        E: EqualityStrategy<Q>,
    {
        self.probe(q).1.map(|k| self.handle(k))
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        H: HashStrategy<Q>,
        E: EqualityStrategy<Q>,
    {
        self.probe(q).1.is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        H: HashStrategy<Q>,
        E: EqualityStrategy<Q>,
    {
        let k = self.probe(q).1?;
        self.slots.get(k).map(|e| &e.value)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        H: HashStrategy<Q>,
        E: EqualityStrategy<Q>,
    {
        let k = self.probe(q).1?;
        self.slots.get(k).map(|e| (&e.key, &e.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        H: HashStrategy<Q>,
        E: EqualityStrategy<Q>,
    {
        let k = self.probe(q).1?;
        self.slots.get_mut(k).map(|e| &mut e.value)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        H: HashStrategy<Q>,
        E: EqualityStrategy<Q>,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Unlinks the entry equal to `q` and returns it. Bucket count is unchanged.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        H: HashStrategy<Q>,
        E: EqualityStrategy<Q>,
    {
        let (bucket, _, pos) = self.probe(q);
        let k = self.buckets[bucket].remove(pos?);
        self.slots.remove(k).map(|e| (e.key, e.value))
    }

    /// Bucket that `q` is (or would be) filed in.
    pub fn bucket_of<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized,
        H: HashStrategy<Q>,
    {
        self.bucket_index(HashStrategy::<Q>::hash_key(&self.hash, q))
    }
}

impl<'a, K, V, H, E> IntoIterator for &'a HashTable<K, V, H, E> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, H, E> IntoIterator for &'a mut HashTable<K, V, H, E> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, H, E> IntoIterator for HashTable<K, V, H, E> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(mut self) -> Self::IntoIter {
        let order = self.take_order();
        IntoIter {
            order: order.into_iter(),
            slots: core::mem::take(&mut self.slots),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, H, E> fmt::Debug for HashTable<K, V, H, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fnv::{fnv1a, FNV_PRIME, FNV_SEED};
    use std::cell::Cell;
    use std::collections::BTreeSet;

    /// Invariant: zero buckets is rejected at construction.
    #[test]
    fn zero_buckets_rejected() {
        let r = StringTable::<String, i32>::for_strings(0);
        assert_eq!(r.err(), Some(TableError::InvalidArgument));
        let r = PointerTable::<i32>::for_pointers(0);
        assert_eq!(r.err(), Some(TableError::InvalidArgument));
    }

    /// Invariant: a bucket count no 32-bit hash can reach is rejected, not
    /// allocated.
    #[test]
    fn oversized_bucket_count_rejected() {
        let r = StringTable::<String, u8>::for_strings(usize::MAX);
        assert_eq!(r.err(), Some(TableError::InvalidArgument));
        let r = HashableTable::<u64, u8>::for_hashable(usize::MAX / 2);
        assert_eq!(r.err(), Some(TableError::InvalidArgument));
    }

    /// Invariant: duplicate keys are rejected and the table remains unchanged.
    #[test]
    fn duplicate_insert_rejected() {
        let mut t = StringTable::for_strings(8).unwrap();
        let handle = t.insert("dup".to_string(), 1).unwrap();
        match t.insert("dup".to_string(), 2) {
            Err(TableError::DuplicateKey) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(*handle.value(&t).unwrap(), 1);
        assert_eq!(t.len(), 1);
    }

    /// Invariant: each entry sits in the chain at `hash % bucket_count`.
    #[test]
    fn entries_filed_by_hash_mod_buckets() {
        let mut t = StringTable::for_strings(8).unwrap();
        for k in ["foo", "bar", "baz", "a"] {
            t.insert(k, ()).unwrap();
        }
        for k in ["foo", "bar", "baz", "a"] {
            let expected = (fnv1a(k.as_bytes(), FNV_SEED) % 8) as usize;
            assert_eq!(t.bucket_of(k), expected);
        }
        let a = (u32::from(b'a') ^ FNV_SEED).wrapping_mul(FNV_PRIME) % 8;
        assert_eq!(t.bucket_of("a"), a as usize);
        // "bar" and "baz" collide in bucket 2.
        assert_eq!(t.chain_len(2), Some(2));
        assert_eq!(t.chain_len(8), None);
        let total: usize = (0..8).filter_map(|b| t.chain_len(b)).sum();
        assert_eq!(total, t.len());
    }

    /// Invariant: borrowed lookup works (store `String`, query with `&str`).
    #[test]
    fn borrowed_lookup_with_str() {
        let mut t = StringTable::for_strings(4).unwrap();
        t.insert("hello".to_string(), 1).unwrap();
        assert!(t.contains_key("hello"));
        assert!(!t.contains_key("world"));
        assert!(t.find("hello").is_some());
        assert_eq!(t.get_key_value("hello"), Some((&"hello".to_string(), &1)));
    }

    /// Invariant: a present value that is itself zero is distinguishable from absence.
    #[test]
    fn zero_value_is_not_absence() {
        let mut t = StringTable::for_strings(4).unwrap();
        t.insert("zero", 0).unwrap();
        assert_eq!(t.get("zero"), Some(&0));
        assert_eq!(t.get("none"), None);
    }

    /// Invariant: the empty key hashes to the sentinel and is a valid key.
    #[test]
    fn empty_key_is_hashable() {
        let mut t = StringTable::for_strings(5).unwrap();
        t.insert(String::new(), 9).unwrap();
        assert_eq!(t.bucket_of(""), 0);
        assert_eq!(t.get(""), Some(&9));
        assert_eq!(t.insert(String::new(), 1), Err(TableError::DuplicateKey));
    }

    /// Invariant: handle access resolves while the entry exists and becomes
    /// `None` after removal; `value_mut` updates the stored value.
    #[test]
    fn handle_access_and_mutation() {
        let mut t = StringTable::for_strings(4).unwrap();
        let h = t.insert("k1".to_string(), 10).unwrap();
        assert_eq!(h.key(&t), Some(&"k1".to_string()));
        *h.value_mut(&mut t).unwrap() += 5;
        assert_eq!(h.value(&t), Some(&15));

        let (k, v) = t.remove_handle(h).unwrap();
        assert_eq!((k.as_str(), v), ("k1", 15));
        assert!(h.value(&t).is_none());
        assert!(t.remove_handle(h).is_none());
        assert!(!t.contains_key("k1"));
    }

    /// Invariant: a removed entry's handle never aliases a later entry.
    #[test]
    fn stale_handle_does_not_alias_new_entry() {
        let mut t = StringTable::for_strings(4).unwrap();
        let h1 = t.insert("old".to_string(), 1).unwrap();
        t.remove("old").unwrap();
        let h2 = t.insert("new".to_string(), 2).unwrap();
        assert_ne!(h1, h2);
        assert!(h1.value(&t).is_none());
        assert_eq!(h2.value(&t), Some(&2));
    }

    /// Invariant: iteration walks buckets in index order, chains in insertion order.
    #[test]
    fn iteration_follows_bucket_then_chain_order() {
        let mut t = StringTable::for_strings(8).unwrap();
        for (i, k) in ["foo", "baz", "a", "bar", "foobar"].iter().enumerate() {
            t.insert(*k, i).unwrap();
        }
        let walked: Vec<&str> = t.keys().copied().collect();
        // buckets: foobar=0, baz=2, bar=2, a=4, foo=7
        assert_eq!(walked, vec!["foobar", "baz", "bar", "a", "foo"]);
        assert_eq!(t.iter().len(), 5);

        // A fresh iteration restarts from the beginning.
        let again: Vec<&str> = t.iter().map(|(k, _)| *k).collect();
        assert_eq!(again, walked);
    }

    /// Invariant: `iter_mut` updates values as seen by later lookups.
    #[test]
    fn iter_mut_updates_values() {
        let mut t = StringTable::for_strings(3).unwrap();
        for (i, k) in ["k1", "k2", "k3"].iter().enumerate() {
            t.insert(k.to_string(), i as i32).unwrap();
        }
        for (_k, v) in t.iter_mut() {
            *v += 10;
        }
        for v in t.values_mut() {
            *v *= 2;
        }
        assert_eq!(t.get("k1"), Some(&20));
        assert_eq!(t.get("k3"), Some(&24));
        let sum: i32 = t.values().sum();
        assert_eq!(sum, 20 + 22 + 24);
    }

    /// Invariant: `insert_with` only runs the constructor on a successful insert.
    #[test]
    fn insert_with_is_lazy_and_deduplicates() {
        let mut t = StringTable::for_strings(4).unwrap();
        let calls = Cell::new(0);
        t.insert_with("k".to_string(), || {
            calls.set(calls.get() + 1);
            "v".to_string()
        })
        .unwrap();
        let r = t.insert_with("k".to_string(), || {
            calls.set(calls.get() + 1);
            "v2".to_string()
        });
        assert_eq!(r, Err(TableError::DuplicateKey));
        assert_eq!(calls.get(), 1);
        assert_eq!(t.get("k").map(String::as_str), Some("v"));
    }

    /// Invariant: `replace` overwrites in place and reports the old value.
    #[test]
    fn replace_upserts() {
        let mut t = StringTable::for_strings(4).unwrap();
        assert_eq!(t.replace("k".to_string(), 1), None);
        let h = t.find("k").unwrap();
        assert_eq!(t.replace("k".to_string(), 2), Some(1));
        assert_eq!(t.len(), 1);
        assert_eq!(h.value(&t), Some(&2));
    }

    /// Invariant: `get_mut` writes through to the stored value.
    #[test]
    fn get_mut_writes_through() {
        let mut t = StringTable::for_strings(4).unwrap();
        t.insert("k", vec![1]).unwrap();
        t.get_mut("k").unwrap().push(2);
        assert_eq!(t.get("k"), Some(&vec![1, 2]));
        assert!(t.get_mut("missing").is_none());
    }

    /// Invariant: drain empties the table in bucket order and keeps the bucket count.
    #[test]
    fn drain_yields_bucket_order_and_empties() {
        let mut t = StringTable::for_strings(8).unwrap();
        for k in ["foo", "bar", "a"] {
            t.insert(k, ()).unwrap();
        }
        let h = t.find("foo").unwrap();
        let drained: Vec<&str> = t.drain().map(|(k, _)| k).collect();
        assert_eq!(drained, vec!["bar", "a", "foo"]);
        assert!(t.is_empty());
        assert_eq!(t.bucket_count(), 8);
        assert_eq!(t.longest_chain(), 0);
        assert!(h.value(&t).is_none());
        t.insert("foo", ()).unwrap();
        assert!(h.value(&t).is_none(), "stale handle stays invalid after drain");
    }

    /// Invariant: dropping a partially consumed drain still removes everything.
    #[test]
    fn dropped_drain_removes_rest() {
        let mut t = StringTable::for_strings(2).unwrap();
        for k in ["a", "b", "c", "d"] {
            t.insert(k.to_string(), ()).unwrap();
        }
        let first = t.drain().next();
        assert!(first.is_some());
        assert!(t.is_empty());
        assert!(!t.contains_key("a"));
    }

    /// Invariant: a leaked drain still leaves an empty, consistent table.
    #[test]
    fn leaked_drain_leaves_table_empty() {
        let mut t = StringTable::for_strings(4).unwrap();
        t.insert("a", 1).unwrap();
        t.insert("b", 2).unwrap();
        let d = t.drain();
        assert_eq!(d.len(), 2);
        core::mem::forget(d);

        assert_eq!(t.len(), 0);
        assert_eq!(t.iter().len(), 0);
        t.insert("a", 3).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.iter().len(), t.iter().count());
        assert_eq!(t.get("a"), Some(&3));
    }

    /// Invariant: handles only resolve in the table that issued them.
    #[test]
    fn foreign_handle_does_not_resolve() {
        let mut a = StringTable::for_strings(4).unwrap();
        let mut b = StringTable::for_strings(4).unwrap();
        let ha = a.insert("shared".to_string(), 1).unwrap();
        let hb = b.insert("shared".to_string(), 2).unwrap();
        assert_ne!(ha, hb);

        assert_eq!(ha.value(&b), None);
        assert_eq!(ha.key(&b), None);
        assert!(ha.value_mut(&mut b).is_none());
        assert!(b.remove_handle(ha).is_none());
        assert_eq!(b.get("shared"), Some(&2));
        assert_eq!(ha.value(&a), Some(&1));
    }

    /// Invariant: owning iteration yields every entry exactly once.
    #[test]
    fn into_iter_owns_entries() {
        let mut t = StringTable::for_strings(3).unwrap();
        for k in ["x", "y", "z"] {
            t.insert(k.to_string(), k.len()).unwrap();
        }
        let keys: BTreeSet<String> = t.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), 3);
        assert!(keys.contains("y"));
    }

    /// Invariant: `clear` drops entries, keeps buckets, and the table is reusable.
    #[test]
    fn clear_keeps_buckets() {
        let mut t = PointerTable::for_pointers(4).unwrap();
        let objs = [1u8, 2, 3];
        for o in &objs {
            t.insert(PtrKey::of(o), *o).unwrap();
        }
        t.clear();
        assert_eq!(t.len(), 0);
        assert_eq!(t.bucket_count(), 4);
        t.insert(PtrKey::of(&objs[0]), 7).unwrap();
        assert_eq!(t.get(&PtrKey::of(&objs[0])), Some(&7));
    }

    /// Invariant: pointer keys compare by identity; equal contents at different
    /// addresses are different keys.
    #[test]
    fn pointer_keys_by_identity() {
        let a = String::from("same");
        let b = String::from("same");
        let mut t = PointerTable::for_pointers(8).unwrap();
        t.insert(PtrKey::of(&a), "a").unwrap();
        t.insert(PtrKey::of(&b), "b").unwrap();
        assert_eq!(t.get(&PtrKey::of(&a)), Some(&"a"));
        assert_eq!(t.get(&PtrKey::of(&b)), Some(&"b"));
        assert_eq!(t.insert(PtrKey::of(&a), "again"), Err(TableError::DuplicateKey));
    }

    /// Invariant: lookups work when every key collides; equality resolves
    /// the entry.
    #[test]
    fn collision_handling_with_const_strategy() {
        let mut t: HashTable<u32, &str, _, _> =
            HashTable::with_strategies(16, |_: &u32| 0u32, |a: &u32, b: &u32| a == b).unwrap();
        t.insert(10, "a").unwrap();
        t.insert(20, "b").unwrap();
        t.insert(30, "c").unwrap();
        assert_eq!(t.chain_len(0), Some(3));
        assert_eq!(t.longest_chain(), 3);
        assert_eq!(t.remove(&20), Some("b"));
        assert_eq!(t.get(&10), Some(&"a"));
        assert_eq!(t.get(&30), Some(&"c"));
        assert_eq!(t.chain_len(0), Some(2));
    }

    /// Invariant: hashable keys work through the `BuildHasher` adapter.
    #[test]
    fn hashable_keys() {
        let mut t = HashableTable::for_hashable(8).unwrap();
        t.insert((1u32, 2u32), "pair").unwrap();
        assert_eq!(t.get(&(1, 2)), Some(&"pair"));
        assert_eq!(t.get(&(2, 1)), None);
        assert_eq!(HashStrategy::<(u32, u32)>::kind(t.hash_strategy()), "hasher");
    }

    /// Invariant: the config seed reaches the string strategy.
    #[test]
    fn from_config_uses_seed() {
        let cfg = TableConfig::new(16).with_seed(0x1234);
        let t = StringTable::<String, ()>::from_config(&cfg).unwrap();
        assert_eq!(t.hash_strategy().seed(), 0x1234);
        assert_eq!(t.bucket_count(), 16);
        let bad = TableConfig::new(0);
        assert!(StringTable::<String, ()>::from_config(&bad).is_err());
    }

    /// Invariant: `len()`, `is_empty()` and `load_factor()` track live entries,
    /// unaffected by failed duplicate inserts.
    #[test]
    fn len_and_load_factor() {
        let mut t = StringTable::for_strings(2).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.load_factor(), 0.0);
        t.insert("a", 1).unwrap();
        let _ = t.insert("a", 2);
        t.insert("b", 2).unwrap();
        t.insert("c", 3).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.load_factor(), 1.5);
        t.remove("a");
        assert_eq!(t.len(), 2);
        assert_eq!(t.bucket_count(), 2);
    }

    /// Invariant: exceeding the load threshold only logs; inserts keep working
    /// and the bucket count never grows.
    #[test]
    fn no_resize_past_threshold() {
        let cfg = TableConfig::new(1).with_load_warn_threshold(1.0);
        let mut t = StringTable::from_config(&cfg).unwrap();
        for i in 0..32 {
            t.insert(format!("k{i}"), i).unwrap();
        }
        assert_eq!(t.bucket_count(), 1);
        assert_eq!(t.chain_len(0), Some(32));
        assert_eq!(t.get("k31"), Some(&31));
    }

    #[test]
    fn debug_prints_map() {
        let mut t = StringTable::for_strings(1).unwrap();
        t.insert("k", 1).unwrap();
        assert_eq!(format!("{:?}", t), r#"{"k": 1}"#);
    }
}
