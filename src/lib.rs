//! ktable: a fixed-bucket chained hash table whose hashing and key
//! comparison are chosen at construction.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one table implementation for every key domain a subsystem
//!   needs (symbol names, object addresses, composite ids) instead of a
//!   copy of the table logic per key type.
//! - Layers:
//!   - Strategies (`strategy`): the two-operation capability a table is
//!     bound to, `HashStrategy` (key -> `u32`) and `EqualityStrategy`
//!     (key, key -> bool).
//!   - Key kinds: `fnv` (string keys, 32-bit FNV-1a over NUL-terminated
//!     bytes), `pointer` (address identity tokens, scrambled bit pattern),
//!     `hasher` (any `Hash + Eq` key through a `BuildHasher`).
//!   - `HashTable<K, V, H, E>`: bucket array of chains over generational
//!     slot storage, returning stable `Handle`s.
//!
//! Constraints
//! - Bucket count is fixed at construction and must be nonzero. The
//!   table never resizes; a load factor above the configured threshold is
//!   logged once and otherwise tolerated.
//! - Unique keys: `insert` rejects duplicates with `DuplicateKey`;
//!   `replace` is the explicit overwrite.
//! - Absence is `None`, never a sentinel value.
//! - Pointer keys are addresses only. The table never dereferences them
//!   and never owns the pointee.
//!
//! Concurrency
//! - No internal locking. Mutations take `&mut self`; lookups and
//!   iteration take `&self`, so the borrow checker enforces a single
//!   mutator or many readers, and no mutation while an iterator is live.
//! - The table is `Send`/`Sync` whenever its keys, values and strategies
//!   are; wrap it in `std::sync::RwLock` to share it between threads.
//!
//! Hashing invariants
//! - Each entry stores the `u32` hash it was filed under. Unlinking uses
//!   the stored hash and never calls the strategy again.
//! - Strategies must agree with `Borrow`: a stored `K` and its borrowed
//!   form `Q` hash and compare the same.
//!
//! Notes and non-goals
//! - No rehash or shrink path.
//! - No persistence or wire format.
//! - `iter()` and `drain()` walk buckets in index order, then chain order;
//!   `iter_mut()` walks storage order.

pub mod config;
pub mod failure;
pub mod fnv;
pub mod hash_table;
mod hash_table_proptest;
pub mod hasher;
pub mod pointer;
pub mod strategy;

// Public surface
pub use config::TableConfig;
pub use failure::{Result, TableError};
pub use fnv::{fnv1a, StrKey, StringEq, StringHash, EMPTY_HASH, FNV_PRIME, FNV_SEED};
pub use hash_table::{Handle, HashTable, HashableTable, PointerTable, StringTable};
pub use hasher::{HasherStrategy, KeyEq};
pub use pointer::{scramble_address, PointerEq, PointerHash, PtrKey};
pub use strategy::{EqualityStrategy, HashStrategy};
