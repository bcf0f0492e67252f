//! Hash and equality capabilities a table is bound to at construction.
//!
//! A `HashTable` never inspects its keys directly. Every bucket index comes
//! from a `HashStrategy` and every chain match from an `EqualityStrategy`,
//! so one table implementation serves string keys, pointer keys, and any
//! other key domain that supplies the pair.
//!
//! Both traits are generic over the *query* type `Q` rather than the stored
//! key type. A table storing `String` keys can then be probed with `&str`,
//! following the `Borrow<Q>` convention of `std` and `hashbrown`.
//!
//! Contract
//! - Pure and deterministic: the same input always yields the same result
//!   for the lifetime of the strategy value.
//! - Consistent: `equals(a, b)` implies `hash_key(a) == hash_key(b)`.
//! - Borrow-stable: for a stored `K: Borrow<Q>`, hashing or comparing `k`
//!   and `k.borrow()` must agree.
//!
//! A strategy that breaks the contract cannot corrupt memory; it only makes
//! lookups miss entries that are present.

/// Computes the 32-bit hash of a key. The table reduces it modulo its
/// bucket count.
pub trait HashStrategy<Q: ?Sized> {
    fn hash_key(&self, key: &Q) -> u32;

    /// Short label for diagnostics.
    fn kind(&self) -> &'static str {
        "custom"
    }
}

/// Decides whether two keys name the same entry.
pub trait EqualityStrategy<Q: ?Sized> {
    fn equals(&self, a: &Q, b: &Q) -> bool;
}

impl<Q: ?Sized, F> HashStrategy<Q> for F
where
    F: Fn(&Q) -> u32,
{
    #[inline]
    fn hash_key(&self, key: &Q) -> u32 {
        self(key)
    }
}

impl<Q: ?Sized, F> EqualityStrategy<Q> for F
where
    F: Fn(&Q, &Q) -> bool,
{
    #[inline]
    fn equals(&self, a: &Q, b: &Q) -> bool {
        self(a, b)
    }
}
