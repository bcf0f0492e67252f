//! Adapter for keys that already implement `Hash + Eq`.
//!
//! Any `BuildHasher` becomes a `HashStrategy` by folding its 64-bit output
//! to 32 bits. The default builder is hashbrown's, which is fast and fixed
//! for the life of the process.

use crate::strategy::{EqualityStrategy, HashStrategy};
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Hash strategy backed by a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct HasherStrategy<S = DefaultHashBuilder> {
    build: S,
}

impl<S: BuildHasher> HasherStrategy<S> {
    pub fn with_hasher(build: S) -> Self {
        Self { build }
    }
}

impl<Q, S> HashStrategy<Q> for HasherStrategy<S>
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &Q) -> u32 {
        let h = self.build.hash_one(key);
        (h ^ (h >> 32)) as u32
    }

    fn kind(&self) -> &'static str {
        "hasher"
    }
}

/// Equality strategy that defers to `Eq`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyEq;

impl<Q: ?Sized + Eq> EqualityStrategy<Q> for KeyEq {
    #[inline]
    fn equals(&self, a: &Q, b: &Q) -> bool {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hasher;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0xAAAA_AAAA_0000_0001
        }
    }

    #[test]
    fn folds_high_half() {
        let s = HasherStrategy::with_hasher(ConstBuildHasher);
        assert_eq!(s.hash_key(&17u64), 0xAAAA_AAAB);
    }

    #[test]
    fn borrowed_forms_hash_alike() {
        let s: HasherStrategy = HasherStrategy::default();
        let owned = String::from("k");
        assert_eq!(s.hash_key(&owned), s.hash_key("k"));
        assert!(KeyEq.equals("k", owned.as_str()));
    }
}
