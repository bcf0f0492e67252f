//! Pointer keys: identity tokens hashed by their bit pattern.
//!
//! `PtrKey` records an address and nothing else. The table stores and
//! compares the address; it never dereferences it and never owns the
//! pointee, so a pointee may be freed while its key is still in a table.

use crate::strategy::{EqualityStrategy, HashStrategy};
use core::fmt;
use core::ptr::NonNull;

/// 64-bit golden-ratio multiplier for Fibonacci hashing.
pub const GOLDEN_RATIO_64: u64 = 0x9E37_79B9_7F4A_7C15;

/// Address of an object, used purely as an identity token.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PtrKey(usize);

impl PtrKey {
    pub const fn null() -> Self {
        PtrKey(0)
    }

    pub fn of<T: ?Sized>(r: &T) -> Self {
        Self::from_ptr(r as *const T)
    }

    pub fn from_ptr<T: ?Sized>(p: *const T) -> Self {
        // Drops fat-pointer metadata; two views of one object share a key.
        PtrKey(p.cast::<u8>() as usize)
    }

    pub fn from_mut<T: ?Sized>(p: *mut T) -> Self {
        Self::from_ptr(p as *const T)
    }

    pub fn from_non_null<T: ?Sized>(p: NonNull<T>) -> Self {
        Self::from_ptr(p.as_ptr() as *const T)
    }

    pub const fn addr(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for PtrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PtrKey({:#x})", self.0)
    }
}

impl<T: ?Sized> From<&T> for PtrKey {
    fn from(r: &T) -> Self {
        PtrKey::of(r)
    }
}

impl<T: ?Sized> From<NonNull<T>> for PtrKey {
    fn from(p: NonNull<T>) -> Self {
        PtrKey::from_non_null(p)
    }
}

/// Scrambles an address into 32 bits.
///
/// Folding the high half in first keeps 64-bit addresses that differ only
/// above bit 32 apart; the golden-ratio multiply moves the alignment zeros
/// of the low bits out of the high word that is kept.
#[inline]
pub fn scramble_address(addr: usize) -> u32 {
    let x = addr as u64;
    let x = x ^ (x >> 32);
    (x.wrapping_mul(GOLDEN_RATIO_64) >> 32) as u32
}

/// Hash strategy for pointer keys.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PointerHash;

impl HashStrategy<PtrKey> for PointerHash {
    #[inline]
    fn hash_key(&self, key: &PtrKey) -> u32 {
        scramble_address(key.addr())
    }

    fn kind(&self) -> &'static str {
        "pointer"
    }
}

/// Equality strategy for pointer keys: raw address identity.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PointerEq;

impl EqualityStrategy<PtrKey> for PointerEq {
    #[inline]
    fn equals(&self, a: &PtrKey, b: &PtrKey) -> bool {
        a == b
    }
}
