//! String keys: 32-bit FNV-1a hashing over NUL-terminated byte content.
//!
//! A string key is hashed up to, not including, its first NUL byte, which
//! stands in for the C terminator. Keys without a NUL are hashed in full.
//! An empty key (or a `None` key, standing in for a null pointer) hashes to
//! the sentinel `0` instead of the seed.
//!
//! The fold is `hash = (byte ^ hash) * FNV_PRIME` with 32-bit wrapping
//! multiplication; the wraparound is part of the function.

use crate::strategy::{EqualityStrategy, HashStrategy};
use std::ffi::{CStr, CString};

/// Standard 32-bit FNV offset basis, used as the default seed.
pub const FNV_SEED: u32 = 0x811C_9DC5;

/// 32-bit FNV prime.
pub const FNV_PRIME: u32 = 0x0100_0193;

/// Hash returned for an empty or null key.
pub const EMPTY_HASH: u32 = 0;

/// Byte view of a string-kind key.
///
/// `key_bytes` may include a NUL and trailing garbage; only the prefix
/// before the first NUL takes part in hashing and equality.
pub trait StrKey {
    fn key_bytes(&self) -> &[u8];
}

impl StrKey for str {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl StrKey for String {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl StrKey for [u8] {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

impl StrKey for Vec<u8> {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

impl StrKey for Box<str> {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl StrKey for Box<[u8]> {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

impl StrKey for CStr {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self.to_bytes()
    }
}

impl StrKey for CString {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<T: StrKey + ?Sized> StrKey for &T {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        (**self).key_bytes()
    }
}

// `None` is the null string: it hashes to the sentinel and equals `Some("")`.
impl<T: StrKey> StrKey for Option<T> {
    #[inline]
    fn key_bytes(&self) -> &[u8] {
        match self {
            Some(k) => k.key_bytes(),
            None => &[],
        }
    }
}

/// Prefix of `bytes` before the first NUL.
#[inline]
pub fn terminated(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// FNV-1a over the NUL-terminated prefix of `bytes`, starting from `seed`.
///
/// Returns [`EMPTY_HASH`] when the prefix is empty, whatever the seed.
pub fn fnv1a(bytes: &[u8], seed: u32) -> u32 {
    let text = terminated(bytes);
    if text.is_empty() {
        return EMPTY_HASH;
    }
    text.iter()
        .fold(seed, |hash, &b| (u32::from(b) ^ hash).wrapping_mul(FNV_PRIME))
}

/// Hash strategy for string keys.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StringHash {
    seed: u32,
}

impl StringHash {
    pub const fn new() -> Self {
        Self::with_seed(FNV_SEED)
    }

    pub const fn with_seed(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl Default for StringHash {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: StrKey + ?Sized> HashStrategy<T> for StringHash {
    #[inline]
    fn hash_key(&self, key: &T) -> u32 {
        fnv1a(key.key_bytes(), self.seed)
    }

    fn kind(&self) -> &'static str {
        "string"
    }
}

/// Equality strategy for string keys: byte equality of the terminated prefixes.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StringEq;

impl<T: StrKey + ?Sized> EqualityStrategy<T> for StringEq {
    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        terminated(a.key_bytes()) == terminated(b.key_bytes())
    }
}
