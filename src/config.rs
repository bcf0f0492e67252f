//! Construction parameters for string-keyed tables.

use crate::failure::{Result, TableError};
use crate::fnv::FNV_SEED;

/// Bucket count used by `TableConfig::default()`.
pub const DEFAULT_BUCKET_COUNT: usize = 64;

/// Load factor above which a table logs that its chains are growing long.
pub const DEFAULT_LOAD_WARN_THRESHOLD: f64 = 4.0;

/// Largest usable bucket count: a 32-bit hash never indexes past it.
pub const MAX_BUCKET_COUNT: u64 = 1 << 32;

#[derive(Clone, Debug, PartialEq)]
pub struct TableConfig {
    pub bucket_count: usize,
    pub seed: u32,
    pub load_warn_threshold: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            seed: FNV_SEED,
            load_warn_threshold: DEFAULT_LOAD_WARN_THRESHOLD,
        }
    }
}

impl TableConfig {
    pub fn new(bucket_count: usize) -> Self {
        Self::default().with_bucket_count(bucket_count)
    }

    pub fn with_bucket_count(mut self, bucket_count: usize) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_load_warn_threshold(mut self, threshold: f64) -> Self {
        self.load_warn_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_count == 0 || self.bucket_count as u64 > MAX_BUCKET_COUNT {
            return Err(TableError::InvalidArgument);
        }
        if !self.load_warn_threshold.is_finite() || self.load_warn_threshold <= 0.0 {
            return Err(TableError::InvalidArgument);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let c = TableConfig::default();
        assert_eq!(c.bucket_count, DEFAULT_BUCKET_COUNT);
        assert_eq!(c.seed, FNV_SEED);
        assert_eq!(c.validate(), Ok(()));
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(TableConfig::new(0).validate(), Err(TableError::InvalidArgument));
        assert_eq!(
            TableConfig::new(usize::MAX).validate(),
            Err(TableError::InvalidArgument)
        );
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let c = TableConfig::new(8).with_load_warn_threshold(t);
            assert_eq!(c.validate(), Err(TableError::InvalidArgument));
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn bucket_count_capped_at_hash_range() {
        let max = MAX_BUCKET_COUNT as usize;
        assert_eq!(TableConfig::new(max).validate(), Ok(()));
        assert_eq!(
            TableConfig::new(max + 1).validate(),
            Err(TableError::InvalidArgument)
        );
    }

    #[test]
    fn setters_chain() {
        let c = TableConfig::new(8).with_seed(3).with_load_warn_threshold(1.5);
        assert_eq!(c.bucket_count, 8);
        assert_eq!(c.seed, 3);
        assert_eq!(c.load_warn_threshold, 1.5);
    }
}
