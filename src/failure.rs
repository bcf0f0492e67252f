//! The error and Result types of this crate.
//!
//! Absence is never an error: lookups and removals report a miss as `None`.

use std::{error, fmt, result};

/// Failure of a table operation.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TableError {
    /// A construction parameter is malformed (zero buckets, bad threshold).
    InvalidArgument,
    /// An entry with an equal key is already present; the table is unchanged.
    DuplicateKey,
}

impl error::Error for TableError {}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TableError::InvalidArgument => "invalid argument",
            TableError::DuplicateKey => "duplicate key",
        };
        f.write_str(text)
    }
}

/// Result type of fallible table operations.
pub type Result<T> = result::Result<T, TableError>;
