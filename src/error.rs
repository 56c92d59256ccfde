//! Error types for struct array misuse.
//!
//! These are programming errors. The plain accessors assert; the `try_`
//! variants surface the same conditions as values for callers that
//! prefer to degrade.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructArrayError {
    #[error("record index {index} out of bounds (length {len})")]
    Bounds { index: usize, len: usize },
    #[error("struct array mutated after being transferred")]
    Immutable,
}
