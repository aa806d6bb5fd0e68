//! Error types surfaced by construction and (de)serialization.

use thiserror::Error;

/// Fatal construction failures. Traversal of a successfully built tree never
/// fails.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Build was called with zero primitives.
    #[error("cannot build a tree over zero primitives")]
    EmptyInput,

    /// Spatial splitting duplicated more references or allocated more node
    /// pairs than the overallocated pools can hold.
    #[error("node/reference pool exhausted: needed {needed} slots, capacity {capacity}")]
    PoolExhausted { needed: usize, capacity: usize },
}

/// Failures while saving or loading the serialized tree format.
#[derive(Debug, Error)]
pub enum TreeIoError {
    #[error("tree i/o failed")]
    Io(#[from] std::io::Error),

    /// The header counts do not describe a plausible tree; the file is of a
    /// different format or truncated.
    #[error("implausible tree header: {field} = {value}")]
    VersionMismatch { field: &'static str, value: i64 },
}
