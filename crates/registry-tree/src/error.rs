//! Tree error types

use thiserror::Error;

/// Errors raised by the commitment tree and its witnesses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The requested height does not fit the arena.
    #[error("invalid tree height {height}, maximum is {max}")]
    InvalidHeight { height: u32, max: u32 },

    /// A leaf index outside `[0, capacity)`.
    #[error("leaf index {index} out of range for capacity {capacity}")]
    IndexOutOfRange { index: u64, capacity: u64 },

    /// A witness built for a different tree height.
    #[error("witness height mismatch: expected {expected}, got {actual}")]
    WitnessHeightMismatch { expected: u32, actual: usize },

    /// A snapshot whose node count does not match its height.
    #[error("invalid snapshot: expected {expected} nodes, got {actual}")]
    InvalidSnapshot { expected: usize, actual: usize },

    /// A snapshot node that does not hash its two children.
    #[error("invalid snapshot: node {slot} does not match its children")]
    InconsistentSnapshot { slot: usize },
}
