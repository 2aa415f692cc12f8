//! Client error types

use registry_core::{Hash, RegistryError};
use registry_tree::{field::format_hash_hex, TreeError};
use thiserror::Error;

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The state machine rejected the transition.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Malformed index, witness or snapshot.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// The mirror no longer matches the committed root; refresh first.
    #[error("local mirror {} is out of date, committed root is {}", format_hash_hex(.mirror), format_hash_hex(.committed))]
    StaleMirror { mirror: Hash, committed: Hash },

    /// Applying a receipt to a mirror did not reproduce the committed root.
    ///
    /// The transition itself was committed. Refresh before the next call but
    /// do not resubmit it.
    #[error("mirror root {} diverged from committed root {}", format_hash_hex(.mirror), format_hash_hex(.committed))]
    MirrorDiverged { mirror: Hash, committed: Hash },

    /// The submission never reached the ledger.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// True when `refresh` followed by a resubmission may succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Registry(err) => err.is_retryable(),
            Self::StaleMirror { .. } => true,
            Self::MirrorDiverged { .. } | Self::Tree(_) | Self::Transport(_) => false,
        }
    }
}

impl From<bincode::Error> for ClientError {
    fn from(err: bincode::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
