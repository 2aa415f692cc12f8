//! Registry error types

use registry_tree::{field::format_hash_hex, TreeError};
use thiserror::Error;

use crate::{ledger::LedgerError, types::{Hash, PublicKey}};

/// Reasons a transition precondition did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionFailure {
    /// The witness does not reconstruct the committed root.
    #[error("committed root {} does not match witness root {}", format_hash_hex(.committed), format_hash_hex(.reconstructed))]
    RootMismatch { committed: Hash, reconstructed: Hash },

    /// Purchase of a record that is not listed.
    #[error("asset is not for sale")]
    NotForSale,

    /// Vacant-only mint hit a populated slot.
    #[error("leaf slot is already occupied")]
    SlotOccupied,

    /// Another transition committed between validation and commit.
    #[error("committed root changed before commit")]
    CommitConflict,
}

/// Transition errors. No variant is returned after a partial commit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The signature does not verify for the expected signer.
    #[error("invalid signature from {signer}")]
    SignatureInvalid { signer: PublicKey },

    /// The transition does not apply to the committed state.
    #[error("precondition failed: {0}")]
    PreconditionFailed(#[from] PreconditionFailure),

    /// Malformed index or witness.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl RegistryError {
    /// True when refreshing the tree and regenerating the witness may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PreconditionFailed(_))
    }
}

impl From<LedgerError> for RegistryError {
    fn from(_: LedgerError) -> Self {
        Self::PreconditionFailed(PreconditionFailure::CommitConflict)
    }
}
