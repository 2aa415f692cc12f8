//! Committed root storage

use std::sync::{Arc, RwLock};

use registry_tree::{field::format_hash_hex, ZERO_DIGEST};
use thiserror::Error;

use crate::types::Hash;

/// Holder of the single committed root.
///
/// Implementations must make `compare_and_set` atomic: the comparison and the
/// write observe the same value.
pub trait Ledger {
    /// Last accepted root
    fn root(&self) -> Hash;

    /// Write `new` without a precondition.
    fn set(&self, new: Hash);

    /// Write `new` only if the current root equals `expected`.
    fn compare_and_set(&self, expected: Hash, new: Hash) -> Result<(), LedgerError>;
}

/// Ledger errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The stored root was not the expected one.
    #[error("root precondition failed: expected {}, found {}", format_hash_hex(.expected), format_hash_hex(.actual))]
    RootMismatch { expected: Hash, actual: Hash },
}

/// Process-local ledger backed by a lock-guarded cell.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    root: RwLock<Hash>,
}

impl InMemoryLedger {
    /// Ledger starting at the empty-tree root.
    pub fn new() -> Self {
        Self::with_root(ZERO_DIGEST)
    }

    /// Ledger starting at `root`.
    pub const fn with_root(root: Hash) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }
}

impl Ledger for InMemoryLedger {
    fn root(&self) -> Hash {
        *self.root.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set(&self, new: Hash) {
        *self.root.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = new;
    }

    fn compare_and_set(&self, expected: Hash, new: Hash) -> Result<(), LedgerError> {
        let mut root = self.root.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *root != expected {
            return Err(LedgerError::RootMismatch {
                expected,
                actual: *root,
            });
        }
        *root = new;
        Ok(())
    }
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn root(&self) -> Hash {
        (**self).root()
    }

    fn set(&self, new: Hash) {
        (**self).set(new);
    }

    fn compare_and_set(&self, expected: Hash, new: Hash) -> Result<(), LedgerError> {
        (**self).compare_and_set(expected, new)
    }
}
