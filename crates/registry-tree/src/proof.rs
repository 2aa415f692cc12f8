//! Membership witnesses and proof verification

use serde::{Deserialize, Serialize};

use crate::{error::TreeError, hasher::FieldHasher, Hash, ZERO_DIGEST};

/// Fold a leaf up through its siblings and return the resulting root.
///
/// Position at each level comes from the index bits: an even index is the
/// left child, an odd index the right child.
pub fn compute_root<H: FieldHasher>(leaf: &Hash, siblings: &[Hash], index: u64) -> Hash {
    let mut current_hash = *leaf;
    let mut current_index = index;

    for sibling in siblings {
        current_hash = if current_index % 2 == 0 {
            H::hash_pair(&current_hash, sibling)
        } else {
            H::hash_pair(sibling, &current_hash)
        };
        current_index /= 2;
    }

    current_hash
}

/// Check that `leaf` sits at `index` under `root`.
pub fn verify_proof<H: FieldHasher>(leaf: &Hash, proof: &[Hash], root: &Hash, index: u64) -> bool {
    compute_root::<H>(leaf, proof, index) == *root
}

/// Sibling path for one leaf, usable with any tree height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipWitness {
    /// Height of the tree the witness was taken from
    pub height: u32,
    /// Sibling hashes from leaf to root
    pub siblings: Vec<Hash>,
}

impl MembershipWitness {
    /// Wrap a bottom-up sibling path.
    ///
    /// A path too long for any `u32` height gets `u32::MAX`, which no tree
    /// accepts in [`Self::check_height`].
    pub fn new(siblings: Vec<Hash>) -> Self {
        Self {
            height: u32::try_from(siblings.len()).unwrap_or(u32::MAX),
            siblings,
        }
    }

    /// Number of siblings in the path.
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    /// True only for height-0 witnesses.
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// Ensure the witness matches a tree of `height`.
    pub fn check_height(&self, height: u32) -> Result<(), TreeError> {
        if self.height != height || self.siblings.len() != height as usize {
            return Err(TreeError::WitnessHeightMismatch {
                expected: height,
                actual: self.siblings.len(),
            });
        }
        Ok(())
    }

    /// Root obtained by placing `leaf` at `index` along this path.
    pub fn compute_root<H: FieldHasher>(&self, index: u64, leaf: &Hash) -> Hash {
        compute_root::<H>(leaf, &self.siblings, index)
    }

    /// Verify membership of `leaf` at `index` under `root`.
    pub fn verify<H: FieldHasher>(&self, index: u64, leaf: &Hash, root: &Hash) -> bool {
        verify_proof::<H>(leaf, &self.siblings, root, index)
    }

    /// Root of the tree if the slot at `index` had never been written.
    ///
    /// Untouched subtrees are stored as [`ZERO_DIGEST`] rather than as the hash
    /// of their zero children, so a pair of zeros folds to zero until the
    /// first populated sibling is met.
    pub fn compute_vacant_root<H: FieldHasher>(&self, index: u64) -> Hash {
        let mut current_hash = ZERO_DIGEST;
        let mut current_index = index;

        for sibling in &self.siblings {
            if current_hash != ZERO_DIGEST || *sibling != ZERO_DIGEST {
                current_hash = if current_index % 2 == 0 {
                    H::hash_pair(&current_hash, sibling)
                } else {
                    H::hash_pair(sibling, &current_hash)
                };
            }
            current_index /= 2;
        }

        current_hash
    }
}
