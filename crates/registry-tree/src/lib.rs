//! Merkle commitment tree for the asset registry
//!
//! A dense, fixed-height binary tree whose root commits to every record slot.
//! Key features:
//! - Fixed capacity: `2^height` leaves, allocated once
//! - O(height) leaf updates and membership proofs
//! - Witnesses carry their height at runtime, so one type serves every depth

mod error;
pub mod field;
mod hasher;
mod proof;
mod tree;

pub use error::TreeError;
pub use hasher::{FieldHasher, Keccak256Hasher, Sha256Hasher};
pub use proof::{compute_root, verify_proof, MembershipWitness};
pub use tree::{CommitmentTree, TreeSnapshot};

/// 32-byte digest / field element
pub type Hash = [u8; 32];

/// Canonical zero digest, the value of every untouched slot
pub const ZERO_DIGEST: Hash = [0u8; 32];

/// Largest supported height (2^20 leaves)
pub const MAX_TREE_HEIGHT: u32 = 20;

#[cfg(test)]
mod tests {
    use super::*;
    use field::scalar;
    use proptest::prelude::*;

    #[test]
    fn test_empty_tree() {
        let tree = CommitmentTree::new(3).unwrap();
        assert_eq!(tree.root(), ZERO_DIGEST);
        assert_eq!(tree.capacity(), 8);
    }

    #[test]
    fn test_insert_and_proof() {
        let mut tree = CommitmentTree::new(3).unwrap();
        tree.set_leaf(0, scalar(123)).unwrap();

        let proof = tree.get_proof(0).unwrap();
        let root = tree.root();
        assert_eq!(proof.len(), 3);
        assert!(verify_proof::<Keccak256Hasher>(&scalar(123), &proof, &root, 0));
        assert!(!verify_proof::<Keccak256Hasher>(&scalar(456), &proof, &root, 0));
    }

    #[test]
    fn test_multiple_leaves_share_root() {
        let mut tree = CommitmentTree::new(3).unwrap();
        tree.set_leaf(0, scalar(1)).unwrap();
        tree.set_leaf(1, scalar(2)).unwrap();
        tree.set_leaf(2, scalar(3)).unwrap();

        let root = tree.root();
        for (index, value) in [(0, 1), (1, 2), (2, 3)] {
            let witness = tree.witness(index).unwrap();
            assert!(witness.verify::<Keccak256Hasher>(index, &scalar(value), &root));
        }
    }

    #[test]
    fn test_witness_reconstructs_updated_root() {
        let mut tree = CommitmentTree::new(4).unwrap();
        tree.set_leaf(5, scalar(10)).unwrap();
        tree.set_leaf(9, scalar(11)).unwrap();

        let witness = tree.witness(5).unwrap();
        let predicted = witness.compute_root::<Keccak256Hasher>(5, &scalar(99));
        tree.set_leaf(5, scalar(99)).unwrap();
        assert_eq!(predicted, tree.root());
    }

    proptest! {
        #[test]
        fn prop_set_leaf_then_proof_verifies(
            height in 0u32..=6,
            raw_index in any::<u64>(),
            value in any::<[u8; 32]>(),
            other in any::<[u8; 32]>(),
        ) {
            let mut tree = CommitmentTree::new(height).unwrap();
            let index = raw_index % tree.capacity();
            tree.set_leaf(index, value).unwrap();

            let proof = tree.get_proof(index).unwrap();
            prop_assert_eq!(proof.len(), height as usize);
            prop_assert!(verify_proof::<Keccak256Hasher>(&value, &proof, &tree.root(), index));
            if other != value {
                prop_assert!(!verify_proof::<Keccak256Hasher>(&other, &proof, &tree.root(), index));
            }
        }
    }
}
