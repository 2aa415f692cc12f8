//! Dense fixed-height Merkle tree

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::{
    error::TreeError,
    hasher::{FieldHasher, Keccak256Hasher},
    proof::{self, MembershipWitness},
    Hash, MAX_TREE_HEIGHT, ZERO_DIGEST,
};

/// Binary Merkle tree over `2^height` leaves.
///
/// Nodes live in a single arena indexed from 1: slot 1 is the root, slots
/// `[capacity, 2 * capacity)` are the leaves and the children of slot `i` are
/// `2i` and `2i + 1`. Slot 0 is never read. Every slot starts at
/// [`ZERO_DIGEST`], so an untouched subtree is represented by zero.
pub struct CommitmentTree<H = Keccak256Hasher> {
    /// Node storage, sized once at construction
    nodes: Vec<Hash>,
    /// Tree height
    height: u32,
    /// Number of leaves (2^height)
    capacity: u64,
    _hasher: PhantomData<H>,
}

/// Portable copy of a tree's node arena.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    /// Tree height
    pub height: u32,
    /// Arena slots, including the unused slot 0
    pub nodes: Vec<Hash>,
}

impl CommitmentTree {
    /// Create an empty Keccak256 tree of the given height.
    pub fn new(height: u32) -> Result<Self, TreeError> {
        Self::with_hasher(height)
    }
}

impl<H: FieldHasher> CommitmentTree<H> {
    /// Create an empty tree using hasher `H`.
    pub fn with_hasher(height: u32) -> Result<Self, TreeError> {
        if height > MAX_TREE_HEIGHT {
            return Err(TreeError::InvalidHeight {
                height,
                max: MAX_TREE_HEIGHT,
            });
        }
        let capacity = 1u64 << height;

        Ok(Self {
            nodes: vec![ZERO_DIGEST; 2 * capacity as usize],
            height,
            capacity,
            _hasher: PhantomData,
        })
    }

    /// Rebuild a tree from a snapshot taken with [`Self::snapshot`], checking
    /// every internal node against its children.
    pub fn from_snapshot(snapshot: TreeSnapshot) -> Result<Self, TreeError> {
        let mut tree = Self::with_hasher(snapshot.height)?;
        if snapshot.nodes.len() != tree.nodes.len() {
            return Err(TreeError::InvalidSnapshot {
                expected: tree.nodes.len(),
                actual: snapshot.nodes.len(),
            });
        }
        tree.nodes = snapshot.nodes;

        // Internal nodes either hash their children or stand for an untouched
        // all-zero subtree.
        for slot in 1..tree.capacity as usize {
            let (left, right) = (&tree.nodes[2 * slot], &tree.nodes[2 * slot + 1]);
            let node = &tree.nodes[slot];
            let untouched = *node == ZERO_DIGEST && *left == ZERO_DIGEST && *right == ZERO_DIGEST;
            if !untouched && *node != H::hash_pair(left, right) {
                return Err(TreeError::InconsistentSnapshot { slot });
            }
        }
        Ok(tree)
    }

    /// Copy out the node arena.
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            height: self.height,
            nodes: self.nodes.clone(),
        }
    }

    /// Get the root hash
    pub fn root(&self) -> Hash {
        self.nodes[1]
    }

    /// Tree height
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of leaf slots
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Overwrite a leaf and rehash its path to the root.
    pub fn set_leaf(&mut self, index: u64, value: Hash) -> Result<(), TreeError> {
        let mut current = self.leaf_slot(index)?;
        self.nodes[current] = value;

        while current > 1 {
            current /= 2;
            self.nodes[current] = H::hash_pair(&self.nodes[2 * current], &self.nodes[2 * current + 1]);
        }

        Ok(())
    }

    /// Get the value stored at a leaf
    pub fn get_leaf(&self, index: u64) -> Result<Hash, TreeError> {
        Ok(self.nodes[self.leaf_slot(index)?])
    }

    /// Sibling hashes for `index`, ordered from the leaf level upwards.
    pub fn get_proof(&self, index: u64) -> Result<Vec<Hash>, TreeError> {
        let mut current = self.leaf_slot(index)?;
        let mut siblings = Vec::with_capacity(self.height as usize);

        while current > 1 {
            siblings.push(self.nodes[current ^ 1]);
            current /= 2;
        }

        Ok(siblings)
    }

    /// Membership witness for `index` against the current root.
    pub fn witness(&self, index: u64) -> Result<MembershipWitness, TreeError> {
        self.get_proof(index).map(MembershipWitness::new)
    }

    /// Verify a proof produced by any tree sharing this hasher.
    pub fn verify_proof(leaf: &Hash, proof: &[Hash], root: &Hash, index: u64) -> bool {
        proof::verify_proof::<H>(leaf, proof, root, index)
    }

    /// All leaves in index order
    pub fn leaves(&self) -> &[Hash] {
        &self.nodes[self.capacity as usize..]
    }

    fn leaf_slot(&self, index: u64) -> Result<usize, TreeError> {
        if index >= self.capacity {
            return Err(TreeError::IndexOutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        Ok((index + self.capacity) as usize)
    }
}

impl<H> Clone for CommitmentTree<H> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            height: self.height,
            capacity: self.capacity,
            _hasher: PhantomData,
        }
    }
}

impl<H> fmt::Debug for CommitmentTree<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitmentTree")
            .field("height", &self.height)
            .field("capacity", &self.capacity)
            .field("root", &hex::encode(self.nodes[1]))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field::scalar, Sha256Hasher};

    #[test]
    fn test_new_rejects_oversized_height() {
        let err = CommitmentTree::new(MAX_TREE_HEIGHT + 1).unwrap_err();
        assert_eq!(
            err,
            TreeError::InvalidHeight {
                height: MAX_TREE_HEIGHT + 1,
                max: MAX_TREE_HEIGHT
            }
        );
    }

    #[test]
    fn test_single_leaf_root() {
        let mut tree = CommitmentTree::new(3).unwrap();
        let value = scalar(123);
        tree.set_leaf(0, value).unwrap();

        let mut expected = value;
        for _ in 0..3 {
            expected = Keccak256Hasher::hash_pair(&expected, &ZERO_DIGEST);
        }
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_set_leaf_out_of_range_leaves_tree_untouched() {
        let mut tree = CommitmentTree::new(2).unwrap();
        tree.set_leaf(3, scalar(9)).unwrap();
        let before = tree.root();

        let err = tree.set_leaf(4, scalar(1)).unwrap_err();
        assert_eq!(err, TreeError::IndexOutOfRange { index: 4, capacity: 4 });
        assert_eq!(tree.root(), before);
        assert!(tree.get_proof(4).is_err());
        assert!(tree.get_leaf(4).is_err());
    }

    #[test]
    fn test_height_zero() {
        let mut tree = CommitmentTree::new(0).unwrap();
        assert_eq!(tree.capacity(), 1);
        tree.set_leaf(0, scalar(42)).unwrap();
        assert_eq!(tree.root(), scalar(42));
        assert!(tree.get_proof(0).unwrap().is_empty());
        assert!(CommitmentTree::<Keccak256Hasher>::verify_proof(&scalar(42), &[], &tree.root(), 0));
    }

    #[test]
    fn test_leaves_in_index_order() {
        let mut tree = CommitmentTree::new(2).unwrap();
        tree.set_leaf(2, scalar(3)).unwrap();
        tree.set_leaf(0, scalar(1)).unwrap();
        assert_eq!(tree.leaves(), &[scalar(1), ZERO_DIGEST, scalar(3), ZERO_DIGEST]);
        assert_eq!(tree.get_leaf(2).unwrap(), scalar(3));
    }

    #[test]
    fn test_proof_siblings_are_bottom_up() {
        let mut tree = CommitmentTree::new(2).unwrap();
        tree.set_leaf(0, scalar(1)).unwrap();
        tree.set_leaf(1, scalar(2)).unwrap();
        tree.set_leaf(3, scalar(4)).unwrap();

        let proof = tree.get_proof(1).unwrap();
        assert_eq!(proof.len(), 2);
        assert_eq!(proof[0], scalar(1));
        assert_eq!(proof[1], Keccak256Hasher::hash_pair(&ZERO_DIGEST, &scalar(4)));
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_root() {
        let mut tree = CommitmentTree::<Sha256Hasher>::with_hasher(4).unwrap();
        tree.set_leaf(7, scalar(77)).unwrap();

        let restored = CommitmentTree::<Sha256Hasher>::from_snapshot(tree.snapshot()).unwrap();
        assert_eq!(restored.root(), tree.root());
        assert_eq!(restored.get_proof(7).unwrap(), tree.get_proof(7).unwrap());
    }

    #[test]
    fn test_snapshot_with_tampered_node_is_rejected() {
        let mut tree = CommitmentTree::new(3).unwrap();
        tree.set_leaf(2, scalar(5)).unwrap();

        let mut snapshot = tree.snapshot();
        snapshot.nodes[1] = scalar(1);
        assert_eq!(
            CommitmentTree::<Keccak256Hasher>::from_snapshot(snapshot).unwrap_err(),
            TreeError::InconsistentSnapshot { slot: 1 }
        );

        // a leaf swapped without rehashing its parent
        let mut snapshot = tree.snapshot();
        snapshot.nodes[8 + 2] = scalar(6);
        assert_eq!(
            CommitmentTree::<Keccak256Hasher>::from_snapshot(snapshot).unwrap_err(),
            TreeError::InconsistentSnapshot { slot: 5 }
        );
    }

    #[test]
    fn test_snapshot_with_cleared_leaf_is_accepted() {
        let mut tree = CommitmentTree::new(2).unwrap();
        tree.set_leaf(1, scalar(5)).unwrap();
        tree.set_leaf(1, ZERO_DIGEST).unwrap();

        let restored = CommitmentTree::<Keccak256Hasher>::from_snapshot(tree.snapshot()).unwrap();
        assert_eq!(restored.root(), tree.root());
    }

    #[test]
    fn test_snapshot_with_wrong_size_is_rejected() {
        let snapshot = TreeSnapshot {
            height: 3,
            nodes: vec![ZERO_DIGEST; 4],
        };
        assert_eq!(
            CommitmentTree::<Keccak256Hasher>::from_snapshot(snapshot).unwrap_err(),
            TreeError::InvalidSnapshot { expected: 16, actual: 4 }
        );
    }
}
