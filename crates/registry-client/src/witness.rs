//! Witness generation from the local mirror

use registry_core::{AssetRecord, Hash, LeafIndex};
use registry_tree::{CommitmentTree, MembershipWitness, TreeError, TreeSnapshot};

use crate::error::ClientError;

/// Witness generator backed by a mirror of the committed tree
#[derive(Clone, Debug)]
pub struct WitnessGenerator {
    tree: CommitmentTree,
}

impl WitnessGenerator {
    /// Create a new witness generator
    pub const fn new(tree: CommitmentTree) -> Self {
        Self { tree }
    }

    /// Generator over an empty tree of `height`.
    pub fn empty(height: u32) -> Result<Self, TreeError> {
        CommitmentTree::new(height).map(Self::new)
    }

    /// Generate witness for a leaf
    pub fn generate_witness(&self, index: LeafIndex) -> Result<MembershipWitness, TreeError> {
        self.tree.witness(index)
    }

    /// Mirror root
    pub fn root(&self) -> Hash {
        self.tree.root()
    }

    /// Mirror tree
    pub const fn tree(&self) -> &CommitmentTree {
        &self.tree
    }

    /// Fail with [`ClientError::StaleMirror`] unless the mirror matches `committed`.
    pub fn ensure_synced(&self, committed: Hash) -> Result<(), ClientError> {
        if self.tree.root() != committed {
            return Err(ClientError::StaleMirror {
                mirror: self.tree.root(),
                committed,
            });
        }
        Ok(())
    }

    /// Write a committed record into the mirror and check the resulting root.
    pub fn apply(&mut self, index: LeafIndex, record: &AssetRecord, committed: Hash) -> Result<(), ClientError> {
        self.tree.set_leaf(index, record.digest())?;
        if self.tree.root() != committed {
            return Err(ClientError::MirrorDiverged {
                mirror: self.tree.root(),
                committed,
            });
        }
        Ok(())
    }

    /// Replace the mirror with a fetched snapshot.
    pub fn reset(&mut self, snapshot: TreeSnapshot) -> Result<(), TreeError> {
        self.tree = CommitmentTree::from_snapshot(snapshot)?;
        Ok(())
    }
}
