//! Transaction submission

use std::sync::Arc;

use async_trait::async_trait;
use registry_core::{Hash, LeafIndex, Ledger, RegistryStateMachine, Transition, TransitionReceipt};
use registry_tree::{
    field::format_hash_hex, CommitmentTree, Keccak256Hasher, MembershipWitness, TreeError, TreeSnapshot,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::ClientError;

/// Context passed with every submission
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkContext {
    /// Target network
    pub network: String,
    /// Free-form note logged with each submission
    pub memo: Option<String>,
}

/// Transport that carries transitions to the ledger.
///
/// Submissions sharing one committed root are serialized by the
/// implementation; a rejected submission leaves the root unchanged.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Last committed root
    async fn committed_root(&self, ctx: &NetworkContext) -> Result<Hash, ClientError>;

    /// Full tree state matching the committed root
    async fn fetch_tree(&self, ctx: &NetworkContext) -> Result<TreeSnapshot, ClientError>;

    /// Submit one transition
    async fn submit(&self, ctx: &NetworkContext, tx: &Transition) -> Result<TransitionReceipt, ClientError>;
}

#[async_trait]
impl<T: TransactionSubmitter + ?Sized> TransactionSubmitter for Arc<T> {
    async fn committed_root(&self, ctx: &NetworkContext) -> Result<Hash, ClientError> {
        (**self).committed_root(ctx).await
    }

    async fn fetch_tree(&self, ctx: &NetworkContext) -> Result<TreeSnapshot, ClientError> {
        (**self).fetch_tree(ctx).await
    }

    async fn submit(&self, ctx: &NetworkContext, tx: &Transition) -> Result<TransitionReceipt, ClientError> {
        (**self).submit(ctx, tx).await
    }
}

/// In-process submitter around a shared state machine.
///
/// Keeps an indexer copy of the tree, advanced from each receipt, so clients
/// can re-fetch the state behind the committed root.
#[derive(Debug)]
pub struct LocalSubmitter<L> {
    network: String,
    inner: Mutex<LocalState<L>>,
}

#[derive(Debug)]
struct LocalState<L> {
    machine: RegistryStateMachine<L>,
    indexer: CommitmentTree,
    /// Stats
    total_submitted: u64,
    total_committed: u64,
}

impl<L: Ledger> LocalState<L> {
    /// Mint witnesses must match the indexed tree; the state machine commits
    /// mints without comparing against the committed root.
    fn check_mint_witness(&self, index: LeafIndex, witness: &MembershipWitness) -> Result<(), ClientError> {
        let current = self.indexer.witness(index)?;
        if current != *witness {
            let leaf = self.indexer.get_leaf(index)?;
            warn!("Rejected mint at index {}: witness does not match the indexed tree", index);
            return Err(ClientError::StaleMirror {
                mirror: witness.compute_root::<Keccak256Hasher>(index, &leaf),
                committed: self.indexer.root(),
            });
        }
        Ok(())
    }
}

impl<L: Ledger> LocalSubmitter<L> {
    /// Create a submitter over a machine whose ledger starts empty.
    pub fn new(network: impl Into<String>, machine: RegistryStateMachine<L>) -> Result<Self, TreeError> {
        let indexer = CommitmentTree::new(machine.height())?;
        Ok(Self::with_tree(network, machine, indexer))
    }

    /// Create a submitter whose indexer starts from `tree`.
    pub fn with_tree(network: impl Into<String>, machine: RegistryStateMachine<L>, tree: CommitmentTree) -> Self {
        Self {
            network: network.into(),
            inner: Mutex::new(LocalState {
                machine,
                indexer: tree,
                total_submitted: 0,
                total_committed: 0,
            }),
        }
    }

    /// Submitted and committed transition counts
    pub async fn stats(&self) -> (u64, u64) {
        let state = self.inner.lock().await;
        (state.total_submitted, state.total_committed)
    }

    fn check_network(&self, ctx: &NetworkContext) -> Result<(), ClientError> {
        if ctx.network != self.network {
            return Err(ClientError::Transport(format!(
                "submitter serves network {:?}, context targets {:?}",
                self.network, ctx.network
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<L: Ledger + Send> TransactionSubmitter for LocalSubmitter<L> {
    async fn committed_root(&self, ctx: &NetworkContext) -> Result<Hash, ClientError> {
        self.check_network(ctx)?;
        Ok(self.inner.lock().await.machine.committed_root())
    }

    async fn fetch_tree(&self, ctx: &NetworkContext) -> Result<TreeSnapshot, ClientError> {
        self.check_network(ctx)?;
        Ok(self.inner.lock().await.indexer.snapshot())
    }

    async fn submit(&self, ctx: &NetworkContext, tx: &Transition) -> Result<TransitionReceipt, ClientError> {
        self.check_network(ctx)?;

        let payload = tx.encode()?;
        let tx_hash = tx.hash();
        debug!(
            "Submitting {} tx {} ({} bytes, memo {:?})",
            tx.kind().as_str(),
            format_hash_hex(&tx_hash),
            payload.len(),
            ctx.memo
        );
        let decoded = Transition::decode(&payload)?;

        let mut state = self.inner.lock().await;
        state.total_submitted += 1;

        if let Transition::Mint { index, witness, .. } = &decoded {
            state.check_mint_witness(*index, witness)?;
        }

        let receipt = state.machine.apply(&decoded)?;
        state.total_committed += 1;

        state.indexer.set_leaf(receipt.index, receipt.record.digest())?;
        if state.indexer.root() != receipt.new_root {
            warn!(
                "Indexer root {} no longer matches committed root {} after {} at index {}",
                format_hash_hex(&state.indexer.root()),
                format_hash_hex(&receipt.new_root),
                receipt.kind.as_str(),
                receipt.index
            );
            return Err(ClientError::MirrorDiverged {
                mirror: state.indexer.root(),
                committed: receipt.new_root,
            });
        }

        info!(
            "Tx {} committed on {}: root {}",
            format_hash_hex(&tx_hash),
            self.network,
            format_hash_hex(&receipt.new_root)
        );
        Ok(receipt)
    }
}
