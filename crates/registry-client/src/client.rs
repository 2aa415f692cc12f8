//! Registry client

use ed25519_dalek::SigningKey;
use registry_core::{
    ownership_message, purchase_message, AssetRecord, Ed25519Scheme, Hash, LeafIndex, Price, PublicKey,
    SignatureScheme, Transition, TransitionReceipt,
};
use registry_tree::{field::format_hash_hex, TreeError};
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::submitter::{NetworkContext, TransactionSubmitter};
use crate::witness::WitnessGenerator;

/// Drives registry transitions from a local mirror of the tree.
///
/// Each call takes its witness from the mirror, submits, and on success
/// advances the mirror with the same leaf write the ledger committed.
///
/// The client never retries. When a call fails with an error for which
/// [`ClientError::is_retryable`] holds, call [`Self::refresh`] and repeat the
/// call; the fresh witness is generated from the refreshed mirror.
#[derive(Debug)]
pub struct RegistryClient<T> {
    submitter: T,
    ctx: NetworkContext,
    witnesses: WitnessGenerator,
}

impl<T: TransactionSubmitter> RegistryClient<T> {
    /// Create a client and load the current tree from the submitter.
    pub async fn connect(config: &ClientConfig, submitter: T) -> Result<Self, ClientError> {
        let mut client = Self {
            submitter,
            ctx: config.context(),
            witnesses: WitnessGenerator::empty(config.tree_height)?,
        };
        client.refresh().await?;
        Ok(client)
    }

    /// Re-fetch the tree state and rebuild the mirror.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let snapshot = self.submitter.fetch_tree(&self.ctx).await?;
        let height = self.witnesses.tree().height();
        if snapshot.height != height {
            return Err(TreeError::WitnessHeightMismatch {
                expected: height,
                actual: snapshot.height as usize,
            }
            .into());
        }
        self.witnesses.reset(snapshot)?;

        let committed = self.submitter.committed_root(&self.ctx).await?;
        self.witnesses.ensure_synced(committed)?;
        info!("Mirror refreshed at root {}", format_hash_hex(&committed));
        Ok(())
    }

    /// Mirror root
    pub fn mirror_root(&self) -> Hash {
        self.witnesses.root()
    }

    /// Context sent with every submission
    pub const fn context(&self) -> &NetworkContext {
        &self.ctx
    }

    /// Underlying submitter
    pub const fn submitter(&self) -> &T {
        &self.submitter
    }

    /// Mint an unlisted record owned by `owner_key` at `index`.
    pub async fn mint_asset(
        &mut self,
        owner_key: &SigningKey,
        content_hash: Hash,
        index: LeafIndex,
    ) -> Result<AssetRecord, ClientError> {
        let asset = AssetRecord::unlisted(Ed25519Scheme::public_key(owner_key), content_hash);
        let tx = Transition::Mint {
            index,
            witness: self.witnesses.generate_witness(index)?,
            asset,
            signature: Ed25519Scheme::sign(owner_key, &ownership_message(&content_hash)),
        };

        Ok(self.submit(tx).await?.record)
    }

    /// List the unlisted record owned by `owner_key` at `index` for `price`.
    pub async fn list_for_sale(
        &mut self,
        owner_key: &SigningKey,
        content_hash: Hash,
        price: Price,
        index: LeafIndex,
    ) -> Result<AssetRecord, ClientError> {
        let asset = AssetRecord::unlisted(Ed25519Scheme::public_key(owner_key), content_hash);
        let tx = Transition::ListForSale {
            index,
            witness: self.witnesses.generate_witness(index)?,
            asset,
            new_price: price,
            signature: Ed25519Scheme::sign(owner_key, &ownership_message(&content_hash)),
        };

        Ok(self.submit(tx).await?.record)
    }

    /// Buy the record listed by `current_owner` at `index` for `price`.
    ///
    /// The buyer signs the content hash and price. No payment is made.
    pub async fn purchase_asset(
        &mut self,
        current_owner: PublicKey,
        buyer_key: &SigningKey,
        content_hash: Hash,
        price: Price,
        index: LeafIndex,
    ) -> Result<AssetRecord, ClientError> {
        let asset = AssetRecord::listed(current_owner, content_hash, price);
        let tx = Transition::Purchase {
            index,
            witness: self.witnesses.generate_witness(index)?,
            asset,
            new_owner: Ed25519Scheme::public_key(buyer_key),
            signature: Ed25519Scheme::sign(buyer_key, &purchase_message(&content_hash, price)),
        };

        Ok(self.submit(tx).await?.record)
    }

    async fn submit(&mut self, tx: Transition) -> Result<TransitionReceipt, ClientError> {
        let committed = self.submitter.committed_root(&self.ctx).await?;
        self.witnesses.ensure_synced(committed)?;

        let receipt = self.submitter.submit(&self.ctx, &tx).await?;
        self.witnesses.apply(receipt.index, &receipt.record, receipt.new_root)?;
        Ok(receipt)
    }
}
