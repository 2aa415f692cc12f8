//! Registry state machine
//!
//! Applies mint, list and purchase transitions against the committed root.
//! Every check runs before the ledger is touched, so a failed transition
//! leaves the root as it was.

use std::marker::PhantomData;

use registry_tree::{
    field::format_hash_hex, FieldHasher, Keccak256Hasher, MembershipWitness, TreeError, MAX_TREE_HEIGHT,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::asset::{AssetRecord, AssetState};
use crate::error::{PreconditionFailure, RegistryError};
use crate::ledger::Ledger;
use crate::signature::{ownership_message, purchase_message, Ed25519Scheme, SignatureScheme};
use crate::transition::{Transition, TransitionKind, TransitionReceipt};
use crate::types::{Hash, LeafIndex, Price, PublicKey, Signature};

/// How `mint` treats the current content of the target slot.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum MintPolicy {
    /// Overwrite whatever is stored at the index
    #[default]
    Unchecked,
    /// Require the witness to prove the slot still holds the zero digest
    RequireVacant,
}

impl From<&str> for MintPolicy {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "require-vacant" | "require_vacant" | "vacant" => Self::RequireVacant,
            _ => Self::Unchecked,
        }
    }
}

/// Registry state machine over a ledger `L`, signature scheme `S` and
/// hasher `H`.
#[derive(Debug)]
pub struct RegistryStateMachine<L, S = Ed25519Scheme, H = Keccak256Hasher> {
    ledger: L,
    height: u32,
    mint_policy: MintPolicy,
    _primitives: PhantomData<fn() -> (S, H)>,
}

impl<L: Ledger> RegistryStateMachine<L> {
    /// Create a state machine with the default Ed25519 / Keccak256 primitives.
    pub fn new(ledger: L, height: u32) -> Result<Self, RegistryError> {
        Self::with_primitives(ledger, height)
    }
}

impl<L, S, H> RegistryStateMachine<L, S, H>
where
    L: Ledger,
    S: SignatureScheme,
    H: FieldHasher,
{
    /// Create a state machine for witnesses of `height`.
    pub fn with_primitives(ledger: L, height: u32) -> Result<Self, RegistryError> {
        if height > MAX_TREE_HEIGHT {
            return Err(TreeError::InvalidHeight {
                height,
                max: MAX_TREE_HEIGHT,
            }
            .into());
        }

        Ok(Self {
            ledger,
            height,
            mint_policy: MintPolicy::default(),
            _primitives: PhantomData,
        })
    }

    /// Set the mint policy
    pub const fn with_mint_policy(mut self, mint_policy: MintPolicy) -> Self {
        self.mint_policy = mint_policy;
        self
    }

    /// Get the committed root
    pub fn committed_root(&self) -> Hash {
        self.ledger.root()
    }

    /// Witness height accepted by this machine
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Active mint policy
    pub const fn mint_policy(&self) -> MintPolicy {
        self.mint_policy
    }

    /// Underlying ledger
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Apply a submitted transition
    pub fn apply(&self, tx: &Transition) -> Result<TransitionReceipt, RegistryError> {
        match tx {
            Transition::Mint {
                index,
                witness,
                asset,
                signature,
            } => self.mint(*index, witness, asset, signature),
            Transition::ListForSale {
                index,
                witness,
                asset,
                new_price,
                signature,
            } => self.list_for_sale(*index, witness, asset, *new_price, signature),
            Transition::Purchase {
                index,
                witness,
                asset,
                new_owner,
                signature,
            } => self.purchase_asset(*index, witness, asset, new_owner, signature),
        }
    }

    /// Write `asset` at `index`.
    ///
    /// Under [`MintPolicy::Unchecked`] the previous content of the slot is not
    /// inspected and the new root is committed unconditionally.
    pub fn mint(
        &self,
        index: LeafIndex,
        witness: &MembershipWitness,
        asset: &AssetRecord,
        signature: &Signature,
    ) -> Result<TransitionReceipt, RegistryError> {
        self.check_witness(index, witness)?;
        self.require_signature(&asset.owner, &ownership_message(&asset.content_hash), signature)
            .inspect_err(|e| warn!("Rejected mint at index {}: {}", index, e))?;

        let new_root = witness.compute_root::<H>(index, &asset.digest_with::<H>());

        let previous_root = match self.mint_policy {
            MintPolicy::Unchecked => {
                let previous_root = self.ledger.root();
                self.ledger.set(new_root);
                previous_root
            }
            MintPolicy::RequireVacant => {
                let committed = self.ledger.root();
                if witness.compute_vacant_root::<H>(index) != committed {
                    warn!("Rejected mint at index {}: slot is not vacant", index);
                    return Err(PreconditionFailure::SlotOccupied.into());
                }
                self.ledger.compare_and_set(committed, new_root)?;
                committed
            }
        };

        Ok(self.receipt(TransitionKind::Mint, index, previous_root, new_root, *asset))
    }

    /// Offer the record at `index` for `new_price`.
    pub fn list_for_sale(
        &self,
        index: LeafIndex,
        witness: &MembershipWitness,
        asset: &AssetRecord,
        new_price: Price,
        signature: &Signature,
    ) -> Result<TransitionReceipt, RegistryError> {
        self.check_witness(index, witness)?;
        let committed = self
            .require_membership(index, witness, asset)
            .inspect_err(|e| warn!("Rejected listing at index {}: {}", index, e))?;
        self.require_signature(&asset.owner, &ownership_message(&asset.content_hash), signature)
            .inspect_err(|e| warn!("Rejected listing at index {}: {}", index, e))?;

        let updated = AssetRecord::from(AssetState::Listed {
            owner: asset.owner,
            content_hash: asset.content_hash,
            price: new_price,
        });

        self.commit(TransitionKind::ListForSale, index, witness, committed, updated)
    }

    /// Transfer the listed record at `index` to `new_owner`.
    ///
    /// Only the buyer's intent is authenticated; no payment is moved or
    /// checked here.
    pub fn purchase_asset(
        &self,
        index: LeafIndex,
        witness: &MembershipWitness,
        asset: &AssetRecord,
        new_owner: &PublicKey,
        signature: &Signature,
    ) -> Result<TransitionReceipt, RegistryError> {
        self.check_witness(index, witness)?;
        let committed = self
            .require_membership(index, witness, asset)
            .inspect_err(|e| warn!("Rejected purchase at index {}: {}", index, e))?;

        let AssetState::Listed {
            content_hash, price, ..
        } = asset.state()
        else {
            warn!("Rejected purchase at index {}: asset is not for sale", index);
            return Err(PreconditionFailure::NotForSale.into());
        };

        self.require_signature(new_owner, &purchase_message(&content_hash, price), signature)
            .inspect_err(|e| warn!("Rejected purchase at index {}: {}", index, e))?;

        let updated = AssetRecord::from(AssetState::Unlisted {
            owner: *new_owner,
            content_hash,
        });

        self.commit(TransitionKind::Purchase, index, witness, committed, updated)
    }

    fn check_witness(&self, index: LeafIndex, witness: &MembershipWitness) -> Result<(), TreeError> {
        let capacity = 1u64 << self.height;
        if index >= capacity {
            return Err(TreeError::IndexOutOfRange { index, capacity });
        }
        witness.check_height(self.height)
    }

    /// Returns the committed root the witness was checked against.
    fn require_membership(
        &self,
        index: LeafIndex,
        witness: &MembershipWitness,
        asset: &AssetRecord,
    ) -> Result<Hash, RegistryError> {
        let committed = self.ledger.root();
        let reconstructed = witness.compute_root::<H>(index, &asset.digest_with::<H>());
        debug!(
            "Witness for index {} reconstructs {} (committed {})",
            index,
            format_hash_hex(&reconstructed),
            format_hash_hex(&committed)
        );

        if reconstructed != committed {
            return Err(PreconditionFailure::RootMismatch {
                committed,
                reconstructed,
            }
            .into());
        }
        Ok(committed)
    }

    fn require_signature(
        &self,
        signer: &PublicKey,
        message: &[Hash],
        signature: &Signature,
    ) -> Result<(), RegistryError> {
        if !S::verify(signer, message, signature) {
            return Err(RegistryError::SignatureInvalid { signer: *signer });
        }
        Ok(())
    }

    fn commit(
        &self,
        kind: TransitionKind,
        index: LeafIndex,
        witness: &MembershipWitness,
        committed: Hash,
        updated: AssetRecord,
    ) -> Result<TransitionReceipt, RegistryError> {
        let new_root = witness.compute_root::<H>(index, &updated.digest_with::<H>());
        self.ledger
            .compare_and_set(committed, new_root)
            .inspect_err(|e| warn!("Lost commit race for {} at index {}: {}", kind.as_str(), index, e))?;

        Ok(self.receipt(kind, index, committed, new_root, updated))
    }

    fn receipt(
        &self,
        kind: TransitionKind,
        index: LeafIndex,
        previous_root: Hash,
        new_root: Hash,
        record: AssetRecord,
    ) -> TransitionReceipt {
        info!(
            "Committed {} at index {}: {} -> {}",
            kind.as_str(),
            index,
            format_hash_hex(&previous_root),
            format_hash_hex(&new_root)
        );

        TransitionReceipt {
            kind,
            index,
            previous_root,
            new_root,
            record,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use ed25519_dalek::SigningKey;
    use registry_tree::{field::scalar, CommitmentTree, Sha256Hasher, ZERO_DIGEST};

    const HEIGHT: u32 = 3;

    fn owner_key() -> SigningKey {
        SigningKey::from_bytes(&[11u8; 32])
    }

    fn buyer_key() -> SigningKey {
        SigningKey::from_bytes(&[22u8; 32])
    }

    fn setup() -> (RegistryStateMachine<InMemoryLedger>, CommitmentTree) {
        let machine = RegistryStateMachine::new(InMemoryLedger::new(), HEIGHT).unwrap();
        let tree = CommitmentTree::new(HEIGHT).unwrap();
        (machine, tree)
    }

    fn minted(
        machine: &RegistryStateMachine<InMemoryLedger>,
        tree: &mut CommitmentTree,
        index: LeafIndex,
        content: u64,
    ) -> AssetRecord {
        let key = owner_key();
        let asset = AssetRecord::unlisted(Ed25519Scheme::public_key(&key), scalar(content));
        let signature = Ed25519Scheme::sign(&key, &ownership_message(&asset.content_hash));
        let receipt = machine
            .mint(index, &tree.witness(index).unwrap(), &asset, &signature)
            .unwrap();
        tree.set_leaf(index, asset.digest()).unwrap();
        assert_eq!(receipt.new_root, tree.root());
        asset
    }

    #[test]
    fn test_mint_commits_witness_root() {
        let (machine, mut tree) = setup();
        minted(&machine, &mut tree, 2, 123);
        assert_eq!(machine.committed_root(), tree.root());
    }

    #[test]
    fn test_mint_rejects_bad_signature() {
        let (machine, tree) = setup();
        let asset = AssetRecord::unlisted(Ed25519Scheme::public_key(&owner_key()), scalar(1));
        let forged = Ed25519Scheme::sign(&buyer_key(), &ownership_message(&asset.content_hash));

        let err = machine
            .mint(0, &tree.witness(0).unwrap(), &asset, &forged)
            .unwrap_err();
        assert_eq!(err, RegistryError::SignatureInvalid { signer: asset.owner });
        assert_eq!(machine.committed_root(), ZERO_DIGEST);
    }

    #[test]
    fn test_unchecked_mint_overwrites_occupied_slot() {
        let (machine, mut tree) = setup();
        minted(&machine, &mut tree, 1, 5);
        let replacement = minted(&machine, &mut tree, 1, 6);
        assert_eq!(tree.get_leaf(1).unwrap(), replacement.digest());
        assert_eq!(machine.committed_root(), tree.root());
    }

    #[test]
    fn test_vacant_mint_rejects_occupied_slot() {
        let (machine, mut tree) = setup();
        let machine = machine.with_mint_policy(MintPolicy::RequireVacant);
        minted(&machine, &mut tree, 4, 5);

        let key = owner_key();
        let asset = AssetRecord::unlisted(Ed25519Scheme::public_key(&key), scalar(6));
        let signature = Ed25519Scheme::sign(&key, &ownership_message(&asset.content_hash));
        let before = machine.committed_root();

        let err = machine
            .mint(4, &tree.witness(4).unwrap(), &asset, &signature)
            .unwrap_err();
        assert_eq!(err, RegistryError::PreconditionFailed(PreconditionFailure::SlotOccupied));
        assert_eq!(machine.committed_root(), before);

        // a different slot is still free
        machine
            .mint(5, &tree.witness(5).unwrap(), &asset, &signature)
            .unwrap();
    }

    #[test]
    fn test_list_then_purchase() {
        let (machine, mut tree) = setup();
        let asset = minted(&machine, &mut tree, 3, 789);
        let owner = owner_key();
        let buyer = buyer_key();

        let list_sig = Ed25519Scheme::sign(&owner, &ownership_message(&asset.content_hash));
        let receipt = machine
            .list_for_sale(3, &tree.witness(3).unwrap(), &asset, 1000, &list_sig)
            .unwrap();
        let listed = AssetRecord::listed(asset.owner, asset.content_hash, 1000);
        assert_eq!(receipt.record, listed);
        tree.set_leaf(3, listed.digest()).unwrap();
        assert_eq!(machine.committed_root(), tree.root());

        let buyer_pk = Ed25519Scheme::public_key(&buyer);
        let buy_sig = Ed25519Scheme::sign(&buyer, &purchase_message(&asset.content_hash, 1000));
        let receipt = machine
            .purchase_asset(3, &tree.witness(3).unwrap(), &listed, &buyer_pk, &buy_sig)
            .unwrap();
        assert_eq!(receipt.record, AssetRecord::unlisted(buyer_pk, asset.content_hash));
        tree.set_leaf(3, receipt.record.digest()).unwrap();
        assert_eq!(machine.committed_root(), tree.root());
    }

    #[test]
    fn test_purchase_unlisted_fails() {
        let (machine, mut tree) = setup();
        let asset = minted(&machine, &mut tree, 0, 1);
        let buyer = buyer_key();
        let signature = Ed25519Scheme::sign(&buyer, &purchase_message(&asset.content_hash, 0));
        let before = machine.committed_root();

        let err = machine
            .purchase_asset(
                0,
                &tree.witness(0).unwrap(),
                &asset,
                &Ed25519Scheme::public_key(&buyer),
                &signature,
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::PreconditionFailed(PreconditionFailure::NotForSale));
        assert_eq!(machine.committed_root(), before);
    }

    #[test]
    fn test_stale_witness_fails() {
        let (machine, mut tree) = setup();
        let asset = minted(&machine, &mut tree, 0, 1);
        let stale = tree.witness(0).unwrap();
        minted(&machine, &mut tree, 1, 2);

        let signature = Ed25519Scheme::sign(&owner_key(), &ownership_message(&asset.content_hash));
        let before = machine.committed_root();
        let err = machine
            .list_for_sale(0, &stale, &asset, 10, &signature)
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::PreconditionFailed(PreconditionFailure::RootMismatch { committed, .. }) if committed == before
        ));
        assert!(err.is_retryable());
        assert_eq!(machine.committed_root(), before);

        // a fresh witness for the same index succeeds
        machine
            .list_for_sale(0, &tree.witness(0).unwrap(), &asset, 10, &signature)
            .unwrap();
    }

    #[test]
    fn test_list_rejects_non_owner_signature() {
        let (machine, mut tree) = setup();
        let asset = minted(&machine, &mut tree, 6, 1);
        let signature = Ed25519Scheme::sign(&buyer_key(), &ownership_message(&asset.content_hash));
        let before = machine.committed_root();

        let err = machine
            .list_for_sale(6, &tree.witness(6).unwrap(), &asset, 10, &signature)
            .unwrap_err();
        assert_eq!(err, RegistryError::SignatureInvalid { signer: asset.owner });
        assert!(!err.is_retryable());
        assert_eq!(machine.committed_root(), before);
    }

    #[test]
    fn test_witness_shape_is_checked() {
        let (machine, tree) = setup();
        let asset = AssetRecord::unlisted(Ed25519Scheme::public_key(&owner_key()), scalar(1));
        let signature = Ed25519Scheme::sign(&owner_key(), &ownership_message(&asset.content_hash));

        let short = MembershipWitness::new(vec![ZERO_DIGEST; 2]);
        assert_eq!(
            machine.mint(0, &short, &asset, &signature).unwrap_err(),
            RegistryError::Tree(TreeError::WitnessHeightMismatch { expected: HEIGHT, actual: 2 })
        );
        assert_eq!(
            machine
                .mint(8, &tree.witness(7).unwrap(), &asset, &signature)
                .unwrap_err(),
            RegistryError::Tree(TreeError::IndexOutOfRange { index: 8, capacity: 8 })
        );
        assert_eq!(machine.committed_root(), ZERO_DIGEST);
    }

    #[test]
    fn test_apply_dispatches() {
        let (machine, tree) = setup();
        let key = owner_key();
        let asset = AssetRecord::unlisted(Ed25519Scheme::public_key(&key), scalar(77));
        let tx = Transition::Mint {
            index: 2,
            witness: tree.witness(2).unwrap(),
            asset,
            signature: Ed25519Scheme::sign(&key, &ownership_message(&asset.content_hash)),
        };

        let receipt = machine.apply(&tx).unwrap();
        assert_eq!(receipt.kind, TransitionKind::Mint);
        assert_eq!(receipt.index, 2);
        assert_eq!(receipt.previous_root, ZERO_DIGEST);
    }

    #[test]
    fn test_alternate_hasher() {
        let machine: RegistryStateMachine<InMemoryLedger, Ed25519Scheme, Sha256Hasher> =
            RegistryStateMachine::with_primitives(InMemoryLedger::new(), 2).unwrap();
        let mut tree = CommitmentTree::<Sha256Hasher>::with_hasher(2).unwrap();
        let key = owner_key();
        let asset = AssetRecord::unlisted(Ed25519Scheme::public_key(&key), scalar(3));
        let signature = Ed25519Scheme::sign(&key, &ownership_message(&asset.content_hash));

        machine
            .mint(1, &tree.witness(1).unwrap(), &asset, &signature)
            .unwrap();
        tree.set_leaf(1, asset.digest_with::<Sha256Hasher>()).unwrap();
        assert_eq!(machine.committed_root(), tree.root());
    }

    #[test]
    fn test_mint_policy_from_str() {
        assert_eq!(MintPolicy::from("require-vacant"), MintPolicy::RequireVacant);
        assert_eq!(MintPolicy::from("UNCHECKED"), MintPolicy::Unchecked);
        assert_eq!(MintPolicy::from("anything"), MintPolicy::Unchecked);
    }

    #[test]
    fn test_oversized_height_rejected() {
        let err = RegistryStateMachine::new(InMemoryLedger::new(), MAX_TREE_HEIGHT + 1).unwrap_err();
        assert!(matches!(err, RegistryError::Tree(TreeError::InvalidHeight { .. })));
    }
}
