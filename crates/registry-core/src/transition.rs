//! Transition payloads and receipts

use registry_tree::MembershipWitness;
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

use crate::asset::AssetRecord;
use crate::types::{Hash, LeafIndex, Price, PublicKey, Signature};

/// Transition kind
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransitionKind {
    /// Write a new record
    Mint,
    /// Offer a record at a price
    ListForSale,
    /// Transfer a listed record to a buyer
    Purchase,
}

impl TransitionKind {
    /// Name used in logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::ListForSale => "list_for_sale",
            Self::Purchase => "purchase",
        }
    }

    const fn tag(&self) -> u8 {
        match self {
            Self::Mint => 0,
            Self::ListForSale => 1,
            Self::Purchase => 2,
        }
    }
}

/// One authenticated registry mutation, as submitted to the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Create a record
    Mint {
        index: LeafIndex,
        witness: MembershipWitness,
        asset: AssetRecord,
        /// Owner signature over the content hash
        signature: Signature,
    },
    /// Offer a record for sale
    ListForSale {
        index: LeafIndex,
        witness: MembershipWitness,
        /// Record currently committed at `index`
        asset: AssetRecord,
        new_price: Price,
        /// Owner signature over the content hash
        signature: Signature,
    },
    /// Buy a listed record
    Purchase {
        index: LeafIndex,
        witness: MembershipWitness,
        /// Listed record currently committed at `index`
        asset: AssetRecord,
        new_owner: PublicKey,
        /// Buyer signature over the content hash and price
        signature: Signature,
    },
}

impl Transition {
    /// Transition kind
    pub const fn kind(&self) -> TransitionKind {
        match self {
            Self::Mint { .. } => TransitionKind::Mint,
            Self::ListForSale { .. } => TransitionKind::ListForSale,
            Self::Purchase { .. } => TransitionKind::Purchase,
        }
    }

    /// Target leaf index
    pub const fn index(&self) -> LeafIndex {
        match self {
            Self::Mint { index, .. } | Self::ListForSale { index, .. } | Self::Purchase { index, .. } => *index,
        }
    }

    /// Wire encoding
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode a payload produced by [`Self::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Compute transaction hash
    pub fn hash(&self) -> Hash {
        let mut hasher = Keccak::v256();
        hasher.update(&[self.kind().tag()]);
        hasher.update(&self.index().to_be_bytes());

        let (witness, asset, signature) = match self {
            Self::Mint {
                witness,
                asset,
                signature,
                ..
            } => (witness, asset, signature),
            Self::ListForSale {
                witness,
                asset,
                new_price,
                signature,
                ..
            } => {
                hasher.update(&new_price.to_be_bytes());
                (witness, asset, signature)
            }
            Self::Purchase {
                witness,
                asset,
                new_owner,
                signature,
                ..
            } => {
                hasher.update(new_owner.as_bytes());
                (witness, asset, signature)
            }
        };

        for sibling in &witness.siblings {
            hasher.update(sibling);
        }
        for element in asset.to_fields() {
            hasher.update(&element);
        }
        hasher.update(&signature.r);
        hasher.update(&signature.s);

        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        output
    }
}

/// Result of a committed transition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionReceipt {
    /// Kind of the applied transition
    pub kind: TransitionKind,
    /// Leaf that was written
    pub index: LeafIndex,
    /// Committed root before the transition
    pub previous_root: Hash,
    /// Committed root after the transition
    pub new_root: Hash,
    /// Record now stored at `index`
    pub record: AssetRecord,
}
