//! Asset records and their canonical digest

use registry_tree::{field, FieldHasher, Keccak256Hasher};
use serde::{Deserialize, Serialize};

use crate::types::{Hash, Price, PublicKey};

/// Record committed at one leaf of the registry.
///
/// The four fields are flattened into the leaf digest in declaration order.
/// Reordering them changes every root ever committed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Current owner
    pub owner: PublicKey,
    /// Digest of the off-tree content
    pub content_hash: Hash,
    /// Asking price, 0 when unlisted
    pub price: Price,
    /// Whether the record is offered for sale
    pub for_sale: bool,
}

/// Logical state of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetState {
    /// Owned, not offered
    Unlisted { owner: PublicKey, content_hash: Hash },
    /// Offered at `price`
    Listed {
        owner: PublicKey,
        content_hash: Hash,
        price: Price,
    },
}

impl AssetRecord {
    /// Freshly minted record
    pub const fn unlisted(owner: PublicKey, content_hash: Hash) -> Self {
        Self {
            owner,
            content_hash,
            price: 0,
            for_sale: false,
        }
    }

    /// Record offered for sale at `price`
    pub const fn listed(owner: PublicKey, content_hash: Hash, price: Price) -> Self {
        Self {
            owner,
            content_hash,
            price,
            for_sale: true,
        }
    }

    /// Classify by the `for_sale` flag.
    pub const fn state(&self) -> AssetState {
        if self.for_sale {
            AssetState::Listed {
                owner: self.owner,
                content_hash: self.content_hash,
                price: self.price,
            }
        } else {
            AssetState::Unlisted {
                owner: self.owner,
                content_hash: self.content_hash,
            }
        }
    }

    /// Field elements in wire order: owner, content hash, price, for-sale flag.
    pub fn to_fields(&self) -> [Hash; 4] {
        [
            self.owner.to_field(),
            self.content_hash,
            field::scalar(self.price),
            field::flag(self.for_sale),
        ]
    }

    /// Leaf digest under hasher `H`.
    pub fn digest_with<H: FieldHasher>(&self) -> Hash {
        H::hash_fields(&self.to_fields())
    }

    /// Leaf digest under Keccak256.
    pub fn digest(&self) -> Hash {
        self.digest_with::<Keccak256Hasher>()
    }
}

impl From<AssetState> for AssetRecord {
    fn from(state: AssetState) -> Self {
        match state {
            AssetState::Unlisted {
                owner,
                content_hash,
            } => Self::unlisted(owner, content_hash),
            AssetState::Listed {
                owner,
                content_hash,
                price,
            } => Self::listed(owner, content_hash, price),
        }
    }
}

impl AssetState {
    /// Current owner
    pub const fn owner(&self) -> PublicKey {
        match self {
            Self::Unlisted { owner, .. } | Self::Listed { owner, .. } => *owner,
        }
    }

    /// Content digest
    pub const fn content_hash(&self) -> Hash {
        match self {
            Self::Unlisted { content_hash, .. } | Self::Listed { content_hash, .. } => *content_hash,
        }
    }

    /// True for [`AssetState::Listed`].
    pub const fn is_listed(&self) -> bool {
        matches!(self, Self::Listed { .. })
    }
}
