//! Field hashers for the commitment tree

use sha2::{Digest as _, Sha256};
use tiny_keccak::{Hasher, Keccak};

use crate::Hash;

/// Hash primitive over sequences of 32-byte field elements.
///
/// The output layout is part of the commitment contract: two trees built with
/// different hashers never share roots.
pub trait FieldHasher {
    /// Hash a sequence of field elements, absorbed in order.
    fn hash_fields(inputs: &[Hash]) -> Hash;

    /// Hash two child nodes into their parent.
    fn hash_pair(left: &Hash, right: &Hash) -> Hash {
        Self::hash_fields(&[*left, *right])
    }
}

/// Keccak256 hasher
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Keccak256Hasher;

impl FieldHasher for Keccak256Hasher {
    fn hash_fields(inputs: &[Hash]) -> Hash {
        let mut hasher = Keccak::v256();
        for input in inputs {
            hasher.update(input);
        }
        let mut output = [0u8; 32];
        hasher.finalize(&mut output);
        output
    }
}

/// SHA-256 hasher
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sha256Hasher;

impl FieldHasher for Sha256Hasher {
    fn hash_fields(inputs: &[Hash]) -> Hash {
        let mut hasher = Sha256::new();
        for input in inputs {
            hasher.update(input);
        }
        hasher.finalize().into()
    }
}
