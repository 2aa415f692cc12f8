//! Signature scheme seam and the Ed25519 implementation

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use registry_tree::field;

use crate::types::{Hash, Price, PublicKey, Signature};

/// Signature primitive over sequences of field elements.
pub trait SignatureScheme {
    /// Private signing key
    type SecretKey;

    /// Identity matching `secret`.
    fn public_key(secret: &Self::SecretKey) -> PublicKey;

    /// Sign a message of field elements.
    fn sign(secret: &Self::SecretKey, message: &[Hash]) -> Signature;

    /// Check `signature` over `message` for `public_key`. Malformed keys or
    /// signatures verify as `false`.
    fn verify(public_key: &PublicKey, message: &[Hash], signature: &Signature) -> bool;
}

/// Ed25519 over the concatenated 32-byte field elements
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Scheme;

impl SignatureScheme for Ed25519Scheme {
    type SecretKey = SigningKey;

    fn public_key(secret: &SigningKey) -> PublicKey {
        PublicKey(secret.verifying_key().to_bytes())
    }

    fn sign(secret: &SigningKey, message: &[Hash]) -> Signature {
        let signature = secret.sign(&message_bytes(message));
        Signature::from_bytes(&signature.to_bytes())
    }

    fn verify(public_key: &PublicKey, message: &[Hash], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&signature.to_bytes());
        key.verify_strict(&message_bytes(message), &signature).is_ok()
    }
}

/// Message an owner signs to mint or list `content_hash`.
pub fn ownership_message(content_hash: &Hash) -> [Hash; 1] {
    [*content_hash]
}

/// Message a buyer signs to purchase `content_hash` at `price`.
pub fn purchase_message(content_hash: &Hash, price: Price) -> [Hash; 2] {
    [*content_hash, field::scalar(price)]
}

fn message_bytes(message: &[Hash]) -> Vec<u8> {
    message.concat()
}
