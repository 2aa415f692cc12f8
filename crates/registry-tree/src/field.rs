//! Field element encoding
//!
//! A field element is a 32-byte big-endian word. Scalars are right-aligned so
//! `scalar(1)` is `0x00..01`.

use crate::Hash;

/// Embed an unsigned scalar into a field element.
pub fn scalar(value: u64) -> Hash {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Embed a flag as `0` or `1`.
pub fn flag(value: bool) -> Hash {
    scalar(u64::from(value))
}

/// Format a field element as `0x`-prefixed hex.
pub fn format_hash_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}
