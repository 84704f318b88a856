//! # Hashing Utilities
//!
//! Two hash functions, each with one job:
//!
//! - **BLAKE3** derives identifiers: contract addresses, label identities
//!   and vault ids. Identifier derivation always goes through a derive-key
//!   context so that an address preimage can never be replayed as a vault
//!   id preimage.
//!
//! - **SHA-256** hashes event signatures into log topics, so indexers can
//!   filter logs by a fixed 32-byte key.
//!
//! Multi-part variants stream each part into the hasher in order, so
//! `hash_multi(&[a, b])` equals `hash(a || b)` without building the
//! concatenation.

use sha2::{Digest, Sha256};

/// SHA-256 digest as a fixed-size array. Used for event topics.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Plain BLAKE3 digest.
///
/// # Example
///
/// ```
/// use modular_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"modular plugin");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 over `parts` in order.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    stream(blake3::Hasher::new(), parts)
}

/// BLAKE3 in derive-key mode under `context`.
///
/// Different contexts select different internal keys, so
/// `domain_separated_hash("a", x) != domain_separated_hash("b", x)`.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    domain_separated_hash_multi(context, &[data])
}

/// Derive-key BLAKE3 under `context` over `parts` in order.
pub fn domain_separated_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    stream(blake3::Hasher::new_derive_key(context), parts)
}

fn stream(mut hasher: blake3::Hasher, parts: &[&[u8]]) -> [u8; 32] {
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
