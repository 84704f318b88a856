//! # Hashing Primitives
//!
//! Thin wrappers around `blake3` and `sha2`. Nothing here is novel
//! cryptography; it only fixes which hash is used for what.

pub mod hash;

pub use hash::{
    blake3_hash, blake3_hash_multi, domain_separated_hash, domain_separated_hash_multi,
    sha256_array,
};
