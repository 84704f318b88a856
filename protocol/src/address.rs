//! # Addresses
//!
//! An [`Address`] is the opaque 20-byte reference the host hands out for
//! every identity and every deployed contract. Contracts never learn
//! anything about an address beyond equality and its byte form.
//!
//! [`Address::ZERO`] is the empty-reference sentinel: an unset or removed
//! registry slot reads as zero, and no deployment ever produces it.
//!
//! ```text
//! contract address = BLAKE3-derive-key(CONTRACT_ADDRESS_CONTEXT,
//!                                      deployer || nonce_be)[..20]
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::config::{ADDRESS_LENGTH, CONTRACT_ADDRESS_CONTEXT, LABEL_ADDRESS_CONTEXT};
use crate::crypto::hash::{domain_separated_hash, domain_separated_hash_multi};
use crate::error::HostError;

/// A 20-byte account or contract reference.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The empty-reference sentinel.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw byte view.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Returns `true` for the empty-reference sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Deterministic identity for a human label ("owner", "user1", ...).
    ///
    /// Used by tests and local tooling to name signers without key material.
    pub fn from_label(label: &str) -> Self {
        Self::truncate(domain_separated_hash(LABEL_ADDRESS_CONTEXT, label.as_bytes()))
    }

    /// Address of the contract `deployer` creates with its `nonce`-th
    /// deployment or transaction.
    pub fn derive_contract(deployer: &Address, nonce: u64) -> Self {
        Self::truncate(domain_separated_hash_multi(
            CONTRACT_ADDRESS_CONTEXT,
            &[deployer.as_bytes(), &nonce.to_be_bytes()],
        ))
    }

    /// Lowercase hex, `0x`-prefixed.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    fn truncate(digest: [u8; 32]) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest[..ADDRESS_LENGTH]);
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl FromStr for Address {
    type Err = HostError;

    /// Parses hex with or without the `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| HostError::InvalidAddressHex(e.to_string()))?;
        let bytes: [u8; ADDRESS_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| HostError::InvalidAddressLength {
                    expected: ADDRESS_LENGTH,
                    got: bytes.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
