//! # Notifications
//!
//! Contracts report successful state changes by emitting events. Each
//! event is flattened into a [`LogEntry`]: the emitting address, the event
//! name, a 32-byte topic (SHA-256 of the canonical signature) and a JSON
//! payload. Indexers filter on the topic; tests decode the payload back
//! into the typed event with [`LogEntry::decode`].
//!
//! Logs are buffered per transaction and only become part of the chain's
//! permanent log when the transaction commits.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto::hash::sha256_array;
use crate::error::HostError;

/// A typed notification a contract can emit.
pub trait Event: Serialize {
    /// Short event name, e.g. `"ModuleExecuted"`.
    const NAME: &'static str;

    /// Canonical signature, e.g. `"ModuleExecuted(uint256,uint256,uint256)"`.
    const SIGNATURE: &'static str;

    /// Topic under which this event is indexed.
    fn topic() -> [u8; 32] {
        sha256_array(Self::SIGNATURE.as_bytes())
    }
}

/// One emitted event as recorded by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Contract that emitted the event.
    pub emitter: Address,
    /// Event name.
    pub name: String,
    /// SHA-256 of the event signature.
    pub topic: [u8; 32],
    /// Event payload.
    pub data: serde_json::Value,
}

impl LogEntry {
    /// Record `event` as emitted by `emitter`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::EventEncoding`] if the payload does not encode
    /// as JSON.
    pub fn new<E: Event>(emitter: Address, event: &E) -> Result<Self, HostError> {
        let data = serde_json::to_value(event).map_err(|e| HostError::EventEncoding {
            event: E::NAME,
            reason: e.to_string(),
        })?;
        Ok(Self {
            emitter,
            name: E::NAME.to_string(),
            topic: E::topic(),
            data,
        })
    }

    /// Returns `true` if this entry carries an `E`.
    pub fn is<E: Event>(&self) -> bool {
        self.topic == E::topic()
    }

    /// Decode the payload as `E`, or `None` if this entry is a different
    /// event or the payload does not match.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Option<E> {
        if !self.is::<E>() {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }
}

/// Serde adapter for 128-bit words in event payloads.
///
/// JSON numbers cannot carry the full `u128` range, so words travel as
/// decimal strings. Use with `#[serde(with = "modular_protocol::event::word")]`.
pub mod word {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
