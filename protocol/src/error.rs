//! Error types for the host environment.
//!
//! Contract-level failures live next to the contracts that raise them.
//! [`HostError`] covers only what the host itself can reject: malformed
//! addresses and runaway call stacks.

use thiserror::Error;

/// Errors raised by the host environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// An address string was not valid hex.
    #[error("invalid address hex: {0}")]
    InvalidAddressHex(String),

    /// The decoded address has an unexpected length.
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidAddressLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        got: usize,
    },

    /// An event payload could not be encoded as JSON.
    #[error("cannot encode event {event}: {reason}")]
    EventEncoding {
        /// Name of the event.
        event: &'static str,
        /// Encoder message.
        reason: String,
    },

    /// A nested call would exceed the maximum call depth.
    #[error("call depth exceeded: limit is {limit}")]
    CallDepthExceeded {
        /// Configured depth limit.
        limit: usize,
    },
}
