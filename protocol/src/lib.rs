//! # Modular Protocol: Host Environment
//!
//! The environment the registry and its plugins execute in. Contracts in
//! `modular-contracts` depend on this crate for everything that is not
//! their own state:
//!
//! - **address**: 20-byte references and the zero sentinel.
//! - **env**: the block being executed and the per-call context.
//! - **event**: typed notifications and the log entries they become.
//! - **crypto**: BLAKE3 and SHA-256 helpers.
//! - **config**: protocol constants.
//! - **logging**: `tracing` subscriber setup.
//!
//! The host guarantees a total order of transactions, so nothing in this
//! crate is synchronized. Atomicity is enforced one layer up, where each
//! transaction either commits all of its effects or none.

pub mod address;
pub mod config;
pub mod crypto;
pub mod env;
pub mod error;
pub mod event;
pub mod logging;

pub use address::Address;
pub use env::{BlockEnv, CallContext};
pub use error::HostError;
pub use event::{Event, LogEntry};
