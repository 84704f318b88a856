//! # Modular Plugin System: Contracts
//!
//! A registry that dispatches to independently deployed plugins by slot
//! index, and the plugins it ships with:
//!
//! - **Registry**: owner-gated slot table (add / update / remove) with a
//!   public `execute_module` that forwards an integer to the plugin in a
//!   slot and relays its integer result.
//! - **Plugin**: the one-method capability every dispatch target
//!   implements.
//! - **EchoDoubler**: stateless plugin returning `2 * input`.
//! - **VaultFactory**: stateful plugin that opens a vault per deposit and
//!   returns a collision-free vault id.
//! - **Chain**: in-process host that deploys contracts and runs each
//!   operation as an all-or-nothing transaction.
//!
//! ## Design Principles
//!
//! 1. Arithmetic is checked; overflow is an error, never a wrap.
//! 2. Every check happens before the first write, and the host rolls back
//!    anything a failing transaction did anyway.
//! 3. The registry knows plugins only through [`plugin::Plugin`].
//! 4. Every event is serde-serializable for indexers and tests.

pub mod chain;
pub mod echo_doubler;
pub mod plugin;
pub mod registry;
pub mod vault_factory;

pub use chain::{Chain, ChainError, Receipt, Transaction};
pub use echo_doubler::EchoDoubler;
pub use plugin::{Plugin, PluginError, PluginSet};
pub use registry::{Registry, RegistryError};
pub use vault_factory::{VaultFactory, VaultId, VaultRecord};
