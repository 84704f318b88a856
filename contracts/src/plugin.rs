//! # Plugin Capability
//!
//! Every module the registry can dispatch to implements [`Plugin`]. The
//! trait is the entire coupling surface between the registry and foreign
//! code: one call shape, one integer in, one integer out. The registry
//! never inspects a plugin beyond that.
//!
//! Deployed plugins live in a [`PluginSet`], keyed by the address the host
//! assigned at deployment. The registry only ever holds those addresses;
//! removing or overwriting a slot leaves the plugin itself untouched.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use modular_protocol::{Address, CallContext, HostError};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a plugin can raise from [`Plugin::perform_action`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// A vault was requested with a zero deposit.
    #[error("initial deposit must be greater than 0")]
    InvalidDeposit,

    /// Checked arithmetic overflowed.
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// The host refused a nested call or an event.
    #[error(transparent)]
    Host(#[from] HostError),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// The single capability a module exposes to the registry.
pub trait Plugin: fmt::Debug + Send + Sync {
    /// Human-readable plugin kind, used in logs.
    fn name(&self) -> &'static str;

    /// Run the plugin's action. State changes made here are rolled back by
    /// the host if the enclosing transaction fails.
    fn perform_action(&mut self, ctx: &mut CallContext<'_>, input: u128)
        -> Result<u128, PluginError>;

    /// Clone into a fresh box. The host snapshots plugin state through
    /// this before every transaction.
    fn clone_box(&self) -> Box<dyn Plugin>;

    /// Typed read access for observers (`Chain::plugin::<T>()`).
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Plugin> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ---------------------------------------------------------------------------
// PluginSet
// ---------------------------------------------------------------------------

/// Deployed plugins keyed by address.
#[derive(Debug, Clone, Default)]
pub struct PluginSet {
    plugins: BTreeMap<Address, Box<dyn Plugin>>,
}

impl PluginSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `plugin` at `address`, replacing whatever was there.
    pub fn insert(&mut self, address: Address, plugin: Box<dyn Plugin>) {
        self.plugins.insert(address, plugin);
    }

    /// The plugin deployed at `address`, if any.
    pub fn get(&self, address: &Address) -> Option<&dyn Plugin> {
        self.plugins.get(address).map(|plugin| plugin.as_ref())
    }

    /// Mutable access for dispatch.
    pub fn get_mut(&mut self, address: &Address) -> Option<&mut Box<dyn Plugin>> {
        self.plugins.get_mut(address)
    }

    /// Returns `true` if a plugin is deployed at `address`.
    pub fn contains(&self, address: &Address) -> bool {
        self.plugins.contains_key(address)
    }

    /// Number of deployed plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` if nothing is deployed.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo_doubler::EchoDoubler;
    use modular_protocol::BlockEnv;

    #[test]
    fn boxed_plugins_clone_independently() {
        let original: Box<dyn Plugin> = Box::new(EchoDoubler::new());
        let copy = original.clone();
        assert_eq!(copy.name(), original.name());
    }

    #[test]
    fn set_tracks_deployments() {
        let address = Address::from_label("echo");
        let mut set = PluginSet::new();
        assert!(set.is_empty());

        set.insert(address, Box::new(EchoDoubler::new()));
        assert!(set.contains(&address));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&address).map(|p| p.name()), Some("EchoDoubler"));
        assert!(set.get(&Address::from_label("missing")).is_none());
    }

    #[test]
    fn dispatch_through_the_set() {
        let address = Address::from_label("echo");
        let caller = Address::from_label("caller");
        let mut set = PluginSet::new();
        set.insert(address, Box::new(EchoDoubler::new()));

        let mut logs = Vec::new();
        let mut ctx = CallContext::new(address, caller, BlockEnv::at(1, 1), &mut logs);
        let plugin = set.get_mut(&address).unwrap();
        assert_eq!(plugin.perform_action(&mut ctx, 21).unwrap(), 42);
    }
}
