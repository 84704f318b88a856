//! # Module Registry
//!
//! An owner-administered, index-addressed table of plugin addresses with a
//! single dispatch entry point:
//!
//! 1. **Add**: the owner appends a plugin address; it gets the next index.
//! 2. **Update**: the owner repoints an existing slot.
//! 3. **Remove**: the owner tombstones a slot by writing the zero address.
//!    The slot stays allocated and the count never shrinks, so every other
//!    index keeps pointing where it did.
//! 4. **Execute**: anyone dispatches `input` to the plugin in a slot and
//!    gets its result back.
//!
//! ## Re-entrancy
//!
//! [`Registry::execute_module`] borrows the registry immutably. Nothing is
//! written to registry state around the foreign call, so a plugin that
//! somehow reached back into the registry could not observe or leave a
//! half-finished update.

use modular_protocol::event::word;
use modular_protocol::{Address, CallContext, Event, HostError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::plugin::{PluginError, PluginSet};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The caller is not the registry owner.
    #[error("unauthorized account: {caller}")]
    NotAuthorized {
        /// The address that attempted the operation.
        caller: Address,
    },

    /// The zero address was supplied where a real reference is required.
    #[error("invalid reference: the zero address is not a module")]
    InvalidReference,

    /// The slot index is not below the current slot count.
    #[error("slot {index} out of range (count {count})")]
    SlotOutOfRange {
        /// Requested index.
        index: u64,
        /// Slot count at the time of the request.
        count: u64,
    },

    /// The slot exists but was removed.
    #[error("slot {index} is removed or not set")]
    SlotEmpty {
        /// Requested index.
        index: u64,
    },

    /// The slot points at an address that exposes no capability.
    #[error("no plugin deployed at {module}")]
    NoCapability {
        /// Address held by the slot.
        module: Address,
    },

    /// The dispatched plugin failed.
    #[error("module in slot {index} failed: {source}")]
    Module {
        /// Slot that was executed.
        index: u64,
        /// The plugin's error.
        #[source]
        source: PluginError,
    },

    /// The host refused a nested call or an event.
    #[error(transparent)]
    Host(#[from] HostError),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A plugin address was appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleAdded {
    pub index: u64,
    pub module: Address,
}

impl Event for ModuleAdded {
    const NAME: &'static str = "ModuleAdded";
    const SIGNATURE: &'static str = "ModuleAdded(uint256,address)";
}

/// A slot was repointed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUpdated {
    pub index: u64,
    pub previous: Address,
    pub module: Address,
}

impl Event for ModuleUpdated {
    const NAME: &'static str = "ModuleUpdated";
    const SIGNATURE: &'static str = "ModuleUpdated(uint256,address,address)";
}

/// A slot was tombstoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRemoved {
    pub index: u64,
    pub previous: Address,
}

impl Event for ModuleRemoved {
    const NAME: &'static str = "ModuleRemoved";
    const SIGNATURE: &'static str = "ModuleRemoved(uint256,address)";
}

/// A plugin ran through the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleExecuted {
    pub index: u64,
    #[serde(with = "word")]
    pub input: u128,
    #[serde(with = "word")]
    pub result: u128,
}

impl Event for ModuleExecuted {
    const NAME: &'static str = "ModuleExecuted";
    const SIGNATURE: &'static str = "ModuleExecuted(uint256,uint256,uint256)";
}

/// Registry ownership changed hands (also emitted at deployment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransferred {
    pub previous_owner: Address,
    pub new_owner: Address,
}

impl Event for OwnershipTransferred {
    const NAME: &'static str = "OwnershipTransferred";
    const SIGNATURE: &'static str = "OwnershipTransferred(address,address)";
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Slot table plus its administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    /// The only identity allowed to mutate slots.
    owner: Address,
    /// Slot `i` holds a plugin address or the zero tombstone.
    slots: Vec<Address>,
}

impl Registry {
    /// Deploys an empty registry owned by the deploying caller.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Host`] if the deployment event cannot be
    /// recorded.
    pub fn new(ctx: &mut CallContext<'_>) -> Result<Self, RegistryError> {
        let owner = ctx.caller();
        ctx.emit(&OwnershipTransferred {
            previous_owner: Address::ZERO,
            new_owner: owner,
        })?;
        info!(registry = %ctx.this(), owner = %owner, "registry deployed");
        Ok(Self {
            owner,
            slots: Vec::new(),
        })
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Hands administration to `new_owner`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAuthorized`] for non-owners and
    /// [`RegistryError::InvalidReference`] for the zero address.
    pub fn transfer_ownership(
        &mut self,
        ctx: &mut CallContext<'_>,
        new_owner: Address,
    ) -> Result<(), RegistryError> {
        self.only_owner(ctx)?;
        if new_owner.is_zero() {
            return Err(RegistryError::InvalidReference);
        }

        let previous_owner = self.owner;
        ctx.emit(&OwnershipTransferred {
            previous_owner,
            new_owner,
        })?;
        self.owner = new_owner;
        info!(registry = %ctx.this(), from = %previous_owner, to = %new_owner, "ownership transferred");
        Ok(())
    }

    /// Appends `module` and returns its slot index.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAuthorized`] for non-owners and
    /// [`RegistryError::InvalidReference`] for the zero address.
    pub fn add_module(
        &mut self,
        ctx: &mut CallContext<'_>,
        module: Address,
    ) -> Result<u64, RegistryError> {
        self.only_owner(ctx)?;
        if module.is_zero() {
            return Err(RegistryError::InvalidReference);
        }

        let index = self.get_module_count();
        ctx.emit(&ModuleAdded { index, module })?;
        self.slots.push(module);
        info!(registry = %ctx.this(), index, module = %module, "module added");
        Ok(index)
    }

    /// Repoints slot `index` at `module`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAuthorized`] for non-owners,
    /// [`RegistryError::SlotOutOfRange`] for an unallocated index and
    /// [`RegistryError::InvalidReference`] for the zero address.
    pub fn update_module(
        &mut self,
        ctx: &mut CallContext<'_>,
        index: u64,
        module: Address,
    ) -> Result<(), RegistryError> {
        self.only_owner(ctx)?;
        let position = self.position(index)?;
        if module.is_zero() {
            return Err(RegistryError::InvalidReference);
        }

        let previous = self.slots[position];
        ctx.emit(&ModuleUpdated {
            index,
            previous,
            module,
        })?;
        self.slots[position] = module;
        info!(registry = %ctx.this(), index, from = %previous, to = %module, "module updated");
        Ok(())
    }

    /// Tombstones slot `index`. The slot count is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAuthorized`] for non-owners and
    /// [`RegistryError::SlotOutOfRange`] for an unallocated index.
    pub fn remove_module(
        &mut self,
        ctx: &mut CallContext<'_>,
        index: u64,
    ) -> Result<(), RegistryError> {
        self.only_owner(ctx)?;
        let position = self.position(index)?;

        let previous = self.slots[position];
        ctx.emit(&ModuleRemoved { index, previous })?;
        self.slots[position] = Address::ZERO;
        info!(registry = %ctx.this(), index, module = %previous, "module removed");
        Ok(())
    }

    /// Address in slot `index`; the zero address if the slot was removed.
    pub fn get_module_address(&self, index: u64) -> Result<Address, RegistryError> {
        let position = self.position(index)?;
        Ok(self.slots[position])
    }

    /// Number of allocated slots. Never decreases.
    pub fn get_module_count(&self) -> u64 {
        self.slots.len() as u64
    }

    /// The live plugin address in slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SlotOutOfRange`] or
    /// [`RegistryError::SlotEmpty`].
    pub fn resolve(&self, index: u64) -> Result<Address, RegistryError> {
        let module = self.get_module_address(index)?;
        if module.is_zero() {
            return Err(RegistryError::SlotEmpty { index });
        }
        Ok(module)
    }

    /// Dispatches `input` to the plugin in slot `index` and returns its
    /// result. Open to any caller.
    ///
    /// The plugin runs in a nested context whose `caller` is this registry.
    /// On success a [`ModuleExecuted`] event is emitted after the plugin's
    /// own events.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SlotOutOfRange`], [`RegistryError::SlotEmpty`],
    /// [`RegistryError::NoCapability`] when the slot's address has no plugin,
    /// or [`RegistryError::Module`] wrapping the plugin's own failure.
    pub fn execute_module(
        &self,
        ctx: &mut CallContext<'_>,
        plugins: &mut PluginSet,
        index: u64,
        input: u128,
    ) -> Result<u128, RegistryError> {
        let module = self.resolve(index)?;
        let plugin = plugins
            .get_mut(&module)
            .ok_or(RegistryError::NoCapability { module })?;

        debug!(registry = %ctx.this(), index, module = %module, plugin = plugin.name(), "dispatching");

        let result = {
            let mut inner = ctx.nested(module)?;
            plugin
                .perform_action(&mut inner, input)
                .map_err(|source| RegistryError::Module { index, source })?
        };

        ctx.emit(&ModuleExecuted {
            index,
            input,
            result,
        })?;
        Ok(result)
    }

    fn only_owner(&self, ctx: &CallContext<'_>) -> Result<(), RegistryError> {
        if ctx.caller() != self.owner {
            return Err(RegistryError::NotAuthorized {
                caller: ctx.caller(),
            });
        }
        Ok(())
    }

    fn position(&self, index: u64) -> Result<usize, RegistryError> {
        let count = self.get_module_count();
        if index >= count {
            return Err(RegistryError::SlotOutOfRange { index, count });
        }
        // index < count <= usize::MAX, so the cast is lossless.
        Ok(index as usize)
    }
}
