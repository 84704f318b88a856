//! # Vault Factory
//!
//! Stateful plugin: every successful [`perform_action`](Plugin::perform_action)
//! opens a new vault holding the deposited amount and returns its id.
//!
//! ## Identifiers
//!
//! ```text
//! vault_id = u128_be( BLAKE3-derive-key(VAULT_ID_CONTEXT,
//!                        caller || counter || block.timestamp || block.number || salt)[..16] )
//! ```
//!
//! The counter strictly increases with every creation, so two creations
//! never share a preimage, even inside one transaction. `salt` is 0 unless
//! the derived id is already taken, in which case it is bumped until the
//! id is fresh. Ids are never reused.
//!
//! ## Counter
//!
//! `vault_counter` starts at [`INITIAL_VAULT_COUNTER`] (1) and is bumped
//! once per creation, so it always reads one more than the number of vaults.

use std::any::Any;
use std::collections::HashMap;

use modular_protocol::config::{DEFAULT_VAULT_NAME, INITIAL_VAULT_COUNTER, VAULT_ID_CONTEXT};
use modular_protocol::crypto::domain_separated_hash_multi;
use modular_protocol::event::word;
use modular_protocol::{Address, BlockEnv, CallContext, Event};
use serde::{Deserialize, Serialize};

use crate::plugin::{Plugin, PluginError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Identifier of a vault.
pub type VaultId = u128;

/// A stored vault. Reads of unknown ids return the all-zero default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// Vault identifier; 0 for an absent record.
    #[serde(with = "word")]
    pub id: VaultId,
    /// Immediate caller that created the vault.
    pub owner: Address,
    /// Deposit made at creation.
    #[serde(with = "word")]
    pub balance: u128,
    /// Display name.
    pub vault_name: String,
}

/// Emitted once per created vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCreated {
    #[serde(with = "word")]
    pub vault_id: VaultId,
    pub owner: Address,
    #[serde(with = "word")]
    pub balance: u128,
    /// Counter value after this creation.
    #[serde(with = "word")]
    pub counter_snapshot: u128,
    pub vault_name: String,
}

impl Event for VaultCreated {
    const NAME: &'static str = "VaultCreated";
    const SIGNATURE: &'static str = "VaultCreated(uint256,address,uint256,uint256,string)";
}

// ---------------------------------------------------------------------------
// VaultFactory
// ---------------------------------------------------------------------------

/// Creates vaults and remembers them.
#[derive(Debug, Clone)]
pub struct VaultFactory {
    vaults: HashMap<VaultId, VaultRecord>,
    vault_counter: u128,
}

impl VaultFactory {
    /// A factory with no vaults and the counter at its initial value.
    pub fn new() -> Self {
        Self {
            vaults: HashMap::new(),
            vault_counter: INITIAL_VAULT_COUNTER,
        }
    }

    /// Opens a vault for the immediate caller and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidDeposit`] for a zero deposit,
    /// [`PluginError::Overflow`] if the counter is exhausted and
    /// [`PluginError::Host`] if the event cannot be recorded. No error path
    /// touches state.
    pub fn create_vault(
        &mut self,
        ctx: &mut CallContext<'_>,
        deposit: u128,
    ) -> Result<VaultId, PluginError> {
        if deposit == 0 {
            return Err(PluginError::InvalidDeposit);
        }

        let next_counter = self
            .vault_counter
            .checked_add(1)
            .ok_or(PluginError::Overflow("vault counter"))?;

        let owner = ctx.caller();
        let block = ctx.block();
        let mut salt = 0u64;
        let mut vault_id = derive_vault_id(&owner, self.vault_counter, &block, salt);
        while vault_id == 0 || self.vaults.contains_key(&vault_id) {
            salt += 1;
            vault_id = derive_vault_id(&owner, self.vault_counter, &block, salt);
        }

        ctx.emit(&VaultCreated {
            vault_id,
            owner,
            balance: deposit,
            counter_snapshot: next_counter,
            vault_name: DEFAULT_VAULT_NAME.to_string(),
        })?;

        self.vaults.insert(
            vault_id,
            VaultRecord {
                id: vault_id,
                owner,
                balance: deposit,
                vault_name: DEFAULT_VAULT_NAME.to_string(),
            },
        );
        self.vault_counter = next_counter;

        tracing::debug!(
            vault_id = %vault_id,
            owner = %owner,
            balance = %deposit,
            counter = %next_counter,
            "vault created"
        );

        Ok(vault_id)
    }

    /// The vault stored under `id`, or the zeroed record if none was created.
    pub fn vaults(&self, id: VaultId) -> VaultRecord {
        self.vaults.get(&id).cloned().unwrap_or_default()
    }

    /// Current counter value (number of vaults + 1).
    pub fn vault_counter(&self) -> u128 {
        self.vault_counter
    }

    /// Number of stored vaults.
    pub fn vault_count(&self) -> usize {
        self.vaults.len()
    }
}

impl Default for VaultFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for VaultFactory {
    fn name(&self) -> &'static str {
        "VaultFactory"
    }

    /// Treats `input` as the deposit and returns the new vault id.
    fn perform_action(
        &mut self,
        ctx: &mut CallContext<'_>,
        input: u128,
    ) -> Result<u128, PluginError> {
        self.create_vault(ctx, input)
    }

    fn clone_box(&self) -> Box<dyn Plugin> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn derive_vault_id(owner: &Address, counter: u128, block: &BlockEnv, salt: u64) -> VaultId {
    let digest = domain_separated_hash_multi(
        VAULT_ID_CONTEXT,
        &[
            owner.as_bytes(),
            &counter.to_be_bytes(),
            &block.timestamp.to_be_bytes(),
            &block.number.to_be_bytes(),
            &salt.to_be_bytes(),
        ],
    );
    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(head)
}
