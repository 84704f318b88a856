//! # Chain: In-Process Transaction Host
//!
//! Owns every deployed contract and runs each public operation as one
//! atomic transaction:
//!
//! 1. **Snapshot**: all contract state is cloned before the transaction.
//! 2. **Execute**: the caller's closure runs against a [`Transaction`]
//!    handle; events go to a per-transaction buffer.
//! 3. **Commit** on `Ok`: events are appended to the chain log, the
//!    sender's nonce is bumped and the transaction is sealed into a block.
//! 4. **Revert** on `Err`: the snapshot is restored. No events, no nonce
//!    bump, no block. The error is returned untouched.
//!
//! The host serializes transactions (`&mut self`), so no locking exists
//! anywhere below it.

use std::collections::{BTreeMap, HashMap};

use modular_protocol::config::{chain_name, CHAIN_ID_DEVNET};
use modular_protocol::crypto::blake3_hash_multi;
use modular_protocol::{Address, BlockEnv, CallContext, Event, LogEntry};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::plugin::{Plugin, PluginError, PluginSet};
use crate::registry::{Registry, RegistryError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// No contract of the expected kind is deployed at the address.
    #[error("no such contract: {0}")]
    UnknownContract(Address),

    /// The registry rejected the operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A directly called plugin failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// Outcome of a committed transaction.
#[derive(Debug, Clone)]
pub struct Receipt<T> {
    /// Value returned by the transaction body.
    pub output: T,
    /// Events emitted, in order.
    pub logs: Vec<LogEntry>,
    /// Block the transaction was sealed into.
    pub block: BlockEnv,
    /// BLAKE3 of `chain_id || sender || nonce`.
    pub tx_hash: [u8; 32],
}

impl<T> Receipt<T> {
    /// First event of type `E` in this receipt.
    pub fn event<E: Event + DeserializeOwned>(&self) -> Option<E> {
        self.logs.iter().find_map(|entry| entry.decode())
    }

    /// All events of type `E` in this receipt.
    pub fn events<E: Event + DeserializeOwned>(&self) -> Vec<E> {
        self.logs.iter().filter_map(|entry| entry.decode()).collect()
    }
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

/// Everything a transaction may mutate.
#[derive(Debug, Clone, Default)]
struct WorldState {
    registries: BTreeMap<Address, Registry>,
    plugins: PluginSet,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Handle for the operations of one in-flight transaction.
///
/// Several operations may be chained on one handle; they commit or revert
/// together.
pub struct Transaction<'c> {
    state: &'c mut WorldState,
    sender: Address,
    block: BlockEnv,
    logs: Vec<LogEntry>,
}

impl Transaction<'_> {
    /// Signer of this transaction.
    pub fn sender(&self) -> Address {
        self.sender
    }

    /// Block this transaction will be sealed into.
    pub fn block(&self) -> BlockEnv {
        self.block
    }

    /// Events emitted so far.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// [`Registry::add_module`] on the registry at `registry`.
    pub fn add_module(&mut self, registry: Address, module: Address) -> Result<u64, ChainError> {
        self.with_registry(registry, |reg, ctx| reg.add_module(ctx, module))
    }

    /// [`Registry::update_module`] on the registry at `registry`.
    pub fn update_module(
        &mut self,
        registry: Address,
        index: u64,
        module: Address,
    ) -> Result<(), ChainError> {
        self.with_registry(registry, |reg, ctx| reg.update_module(ctx, index, module))
    }

    /// [`Registry::remove_module`] on the registry at `registry`.
    pub fn remove_module(&mut self, registry: Address, index: u64) -> Result<(), ChainError> {
        self.with_registry(registry, |reg, ctx| reg.remove_module(ctx, index))
    }

    /// [`Registry::transfer_ownership`] on the registry at `registry`.
    pub fn transfer_ownership(
        &mut self,
        registry: Address,
        new_owner: Address,
    ) -> Result<(), ChainError> {
        self.with_registry(registry, |reg, ctx| reg.transfer_ownership(ctx, new_owner))
    }

    /// [`Registry::execute_module`] on the registry at `registry`.
    pub fn execute_module(
        &mut self,
        registry: Address,
        index: u64,
        input: u128,
    ) -> Result<u128, ChainError> {
        let WorldState {
            registries,
            plugins,
        } = &mut *self.state;
        let reg = registries
            .get(&registry)
            .ok_or(ChainError::UnknownContract(registry))?;
        let mut ctx = CallContext::new(registry, self.sender, self.block, &mut self.logs);
        Ok(reg.execute_module(&mut ctx, plugins, index, input)?)
    }

    /// Calls the plugin at `plugin` directly, bypassing any registry.
    pub fn perform_action(&mut self, plugin: Address, input: u128) -> Result<u128, ChainError> {
        let target = self
            .state
            .plugins
            .get_mut(&plugin)
            .ok_or(ChainError::UnknownContract(plugin))?;
        let mut ctx = CallContext::new(plugin, self.sender, self.block, &mut self.logs);
        Ok(target.perform_action(&mut ctx, input)?)
    }

    fn with_registry<T>(
        &mut self,
        registry: Address,
        op: impl FnOnce(&mut Registry, &mut CallContext<'_>) -> Result<T, RegistryError>,
    ) -> Result<T, ChainError> {
        let reg = self
            .state
            .registries
            .get_mut(&registry)
            .ok_or(ChainError::UnknownContract(registry))?;
        let mut ctx = CallContext::new(registry, self.sender, self.block, &mut self.logs);
        Ok(op(reg, &mut ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// The host: deployed contracts, account nonces, sealed blocks and the
/// permanent event log.
#[derive(Debug)]
pub struct Chain {
    chain_id: u64,
    block: BlockEnv,
    state: WorldState,
    nonces: HashMap<Address, u64>,
    logs: Vec<LogEntry>,
}

impl Chain {
    /// A devnet chain at genesis.
    pub fn new() -> Self {
        Self::with_genesis(CHAIN_ID_DEVNET, BlockEnv::genesis())
    }

    /// A chain with an explicit id and genesis block.
    pub fn with_genesis(chain_id: u64, genesis: BlockEnv) -> Self {
        info!(chain = %chain_name(chain_id), height = genesis.number, "chain created");
        Self {
            chain_id,
            block: genesis,
            state: WorldState::default(),
            nonces: HashMap::new(),
            logs: Vec::new(),
        }
    }

    /// Deploys an empty registry owned by `deployer`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::Registry`] if the registry fails to
    /// initialize. Nothing is deployed and no nonce is consumed.
    pub fn deploy_registry(&mut self, deployer: Address) -> Result<Address, ChainError> {
        let address = self.next_contract_address(&deployer);
        let block = self.block.next();
        let mut logs = Vec::new();
        let registry = {
            let mut ctx = CallContext::new(address, deployer, block, &mut logs);
            Registry::new(&mut ctx)?
        };
        self.state.registries.insert(address, registry);
        self.commit(deployer, block, &logs);
        Ok(address)
    }

    /// Deploys `plugin` on behalf of `deployer`.
    pub fn deploy_plugin<P: Plugin + 'static>(&mut self, deployer: Address, plugin: P) -> Address {
        let address = self.next_contract_address(&deployer);
        let block = self.block.next();
        info!(plugin = plugin.name(), address = %address, "plugin deployed");
        self.state.plugins.insert(address, Box::new(plugin));
        self.commit(deployer, block, &[]);
        address
    }

    /// Runs `body` as one atomic transaction signed by `sender`.
    ///
    /// # Errors
    ///
    /// Whatever `body` returns; all of its effects are discarded first.
    pub fn transact<T, F>(&mut self, sender: Address, body: F) -> Result<Receipt<T>, ChainError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, ChainError>,
    {
        let snapshot = self.state.clone();
        let block = self.block.next();
        let mut tx = Transaction {
            state: &mut self.state,
            sender,
            block,
            logs: Vec::new(),
        };

        match body(&mut tx) {
            Ok(output) => {
                let logs = tx.logs;
                let tx_hash = self.commit(sender, block, &logs);
                Ok(Receipt {
                    output,
                    logs,
                    block,
                    tx_hash,
                })
            }
            Err(err) => {
                self.state = snapshot;
                warn!(sender = %sender, error = %err, "transaction reverted");
                Err(err)
            }
        }
    }

    /// Appends `module` to `registry`.
    pub fn add_module(
        &mut self,
        sender: Address,
        registry: Address,
        module: Address,
    ) -> Result<Receipt<u64>, ChainError> {
        self.transact(sender, |tx| tx.add_module(registry, module))
    }

    /// Repoints slot `index` of `registry`.
    pub fn update_module(
        &mut self,
        sender: Address,
        registry: Address,
        index: u64,
        module: Address,
    ) -> Result<Receipt<()>, ChainError> {
        self.transact(sender, |tx| tx.update_module(registry, index, module))
    }

    /// Tombstones slot `index` of `registry`.
    pub fn remove_module(
        &mut self,
        sender: Address,
        registry: Address,
        index: u64,
    ) -> Result<Receipt<()>, ChainError> {
        self.transact(sender, |tx| tx.remove_module(registry, index))
    }

    /// Hands `registry` to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        sender: Address,
        registry: Address,
        new_owner: Address,
    ) -> Result<Receipt<()>, ChainError> {
        self.transact(sender, |tx| tx.transfer_ownership(registry, new_owner))
    }

    /// Dispatches `input` through slot `index` of `registry`.
    pub fn execute_module(
        &mut self,
        sender: Address,
        registry: Address,
        index: u64,
        input: u128,
    ) -> Result<Receipt<u128>, ChainError> {
        self.transact(sender, |tx| tx.execute_module(registry, index, input))
    }

    /// Calls `plugin` directly.
    pub fn perform_action(
        &mut self,
        sender: Address,
        plugin: Address,
        input: u128,
    ) -> Result<Receipt<u128>, ChainError> {
        self.transact(sender, |tx| tx.perform_action(plugin, input))
    }

    /// The registry deployed at `address`.
    pub fn registry(&self, address: &Address) -> Option<&Registry> {
        self.state.registries.get(address)
    }

    /// The plugin deployed at `address`, if it is a `P`.
    pub fn plugin<P: Plugin + 'static>(&self, address: &Address) -> Option<&P> {
        self.state.plugins.get(address)?.as_any().downcast_ref::<P>()
    }

    /// Every event committed so far.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Latest sealed block.
    pub fn block(&self) -> BlockEnv {
        self.block
    }

    /// Chain identifier.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Committed transactions and deployments sent by `account`.
    pub fn nonce(&self, account: &Address) -> u64 {
        self.nonces.get(account).copied().unwrap_or(0)
    }

    fn next_contract_address(&self, deployer: &Address) -> Address {
        Address::derive_contract(deployer, self.nonce(deployer))
    }

    fn commit(&mut self, sender: Address, block: BlockEnv, logs: &[LogEntry]) -> [u8; 32] {
        let nonce = self.nonces.entry(sender).or_insert(0);
        let tx_hash = blake3_hash_multi(&[
            &self.chain_id.to_be_bytes(),
            sender.as_bytes(),
            &nonce.to_be_bytes(),
        ]);
        *nonce += 1;
        self.block = block;
        self.logs.extend_from_slice(logs);
        debug!(
            sender = %sender,
            height = block.number,
            events = logs.len(),
            tx = %hex_prefix(&tx_hash),
            "transaction committed"
        );
        tx_hash
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// Short hash form for log lines.
fn hex_prefix(hash: &[u8; 32]) -> String {
    hex::encode(&hash[..4])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo_doubler::EchoDoubler;
    use crate::registry::ModuleExecuted;
    use crate::vault_factory::VaultFactory;

    fn chain() -> Chain {
        Chain::with_genesis(CHAIN_ID_DEVNET, BlockEnv::at(0, 1_700_000_000))
    }

    #[test]
    fn deployments_get_distinct_addresses_and_bump_nonce() {
        let mut chain = chain();
        let owner = Address::from_label("owner");

        let core = chain.deploy_registry(owner).unwrap();
        let echo = chain.deploy_plugin(owner, EchoDoubler::new());
        let vault = chain.deploy_plugin(owner, VaultFactory::new());

        assert_ne!(core, echo);
        assert_ne!(echo, vault);
        assert_eq!(chain.nonce(&owner), 3);
        assert_eq!(chain.block().number, 3);
        assert_eq!(chain.registry(&core).unwrap().owner(), owner);
        assert!(chain.plugin::<EchoDoubler>(&echo).is_some());
        assert!(chain.plugin::<VaultFactory>(&echo).is_none());
        assert!(chain.plugin::<VaultFactory>(&core).is_none());
    }

    #[test]
    fn committed_transaction_seals_a_block() {
        let mut chain = chain();
        let owner = Address::from_label("owner");
        let core = chain.deploy_registry(owner).unwrap();
        let echo = chain.deploy_plugin(owner, EchoDoubler::new());
        let before = chain.block();

        let receipt = chain.add_module(owner, core, echo).unwrap();

        assert_eq!(receipt.output, 0);
        assert_eq!(receipt.block, before.next());
        assert_eq!(chain.block(), before.next());
        assert_eq!(chain.nonce(&owner), 3);
    }

    #[test]
    fn failed_transaction_changes_nothing() {
        let mut chain = chain();
        let owner = Address::from_label("owner");
        let core = chain.deploy_registry(owner).unwrap();
        let echo = chain.deploy_plugin(owner, EchoDoubler::new());
        let log_len = chain.logs().len();
        let block = chain.block();

        let err = chain
            .transact(owner, |tx| {
                tx.add_module(core, echo)?;
                tx.execute_module(core, 0, 4)?;
                tx.execute_module(core, 1, 4)
            })
            .unwrap_err();

        assert_eq!(
            err,
            ChainError::Registry(RegistryError::SlotOutOfRange { index: 1, count: 1 })
        );
        assert_eq!(chain.registry(&core).unwrap().get_module_count(), 0);
        assert_eq!(chain.logs().len(), log_len);
        assert_eq!(chain.block(), block);
        assert_eq!(chain.nonce(&owner), 2);
    }

    #[test]
    fn unknown_contract_is_reported() {
        let mut chain = chain();
        let nowhere = Address::from_label("nowhere");
        let sender = Address::from_label("user1");

        assert_eq!(
            chain.execute_module(sender, nowhere, 0, 1).unwrap_err(),
            ChainError::UnknownContract(nowhere)
        );
        assert_eq!(
            chain.perform_action(sender, nowhere, 1).unwrap_err(),
            ChainError::UnknownContract(nowhere)
        );
    }

    #[test]
    fn receipt_exposes_typed_events() {
        let mut chain = chain();
        let owner = Address::from_label("owner");
        let core = chain.deploy_registry(owner).unwrap();
        let echo = chain.deploy_plugin(owner, EchoDoubler::new());
        chain.add_module(owner, core, echo).unwrap();

        let receipt = chain.execute_module(owner, core, 0, 7).unwrap();

        assert_eq!(receipt.output, 14);
        assert_eq!(
            receipt.event::<ModuleExecuted>(),
            Some(ModuleExecuted {
                index: 0,
                input: 7,
                result: 14
            })
        );
        assert_eq!(receipt.events::<ModuleExecuted>().len(), 1);
        assert_eq!(chain.logs().last(), receipt.logs.last());
    }

    #[test]
    fn hex_prefix_shows_first_four_bytes() {
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&[0xde, 0xad, 0x0b, 0x01]);
        hash[4] = 0xff;
        assert_eq!(hex_prefix(&hash), "dead0b01");
    }

    #[test]
    fn tx_hashes_differ_per_nonce() {
        let mut chain = chain();
        let owner = Address::from_label("owner");
        let echo = chain.deploy_plugin(owner, EchoDoubler::new());

        let a = chain.perform_action(owner, echo, 1).unwrap();
        let b = chain.perform_action(owner, echo, 1).unwrap();

        assert_ne!(a.tx_hash, b.tx_hash);
    }
}
