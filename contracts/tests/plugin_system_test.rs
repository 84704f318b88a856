//! Integration tests for the modular plugin system.
//!
//! Each test deploys a fresh chain with one registry and both plugins,
//! then drives it the way an external orchestrator would: one signed
//! transaction per operation, observing results through receipts, events
//! and public reads.

use modular_contracts::registry::{
    ModuleAdded, ModuleExecuted, ModuleRemoved, ModuleUpdated, OwnershipTransferred,
};
use modular_contracts::vault_factory::VaultCreated;
use modular_contracts::{
    Chain, ChainError, EchoDoubler, PluginError, RegistryError, VaultFactory,
};
use modular_protocol::logging::init_test_logging;
use modular_protocol::{Address, BlockEnv};

struct Fixture {
    chain: Chain,
    core: Address,
    echo: Address,
    vault: Address,
    owner: Address,
    user1: Address,
    user2: Address,
}

/// Helper: deploys the registry and both plugins from `owner`.
fn deploy() -> Fixture {
    init_test_logging();
    let owner = Address::from_label("owner");
    let mut chain = Chain::with_genesis(1337, BlockEnv::at(0, 1_700_000_000));
    let core = chain.deploy_registry(owner).unwrap();
    let echo = chain.deploy_plugin(owner, EchoDoubler::new());
    let vault = chain.deploy_plugin(owner, VaultFactory::new());
    Fixture {
        chain,
        core,
        echo,
        vault,
        owner,
        user1: Address::from_label("user1"),
        user2: Address::from_label("user2"),
    }
}

impl Fixture {
    fn module_address(&self, index: u64) -> Result<Address, RegistryError> {
        self.chain.registry(&self.core).unwrap().get_module_address(index)
    }

    fn module_count(&self) -> u64 {
        self.chain.registry(&self.core).unwrap().get_module_count()
    }

    fn factory(&self) -> &VaultFactory {
        self.chain.plugin::<VaultFactory>(&self.vault).unwrap()
    }
}

// ---------------------------------------------------------------------------
// Registry Management
// ---------------------------------------------------------------------------

#[test]
fn deployment_records_owner() {
    let f = deploy();
    let registry = f.chain.registry(&f.core).unwrap();
    assert_eq!(registry.owner(), f.owner);
    assert_eq!(registry.get_module_count(), 0);

    let transfer = f.chain.logs()[0].decode::<OwnershipTransferred>().unwrap();
    assert_eq!(transfer.new_owner, f.owner);
}

#[test]
fn adds_a_plugin() {
    let mut f = deploy();

    let receipt = f.chain.add_module(f.owner, f.core, f.echo).unwrap();

    assert_eq!(receipt.output, 0);
    assert_eq!(
        receipt.event::<ModuleAdded>(),
        Some(ModuleAdded {
            index: 0,
            module: f.echo
        })
    );
    assert_eq!(f.module_address(0).unwrap(), f.echo);
    assert_eq!(f.module_count(), 1);
}

#[test]
fn updates_a_plugin() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.echo).unwrap();

    let receipt = f.chain.update_module(f.owner, f.core, 0, f.vault).unwrap();

    assert_eq!(f.module_address(0).unwrap(), f.vault);
    assert_eq!(f.module_count(), 1);
    assert_eq!(
        receipt.event::<ModuleUpdated>(),
        Some(ModuleUpdated {
            index: 0,
            previous: f.echo,
            module: f.vault
        })
    );
}

#[test]
fn removes_a_plugin() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.echo).unwrap();
    assert_eq!(f.module_address(0).unwrap(), f.echo);

    let receipt = f.chain.remove_module(f.owner, f.core, 0).unwrap();

    assert_eq!(f.module_address(0).unwrap(), Address::ZERO);
    // The slot stays allocated.
    assert_eq!(f.module_count(), 1);
    assert_eq!(
        receipt.event::<ModuleRemoved>(),
        Some(ModuleRemoved {
            index: 0,
            previous: f.echo
        })
    );
}

#[test]
fn prevents_non_owners_from_managing_plugins() {
    let mut f = deploy();
    let log_len = f.chain.logs().len();
    let denied = ChainError::Registry(RegistryError::NotAuthorized { caller: f.user1 });

    assert_eq!(f.chain.add_module(f.user1, f.core, f.echo).unwrap_err(), denied);
    assert_eq!(
        f.chain.update_module(f.user1, f.core, 0, f.echo).unwrap_err(),
        denied
    );
    assert_eq!(f.chain.remove_module(f.user1, f.core, 0).unwrap_err(), denied);

    assert_eq!(f.module_count(), 0);
    assert_eq!(f.chain.logs().len(), log_len);
}

#[test]
fn prevents_adding_zero_address() {
    let mut f = deploy();
    assert_eq!(
        f.chain.add_module(f.owner, f.core, Address::ZERO).unwrap_err(),
        ChainError::Registry(RegistryError::InvalidReference)
    );
    assert_eq!(f.module_count(), 0);
}

#[test]
fn prevents_updating_to_zero_address() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.echo).unwrap();

    assert_eq!(
        f.chain
            .update_module(f.owner, f.core, 0, Address::ZERO)
            .unwrap_err(),
        ChainError::Registry(RegistryError::InvalidReference)
    );
    assert_eq!(f.module_address(0).unwrap(), f.echo);
}

#[test]
fn validates_slot_range() {
    let mut f = deploy();
    let out_of_range = RegistryError::SlotOutOfRange { index: 0, count: 0 };

    assert_eq!(
        f.chain.update_module(f.owner, f.core, 0, f.echo).unwrap_err(),
        ChainError::Registry(out_of_range.clone())
    );
    assert_eq!(
        f.chain.remove_module(f.owner, f.core, 0).unwrap_err(),
        ChainError::Registry(out_of_range.clone())
    );
    assert_eq!(f.module_address(0).unwrap_err(), out_of_range);
}

#[test]
fn ownership_transfer_moves_admin_rights() {
    let mut f = deploy();

    let receipt = f.chain.transfer_ownership(f.owner, f.core, f.user1).unwrap();

    assert_eq!(
        receipt.event::<OwnershipTransferred>(),
        Some(OwnershipTransferred {
            previous_owner: f.owner,
            new_owner: f.user1
        })
    );
    assert!(f.chain.add_module(f.owner, f.core, f.echo).is_err());
    assert_eq!(f.chain.add_module(f.user1, f.core, f.echo).unwrap().output, 0);
}

// ---------------------------------------------------------------------------
// Plugin Execution
// ---------------------------------------------------------------------------

#[test]
fn executes_echo_plugin() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.echo).unwrap();

    let receipt = f.chain.execute_module(f.owner, f.core, 0, 5).unwrap();

    assert_eq!(receipt.output, 10);
    assert_eq!(receipt.logs.len(), 1);
    assert_eq!(receipt.logs[0].emitter, f.core);
    assert_eq!(
        receipt.event::<ModuleExecuted>(),
        Some(ModuleExecuted {
            index: 0,
            input: 5,
            result: 10
        })
    );
}

#[test]
fn anyone_can_execute() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.echo).unwrap();

    assert_eq!(f.chain.execute_module(f.user2, f.core, 0, 21).unwrap().output, 42);
}

#[test]
fn fails_executing_non_existent_plugin() {
    let mut f = deploy();
    assert_eq!(
        f.chain.execute_module(f.owner, f.core, 0, 5).unwrap_err(),
        ChainError::Registry(RegistryError::SlotOutOfRange { index: 0, count: 0 })
    );
}

#[test]
fn fails_executing_removed_plugin() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.echo).unwrap();
    f.chain.remove_module(f.owner, f.core, 0).unwrap();

    assert_eq!(
        f.chain.execute_module(f.owner, f.core, 0, 5).unwrap_err(),
        ChainError::Registry(RegistryError::SlotEmpty { index: 0 })
    );
}

#[test]
fn fails_executing_address_without_capability() {
    let mut f = deploy();
    // The registry itself is a contract, but not a plugin.
    f.chain.add_module(f.owner, f.core, f.core).unwrap();

    assert_eq!(
        f.chain.execute_module(f.owner, f.core, 0, 5).unwrap_err(),
        ChainError::Registry(RegistryError::NoCapability { module: f.core })
    );
}

#[test]
fn echo_overflow_propagates_through_registry() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.echo).unwrap();

    assert_eq!(
        f.chain
            .execute_module(f.owner, f.core, 0, u128::MAX)
            .unwrap_err(),
        ChainError::Registry(RegistryError::Module {
            index: 0,
            source: PluginError::Overflow("EchoDoubler")
        })
    );
}

// ---------------------------------------------------------------------------
// Vault Plugin
// ---------------------------------------------------------------------------

#[test]
fn creates_a_vault_and_returns_a_unique_id() {
    let mut f = deploy();

    let receipt = f.chain.perform_action(f.owner, f.vault, 100).unwrap();
    let created: VaultCreated = receipt.event().unwrap();
    assert_eq!(created.vault_id, receipt.output);

    let vault = f.factory().vaults(created.vault_id);
    assert_eq!(vault.owner, f.owner);
    assert_eq!(vault.balance, 100);
    assert_eq!(vault.vault_name, "DefaultVault");
}

#[test]
fn creates_multiple_unique_vaults() {
    let mut f = deploy();
    let start = f.factory().vault_counter();

    let id1 = f.chain.perform_action(f.owner, f.vault, 100).unwrap().output;
    let id2 = f.chain.perform_action(f.owner, f.vault, 200).unwrap().output;

    assert_ne!(id1, id2);
    assert_eq!(f.factory().vaults(id1).balance, 100);
    assert_eq!(f.factory().vaults(id2).balance, 200);
    assert_eq!(f.factory().vault_counter(), start + 2);
}

#[test]
fn rejects_zero_deposit() {
    let mut f = deploy();
    let start = f.factory().vault_counter();

    assert_eq!(
        f.chain.perform_action(f.owner, f.vault, 0).unwrap_err(),
        ChainError::Plugin(PluginError::InvalidDeposit)
    );
    assert_eq!(f.factory().vault_counter(), start);
    assert_eq!(f.factory().vault_count(), 0);
}

#[test]
fn emits_vault_created_event() {
    let mut f = deploy();

    let receipt = f.chain.perform_action(f.owner, f.vault, 100).unwrap();

    let event: VaultCreated = receipt.event().unwrap();
    assert_eq!(receipt.logs[0].emitter, f.vault);
    assert_eq!(event.owner, f.owner);
    assert_eq!(event.balance, 100);
    assert_eq!(event.counter_snapshot, 2);
    assert_eq!(event.vault_name, "DefaultVault");
}

#[test]
fn unknown_vault_reads_as_zeroed() {
    let f = deploy();
    let vault = f.factory().vaults(42);
    assert!(vault.owner.is_zero());
    assert_eq!(vault.balance, 0);
    assert!(vault.vault_name.is_empty());
}

// ---------------------------------------------------------------------------
// Integration
// ---------------------------------------------------------------------------

#[test]
fn executes_vault_plugin_through_registry() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.vault).unwrap();

    let receipt = f.chain.execute_module(f.owner, f.core, 0, 150).unwrap();

    // Initial value is 1; one vault moves it to 2.
    assert_eq!(f.factory().vault_counter(), 2);

    // Plugin event first, registry event last.
    assert_eq!(receipt.logs.len(), 2);
    let created: VaultCreated = receipt.event().unwrap();
    let executed: ModuleExecuted = receipt.event().unwrap();
    assert_eq!(created.vault_id, receipt.output);
    assert_eq!(executed.result, receipt.output);
    assert_eq!(executed.input, 150);

    // The registry, not the signer, is the vault owner.
    let vault = f.factory().vaults(receipt.output);
    assert_eq!(vault.owner, f.core);
    assert_eq!(vault.balance, 150);
}

#[test]
fn failed_dispatch_leaves_vault_state_untouched() {
    let mut f = deploy();
    f.chain.add_module(f.owner, f.core, f.vault).unwrap();
    let log_len = f.chain.logs().len();

    let err = f.chain.execute_module(f.user1, f.core, 0, 0).unwrap_err();

    assert_eq!(
        err,
        ChainError::Registry(RegistryError::Module {
            index: 0,
            source: PluginError::InvalidDeposit
        })
    );
    assert_eq!(f.factory().vault_counter(), 1);
    assert_eq!(f.chain.logs().len(), log_len);
}

#[test]
fn bootstrap_sequence_registers_plugins_in_order() {
    let mut f = deploy();

    f.chain.add_module(f.owner, f.core, f.echo).unwrap();
    f.chain.add_module(f.owner, f.core, f.vault).unwrap();

    assert_eq!(f.module_address(0).unwrap(), f.echo);
    assert_eq!(f.module_address(1).unwrap(), f.vault);
    assert_eq!(f.module_count(), 2);
    assert_eq!(f.chain.execute_module(f.user1, f.core, 0, 8).unwrap().output, 16);
    let id = f.chain.execute_module(f.user1, f.core, 1, 9).unwrap().output;
    assert_eq!(f.factory().vaults(id).balance, 9);
}
