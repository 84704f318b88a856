//! # Protocol Configuration & Constants
//!
//! Every magic number the host and its contracts agree on lives here.
//! Contracts read these at compile time; the only runtime knob is the
//! `RUST_LOG` filter picked up by [`crate::logging`].

// ---------------------------------------------------------------------------
// Chain Identifiers
// ---------------------------------------------------------------------------

/// Local development chain. Matches the id auto-mining devnets use.
pub const CHAIN_ID_DEVNET: u64 = 1337;

/// Shared test network.
pub const CHAIN_ID_TESTNET: u64 = 0x4D50_5354; // "MPST"

// ---------------------------------------------------------------------------
// Execution Parameters
// ---------------------------------------------------------------------------

/// Seconds added to the block timestamp each time a transaction is sealed.
/// One transaction per block, one second per block.
pub const BLOCK_TIME_SECS: u64 = 1;

/// Maximum nesting of contract-to-contract calls within a transaction.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Vault Factory
// ---------------------------------------------------------------------------

/// Starting value of the vault counter. The first vault created moves it
/// to 2, so the counter runs one ahead of the number of vaults. Callers
/// depend on this exact sequence.
pub const INITIAL_VAULT_COUNTER: u128 = 1;

/// Name assigned to every vault at creation.
pub const DEFAULT_VAULT_NAME: &str = "DefaultVault";

// ---------------------------------------------------------------------------
// Hashing Domains
// ---------------------------------------------------------------------------

/// BLAKE3 derive-key context for contract addresses.
pub const CONTRACT_ADDRESS_CONTEXT: &str = "modular-plugin 2026 contract address";

/// BLAKE3 derive-key context for label-derived identities.
pub const LABEL_ADDRESS_CONTEXT: &str = "modular-plugin 2026 label address";

/// BLAKE3 derive-key context for vault identifiers.
pub const VAULT_ID_CONTEXT: &str = "modular-plugin 2026 vault id";

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns a friendly name for a chain id, mainly for logging.
pub fn chain_name(chain_id: u64) -> String {
    match chain_id {
        CHAIN_ID_DEVNET => "devnet".to_string(),
        CHAIN_ID_TESTNET => "testnet".to_string(),
        other => format!("unknown({})", other),
    }
}
