//! # Execution Environment
//!
//! [`BlockEnv`] is the block a transaction executes in. [`CallContext`] is
//! what a contract sees while it runs: who called it, who signed the
//! transaction, which block it is in, and where to emit events.
//!
//! A contract-to-contract call opens a nested context with
//! [`CallContext::nested`]. The callee sees the calling contract as its
//! `caller`, while `origin` stays the transaction signer:
//!
//! ```text
//! signer --tx--> registry --nested--> plugin
//!   origin = signer everywhere
//!   caller(registry) = signer, caller(plugin) = registry
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::{BLOCK_TIME_SECS, MAX_CALL_DEPTH};
use crate::error::HostError;
use crate::event::{Event, LogEntry};

/// The block a transaction executes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnv {
    /// Block height.
    pub number: u64,
    /// Unix timestamp in seconds.
    pub timestamp: u64,
}

impl BlockEnv {
    /// Block 0, stamped with the current wall-clock time.
    pub fn genesis() -> Self {
        Self {
            number: 0,
            timestamp: Utc::now().timestamp().max(0) as u64,
        }
    }

    /// A block at an explicit height and time.
    pub fn at(number: u64, timestamp: u64) -> Self {
        Self { number, timestamp }
    }

    /// The block that follows this one. Height and time saturate at
    /// `u64::MAX`.
    pub fn next(&self) -> Self {
        Self {
            number: self.number.saturating_add(1),
            timestamp: self.timestamp.saturating_add(BLOCK_TIME_SECS),
        }
    }
}

/// Per-call view of the host handed to a running contract.
#[derive(Debug)]
pub struct CallContext<'a> {
    this: Address,
    caller: Address,
    origin: Address,
    block: BlockEnv,
    depth: usize,
    logs: &'a mut Vec<LogEntry>,
}

impl<'a> CallContext<'a> {
    /// Top-level context: `origin` calls `this` directly.
    pub fn new(
        this: Address,
        origin: Address,
        block: BlockEnv,
        logs: &'a mut Vec<LogEntry>,
    ) -> Self {
        Self {
            this,
            caller: origin,
            origin,
            block,
            depth: 0,
            logs,
        }
    }

    /// Address of the executing contract.
    pub fn this(&self) -> Address {
        self.this
    }

    /// Immediate sender of the current call.
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Signer of the enclosing transaction.
    pub fn origin(&self) -> Address {
        self.origin
    }

    /// Block the transaction executes in.
    pub fn block(&self) -> BlockEnv {
        self.block
    }

    /// Nesting depth; 0 for the top-level call.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Open a call from the executing contract into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::CallDepthExceeded`] past [`MAX_CALL_DEPTH`].
    pub fn nested(&mut self, target: Address) -> Result<CallContext<'_>, HostError> {
        if self.depth + 1 > MAX_CALL_DEPTH {
            return Err(HostError::CallDepthExceeded {
                limit: MAX_CALL_DEPTH,
            });
        }
        Ok(CallContext {
            this: target,
            caller: self.this,
            origin: self.origin,
            block: self.block,
            depth: self.depth + 1,
            logs: &mut *self.logs,
        })
    }

    /// Emit an event from the executing contract.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::EventEncoding`] if the payload does not encode;
    /// nothing is appended in that case.
    pub fn emit<E: Event>(&mut self, event: &E) -> Result<(), HostError> {
        self.logs.push(LogEntry::new(self.this, event)?);
        Ok(())
    }

    /// Events emitted so far in this transaction.
    pub fn logs(&self) -> &[LogEntry] {
        self.logs.as_slice()
    }
}
