//! # Echo Doubler
//!
//! Stateless reference plugin: returns twice its input. Exists so the
//! dispatch path can be exercised without any plugin-side state.

use std::any::Any;

use modular_protocol::CallContext;

use crate::plugin::{Plugin, PluginError};

/// Doubles its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoDoubler;

impl EchoDoubler {
    /// Creates the plugin. It carries no state.
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for EchoDoubler {
    fn name(&self) -> &'static str {
        "EchoDoubler"
    }

    /// `2 * input`. Only fails if the product does not fit in 128 bits.
    fn perform_action(
        &mut self,
        _ctx: &mut CallContext<'_>,
        input: u128,
    ) -> Result<u128, PluginError> {
        input
            .checked_mul(2)
            .ok_or(PluginError::Overflow("EchoDoubler"))
    }

    fn clone_box(&self) -> Box<dyn Plugin> {
        Box::new(*self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
