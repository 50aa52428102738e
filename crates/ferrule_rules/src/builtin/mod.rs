//! Built-in handlers.
//!
//! - [`conditions`] - evaluators for the built-in condition definitions
//! - [`actions`] - executors for the built-in action definitions
//! - [`adapters`] - lifecycle adapters for the built-in rule types

pub mod actions;
pub mod adapters;
pub mod conditions;

use crate::handler::HandlerRegistry;

/// Registers every built-in handler.
pub(crate) fn register(registry: &mut HandlerRegistry) {
    conditions::register(registry);
    actions::register(registry);
    adapters::register(registry);
}
