//! Transactional rule engine for Ferrule.
//!
//! This crate provides:
//! - Rule definitions ([`Rule`], [`RuleType`], condition and action definitions)
//! - The read-only [`RuleDirectory`] and the name-keyed [`HandlerRegistry`]
//! - Rule persistence ([`RuleStore`], [`MemoryRuleStore`])
//! - Units of work ([`Transaction`]) with a per-unit pending-rule queue
//! - The drain loop that runs pending rules to quiescence
//! - The [`RuleService`] façade
//!
//! # Execution model
//!
//! Node lifecycle events recorded in a unit of work are delivered to the
//! rule type adapters, which queue `(actionable, actioned upon, rule)`
//! entries. At commit the queue is drained: each entry's single condition is
//! evaluated and, if it holds, its single action is executed. Actions cause
//! new events, which may queue more entries for a later round. A rule never
//! re-queues itself while it is executing, and the drain fails with a limit
//! error if it does not settle within the configured ceilings.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builtin;
pub mod config;
pub mod directory;
pub mod execution;
pub mod handler;
pub mod model;
pub mod pending;
pub mod policy;
pub mod service;
pub mod store;
pub mod transaction;

pub use config::EngineConfig;
pub use directory::{DirectoryConfig, RuleDirectory};
pub use execution::{DrainReport, RuleFailure};
pub use handler::{
    ActionExecutor, ConditionEvaluator, HandlerRegistry, RuleTypeAdapter, ServiceRegistry,
};
pub use model::{
    ActionDefinition, ConditionDefinition, ParameterDefinition, ParameterKind, ParameterValues,
    Rule, RuleAction, RuleCondition, RuleType,
};
pub use pending::{PendingQueue, PendingRule};
pub use policy::{Behaviour, PolicyComponent};
pub use service::RuleService;
pub use store::{MemoryRuleStore, RuleStore};
pub use transaction::{CommitReceipt, Transaction};
