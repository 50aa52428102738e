//! Condition evaluators, action executors and rule type adapters.
//!
//! Definitions name their handler as a string. The [`HandlerRegistry`] maps
//! those names to factories, so handlers are resolved by name at run time
//! while every implementation is registered up front.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ferrule_foundation::{Error, NodeRef, Result};

use crate::builtin;
use crate::directory::RuleDirectory;
use crate::model::{RuleAction, RuleCondition, RuleType};
use crate::policy::PolicyComponent;
use crate::store::RuleStore;
use crate::transaction::Transaction;

// =============================================================================
// Handler Traits
// =============================================================================

/// Decides whether a rule applies.
pub trait ConditionEvaluator: Send + Sync {
    /// Evaluates the condition for a pending entry.
    ///
    /// # Errors
    ///
    /// Returns an error if a node the condition reads cannot be resolved.
    fn evaluate(&self, tx: &Transaction<'_>, actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<bool>;
}

/// Performs a rule's effect.
pub trait ActionExecutor: Send + Sync {
    /// Executes the action for a pending entry.
    ///
    /// The action may change nodes and enqueue further pending rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the action cannot be applied.
    fn execute(&self, tx: &mut Transaction<'_>, actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()>;
}

/// Hooks a rule type into node lifecycle events.
pub trait RuleTypeAdapter: Send + Sync {
    /// The rule type this adapter triggers.
    fn rule_type(&self) -> &RuleType;

    /// Binds the behaviours that queue this type's rules.
    fn register_policy_behaviour(self: Arc<Self>, policies: &mut PolicyComponent);
}

// =============================================================================
// Service Registry
// =============================================================================

/// Collaborator handles given to handler factories.
#[derive(Clone)]
pub struct ServiceRegistry {
    directory: Arc<RuleDirectory>,
    rule_store: Arc<dyn RuleStore>,
}

impl ServiceRegistry {
    /// Creates a registry of collaborators.
    #[must_use]
    pub fn new(directory: Arc<RuleDirectory>, rule_store: Arc<dyn RuleStore>) -> Self {
        Self {
            directory,
            rule_store,
        }
    }

    /// Returns the rule directory.
    #[must_use]
    pub fn directory(&self) -> &Arc<RuleDirectory> {
        &self.directory
    }

    /// Returns the rule store.
    #[must_use]
    pub fn rule_store(&self) -> &Arc<dyn RuleStore> {
        &self.rule_store
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Handler Registry
// =============================================================================

/// Builds an evaluator for one rule condition.
pub type EvaluatorFactory =
    Arc<dyn Fn(&RuleCondition, &ServiceRegistry) -> Result<Box<dyn ConditionEvaluator>> + Send + Sync>;

/// Builds an executor for one rule action.
pub type ExecutorFactory =
    Arc<dyn Fn(&RuleAction, &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> + Send + Sync>;

/// Builds the adapter for a rule type.
pub type AdapterFactory =
    Arc<dyn Fn(&RuleType, &ServiceRegistry) -> Result<Arc<dyn RuleTypeAdapter>> + Send + Sync>;

/// Name to factory mapping for every handler kind.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    evaluators: HashMap<String, EvaluatorFactory>,
    executors: HashMap<String, ExecutorFactory>,
    adapters: HashMap<String, AdapterFactory>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in handlers.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        builtin::register(&mut registry);
        registry
    }

    /// Registers an evaluator factory, replacing any with the same name.
    pub fn register_evaluator<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&RuleCondition, &ServiceRegistry) -> Result<Box<dyn ConditionEvaluator>> + Send + Sync + 'static,
    {
        self.evaluators.insert(name.to_owned(), Arc::new(factory));
    }

    /// Registers an executor factory, replacing any with the same name.
    pub fn register_executor<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&RuleAction, &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> + Send + Sync + 'static,
    {
        self.executors.insert(name.to_owned(), Arc::new(factory));
    }

    /// Registers an adapter factory, replacing any with the same name.
    pub fn register_adapter<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&RuleType, &ServiceRegistry) -> Result<Arc<dyn RuleTypeAdapter>> + Send + Sync + 'static,
    {
        self.adapters.insert(name.to_owned(), Arc::new(factory));
    }

    /// Returns true if an evaluator is registered under `name`.
    #[must_use]
    pub fn has_evaluator(&self, name: &str) -> bool {
        self.evaluators.contains_key(name)
    }

    /// Returns true if an executor is registered under `name`.
    #[must_use]
    pub fn has_executor(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    /// Returns true if an adapter is registered under `name`.
    #[must_use]
    pub fn has_adapter(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Builds the evaluator for a condition.
    ///
    /// # Errors
    ///
    /// Returns an unknown definition error if no evaluator has the
    /// definition's evaluator name, or an invalid parameter error if the
    /// condition's parameters do not satisfy the definition.
    pub fn evaluator(&self, condition: &RuleCondition, services: &ServiceRegistry) -> Result<Box<dyn ConditionEvaluator>> {
        let definition = &condition.definition;
        let factory = self
            .evaluators
            .get(&definition.evaluator)
            .ok_or_else(|| Error::unknown_definition("evaluator", definition.evaluator.clone()))?;
        definition.validate(&condition.parameters)?;
        factory(condition, services)
    }

    /// Builds the executor for an action.
    ///
    /// # Errors
    ///
    /// Returns an unknown definition error if no executor has the
    /// definition's executor name, or an invalid parameter error if the
    /// action's parameters do not satisfy the definition.
    pub fn executor(&self, action: &RuleAction, services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
        let definition = &action.definition;
        let factory = self
            .executors
            .get(&definition.executor)
            .ok_or_else(|| Error::unknown_definition("executor", definition.executor.clone()))?;
        definition.validate(&action.parameters)?;
        factory(action, services)
    }

    /// Builds the adapter named by a rule type, if it names one.
    ///
    /// # Errors
    ///
    /// Returns an unknown definition error if no adapter is registered
    /// under the rule type's adapter name, or the factory's error.
    pub fn adapter(&self, rule_type: &RuleType, services: &ServiceRegistry) -> Result<Option<Arc<dyn RuleTypeAdapter>>> {
        let Some(name) = &rule_type.adapter else {
            return Ok(None);
        };
        let factory = self
            .adapters
            .get(name)
            .ok_or_else(|| Error::unknown_definition("adapter", name.clone()))?;
        factory(rule_type, services).map(Some)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut evaluators: Vec<_> = self.evaluators.keys().collect();
        let mut executors: Vec<_> = self.executors.keys().collect();
        let mut adapters: Vec<_> = self.adapters.keys().collect();
        evaluators.sort();
        executors.sort();
        adapters.sort();
        f.debug_struct("HandlerRegistry")
            .field("evaluators", &evaluators)
            .field("executors", &executors)
            .field("adapters", &adapters)
            .finish()
    }
}
