//! The rule service.
//!
//! [`RuleService`] is constructed once with its collaborators and is then
//! shared by every unit of work. Construction resolves the adapter of every
//! rule type and binds its behaviours; a rule type whose adapter cannot be
//! built stops the service from being created at all.

use std::fmt;
use std::sync::Arc;

use ferrule_foundation::{Error, ErrorKind, NodeRef, Result};
use ferrule_repository::model::{
    ASPECT_ACTIONABLE, ASSOC_CHILDREN, ASSOC_CONFIGURATIONS, ASSOC_CONTAINS, CHILD_CONFIGURATIONS,
    CHILD_SYSTEM_CONFIGURATION, TYPE_CONFIGURATIONS, TYPE_SYSTEM_FOLDER,
};
use ferrule_repository::{EventKind, NodeEvent, Repository};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::directory::RuleDirectory;
use crate::execution::DrainReport;
use crate::handler::{HandlerRegistry, RuleTypeAdapter, ServiceRegistry};
use crate::model::{ActionDefinition, ConditionDefinition, Rule, RuleType};
use crate::policy::PolicyComponent;
use crate::store::{MemoryRuleStore, RuleStore};
use crate::transaction::Transaction;

/// The rule engine.
pub struct RuleService {
    directory: Arc<RuleDirectory>,
    rule_store: Arc<dyn RuleStore>,
    handlers: HandlerRegistry,
    services: ServiceRegistry,
    policies: PolicyComponent,
    adapters: Vec<Arc<dyn RuleTypeAdapter>>,
    config: EngineConfig,
}

impl RuleService {
    /// Creates the service and binds the adapters of every rule type.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::AdapterInitialization`] if the adapter of any
    /// rule type cannot be resolved or constructed.
    pub fn new(
        directory: Arc<RuleDirectory>,
        rule_store: Arc<dyn RuleStore>,
        handlers: HandlerRegistry,
        config: EngineConfig,
    ) -> Result<Self> {
        let services = ServiceRegistry::new(Arc::clone(&directory), Arc::clone(&rule_store));
        let mut service = Self {
            directory,
            rule_store,
            handlers,
            services,
            policies: PolicyComponent::new(),
            adapters: Vec::new(),
            config,
        };
        service.initialize()?;
        Ok(service)
    }

    /// Creates a service with the built-in directory and handlers and an
    /// in-memory rule store.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in adapter fails to initialize.
    pub fn builtin(config: EngineConfig) -> Result<Self> {
        Self::new(
            Arc::new(RuleDirectory::builtin()),
            Arc::new(MemoryRuleStore::new()),
            HandlerRegistry::builtin(),
            config,
        )
    }

    fn initialize(&mut self) -> Result<()> {
        self.policies.bind_fn(EventKind::NodeCopied, copy_rules_with_node);

        for rule_type in self.directory.rule_types() {
            let adapter = self
                .handlers
                .adapter(&rule_type, &self.services)
                .map_err(|e| {
                    Error::new(ErrorKind::AdapterInitialization {
                        rule_type: rule_type.name.clone(),
                        reason: e.to_string(),
                    })
                })?;
            if let Some(adapter) = adapter {
                debug!(rule_type = %rule_type.name, "registering rule type adapter");
                Arc::clone(&adapter).register_policy_behaviour(&mut self.policies);
                self.adapters.push(adapter);
            }
        }

        info!(
            rule_types = self.directory.rule_types().len(),
            adapters = self.adapters.len(),
            "rule service initialized"
        );
        Ok(())
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
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

    /// Returns the handler registry.
    #[must_use]
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    /// Returns the collaborators handed to handler factories.
    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Returns the lifecycle behaviours.
    #[must_use]
    pub fn policies(&self) -> &PolicyComponent {
        &self.policies
    }

    /// Returns the lifecycle behaviours for binding more.
    pub fn policies_mut(&mut self) -> &mut PolicyComponent {
        &mut self.policies
    }

    /// Returns the initialized rule type adapters.
    #[must_use]
    pub fn adapters(&self) -> &[Arc<dyn RuleTypeAdapter>] {
        &self.adapters
    }

    // =========================================================================
    // Directory
    // =========================================================================

    /// Returns all rule types.
    #[must_use]
    pub fn rule_types(&self) -> Vec<Arc<RuleType>> {
        self.directory.rule_types()
    }

    /// Returns a rule type by name.
    #[must_use]
    pub fn rule_type(&self, name: &str) -> Option<Arc<RuleType>> {
        self.directory.rule_type(name)
    }

    /// Returns all condition definitions.
    #[must_use]
    pub fn condition_definitions(&self) -> Vec<Arc<ConditionDefinition>> {
        self.directory.condition_definitions()
    }

    /// Returns a condition definition by name.
    #[must_use]
    pub fn condition_definition(&self, name: &str) -> Option<Arc<ConditionDefinition>> {
        self.directory.condition_definition(name)
    }

    /// Returns all action definitions.
    #[must_use]
    pub fn action_definitions(&self) -> Vec<Arc<ActionDefinition>> {
        self.directory.action_definitions()
    }

    /// Returns an action definition by name.
    #[must_use]
    pub fn action_definition(&self, name: &str) -> Option<Arc<ActionDefinition>> {
        self.directory.action_definition(name)
    }

    // =========================================================================
    // Units of Work
    // =========================================================================

    /// Begins a unit of work against `repository`.
    #[must_use]
    pub fn begin<'a>(&'a self, repository: &'a Repository) -> Transaction<'a> {
        Transaction::new(self, repository)
    }

    // =========================================================================
    // Actionable Nodes
    // =========================================================================

    /// Makes a node able to carry rules and returns its configuration
    /// folder.
    ///
    /// Calling this on a node that already has a configuration folder
    /// returns the existing folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the node or its store root does not exist.
    pub fn make_actionable(&self, tx: &mut Transaction<'_>, node: &NodeRef) -> Result<NodeRef> {
        if let Some(folder) = self.configuration_folder(tx, node)? {
            return Ok(folder);
        }

        let nodes = tx.nodes_mut();
        let root = nodes.root_node(node.store())?;
        let existing = nodes
            .child_assocs(&root, Some(&CHILD_SYSTEM_CONFIGURATION))?
            .into_iter()
            .find(|assoc| assoc.assoc_type == ASSOC_CHILDREN);
        let system = match existing {
            Some(assoc) => assoc.child,
            None => {
                nodes
                    .create_node(&root, ASSOC_CHILDREN, CHILD_SYSTEM_CONFIGURATION, TYPE_SYSTEM_FOLDER, [])?
                    .child
            }
        };
        let folder = nodes
            .create_node(&system, ASSOC_CONTAINS, CHILD_CONFIGURATIONS, TYPE_CONFIGURATIONS, [])?
            .child;
        nodes.add_aspect(node, ASPECT_ACTIONABLE, [])?;
        nodes.create_association(node, &folder, ASSOC_CONFIGURATIONS)?;

        debug!(node = %node, folder = %folder, "made node actionable");
        Ok(folder)
    }

    /// Returns true if the node carries the actionable aspect.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn is_actionable(&self, tx: &Transaction<'_>, node: &NodeRef) -> Result<bool> {
        tx.nodes().has_aspect(node, &ASPECT_ACTIONABLE)
    }

    /// Returns the node's configuration folder, if it has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn configuration_folder(&self, tx: &Transaction<'_>, node: &NodeRef) -> Result<Option<NodeRef>> {
        Ok(tx
            .nodes()
            .target_assocs(node, Some(&ASSOC_CONFIGURATIONS))?
            .into_iter()
            .next()
            .map(|assoc| assoc.target))
    }

    // =========================================================================
    // Rules
    // =========================================================================

    /// Returns true if rules are attached directly to the node.
    #[must_use]
    pub fn has_rules(&self, node: &NodeRef) -> bool {
        self.rule_store.has_rules(node)
    }

    /// Returns the rules that apply to the node.
    ///
    /// # Errors
    ///
    /// Returns the rule store's error.
    pub fn get_rules(&self, tx: &Transaction<'_>, node: &NodeRef, include_inherited: bool) -> Result<Vec<Rule>> {
        self.rule_store.get(tx.nodes(), node, include_inherited)
    }

    /// Returns the rules of one type that apply to the node.
    ///
    /// # Errors
    ///
    /// Returns the rule store's error.
    pub fn get_rules_by_type(&self, tx: &Transaction<'_>, node: &NodeRef, rule_type: &RuleType) -> Result<Vec<Rule>> {
        self.rule_store.get_by_rule_type(tx.nodes(), node, rule_type)
    }

    /// Returns a rule that applies to the node by id.
    ///
    /// # Errors
    ///
    /// Returns the rule store's error.
    pub fn get_rule(&self, tx: &Transaction<'_>, node: &NodeRef, id: &str) -> Result<Option<Rule>> {
        self.rule_store.get_by_id(tx.nodes(), node, id)
    }

    /// Creates an enabled rule with a fresh id and no conditions or actions.
    ///
    /// The rule is not attached to any node until [`add_rule`](Self::add_rule).
    #[must_use]
    pub fn create_rule(&self, rule_type: &RuleType) -> Rule {
        Rule::new(&Uuid::new_v4().to_string(), rule_type)
    }

    /// Attaches a rule to a node, replacing any rule with the same id.
    ///
    /// # Errors
    ///
    /// Returns the rule store's error.
    pub fn add_rule(&self, node: &NodeRef, rule: Rule) -> Result<()> {
        debug!(node = %node, rule = rule.id(), "adding rule");
        self.rule_store.put(node, rule)
    }

    /// Detaches a rule from a node. Returns false if it was not attached.
    ///
    /// # Errors
    ///
    /// Returns the rule store's error.
    pub fn remove_rule(&self, node: &NodeRef, rule: &Rule) -> Result<bool> {
        debug!(node = %node, rule = rule.id(), "removing rule");
        self.rule_store.remove(node, rule)
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Queues a rule in the unit of work.
    ///
    /// See [`Transaction::add_rule_pending_execution`].
    pub fn add_rule_pending_execution(
        &self,
        tx: &mut Transaction<'_>,
        actionable: &NodeRef,
        actioned_upon: &NodeRef,
        rule: &Rule,
    ) -> bool {
        tx.add_rule_pending_execution(actionable, actioned_upon, rule)
    }

    /// Runs the unit of work's pending rules until none remain.
    ///
    /// # Errors
    ///
    /// See [`Transaction::execute_pending_rules`].
    pub fn execute_pending_rules(&self, tx: &mut Transaction<'_>) -> Result<DrainReport> {
        tx.execute_pending_rules()
    }

    /// Returns true if rules attached to the node may be triggered in the
    /// unit of work.
    #[must_use]
    pub fn rules_enabled(&self, tx: &Transaction<'_>, node: &NodeRef) -> bool {
        tx.rules_enabled(node)
    }

    /// Allows rules attached to the node to be triggered in the unit of work.
    pub fn enable_rules(&self, tx: &mut Transaction<'_>, node: &NodeRef) {
        tx.enable_rules(node);
    }

    /// Stops rules attached to the node from being triggered in the unit of
    /// work.
    pub fn disable_rules(&self, tx: &mut Transaction<'_>, node: &NodeRef) {
        tx.disable_rules(node);
    }
}

impl fmt::Debug for RuleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleService")
            .field("directory", &self.directory)
            .field("handlers", &self.handlers)
            .field("policies", &self.policies)
            .field("adapters", &self.adapters.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Gives the copy of a node with rules its own configuration, and its own
/// rules once the unit of work commits.
fn copy_rules_with_node(tx: &mut Transaction<'_>, event: &NodeEvent) -> Result<()> {
    let NodeEvent::NodeCopied { source, copy } = event else {
        return Ok(());
    };
    let service = tx.service();
    if !service.has_rules(source) || !tx.nodes().exists(&copy.child) {
        return Ok(());
    }
    service.make_actionable(tx, &copy.child)?;
    tx.copy_rules_on_commit(source, &copy.child);
    debug!(source = %source, copy = %copy.child, "rules will be copied at commit");
    Ok(())
}
