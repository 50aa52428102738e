//! Shared fixtures for rule layer tests.
//!
//! Besides the built-in handlers, the fixture registers test actions:
//! - `log`: appends a tag to a list property on the actionable node and
//!   optionally queues another rule (by id) for the same nodes
//! - `fail`: sets a property on the actioned-upon node, then fails
//! - `copy-and-fail`: copies the actioned-upon node into the actionable
//!   node, delivers the copy's events, then fails
//!
//! It also declares a `manual` rule type with no adapter, for rules that
//! are only ever queued explicitly.

#![allow(dead_code)]

use std::sync::Arc;

use ferrule_foundation::{Error, NodeRef, QName, Result, StoreRef, Value};
use ferrule_repository::Repository;
use ferrule_repository::model::{ASSOC_CONTAINS, TYPE_CONTENT, TYPE_FOLDER};
use ferrule_rules::builtin::{actions, conditions};
use ferrule_rules::directory::builtin_config;
use ferrule_rules::{
    ActionDefinition, ActionExecutor, EngineConfig, HandlerRegistry, MemoryRuleStore,
    ParameterDefinition, ParameterKind, ParameterValues, Rule, RuleAction, RuleDirectory,
    RuleService, RuleType, ServiceRegistry, Transaction,
};

pub const MARKER: QName = QName::from_static("urn:test", "marker");
pub const LOG: QName = QName::from_static("urn:test", "log");
pub const TOUCHED: QName = QName::from_static("urn:test", "touched");

pub struct Fixture {
    pub service: RuleService,
    pub repository: Repository,
    pub store: StoreRef,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut config_entries = builtin_config();
        config_entries.rule_types.push(RuleType::new("manual", "Manual"));
        config_entries.actions.push(
            ActionDefinition::new("log", "log")
                .with_parameter(ParameterDefinition::mandatory("tag", ParameterKind::Text))
                .with_parameter(ParameterDefinition::optional("next", ParameterKind::Text)),
        );
        config_entries.actions.push(ActionDefinition::new("fail", "fail"));
        config_entries
            .actions
            .push(ActionDefinition::new("copy-and-fail", "copy-and-fail"));
        let directory = RuleDirectory::from_config(config_entries).unwrap();

        let mut handlers = HandlerRegistry::builtin();
        handlers.register_executor("log", log_factory);
        handlers.register_executor("fail", fail_factory);
        handlers.register_executor("copy-and-fail", copy_and_fail_factory);

        let service = RuleService::new(
            Arc::new(directory),
            Arc::new(MemoryRuleStore::new()),
            handlers,
            config,
        )
        .unwrap();
        let (repository, store) = Repository::with_store("workspace", "SpacesStore").unwrap();
        Self {
            service,
            repository,
            store,
        }
    }

    pub fn begin(&self) -> Transaction<'_> {
        self.service.begin(&self.repository)
    }

    pub fn root(&self) -> NodeRef {
        self.repository.snapshot().root_node(&self.store).unwrap()
    }

    /// Creates and commits an actionable folder under the store root.
    pub fn actionable_folder(&self, name: &str) -> NodeRef {
        let mut tx = self.begin();
        let folder = folder(&mut tx, &self.root(), name);
        self.service.make_actionable(&mut tx, &folder).unwrap();
        tx.commit().unwrap();
        folder
    }

    /// Builds a rule of the named type with one condition and one action.
    pub fn rule(
        &self,
        rule_type: &str,
        condition: (&str, ParameterValues),
        action: (&str, ParameterValues),
    ) -> Rule {
        let service = &self.service;
        let mut rule = service.create_rule(&service.rule_type(rule_type).unwrap());
        rule.add_condition(service.condition_definition(condition.0).unwrap(), condition.1);
        rule.add_action(service.action_definition(action.0).unwrap(), action.1);
        rule
    }

    /// Rule of the given type: always true, add the marker aspect.
    pub fn marking_rule(&self, rule_type: &str) -> Rule {
        self.rule(
            rule_type,
            (conditions::NO_CONDITION, ParameterValues::new()),
            (
                actions::ADD_FEATURES,
                ParameterValues::new().with(actions::PARAM_ASPECT_NAME, MARKER),
            ),
        )
    }

    /// Manual rule whose action logs `tag` on the actionable node.
    pub fn logging_rule(&self, tag: &str) -> Rule {
        self.rule(
            "manual",
            (conditions::NO_CONDITION, ParameterValues::new()),
            ("log", ParameterValues::new().with("tag", tag)),
        )
    }

    /// Points a logging rule at the rule to queue after it runs.
    pub fn then_queue(&self, rule: &mut Rule, tag: &str, next: &Rule) {
        rule.clear_actions();
        rule.add_action(
            self.service.action_definition("log").unwrap(),
            ParameterValues::new()
                .with("tag", tag)
                .with("next", next.id()),
        );
    }
}

pub fn folder(tx: &mut Transaction<'_>, parent: &NodeRef, name: &str) -> NodeRef {
    tx.nodes_mut()
        .create_node(parent, ASSOC_CONTAINS, QName::new("", name), TYPE_FOLDER, [])
        .unwrap()
        .child
}

pub fn content(tx: &mut Transaction<'_>, parent: &NodeRef, name: &str) -> NodeRef {
    tx.nodes_mut()
        .create_node(parent, ASSOC_CONTAINS, QName::new("", name), TYPE_CONTENT, [])
        .unwrap()
        .child
}

/// Tags logged on a node, oldest first.
pub fn log_of(tx: &Transaction<'_>, node: &NodeRef) -> Vec<String> {
    match tx.nodes().property(node, &LOG).unwrap() {
        Some(Value::List(items)) => items.iter().filter_map(Value::to_text).collect(),
        _ => Vec::new(),
    }
}

// =============================================================================
// Test Actions
// =============================================================================

struct Log {
    tag: String,
    next: Option<String>,
}

impl ActionExecutor for Log {
    fn execute(&self, tx: &mut Transaction<'_>, actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()> {
        let mut items = match tx.nodes().property(actionable, &LOG)? {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        };
        items.push(Value::text(&self.tag));
        tx.nodes_mut().set_property(actionable, LOG, Value::List(items))?;

        if let Some(next) = &self.next {
            let service = tx.service();
            let rule = service
                .get_rule(tx, actionable, next)?
                .ok_or_else(|| Error::invalid_operation(format!("no rule {next}")))?;
            tx.add_rule_pending_execution(actionable, actioned_upon, &rule);
        }
        Ok(())
    }
}

fn log_factory(action: &RuleAction, _services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
    let params = &action.parameters;
    Ok(Box::new(Log {
        tag: params.optional_text("log", "tag")?.unwrap_or_default(),
        next: params.optional_text("log", "next")?,
    }))
}

struct Fail;

impl ActionExecutor for Fail {
    fn execute(&self, tx: &mut Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()> {
        tx.nodes_mut().set_property(actioned_upon, TOUCHED, true)?;
        Err(Error::invalid_operation("deliberate failure"))
    }
}

fn fail_factory(_action: &RuleAction, _services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
    Ok(Box::new(Fail))
}

struct CopyAndFail;

impl ActionExecutor for CopyAndFail {
    fn execute(&self, tx: &mut Transaction<'_>, actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()> {
        tx.nodes_mut()
            .copy_node(actioned_upon, actionable, ASSOC_CONTAINS, QName::new("", "copy"), false)?;
        tx.flush_events()?;
        Err(Error::invalid_operation("failed after copying"))
    }
}

fn copy_and_fail_factory(_action: &RuleAction, _services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
    Ok(Box::new(CopyAndFail))
}
