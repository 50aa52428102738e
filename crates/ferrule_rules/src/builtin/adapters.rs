//! Built-in rule type adapters.
//!
//! Each adapter listens for the lifecycle events of its rule type and
//! queues the matching rules of the folder involved:
//!
//! | Rule type  | Events                                         | Folder         |
//! |------------|------------------------------------------------|----------------|
//! | `inbound`  | node created, node copied, node moved (into)   | new parent     |
//! | `outbound` | node moved (out of)                            | former parent  |
//! | `update`   | properties updated                             | primary parent |
//!
//! Only `contains` associations trigger rules, and configuration folders
//! never do. A move within the same folder triggers neither `inbound` nor
//! `outbound`.

use std::sync::Arc;

use ferrule_foundation::{NodeRef, Result};
use ferrule_repository::model::{ASSOC_CONTAINS, TYPE_CONFIGURATIONS, TYPE_SYSTEM_FOLDER};
use ferrule_repository::{ChildAssocRef, EventKind, NodeEvent};
use tracing::debug;

use crate::handler::{HandlerRegistry, RuleTypeAdapter, ServiceRegistry};
use crate::model::RuleType;
use crate::policy::PolicyComponent;
use crate::transaction::Transaction;

/// Adapter for rules run when items arrive in a folder.
pub const INBOUND: &str = "inbound";
/// Adapter for rules run when items leave a folder.
pub const OUTBOUND: &str = "outbound";
/// Adapter for rules run when items in a folder change.
pub const UPDATE: &str = "update";

pub(crate) fn register(registry: &mut HandlerRegistry) {
    registry.register_adapter(INBOUND, inbound);
    registry.register_adapter(OUTBOUND, outbound);
    registry.register_adapter(UPDATE, update);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Inbound,
    Outbound,
    Update,
}

impl Trigger {
    fn events(self) -> &'static [EventKind] {
        match self {
            Self::Inbound => &[EventKind::NodeCreated, EventKind::NodeCopied, EventKind::NodeMoved],
            Self::Outbound => &[EventKind::NodeMoved],
            Self::Update => &[EventKind::PropertiesUpdated],
        }
    }
}

/// Queues the rules of one rule type in response to lifecycle events.
struct LifecycleAdapter {
    rule_type: RuleType,
    trigger: Trigger,
}

impl LifecycleAdapter {
    /// The child association whose parent's rules should run, if any.
    fn triggered_by(&self, tx: &Transaction<'_>, event: &NodeEvent) -> Result<Option<ChildAssocRef>> {
        let assoc = match (self.trigger, event) {
            (Trigger::Inbound, NodeEvent::NodeCreated { assoc }) => assoc.clone(),
            (Trigger::Inbound, NodeEvent::NodeCopied { copy, .. }) => copy.clone(),
            (Trigger::Inbound, NodeEvent::NodeMoved { from, to }) if from.parent != to.parent => to.clone(),
            (Trigger::Outbound, NodeEvent::NodeMoved { from, to }) if from.parent != to.parent => from.clone(),
            (Trigger::Update, NodeEvent::PropertiesUpdated { node, .. }) => {
                if !tx.nodes().exists(node) || tx.is_new_node(node) {
                    return Ok(None);
                }
                match tx.nodes().primary_parent(node)? {
                    Some(assoc) => assoc,
                    None => return Ok(None),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(assoc))
    }

    fn on_event(&self, tx: &mut Transaction<'_>, event: &NodeEvent) -> Result<()> {
        let Some(assoc) = self.triggered_by(tx, event)? else {
            return Ok(());
        };
        if assoc.assoc_type != ASSOC_CONTAINS {
            return Ok(());
        }
        self.trigger_rules(tx, &assoc.parent, &assoc.child)
    }

    fn trigger_rules(&self, tx: &mut Transaction<'_>, folder: &NodeRef, child: &NodeRef) -> Result<()> {
        let nodes = tx.nodes();
        if !nodes.exists(folder) || !nodes.exists(child) {
            return Ok(());
        }
        let child_type = nodes.node_type(child)?;
        if child_type == TYPE_CONFIGURATIONS || child_type == TYPE_SYSTEM_FOLDER {
            return Ok(());
        }
        if !tx.rules_enabled(folder) {
            debug!(folder = %folder, rule_type = %self.rule_type.name, "rules disabled, not triggering");
            return Ok(());
        }

        let service = tx.service();
        let rules = service.get_rules_by_type(tx, folder, &self.rule_type)?;
        for rule in &rules {
            tx.add_rule_pending_execution(folder, child, rule);
        }
        Ok(())
    }
}

impl RuleTypeAdapter for LifecycleAdapter {
    fn rule_type(&self) -> &RuleType {
        &self.rule_type
    }

    fn register_policy_behaviour(self: Arc<Self>, policies: &mut PolicyComponent) {
        for &kind in self.trigger.events() {
            let adapter = Arc::clone(&self);
            policies.bind_fn(kind, move |tx, event| adapter.on_event(tx, event));
        }
    }
}

fn adapter(rule_type: &RuleType, trigger: Trigger) -> Arc<dyn RuleTypeAdapter> {
    Arc::new(LifecycleAdapter {
        rule_type: rule_type.clone(),
        trigger,
    })
}

fn inbound(rule_type: &RuleType, _services: &ServiceRegistry) -> Result<Arc<dyn RuleTypeAdapter>> {
    Ok(adapter(rule_type, Trigger::Inbound))
}

fn outbound(rule_type: &RuleType, _services: &ServiceRegistry) -> Result<Arc<dyn RuleTypeAdapter>> {
    Ok(adapter(rule_type, Trigger::Outbound))
}

fn update(rule_type: &RuleType, _services: &ServiceRegistry) -> Result<Arc<dyn RuleTypeAdapter>> {
    Ok(adapter(rule_type, Trigger::Update))
}
