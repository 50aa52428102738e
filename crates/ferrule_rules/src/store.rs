//! Rule persistence.
//!
//! The engine reads and writes rules through the [`RuleStore`] trait.
//! [`MemoryRuleStore`] keeps per-node rule lists in memory and resolves
//! inheritance by walking the node's primary parents.

use std::collections::HashMap;

use ferrule_foundation::{NodeRef, Result};
use ferrule_repository::NodeStore;
use parking_lot::RwLock;
use tracing::trace;

use crate::model::{Rule, RuleType};

/// Persistence adapter for rules attached to nodes.
///
/// Implementations must be read-after-write consistent: a `put` followed by
/// a `get` observes the put.
pub trait RuleStore: Send + Sync {
    /// Returns the rules that apply to `node`.
    ///
    /// With `include_inherited`, rules on ancestors that apply to children
    /// come first, root-most first, followed by the node's own rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the node's ancestors cannot be resolved.
    fn get(&self, nodes: &NodeStore, node: &NodeRef, include_inherited: bool) -> Result<Vec<Rule>>;

    /// Returns the rule with the given id among the rules that apply to `node`.
    ///
    /// # Errors
    ///
    /// Returns an error if the node's ancestors cannot be resolved.
    fn get_by_id(&self, nodes: &NodeStore, node: &NodeRef, id: &str) -> Result<Option<Rule>> {
        Ok(self
            .get(nodes, node, true)?
            .into_iter()
            .find(|rule| rule.id() == id))
    }

    /// Returns the rules of one type that apply to `node`, inherited included.
    ///
    /// # Errors
    ///
    /// Returns an error if the node's ancestors cannot be resolved.
    fn get_by_rule_type(&self, nodes: &NodeStore, node: &NodeRef, rule_type: &RuleType) -> Result<Vec<Rule>> {
        Ok(self
            .get(nodes, node, true)?
            .into_iter()
            .filter(|rule| rule.is_of_type(rule_type))
            .collect())
    }

    /// Returns true if rules are attached directly to `node`.
    fn has_rules(&self, node: &NodeRef) -> bool;

    /// Attaches a rule, replacing any rule with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule cannot be stored.
    fn put(&self, node: &NodeRef, rule: Rule) -> Result<()>;

    /// Detaches a rule. Returns false if it was not attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule cannot be removed.
    fn remove(&self, node: &NodeRef, rule: &Rule) -> Result<bool>;

    /// Attaches copies of the rules attached directly to `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule cannot be stored.
    fn copy_rules(&self, from: &NodeRef, to: &NodeRef) -> Result<()>;
}

/// In-memory rule store.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: RwLock<HashMap<NodeRef, Vec<Rule>>>,
}

impl MemoryRuleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn own(&self, node: &NodeRef) -> Vec<Rule> {
        self.rules.read().get(node).cloned().unwrap_or_default()
    }
}

impl RuleStore for MemoryRuleStore {
    fn get(&self, nodes: &NodeStore, node: &NodeRef, include_inherited: bool) -> Result<Vec<Rule>> {
        let mut out: Vec<Rule> = Vec::new();
        if include_inherited && nodes.exists(node) {
            let rules = self.rules.read();
            for ancestor in nodes.ancestors(node)?.iter().rev() {
                let inherited = rules.get(ancestor).into_iter().flatten();
                for rule in inherited.filter(|r| r.applies_to_children) {
                    if !out.contains(rule) {
                        out.push(rule.clone());
                    }
                }
            }
        }
        for rule in self.own(node) {
            if !out.contains(&rule) {
                out.push(rule);
            }
        }
        Ok(out)
    }

    fn has_rules(&self, node: &NodeRef) -> bool {
        self.rules.read().get(node).is_some_and(|list| !list.is_empty())
    }

    fn put(&self, node: &NodeRef, rule: Rule) -> Result<()> {
        trace!(node = %node, rule = rule.id(), "storing rule");
        let mut rules = self.rules.write();
        let list = rules.entry(node.clone()).or_default();
        match list.iter_mut().find(|r| **r == rule) {
            Some(existing) => *existing = rule,
            None => list.push(rule),
        }
        Ok(())
    }

    fn remove(&self, node: &NodeRef, rule: &Rule) -> Result<bool> {
        let mut rules = self.rules.write();
        let Some(list) = rules.get_mut(node) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|r| r != rule);
        let removed = list.len() != before;
        if list.is_empty() {
            rules.remove(node);
        }
        trace!(node = %node, rule = rule.id(), removed, "removed rule");
        Ok(removed)
    }

    fn copy_rules(&self, from: &NodeRef, to: &NodeRef) -> Result<()> {
        for rule in self.own(from) {
            self.put(to, rule)?;
        }
        Ok(())
    }
}
