//! The pending-rule queue of a unit of work.
//!
//! Entries are `(actionable, actioned upon, rule)` triples kept in insertion
//! order with set semantics: enqueuing a triple that is already waiting is a
//! no-op.

use std::collections::HashSet;
use std::fmt;

use ferrule_foundation::NodeRef;

use crate::model::Rule;

/// A rule waiting to run against a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PendingRule {
    /// The node the rule is attached to.
    pub actionable: NodeRef,
    /// The node that triggered the rule.
    pub actioned_upon: NodeRef,
    /// The rule.
    pub rule: Rule,
}

impl PendingRule {
    /// Creates a pending entry.
    #[must_use]
    pub fn new(actionable: NodeRef, actioned_upon: NodeRef, rule: Rule) -> Self {
        Self {
            actionable,
            actioned_upon,
            rule,
        }
    }
}

impl fmt::Display for PendingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule {} on {} for {}",
            self.rule.id(),
            self.actionable,
            self.actioned_upon
        )
    }
}

/// Insertion-ordered set of pending entries.
#[derive(Clone, Debug, Default)]
pub struct PendingQueue {
    order: Vec<PendingRule>,
    seen: HashSet<PendingRule>,
}

impl PendingQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. Returns false if an equal entry is already queued.
    pub fn push(&mut self, entry: PendingRule) -> bool {
        if !self.seen.insert(entry.clone()) {
            return false;
        }
        self.order.push(entry);
        true
    }

    /// Returns true if an equal entry is queued.
    #[must_use]
    pub fn contains(&self, entry: &PendingRule) -> bool {
        self.seen.contains(entry)
    }

    /// Returns the number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingRule> {
        self.order.iter()
    }

    /// Takes every queued entry, leaving the queue empty.
    pub fn take(&mut self) -> Vec<PendingRule> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }

    /// Drops entries queued after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        for entry in self.order.drain(len.min(self.order.len())..) {
            self.seen.remove(&entry);
        }
    }
}
