//! Units of work.
//!
//! A [`Transaction`] owns everything that is private to one unit of work:
//! the working copy of the node store, the pending-rule queue, the
//! currently-executing rule and the rule enablement switches. Nothing in it
//! is shared, so units of work on different threads never observe each
//! other's state.
//!
//! Rules copied along with a node are recorded here and only written to the
//! shared rule store once the unit of work has committed.

use std::collections::HashSet;
use std::fmt;

use ferrule_foundation::{Error, ErrorKind, NodeRef, Result};
use ferrule_repository::{NodeEvent, NodeStore, Repository};
use tracing::{debug, info, warn};

use crate::execution::{self, DrainReport};
use crate::model::Rule;
use crate::pending::{PendingQueue, PendingRule};
use crate::service::RuleService;

/// Outcome of a successful commit.
#[derive(Debug)]
pub struct CommitReceipt {
    /// The repository version installed by the commit.
    pub version: u64,
    /// Report of the final drain.
    pub report: DrainReport,
}

/// A unit of work against a repository.
///
/// Dropping a transaction without committing discards its changes.
pub struct Transaction<'a> {
    service: &'a RuleService,
    repository: &'a Repository,
    pub(crate) nodes: NodeStore,
    base_version: u64,
    pub(crate) pending: PendingQueue,
    pub(crate) executing: Option<Rule>,
    pub(crate) failed_entries: usize,
    aborted: bool,
    new_nodes: HashSet<NodeRef>,
    new_node_order: Vec<NodeRef>,
    rule_copies: Vec<(NodeRef, NodeRef)>,
    disabled_nodes: HashSet<NodeRef>,
    rules_disabled: bool,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(service: &'a RuleService, repository: &'a Repository) -> Self {
        let checkout = repository.checkout();
        debug!(version = checkout.version, "began unit of work");
        Self {
            service,
            repository,
            nodes: checkout.store,
            base_version: checkout.version,
            pending: PendingQueue::new(),
            executing: None,
            failed_entries: 0,
            aborted: false,
            new_nodes: HashSet::new(),
            new_node_order: Vec::new(),
            rule_copies: Vec::new(),
            disabled_nodes: HashSet::new(),
            rules_disabled: false,
        }
    }

    /// Returns the rule service this unit of work belongs to.
    #[must_use]
    pub fn service(&self) -> &'a RuleService {
        self.service
    }

    /// Returns the working node store.
    #[must_use]
    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// Returns the working node store for mutation.
    ///
    /// Lifecycle events recorded by mutations are delivered on the next
    /// [`flush_events`](Self::flush_events), at the latest when pending
    /// rules are drained.
    pub fn nodes_mut(&mut self) -> &mut NodeStore {
        &mut self.nodes
    }

    /// Returns the repository version this unit of work is based on.
    #[must_use]
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Returns the pending-rule queue.
    #[must_use]
    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Returns the rule currently being executed, if any.
    #[must_use]
    pub fn executing_rule(&self) -> Option<&Rule> {
        self.executing.as_ref()
    }

    /// Returns true if `node` was created or copied in this unit of work.
    #[must_use]
    pub fn is_new_node(&self, node: &NodeRef) -> bool {
        self.new_nodes.contains(node)
    }

    // =========================================================================
    // Pending Rules
    // =========================================================================

    /// Queues a rule to run against `actioned_upon` when pending rules are
    /// drained.
    ///
    /// Returns false if the entry was not queued: either an equal entry is
    /// already waiting, or `rule` is the rule currently executing.
    pub fn add_rule_pending_execution(&mut self, actionable: &NodeRef, actioned_upon: &NodeRef, rule: &Rule) -> bool {
        if self.executing.as_ref() == Some(rule) {
            warn!(
                rule = rule.id(),
                actionable = %actionable,
                actioned_upon = %actioned_upon,
                "rule triggered itself, not queuing"
            );
            return false;
        }
        let queued = self.pending.push(PendingRule::new(
            actionable.clone(),
            actioned_upon.clone(),
            rule.clone(),
        ));
        debug!(
            rule = rule.id(),
            actionable = %actionable,
            actioned_upon = %actioned_upon,
            queued,
            "pending rule"
        );
        queued
    }

    /// Delivers recorded lifecycle events to the bound behaviours until no
    /// events remain.
    ///
    /// # Errors
    ///
    /// Returns the first behaviour error.
    pub fn flush_events(&mut self) -> Result<()> {
        let service = self.service;
        let policies = service.policies();
        while self.nodes.has_pending_events() {
            for event in self.nodes.take_events() {
                match &event {
                    NodeEvent::NodeCreated { assoc } | NodeEvent::NodeCopied { copy: assoc, .. } => {
                        if self.new_nodes.insert(assoc.child.clone()) {
                            self.new_node_order.push(assoc.child.clone());
                        }
                    }
                    _ => {}
                }
                policies.dispatch(self, &event)?;
            }
        }
        Ok(())
    }

    /// Runs pending rules until none remain.
    ///
    /// A drain that returns an error leaves the unit of work unable to
    /// commit.
    ///
    /// # Errors
    ///
    /// Returns an error if a drain ceiling is exceeded, if an event
    /// behaviour fails, or, with fail-fast configured, the first failed
    /// entry's error.
    pub fn execute_pending_rules(&mut self) -> Result<DrainReport> {
        let result = execution::drain(self);
        if result.is_err() {
            self.aborted = true;
        }
        result
    }

    /// Returns true if a drain in this unit of work ended in an error.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    // =========================================================================
    // Deferred Rule Copies
    // =========================================================================

    /// Records that the rules attached to `source` are to be attached to
    /// `copy` when the unit of work commits.
    pub(crate) fn copy_rules_on_commit(&mut self, source: &NodeRef, copy: &NodeRef) {
        self.rule_copies.push((source.clone(), copy.clone()));
    }

    /// Returns the `(source, copy)` pairs whose rules are copied at commit.
    #[must_use]
    pub fn pending_rule_copies(&self) -> &[(NodeRef, NodeRef)] {
        &self.rule_copies
    }

    // =========================================================================
    // Checkpoints
    // =========================================================================

    /// Captures the state a single pending entry may change.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.nodes.clone(),
            pending: self.pending.len(),
            new_nodes: self.new_node_order.len(),
            rule_copies: self.rule_copies.len(),
        }
    }

    /// Returns to a checkpoint taken earlier in the same drain.
    pub(crate) fn restore(&mut self, checkpoint: Checkpoint) {
        self.nodes = checkpoint.nodes;
        self.pending.truncate(checkpoint.pending);
        for node in self.new_node_order.drain(checkpoint.new_nodes..) {
            self.new_nodes.remove(&node);
        }
        self.rule_copies.truncate(checkpoint.rule_copies);
    }

    // =========================================================================
    // Rule Enablement
    // =========================================================================

    /// Returns true if rules attached to `node` may be triggered.
    #[must_use]
    pub fn rules_enabled(&self, node: &NodeRef) -> bool {
        !self.rules_disabled && !self.disabled_nodes.contains(node)
    }

    /// Stops rules attached to `node` from being triggered.
    pub fn disable_rules(&mut self, node: &NodeRef) {
        self.disabled_nodes.insert(node.clone());
    }

    /// Allows rules attached to `node` to be triggered again.
    pub fn enable_rules(&mut self, node: &NodeRef) {
        self.disabled_nodes.remove(node);
    }

    /// Stops all rules from being triggered.
    pub fn disable_all_rules(&mut self) {
        self.rules_disabled = true;
    }

    /// Allows rules to be triggered again, except on individually disabled
    /// nodes.
    pub fn enable_all_rules(&mut self) {
        self.rules_disabled = false;
    }

    // =========================================================================
    // Completion
    // =========================================================================

    /// Drains pending rules, installs the working store in the repository
    /// and then applies the deferred rule copies.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::RuleExecutionFailed`] if an earlier drain ended
    /// in an error, or if any pending entry failed in this unit of work
    /// (unless the engine commits despite failures). Also returns any error
    /// from the drain, or [`ErrorKind::ConcurrentModification`] if another
    /// unit of work committed first. On error nothing is committed.
    pub fn commit(mut self) -> Result<CommitReceipt> {
        let report = self.execute_pending_rules()?;
        if self.aborted {
            warn!(failed = self.failed_entries, "drain aborted, rolling back");
            return Err(Error::new(ErrorKind::RuleExecutionFailed {
                count: self.failed_entries.max(1),
            }));
        }
        if self.failed_entries > 0 && !self.service.config().commit_on_rule_failure {
            warn!(failed = self.failed_entries, "rule failures, rolling back");
            return Err(Error::new(ErrorKind::RuleExecutionFailed {
                count: self.failed_entries,
            }));
        }
        let version = self.repository.commit(self.base_version, self.nodes)?;
        let rule_store = self.service.rule_store();
        for (source, copy) in &self.rule_copies {
            rule_store.copy_rules(source, copy)?;
            debug!(source = %source, copy = %copy, "copied rules with node");
        }
        info!(
            version,
            rounds = report.rounds,
            executed = report.executed,
            "committed unit of work"
        );
        Ok(CommitReceipt { version, report })
    }

    /// Discards the unit of work.
    pub fn rollback(self) {
        debug!(
            version = self.base_version,
            pending = self.pending.len(),
            rule_copies = self.rule_copies.len(),
            "rolled back unit of work"
        );
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("base_version", &self.base_version)
            .field("pending", &self.pending.len())
            .field("executing", &self.executing.as_ref().map(Rule::id))
            .field("aborted", &self.aborted)
            .field("rules_disabled", &self.rules_disabled)
            .finish_non_exhaustive()
    }
}

/// State of a unit of work before one pending entry ran.
pub(crate) struct Checkpoint {
    nodes: NodeStore,
    pending: usize,
    new_nodes: usize,
    rule_copies: usize,
}
