//! Draining pending rules.
//!
//! A drain runs in rounds. Each round takes the whole pending queue and runs
//! its entries in insertion order; anything queued while a round runs waits
//! for the next round. The drain ends when a round starts with an empty
//! queue.
//!
//! Every entry runs atomically: the working node store, the queue, the set
//! of new nodes and the deferred rule copies are checkpointed before the
//! entry and restored if it fails, so a failed entry leaves no trace besides
//! its [`RuleFailure`].

use std::ops::{Deref, DerefMut};

use ferrule_foundation::{Error, ErrorContext, Result, SemanticLimit};
use tracing::{debug, warn};

use crate::model::Rule;
use crate::pending::PendingRule;
use crate::transaction::Transaction;

// =============================================================================
// Drain Report
// =============================================================================

/// A pending entry that failed.
#[derive(Debug)]
pub struct RuleFailure {
    /// The entry.
    pub entry: PendingRule,
    /// Why it failed, with the rule and nodes in its context.
    pub error: Error,
}

/// What a drain did.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Number of non-empty rounds.
    pub rounds: u32,
    /// Entries whose condition held and whose action ran.
    pub executed: usize,
    /// Entries whose condition did not hold.
    pub not_matched: usize,
    /// Entries skipped because the rule was disabled or a node was gone.
    pub skipped: usize,
    /// Entries that failed.
    pub failures: Vec<RuleFailure>,
}

impl DrainReport {
    /// Returns the number of entries processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.executed + self.not_matched + self.skipped + self.failures.len()
    }

    /// Returns true if no entry failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns true if nothing was processed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processed() == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Executed,
    NotMatched,
    Skipped,
}

// =============================================================================
// Executing Marker
// =============================================================================

/// Marks a rule as executing for as long as the guard lives.
struct ExecutingGuard<'t, 'a> {
    tx: &'t mut Transaction<'a>,
    previous: Option<Rule>,
}

impl<'t, 'a> ExecutingGuard<'t, 'a> {
    fn new(tx: &'t mut Transaction<'a>, rule: Rule) -> Self {
        let previous = tx.executing.replace(rule);
        Self { tx, previous }
    }
}

impl<'a> Deref for ExecutingGuard<'_, 'a> {
    type Target = Transaction<'a>;

    fn deref(&self) -> &Self::Target {
        self.tx
    }
}

impl DerefMut for ExecutingGuard<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.tx
    }
}

impl Drop for ExecutingGuard<'_, '_> {
    fn drop(&mut self) {
        self.tx.executing = self.previous.take();
    }
}

// =============================================================================
// Drain
// =============================================================================

/// Runs pending rules until the queue stays empty.
pub(crate) fn drain(tx: &mut Transaction<'_>) -> Result<DrainReport> {
    let config = tx.service().config();
    let mut report = DrainReport::default();
    tx.flush_events()?;

    loop {
        let batch = tx.pending.take();
        if batch.is_empty() {
            break;
        }
        if report.rounds >= config.max_drain_rounds {
            let rule = batch.first().map(|entry| entry.rule.id().to_owned());
            warn!(limit = config.max_drain_rounds, rule = ?rule, "drain did not settle");
            return Err(Error::limit_exceeded(SemanticLimit::MaxDrainRounds {
                limit: config.max_drain_rounds,
                rule,
            }));
        }
        report.rounds += 1;
        debug!(round = report.rounds, entries = batch.len(), "draining pending rules");

        for entry in batch {
            if report.processed() >= config.max_executions as usize {
                warn!(limit = config.max_executions, "too many rule executions");
                return Err(Error::limit_exceeded(SemanticLimit::MaxExecutions {
                    limit: config.max_executions,
                }));
            }
            match run_atomically(tx, &entry) {
                Ok(Outcome::Executed) => report.executed += 1,
                Ok(Outcome::NotMatched) => report.not_matched += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(error) => {
                    warn!(entry = %entry, error = %error, "pending rule failed");
                    tx.failed_entries += 1;
                    if config.fail_fast {
                        return Err(error);
                    }
                    report.failures.push(RuleFailure { entry, error });
                }
            }
        }
    }

    if !report.is_empty() {
        debug!(
            rounds = report.rounds,
            executed = report.executed,
            not_matched = report.not_matched,
            skipped = report.skipped,
            failed = report.failures.len(),
            "drain settled"
        );
    }
    Ok(report)
}

/// Runs one entry, restoring the working store and queue if it fails.
fn run_atomically(tx: &mut Transaction<'_>, entry: &PendingRule) -> Result<Outcome> {
    let rule = &entry.rule;
    if !rule.is_enabled() || !tx.rules_enabled(&entry.actionable) {
        debug!(entry = %entry, "rule disabled, skipping");
        return Ok(Outcome::Skipped);
    }
    if !tx.nodes().exists(&entry.actionable) || !tx.nodes().exists(&entry.actioned_upon) {
        debug!(entry = %entry, "node no longer exists, skipping");
        return Ok(Outcome::Skipped);
    }

    let checkpoint = tx.checkpoint();
    run(tx, entry).map_err(|error| {
        tx.restore(checkpoint);
        error.with_context(
            ErrorContext::new()
                .with_rule(rule.id())
                .with_nodes(entry.actionable.clone(), entry.actioned_upon.clone())
                .with_frame(format!("executing {rule}")),
        )
    })
}

fn run(tx: &mut Transaction<'_>, entry: &PendingRule) -> Result<Outcome> {
    let rule = &entry.rule;
    let mut guard = ExecutingGuard::new(tx, rule.clone());

    let (condition, action) = match (rule.conditions(), rule.actions()) {
        ([condition], [action]) => (condition, action),
        (conditions, actions) => {
            return Err(Error::rule_configuration(
                rule.id(),
                Some(entry.actionable.clone()),
                format!(
                    "expected exactly one condition and one action, found {} and {}",
                    conditions.len(),
                    actions.len()
                ),
            ));
        }
    };

    let service = guard.service();
    let evaluator = service.handlers().evaluator(condition, service.services())?;
    let executor = service.handlers().executor(action, service.services())?;

    if !evaluator.evaluate(&guard, &entry.actionable, &entry.actioned_upon)? {
        debug!(entry = %entry, "condition not met");
        return Ok(Outcome::NotMatched);
    }
    debug!(entry = %entry, "executing rule");
    executor.execute(&mut guard, &entry.actionable, &entry.actioned_upon)?;
    // Deliver the action's events while the rule is still marked executing.
    guard.flush_events()?;
    Ok(Outcome::Executed)
}
