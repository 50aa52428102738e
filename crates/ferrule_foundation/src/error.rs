//! Error types for the Ferrule system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::node::{NodeRef, StoreRef};

/// Result alias used across all Ferrule crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Ferrule operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context naming the rule and node involved.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error, replacing any existing context.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a node not found error.
    #[must_use]
    pub fn node_not_found(node: NodeRef) -> Self {
        Self::new(ErrorKind::NodeNotFound(node))
    }

    /// Creates a store not found error.
    #[must_use]
    pub fn store_not_found(store: StoreRef) -> Self {
        Self::new(ErrorKind::StoreNotFound(store))
    }

    /// Creates an invalid operation error.
    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation(message.into()))
    }

    /// Creates a rule configuration error for a malformed or unresolvable rule.
    #[must_use]
    pub fn rule_configuration(
        rule: impl Into<String>,
        node: Option<NodeRef>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::RuleConfiguration {
            rule: rule.into(),
            node,
            reason: reason.into(),
        })
    }

    /// Creates an unknown definition error.
    #[must_use]
    pub fn unknown_definition(kind: &'static str, name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownDefinition {
            kind,
            name: name.into(),
        })
    }

    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(
        definition: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::InvalidParameter {
            definition: definition.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        })
    }

    /// Creates a semantic limit exceeded error.
    #[must_use]
    pub fn limit_exceeded(limit: SemanticLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Returns true for errors in the "rule configuration" class.
    ///
    /// These are raised for malformed rules and for definitions whose
    /// evaluator, executor or adapter cannot be resolved or constructed.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RuleConfiguration { .. }
                | ErrorKind::AdapterInitialization { .. }
                | ErrorKind::UnknownDefinition { .. }
                | ErrorKind::InvalidParameter { .. }
        )
    }

    /// Returns the rule id from the error context or kind, if known.
    #[must_use]
    pub fn rule_id(&self) -> Option<&str> {
        if let Some(id) = self.context.as_ref().and_then(|c| c.rule_id.as_deref()) {
            return Some(id);
        }
        match &self.kind {
            ErrorKind::RuleConfiguration { rule, .. } => Some(rule),
            _ => None,
        }
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Node does not exist in the store.
    #[error("node not found: {0}")]
    NodeNotFound(NodeRef),

    /// Store does not exist.
    #[error("store not found: {0}")]
    StoreNotFound(StoreRef),

    /// A textual reference or name could not be parsed.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The requested association does not exist.
    #[error("association not found: {source_node} -[{assoc_type}]-> {target}")]
    AssociationNotFound {
        /// Source node of the association.
        source_node: NodeRef,
        /// Association type, displayed as a qualified name.
        assoc_type: String,
        /// Target node of the association.
        target: NodeRef,
    },

    /// The operation is not valid for the given nodes.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Malformed rule or unresolvable rule handler.
    #[error("rule configuration error in rule {rule}: {reason}")]
    RuleConfiguration {
        /// Id of the offending rule.
        rule: String,
        /// Node the rule is attached to, if known.
        node: Option<NodeRef>,
        /// Human-readable description.
        reason: String,
    },

    /// A rule type adapter failed to initialize.
    #[error("unable to initialise the adapter for rule type {rule_type}: {reason}")]
    AdapterInitialization {
        /// The rule type whose adapter failed.
        rule_type: String,
        /// Human-readable description.
        reason: String,
    },

    /// No definition or handler is registered under the name.
    #[error("unknown {kind}: {name}")]
    UnknownDefinition {
        /// What was being looked up (e.g. "rule type", "action executor").
        kind: &'static str,
        /// The name that was not found.
        name: String,
    },

    /// A rule parameter is missing or has the wrong type.
    #[error("invalid parameter {parameter} for {definition}: {reason}")]
    InvalidParameter {
        /// The condition or action definition name.
        definition: String,
        /// The parameter name.
        parameter: String,
        /// Human-readable description.
        reason: String,
    },

    /// Semantic limit exceeded (kill switch triggered).
    #[error("limit exceeded: {0}")]
    LimitExceeded(SemanticLimit),

    /// Pending rules failed during commit and the unit of work was rolled back.
    #[error("{count} pending rule(s) failed; unit of work rolled back")]
    RuleExecutionFailed {
        /// Number of failed pending entries.
        count: usize,
    },

    /// Another unit of work committed since this one began.
    #[error("concurrent modification: expected version {expected}, found {actual}")]
    ConcurrentModification {
        /// Version the unit of work was based on.
        expected: u64,
        /// Version currently committed.
        actual: u64,
    },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Semantic limits (kill switches) that can be exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticLimit {
    /// Too many drain rounds; rules keep re-triggering each other.
    MaxDrainRounds {
        /// The configured limit.
        limit: u32,
        /// Id of a rule still pending when the limit was hit.
        rule: Option<String>,
    },
    /// Too many pending entries executed in one unit of work.
    MaxExecutions {
        /// The configured limit.
        limit: u32,
    },
}

impl fmt::Display for SemanticLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxDrainRounds { limit, rule } => {
                write!(f, "max drain rounds ({limit}) exceeded")?;
                if let Some(rule) = rule {
                    write!(f, ": rule {rule} still pending")?;
                }
                Ok(())
            }
            Self::MaxExecutions { limit } => {
                write!(f, "max rule executions ({limit}) exceeded")
            }
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Id of the rule being processed.
    pub rule_id: Option<String>,
    /// Node the rule is attached to.
    pub actionable: Option<NodeRef>,
    /// Node that triggered the rule.
    pub actioned_upon: Option<NodeRef>,
    /// Stack of operations leading to the error.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule id.
    #[must_use]
    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Sets the actionable and actioned-upon nodes.
    #[must_use]
    pub fn with_nodes(mut self, actionable: NodeRef, actioned_upon: NodeRef) -> Self {
        self.actionable = Some(actionable);
        self.actioned_upon = Some(actioned_upon);
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule_id {
            write!(f, "in rule {rule}")?;
        }
        if let (Some(actionable), Some(upon)) = (&self.actionable, &self.actioned_upon) {
            write!(f, " on {actionable} for {upon}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
