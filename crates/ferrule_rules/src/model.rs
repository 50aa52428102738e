//! Rule definition model.
//!
//! Definitions ([`RuleType`], [`ConditionDefinition`], [`ActionDefinition`])
//! come from the rule directory and are immutable. A [`Rule`] references
//! definitions through its [`RuleCondition`]s and [`RuleAction`]s, each of
//! which carries its own parameter values.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ferrule_foundation::{Error, NodeRef, QName, Result, Value};
use serde::{Deserialize, Serialize};

// =============================================================================
// Definitions
// =============================================================================

/// A category of rule, tied to the lifecycle events that trigger it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleType {
    /// Unique name (e.g. `inbound`).
    pub name: String,
    /// Human-readable label.
    #[serde(default)]
    pub display_label: String,
    /// Name of the adapter that hooks this type into lifecycle events.
    #[serde(default)]
    pub adapter: Option<String>,
}

impl RuleType {
    /// Creates a rule type with no adapter.
    #[must_use]
    pub fn new(name: &str, display_label: &str) -> Self {
        Self {
            name: name.to_owned(),
            display_label: display_label.to_owned(),
            adapter: None,
        }
    }

    /// Sets the adapter name.
    #[must_use]
    pub fn with_adapter(mut self, adapter: &str) -> Self {
        self.adapter = Some(adapter.to_owned());
        self
    }
}

/// Expected kind of a parameter value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterKind {
    /// Text.
    Text,
    /// Qualified name, as a name value or `{namespace}local` text.
    Name,
    /// Node reference, as a node value or `protocol://identifier/id` text.
    Node,
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Any value.
    Any,
}

impl ParameterKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Text => value.as_text().is_some(),
            Self::Name => value.as_name().is_some(),
            Self::Node => value.as_node().is_some(),
            Self::Bool => value.as_bool().is_some(),
            Self::Int => value.as_int().is_some(),
        }
    }
}

/// Declared parameter of a condition or action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Parameter name.
    pub name: String,
    /// Expected value kind.
    pub kind: ParameterKind,
    /// Whether the parameter must be supplied.
    #[serde(default)]
    pub mandatory: bool,
    /// Human-readable label.
    #[serde(default)]
    pub display_label: String,
}

impl ParameterDefinition {
    /// Creates a mandatory parameter.
    #[must_use]
    pub fn mandatory(name: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            mandatory: true,
            display_label: String::new(),
        }
    }

    /// Creates an optional parameter.
    #[must_use]
    pub fn optional(name: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            mandatory: false,
            display_label: String::new(),
        }
    }

    fn check(&self, definition: &str, value: Option<&Value>) -> Result<()> {
        match value {
            None | Some(Value::Null) if self.mandatory => Err(Error::invalid_parameter(
                definition,
                &self.name,
                "mandatory parameter missing",
            )),
            Some(v) if !v.is_null() && !self.kind.accepts(v) => Err(Error::invalid_parameter(
                definition,
                &self.name,
                format!("expected {:?}, got {v:?}", self.kind),
            )),
            _ => Ok(()),
        }
    }
}

fn validate(definition: &str, declared: &[ParameterDefinition], values: &ParameterValues) -> Result<()> {
    for param in declared {
        param.check(definition, values.get(&param.name))?;
    }
    Ok(())
}

/// Definition of a condition: a named evaluator plus its parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    /// Unique name.
    pub name: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Name of the evaluator registered in the handler registry.
    pub evaluator: String,
    /// Declared parameters.
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
}

impl ConditionDefinition {
    /// Creates a condition definition with no parameters.
    #[must_use]
    pub fn new(name: &str, evaluator: &str) -> Self {
        Self {
            name: name.to_owned(),
            title: String::new(),
            description: String::new(),
            evaluator: evaluator.to_owned(),
            parameters: Vec::new(),
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    /// Adds a parameter definition.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Checks parameter values against the declared parameters.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if a mandatory parameter is missing
    /// or a supplied value has the wrong kind.
    pub fn validate(&self, values: &ParameterValues) -> Result<()> {
        validate(&self.name, &self.parameters, values)
    }
}

/// Definition of an action: a named executor plus its parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Unique name.
    pub name: String,
    /// Human-readable title.
    #[serde(default)]
    pub title: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Name of the executor registered in the handler registry.
    pub executor: String,
    /// Declared parameters.
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
}

impl ActionDefinition {
    /// Creates an action definition with no parameters.
    #[must_use]
    pub fn new(name: &str, executor: &str) -> Self {
        Self {
            name: name.to_owned(),
            title: String::new(),
            description: String::new(),
            executor: executor.to_owned(),
            parameters: Vec::new(),
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    /// Adds a parameter definition.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Checks parameter values against the declared parameters.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if a mandatory parameter is missing
    /// or a supplied value has the wrong kind.
    pub fn validate(&self, values: &ParameterValues) -> Result<()> {
        validate(&self.name, &self.parameters, values)
    }
}

// =============================================================================
// Parameter Values
// =============================================================================

/// Parameter name to value mapping owned by a condition or action.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterValues(BTreeMap<String, Value>);

impl ParameterValues {
    /// Creates an empty parameter bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bag with one more parameter set.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_owned(), value.into());
        self
    }

    /// Sets a parameter, returning the previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.to_owned(), value.into())
    }

    /// Returns a parameter value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns the number of parameters set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns a mandatory qualified-name parameter.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if it is missing or not a name.
    pub fn require_name(&self, definition: &str, name: &str) -> Result<QName> {
        self.optional_name(definition, name)?
            .ok_or_else(|| Error::invalid_parameter(definition, name, "mandatory parameter missing"))
    }

    /// Returns an optional qualified-name parameter.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if it is present but not a name.
    pub fn optional_name(&self, definition: &str, name: &str) -> Result<Option<QName>> {
        self.typed(definition, name, "qualified name", Value::as_name)
    }

    /// Returns a mandatory node parameter.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if it is missing or not a node.
    pub fn require_node(&self, definition: &str, name: &str) -> Result<NodeRef> {
        self.typed(definition, name, "node reference", Value::as_node)?
            .ok_or_else(|| Error::invalid_parameter(definition, name, "mandatory parameter missing"))
    }

    /// Returns an optional text parameter.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if it is present but not text.
    pub fn optional_text(&self, definition: &str, name: &str) -> Result<Option<String>> {
        self.typed(definition, name, "text", |v| v.as_text().map(str::to_owned))
    }

    /// Returns an optional boolean parameter.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if it is present but not a boolean.
    pub fn optional_bool(&self, definition: &str, name: &str) -> Result<Option<bool>> {
        self.typed(definition, name, "boolean", Value::as_bool)
    }

    /// Returns a mandatory parameter of any kind.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if it is missing.
    pub fn require_value(&self, definition: &str, name: &str) -> Result<Value> {
        self.get(name)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| Error::invalid_parameter(definition, name, "mandatory parameter missing"))
    }

    fn typed<T>(
        &self,
        definition: &str,
        name: &str,
        expected: &str,
        convert: impl Fn(&Value) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => convert(value).map(Some).ok_or_else(|| {
                Error::invalid_parameter(definition, name, format!("expected {expected}, got {value:?}"))
            }),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// Rule
// =============================================================================

/// A condition attached to a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleCondition {
    /// The condition definition.
    pub definition: Arc<ConditionDefinition>,
    /// Parameter values for this use of the condition.
    pub parameters: ParameterValues,
}

/// An action attached to a rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleAction {
    /// The action definition.
    pub definition: Arc<ActionDefinition>,
    /// Parameter values for this use of the action.
    pub parameters: ParameterValues,
}

/// A rule: conditions and actions of a given rule type.
///
/// A rule's identity is its id: equality and hashing compare ids only, so a
/// rule edited after being queued is still the same rule.
#[derive(Clone, Debug)]
pub struct Rule {
    id: String,
    rule_type: String,
    /// Short human-readable title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Disabled rules are skipped when drained.
    pub enabled: bool,
    /// Whether rules on a folder also apply to its descendants.
    pub applies_to_children: bool,
    conditions: Vec<RuleCondition>,
    actions: Vec<RuleAction>,
}

impl Rule {
    /// Creates an enabled rule with no conditions or actions.
    #[must_use]
    pub fn new(id: &str, rule_type: &RuleType) -> Self {
        Self {
            id: id.to_owned(),
            rule_type: rule_type.name.clone(),
            title: String::new(),
            description: String::new(),
            enabled: true,
            applies_to_children: false,
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Returns the rule id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the rule type name.
    #[must_use]
    pub fn rule_type(&self) -> &str {
        &self.rule_type
    }

    /// Returns true if the rule is of the given type.
    #[must_use]
    pub fn is_of_type(&self, rule_type: &RuleType) -> bool {
        self.rule_type == rule_type.name
    }

    /// Returns true if the rule will run when drained.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Appends a condition.
    pub fn add_condition(&mut self, definition: Arc<ConditionDefinition>, parameters: ParameterValues) {
        self.conditions.push(RuleCondition {
            definition,
            parameters,
        });
    }

    /// Appends an action.
    pub fn add_action(&mut self, definition: Arc<ActionDefinition>, parameters: ParameterValues) {
        self.actions.push(RuleAction {
            definition,
            parameters,
        });
    }

    /// Removes all conditions.
    pub fn clear_conditions(&mut self) {
        self.conditions.clear();
    }

    /// Removes all actions.
    pub fn clear_actions(&mut self) {
        self.actions.clear();
    }

    /// Returns the conditions in order.
    #[must_use]
    pub fn conditions(&self) -> &[RuleCondition] {
        &self.conditions
    }

    /// Returns the actions in order.
    #[must_use]
    pub fn actions(&self) -> &[RuleAction] {
        &self.actions
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Rule {}

impl Hash for Rule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rule {}", self.rule_type, self.id)?;
        if !self.title.is_empty() {
            write!(f, " ({})", self.title)?;
        }
        Ok(())
    }
}
