//! The rule directory: rule types, conditions and actions by name.
//!
//! The directory is built once from a [`DirectoryConfig`] and is read-only
//! afterwards, so it is shared between units of work behind an `Arc`.
//! Lookups by an unknown name return `None`.

use std::collections::BTreeMap;
use std::sync::Arc;

use ferrule_foundation::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

use crate::builtin::{actions, adapters, conditions};
use crate::model::{ActionDefinition, ConditionDefinition, ParameterDefinition, ParameterKind, RuleType};

/// Serializable description of a rule directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DirectoryConfig {
    /// Rule types.
    pub rule_types: Vec<RuleType>,
    /// Condition definitions.
    pub conditions: Vec<ConditionDefinition>,
    /// Action definitions.
    pub actions: Vec<ActionDefinition>,
}

impl DirectoryConfig {
    /// Parses a directory configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns a config error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::new(ErrorKind::Config(format!("invalid rule directory: {e}"))))
    }
}

/// Read-only registry of rule types, conditions and actions.
#[derive(Clone, Debug, Default)]
pub struct RuleDirectory {
    rule_types: BTreeMap<String, Arc<RuleType>>,
    conditions: BTreeMap<String, Arc<ConditionDefinition>>,
    actions: BTreeMap<String, Arc<ActionDefinition>>,
}

impl RuleDirectory {
    /// Builds a directory from its configuration.
    ///
    /// # Errors
    ///
    /// Returns a config error if two entries of the same kind share a name.
    pub fn from_config(config: DirectoryConfig) -> Result<Self> {
        Ok(Self {
            rule_types: index("rule type", config.rule_types, |t| &t.name)?,
            conditions: index("condition", config.conditions, |c| &c.name)?,
            actions: index("action", config.actions, |a| &a.name)?,
        })
    }

    /// Builds a directory declaring the built-in rule types, conditions and
    /// actions.
    #[must_use]
    pub fn builtin() -> Self {
        let directory = Self::from_config(builtin_config());
        debug_assert!(directory.is_ok(), "built-in directory has duplicate names");
        directory.unwrap_or_default()
    }

    /// Returns all rule types, ordered by name.
    #[must_use]
    pub fn rule_types(&self) -> Vec<Arc<RuleType>> {
        self.rule_types.values().cloned().collect()
    }

    /// Returns the rule type with the given name.
    #[must_use]
    pub fn rule_type(&self, name: &str) -> Option<Arc<RuleType>> {
        self.rule_types.get(name).cloned()
    }

    /// Returns all condition definitions, ordered by name.
    #[must_use]
    pub fn condition_definitions(&self) -> Vec<Arc<ConditionDefinition>> {
        self.conditions.values().cloned().collect()
    }

    /// Returns the condition definition with the given name.
    #[must_use]
    pub fn condition_definition(&self, name: &str) -> Option<Arc<ConditionDefinition>> {
        self.conditions.get(name).cloned()
    }

    /// Returns all action definitions, ordered by name.
    #[must_use]
    pub fn action_definitions(&self) -> Vec<Arc<ActionDefinition>> {
        self.actions.values().cloned().collect()
    }

    /// Returns the action definition with the given name.
    #[must_use]
    pub fn action_definition(&self, name: &str) -> Option<Arc<ActionDefinition>> {
        self.actions.get(name).cloned()
    }
}

fn index<T>(
    kind: &str,
    entries: Vec<T>,
    name: impl Fn(&T) -> &String,
) -> Result<BTreeMap<String, Arc<T>>> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let key = name(&entry).clone();
        if map.insert(key.clone(), Arc::new(entry)).is_some() {
            return Err(Error::new(ErrorKind::Config(format!(
                "duplicate {kind} '{key}'"
            ))));
        }
    }
    Ok(map)
}

/// The built-in directory entries.
#[must_use]
pub fn builtin_config() -> DirectoryConfig {
    DirectoryConfig {
        rule_types: vec![
            RuleType::new(adapters::INBOUND, "Items are created or enter this folder")
                .with_adapter(adapters::INBOUND),
            RuleType::new(adapters::OUTBOUND, "Items leave this folder")
                .with_adapter(adapters::OUTBOUND),
            RuleType::new(adapters::UPDATE, "Items in this folder are updated")
                .with_adapter(adapters::UPDATE),
        ],
        conditions: vec![
            ConditionDefinition::new(conditions::NO_CONDITION, conditions::NO_CONDITION)
                .with_title("All items"),
            ConditionDefinition::new(conditions::HAS_ASPECT, conditions::HAS_ASPECT)
                .with_title("Items with a specific aspect")
                .with_parameter(ParameterDefinition::mandatory(
                    conditions::PARAM_ASPECT,
                    ParameterKind::Name,
                )),
            ConditionDefinition::new(
                conditions::COMPARE_PROPERTY_VALUE,
                conditions::COMPARE_PROPERTY_VALUE,
            )
            .with_title("Items whose property matches a value")
            .with_parameter(ParameterDefinition::optional(
                conditions::PARAM_PROPERTY,
                ParameterKind::Name,
            ))
            .with_parameter(ParameterDefinition::optional(
                conditions::PARAM_OPERATION,
                ParameterKind::Text,
            ))
            .with_parameter(ParameterDefinition::mandatory(
                conditions::PARAM_VALUE,
                ParameterKind::Any,
            )),
            ConditionDefinition::new(conditions::IS_SUBTYPE, conditions::IS_SUBTYPE)
                .with_title("Items of a specific type")
                .with_parameter(ParameterDefinition::mandatory(
                    conditions::PARAM_TYPE,
                    ParameterKind::Name,
                )),
        ],
        actions: vec![
            ActionDefinition::new(actions::ADD_FEATURES, actions::ADD_FEATURES)
                .with_title("Add aspect")
                .with_parameter(ParameterDefinition::mandatory(
                    actions::PARAM_ASPECT_NAME,
                    ParameterKind::Name,
                )),
            ActionDefinition::new(actions::REMOVE_FEATURES, actions::REMOVE_FEATURES)
                .with_title("Remove aspect")
                .with_parameter(ParameterDefinition::mandatory(
                    actions::PARAM_ASPECT_NAME,
                    ParameterKind::Name,
                )),
            ActionDefinition::new(actions::SET_PROPERTY_VALUE, actions::SET_PROPERTY_VALUE)
                .with_title("Set property value")
                .with_parameter(ParameterDefinition::mandatory(
                    actions::PARAM_PROPERTY,
                    ParameterKind::Name,
                ))
                .with_parameter(ParameterDefinition::mandatory(
                    actions::PARAM_VALUE,
                    ParameterKind::Any,
                )),
            ActionDefinition::new(actions::COPY, actions::COPY)
                .with_title("Copy item to a folder")
                .with_parameter(ParameterDefinition::mandatory(
                    actions::PARAM_DESTINATION_FOLDER,
                    ParameterKind::Node,
                ))
                .with_parameter(ParameterDefinition::optional(
                    actions::PARAM_DEEP_COPY,
                    ParameterKind::Bool,
                )),
            ActionDefinition::new(actions::MOVE, actions::MOVE)
                .with_title("Move item to a folder")
                .with_parameter(ParameterDefinition::mandatory(
                    actions::PARAM_DESTINATION_FOLDER,
                    ParameterKind::Node,
                )),
        ],
    }
}
