//! Built-in condition evaluators.
//!
//! Every evaluator tests the actioned-upon node.

use ferrule_foundation::{Error, NodeRef, QName, Result, Value};
use ferrule_repository::model::PROP_NAME;

use crate::handler::{ConditionEvaluator, HandlerRegistry, ServiceRegistry};
use crate::model::RuleCondition;
use crate::transaction::Transaction;

/// Matches every node.
pub const NO_CONDITION: &str = "no-condition";
/// Matches nodes carrying an aspect.
pub const HAS_ASPECT: &str = "has-aspect";
/// Matches nodes whose property compares to a value.
pub const COMPARE_PROPERTY_VALUE: &str = "compare-property-value";
/// Matches nodes of a type.
pub const IS_SUBTYPE: &str = "is-subtype";

/// Aspect to test for.
pub const PARAM_ASPECT: &str = "aspect";
/// Property to compare; defaults to the node name.
pub const PARAM_PROPERTY: &str = "property";
/// Comparison: `equals`, `contains`, `begins` or `ends`.
pub const PARAM_OPERATION: &str = "operation";
/// Value to compare against.
pub const PARAM_VALUE: &str = "value";
/// Type to test for.
pub const PARAM_TYPE: &str = "type";

pub(crate) fn register(registry: &mut HandlerRegistry) {
    registry.register_evaluator(NO_CONDITION, no_condition);
    registry.register_evaluator(HAS_ASPECT, has_aspect);
    registry.register_evaluator(COMPARE_PROPERTY_VALUE, compare_property_value);
    registry.register_evaluator(IS_SUBTYPE, is_subtype);
}

// =============================================================================
// no-condition
// =============================================================================

struct NoCondition;

impl ConditionEvaluator for NoCondition {
    fn evaluate(&self, _tx: &Transaction<'_>, _actionable: &NodeRef, _actioned_upon: &NodeRef) -> Result<bool> {
        Ok(true)
    }
}

fn no_condition(_condition: &RuleCondition, _services: &ServiceRegistry) -> Result<Box<dyn ConditionEvaluator>> {
    Ok(Box::new(NoCondition))
}

// =============================================================================
// has-aspect
// =============================================================================

struct HasAspect {
    aspect: QName,
}

impl ConditionEvaluator for HasAspect {
    fn evaluate(&self, tx: &Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<bool> {
        tx.nodes().has_aspect(actioned_upon, &self.aspect)
    }
}

fn has_aspect(condition: &RuleCondition, _services: &ServiceRegistry) -> Result<Box<dyn ConditionEvaluator>> {
    let aspect = condition
        .parameters
        .require_name(&condition.definition.name, PARAM_ASPECT)?;
    Ok(Box::new(HasAspect { aspect }))
}

// =============================================================================
// compare-property-value
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Comparison {
    Equals,
    Contains,
    Begins,
    Ends,
}

impl Comparison {
    fn parse(definition: &str, name: Option<&str>) -> Result<Self> {
        match name.unwrap_or("equals") {
            "equals" => Ok(Self::Equals),
            "contains" => Ok(Self::Contains),
            "begins" => Ok(Self::Begins),
            "ends" => Ok(Self::Ends),
            other => Err(Error::invalid_parameter(
                definition,
                PARAM_OPERATION,
                format!("unknown operation '{other}'"),
            )),
        }
    }

    fn matches(self, actual: &Value, expected: &Value) -> bool {
        if self == Self::Equals && actual == expected {
            return true;
        }
        let (Some(actual), Some(expected)) = (actual.to_text(), expected.to_text()) else {
            return false;
        };
        match self {
            Self::Equals => actual == expected,
            Self::Contains => actual.contains(&expected),
            Self::Begins => actual.starts_with(&expected),
            Self::Ends => actual.ends_with(&expected),
        }
    }
}

struct CompareProperty {
    property: QName,
    comparison: Comparison,
    value: Value,
}

impl ConditionEvaluator for CompareProperty {
    fn evaluate(&self, tx: &Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<bool> {
        Ok(tx
            .nodes()
            .property(actioned_upon, &self.property)?
            .is_some_and(|actual| self.comparison.matches(&actual, &self.value)))
    }
}

fn compare_property_value(
    condition: &RuleCondition,
    _services: &ServiceRegistry,
) -> Result<Box<dyn ConditionEvaluator>> {
    let definition = &condition.definition.name;
    let params = &condition.parameters;
    let operation = params.optional_text(definition, PARAM_OPERATION)?;
    Ok(Box::new(CompareProperty {
        property: params
            .optional_name(definition, PARAM_PROPERTY)?
            .unwrap_or(PROP_NAME),
        comparison: Comparison::parse(definition, operation.as_deref())?,
        value: params.require_value(definition, PARAM_VALUE)?,
    }))
}

// =============================================================================
// is-subtype
// =============================================================================

struct IsSubtype {
    node_type: QName,
}

impl ConditionEvaluator for IsSubtype {
    fn evaluate(&self, tx: &Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<bool> {
        Ok(tx.nodes().node_type(actioned_upon)? == self.node_type)
    }
}

fn is_subtype(condition: &RuleCondition, _services: &ServiceRegistry) -> Result<Box<dyn ConditionEvaluator>> {
    let node_type = condition
        .parameters
        .require_name(&condition.definition.name, PARAM_TYPE)?;
    Ok(Box::new(IsSubtype { node_type }))
}
