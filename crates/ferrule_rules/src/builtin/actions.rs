//! Built-in action executors.
//!
//! Every executor acts on the actioned-upon node.

use ferrule_foundation::{NodeRef, QName, Result, Value};
use ferrule_repository::model::ASSOC_CONTAINS;
use ferrule_repository::NodeStore;

use crate::handler::{ActionExecutor, HandlerRegistry, ServiceRegistry};
use crate::model::RuleAction;
use crate::transaction::Transaction;

/// Adds an aspect.
pub const ADD_FEATURES: &str = "add-features";
/// Removes an aspect.
pub const REMOVE_FEATURES: &str = "remove-features";
/// Sets a property.
pub const SET_PROPERTY_VALUE: &str = "set-property-value";
/// Copies the node into a folder.
pub const COPY: &str = "copy";
/// Moves the node into a folder.
pub const MOVE: &str = "move";

/// Aspect to add or remove.
pub const PARAM_ASPECT_NAME: &str = "aspect-name";
/// Property to set.
pub const PARAM_PROPERTY: &str = "property";
/// Value to set.
pub const PARAM_VALUE: &str = "value";
/// Folder to copy or move into.
pub const PARAM_DESTINATION_FOLDER: &str = "destination-folder";
/// Whether a copy includes the node's children.
pub const PARAM_DEEP_COPY: &str = "deep-copy";

pub(crate) fn register(registry: &mut HandlerRegistry) {
    registry.register_executor(ADD_FEATURES, add_features);
    registry.register_executor(REMOVE_FEATURES, remove_features);
    registry.register_executor(SET_PROPERTY_VALUE, set_property_value);
    registry.register_executor(COPY, copy);
    registry.register_executor(MOVE, move_node);
}

struct AddAspect {
    aspect: QName,
}

impl ActionExecutor for AddAspect {
    fn execute(&self, tx: &mut Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()> {
        tx.nodes_mut().add_aspect(actioned_upon, self.aspect.clone(), [])
    }
}

fn add_features(action: &RuleAction, _services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
    let aspect = action
        .parameters
        .require_name(&action.definition.name, PARAM_ASPECT_NAME)?;
    Ok(Box::new(AddAspect { aspect }))
}

struct RemoveAspect {
    aspect: QName,
}

impl ActionExecutor for RemoveAspect {
    fn execute(&self, tx: &mut Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()> {
        tx.nodes_mut().remove_aspect(actioned_upon, &self.aspect)?;
        Ok(())
    }
}

fn remove_features(action: &RuleAction, _services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
    let aspect = action
        .parameters
        .require_name(&action.definition.name, PARAM_ASPECT_NAME)?;
    Ok(Box::new(RemoveAspect { aspect }))
}

struct SetProperty {
    property: QName,
    value: Value,
}

impl ActionExecutor for SetProperty {
    fn execute(&self, tx: &mut Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()> {
        tx.nodes_mut()
            .set_property(actioned_upon, self.property.clone(), self.value.clone())
    }
}

fn set_property_value(action: &RuleAction, _services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
    let definition = &action.definition.name;
    Ok(Box::new(SetProperty {
        property: action.parameters.require_name(definition, PARAM_PROPERTY)?,
        value: action.parameters.require_value(definition, PARAM_VALUE)?,
    }))
}

/// Name of `node` within its parent, or its id for store roots.
fn child_name(nodes: &NodeStore, node: &NodeRef) -> Result<QName> {
    Ok(match nodes.primary_parent(node)? {
        Some(assoc) => assoc.qname,
        None => QName::new("", node.id()),
    })
}

struct CopyNode {
    destination: NodeRef,
    deep: bool,
}

impl ActionExecutor for CopyNode {
    fn execute(&self, tx: &mut Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()> {
        let nodes = tx.nodes_mut();
        let name = child_name(nodes, actioned_upon)?;
        nodes.copy_node(actioned_upon, &self.destination, ASSOC_CONTAINS, name, self.deep)?;
        Ok(())
    }
}

fn copy(action: &RuleAction, _services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
    let definition = &action.definition.name;
    Ok(Box::new(CopyNode {
        destination: action
            .parameters
            .require_node(definition, PARAM_DESTINATION_FOLDER)?,
        deep: action
            .parameters
            .optional_bool(definition, PARAM_DEEP_COPY)?
            .unwrap_or(false),
    }))
}

struct MoveNode {
    destination: NodeRef,
}

impl ActionExecutor for MoveNode {
    fn execute(&self, tx: &mut Transaction<'_>, _actionable: &NodeRef, actioned_upon: &NodeRef) -> Result<()> {
        let nodes = tx.nodes_mut();
        let name = child_name(nodes, actioned_upon)?;
        nodes.move_node(actioned_upon, &self.destination, ASSOC_CONTAINS, name)?;
        Ok(())
    }
}

fn move_node(action: &RuleAction, _services: &ServiceRegistry) -> Result<Box<dyn ActionExecutor>> {
    let destination = action
        .parameters
        .require_node(&action.definition.name, PARAM_DESTINATION_FOLDER)?;
    Ok(Box::new(MoveNode { destination }))
}
