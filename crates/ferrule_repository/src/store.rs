//! Node storage with structural sharing.
//!
//! The `NodeStore` holds every store, node, aspect, property and
//! association. It is built on persistent maps, so cloning is O(1): a unit
//! of work checks out a clone, mutates it freely and either commits it or
//! drops it.

use std::collections::{BTreeMap, VecDeque};

use ferrule_foundation::{Error, ErrorKind, NodeRef, QName, Result, StoreRef, Value};
use tracing::trace;

use crate::association::{AssociationRef, ChildAssocRef};
use crate::event::NodeEvent;
use crate::model;

/// Stored state of a single node.
#[derive(Clone, Debug)]
struct NodeRecord {
    node_type: QName,
    aspects: im::OrdSet<QName>,
    properties: im::OrdMap<QName, Value>,
}

impl NodeRecord {
    fn new(node_type: QName) -> Self {
        Self {
            node_type,
            aspects: im::OrdSet::new(),
            properties: im::OrdMap::new(),
        }
    }
}

/// Persistent snapshot of the repository's nodes.
///
/// All mutations record a [`NodeEvent`]; see [`take_events`](Self::take_events).
#[derive(Clone, Debug, Default)]
pub struct NodeStore {
    /// Root node of each store.
    roots: im::OrdMap<StoreRef, NodeRef>,
    /// Node records.
    nodes: im::HashMap<NodeRef, NodeRecord>,
    /// Parent -> child associations, in creation order.
    children: im::HashMap<NodeRef, im::Vector<ChildAssocRef>>,
    /// Child -> parent association.
    parents: im::HashMap<NodeRef, ChildAssocRef>,
    /// Source -> peer associations.
    targets: im::HashMap<NodeRef, im::Vector<AssociationRef>>,
    /// Target -> peer associations.
    sources: im::HashMap<NodeRef, im::Vector<AssociationRef>>,
    /// Events recorded since the last take.
    events: im::Vector<NodeEvent>,
}

impl NodeStore {
    /// Creates an empty node store with no stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Stores
    // =========================================================================

    /// Creates a store and its root node.
    ///
    /// # Errors
    ///
    /// Returns an error if the store already exists.
    pub fn create_store(&mut self, protocol: &str, identifier: &str) -> Result<StoreRef> {
        let store = StoreRef::new(protocol, identifier);
        if self.roots.contains_key(&store) {
            return Err(Error::invalid_operation(format!(
                "store already exists: {store}"
            )));
        }
        let root = NodeRef::generate(&store);
        self.nodes
            .insert(root.clone(), NodeRecord::new(model::TYPE_STORE_ROOT));
        self.roots.insert(store.clone(), root.clone());
        trace!(store = %store, root = %root, "created store");
        Ok(store)
    }

    /// Returns all stores in a stable order.
    #[must_use]
    pub fn stores(&self) -> Vec<StoreRef> {
        self.roots.keys().cloned().collect()
    }

    /// Returns the root node of a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store does not exist.
    pub fn root_node(&self, store: &StoreRef) -> Result<NodeRef> {
        self.roots
            .get(store)
            .cloned()
            .ok_or_else(|| Error::store_not_found(store.clone()))
    }

    /// Returns true if the node is the root of its store.
    #[must_use]
    pub fn is_root(&self, node: &NodeRef) -> bool {
        self.roots.get(node.store()) == Some(node)
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// Returns true if the node exists.
    #[must_use]
    pub fn exists(&self, node: &NodeRef) -> bool {
        self.nodes.contains_key(node)
    }

    /// Returns the number of nodes across all stores, roots included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn record(&self, node: &NodeRef) -> Result<&NodeRecord> {
        self.nodes
            .get(node)
            .ok_or_else(|| Error::node_not_found(node.clone()))
    }

    fn record_mut(&mut self, node: &NodeRef) -> Result<&mut NodeRecord> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| Error::node_not_found(node.clone()))
    }

    /// Returns the type of a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn node_type(&self, node: &NodeRef) -> Result<QName> {
        Ok(self.record(node)?.node_type.clone())
    }

    /// Creates a node as a child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent does not exist.
    pub fn create_node(
        &mut self,
        parent: &NodeRef,
        assoc_type: QName,
        assoc_qname: QName,
        node_type: QName,
        properties: impl IntoIterator<Item = (QName, Value)>,
    ) -> Result<ChildAssocRef> {
        self.record(parent)?;
        let child = NodeRef::generate(parent.store());
        let mut record = NodeRecord::new(node_type);
        record.properties.extend(properties);
        self.nodes.insert(child.clone(), record);

        let assoc = ChildAssocRef {
            assoc_type,
            parent: parent.clone(),
            qname: assoc_qname,
            child,
        };
        self.link_child(assoc.clone());
        trace!(assoc = %assoc, "created node");
        self.events.push_back(NodeEvent::NodeCreated {
            assoc: assoc.clone(),
        });
        Ok(assoc)
    }

    /// Deletes a node together with all of its descendants.
    ///
    /// Every association touching a deleted node is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is a store root.
    pub fn delete_node(&mut self, node: &NodeRef) -> Result<()> {
        self.record(node)?;
        if self.is_root(node) {
            return Err(Error::invalid_operation(format!(
                "cannot delete store root {node}"
            )));
        }

        let primary_parent = self.parents.get(node).cloned();
        if let Some(assoc) = &primary_parent {
            self.unlink_child(assoc);
        }

        for removed in self.subtree(node) {
            self.nodes.remove(&removed);
            self.children.remove(&removed);
            self.parents.remove(&removed);
            if let Some(outgoing) = self.targets.remove(&removed) {
                for assoc in &outgoing {
                    remove_where(&mut self.sources, &assoc.target, |a| a == assoc);
                }
            }
            if let Some(incoming) = self.sources.remove(&removed) {
                for assoc in &incoming {
                    remove_where(&mut self.targets, &assoc.source, |a| a == assoc);
                }
            }
        }

        trace!(node = %node, "deleted node");
        self.events.push_back(NodeEvent::NodeDeleted {
            node: node.clone(),
            primary_parent,
        });
        Ok(())
    }

    /// Moves a node under a new parent.
    ///
    /// # Errors
    ///
    /// Returns an error if either node does not exist, if the node is a store
    /// root, or if the new parent is the node itself or one of its descendants.
    pub fn move_node(
        &mut self,
        node: &NodeRef,
        new_parent: &NodeRef,
        assoc_type: QName,
        assoc_qname: QName,
    ) -> Result<ChildAssocRef> {
        self.record(node)?;
        self.record(new_parent)?;
        if new_parent == node || self.ancestors(new_parent)?.contains(node) {
            return Err(Error::invalid_operation(format!(
                "cannot move {node} beneath itself"
            )));
        }
        let from = self.parents.get(node).cloned().ok_or_else(|| {
            Error::invalid_operation(format!("cannot move store root {node}"))
        })?;

        self.unlink_child(&from);
        let to = ChildAssocRef {
            assoc_type,
            parent: new_parent.clone(),
            qname: assoc_qname,
            child: node.clone(),
        };
        self.link_child(to.clone());
        trace!(from = %from, to = %to, "moved node");
        self.events.push_back(NodeEvent::NodeMoved {
            from,
            to: to.clone(),
        });
        Ok(to)
    }

    /// Copies a node under `dest_parent`.
    ///
    /// The copy receives the source's type, aspects and properties, plus the
    /// `copiedfrom` aspect referencing the source. With `copy_children`, the
    /// source's children are copied recursively beneath the copy.
    ///
    /// # Errors
    ///
    /// Returns an error if either node does not exist, or if a deep copy
    /// targets the source itself or one of its descendants.
    pub fn copy_node(
        &mut self,
        source: &NodeRef,
        dest_parent: &NodeRef,
        assoc_type: QName,
        assoc_qname: QName,
        copy_children: bool,
    ) -> Result<NodeRef> {
        let mut record = self.record(source)?.clone();
        self.record(dest_parent)?;
        if copy_children
            && (dest_parent == source || self.ancestors(dest_parent)?.contains(source))
        {
            return Err(Error::invalid_operation(format!(
                "cannot deep copy {source} into its own subtree"
            )));
        }

        let children = self.children.get(source).cloned().unwrap_or_default();

        record.aspects.insert(model::ASPECT_COPIED_FROM);
        record
            .properties
            .insert(model::PROP_COPY_REFERENCE, Value::Node(source.clone()));
        let copy = NodeRef::generate(dest_parent.store());
        self.nodes.insert(copy.clone(), record);

        let assoc = ChildAssocRef {
            assoc_type,
            parent: dest_parent.clone(),
            qname: assoc_qname,
            child: copy.clone(),
        };
        self.link_child(assoc.clone());
        trace!(source = %source, copy = %assoc, "copied node");
        self.events.push_back(NodeEvent::NodeCopied {
            source: source.clone(),
            copy: assoc,
        });

        if copy_children {
            for child in &children {
                self.copy_node(
                    &child.child,
                    &copy,
                    child.assoc_type.clone(),
                    child.qname.clone(),
                    true,
                )?;
            }
        }
        Ok(copy)
    }

    // =========================================================================
    // Aspects
    // =========================================================================

    /// Applies an aspect, setting any supplied properties.
    ///
    /// Applying an aspect the node already has only sets the properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn add_aspect(
        &mut self,
        node: &NodeRef,
        aspect: QName,
        properties: impl IntoIterator<Item = (QName, Value)>,
    ) -> Result<()> {
        let record = self.record_mut(node)?;
        let added = record.aspects.insert(aspect.clone()).is_none();
        let mut changed = Vec::new();
        for (name, value) in properties {
            if record.properties.get(&name) != Some(&value) {
                record.properties.insert(name.clone(), value);
                changed.push(name);
            }
        }

        if added {
            trace!(node = %node, aspect = %aspect, "added aspect");
            self.events.push_back(NodeEvent::AspectAdded {
                node: node.clone(),
                aspect,
            });
        }
        if !changed.is_empty() {
            self.events.push_back(NodeEvent::PropertiesUpdated {
                node: node.clone(),
                changed,
            });
        }
        Ok(())
    }

    /// Removes an aspect. Returns true if the node had it.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn remove_aspect(&mut self, node: &NodeRef, aspect: &QName) -> Result<bool> {
        let record = self.record_mut(node)?;
        let removed = record.aspects.remove(aspect).is_some();
        if removed {
            trace!(node = %node, aspect = %aspect, "removed aspect");
            self.events.push_back(NodeEvent::AspectRemoved {
                node: node.clone(),
                aspect: aspect.clone(),
            });
        }
        Ok(removed)
    }

    /// Returns true if the node has the aspect.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn has_aspect(&self, node: &NodeRef, aspect: &QName) -> Result<bool> {
        Ok(self.record(node)?.aspects.contains(aspect))
    }

    /// Returns the node's aspects in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn aspects(&self, node: &NodeRef) -> Result<Vec<QName>> {
        Ok(self.record(node)?.aspects.iter().cloned().collect())
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns a single property value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn property(&self, node: &NodeRef, name: &QName) -> Result<Option<Value>> {
        Ok(self.record(node)?.properties.get(name).cloned())
    }

    /// Returns all properties of a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn properties(&self, node: &NodeRef) -> Result<BTreeMap<QName, Value>> {
        Ok(self
            .record(node)?
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Sets a single property.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn set_property(
        &mut self,
        node: &NodeRef,
        name: QName,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.set_properties(node, [(name, value.into())])
    }

    /// Sets several properties, leaving others untouched.
    ///
    /// Records one `PropertiesUpdated` event naming the properties whose value
    /// actually changed; nothing is recorded if none did.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn set_properties(
        &mut self,
        node: &NodeRef,
        properties: impl IntoIterator<Item = (QName, Value)>,
    ) -> Result<()> {
        let record = self.record_mut(node)?;
        let mut changed = Vec::new();
        for (name, value) in properties {
            if record.properties.get(&name) != Some(&value) {
                record.properties.insert(name.clone(), value);
                changed.push(name);
            }
        }
        if !changed.is_empty() {
            trace!(node = %node, count = changed.len(), "updated properties");
            self.events.push_back(NodeEvent::PropertiesUpdated {
                node: node.clone(),
                changed,
            });
        }
        Ok(())
    }

    /// Removes a property, returning its former value.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn remove_property(&mut self, node: &NodeRef, name: &QName) -> Result<Option<Value>> {
        let record = self.record_mut(node)?;
        let old = record.properties.remove(name);
        if old.is_some() {
            self.events.push_back(NodeEvent::PropertiesUpdated {
                node: node.clone(),
                changed: vec![name.clone()],
            });
        }
        Ok(old)
    }

    // =========================================================================
    // Peer Associations
    // =========================================================================

    /// Creates a peer association. Creating an existing association is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if either node does not exist.
    pub fn create_association(
        &mut self,
        source: &NodeRef,
        target: &NodeRef,
        assoc_type: QName,
    ) -> Result<AssociationRef> {
        self.record(source)?;
        self.record(target)?;
        let assoc = AssociationRef {
            source: source.clone(),
            target: target.clone(),
            assoc_type,
        };
        let exists = self
            .targets
            .get(source)
            .is_some_and(|list| list.contains(&assoc));
        if exists {
            return Ok(assoc);
        }

        push_to(&mut self.targets, source, assoc.clone());
        push_to(&mut self.sources, target, assoc.clone());
        trace!(assoc = %assoc, "created association");
        self.events
            .push_back(NodeEvent::AssociationCreated(assoc.clone()));
        Ok(assoc)
    }

    /// Removes a peer association.
    ///
    /// # Errors
    ///
    /// Returns an error if the association does not exist.
    pub fn remove_association(
        &mut self,
        source: &NodeRef,
        target: &NodeRef,
        assoc_type: &QName,
    ) -> Result<()> {
        let assoc = AssociationRef {
            source: source.clone(),
            target: target.clone(),
            assoc_type: assoc_type.clone(),
        };
        let exists = self
            .targets
            .get(source)
            .is_some_and(|list| list.contains(&assoc));
        if !exists {
            return Err(Error::new(ErrorKind::AssociationNotFound {
                source_node: source.clone(),
                assoc_type: assoc_type.to_string(),
                target: target.clone(),
            }));
        }
        remove_where(&mut self.targets, source, |a| a == &assoc);
        remove_where(&mut self.sources, target, |a| a == &assoc);
        self.events.push_back(NodeEvent::AssociationRemoved(assoc));
        Ok(())
    }

    /// Returns the associations from `source`, optionally filtered by type.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn target_assocs(
        &self,
        source: &NodeRef,
        assoc_type: Option<&QName>,
    ) -> Result<Vec<AssociationRef>> {
        self.record(source)?;
        Ok(filter_assocs(self.targets.get(source), assoc_type))
    }

    /// Returns the associations to `target`, optionally filtered by type.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn source_assocs(
        &self,
        target: &NodeRef,
        assoc_type: Option<&QName>,
    ) -> Result<Vec<AssociationRef>> {
        self.record(target)?;
        Ok(filter_assocs(self.sources.get(target), assoc_type))
    }

    // =========================================================================
    // Child Associations
    // =========================================================================

    /// Returns the child associations of `parent`, optionally filtered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn child_assocs(
        &self,
        parent: &NodeRef,
        qname: Option<&QName>,
    ) -> Result<Vec<ChildAssocRef>> {
        self.record(parent)?;
        Ok(self
            .children
            .get(parent)
            .map(|list| {
                list.iter()
                    .filter(|a| qname.is_none_or(|q| &a.qname == q))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Returns the association to the node's parent; `None` for store roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn primary_parent(&self, node: &NodeRef) -> Result<Option<ChildAssocRef>> {
        self.record(node)?;
        Ok(self.parents.get(node).cloned())
    }

    /// Returns the node's ancestors, nearest first, ending at the store root.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    pub fn ancestors(&self, node: &NodeRef) -> Result<Vec<NodeRef>> {
        self.record(node)?;
        let mut out = Vec::new();
        let mut current = node;
        while let Some(assoc) = self.parents.get(current) {
            out.push(assoc.parent.clone());
            current = &assoc.parent;
        }
        Ok(out)
    }

    fn link_child(&mut self, assoc: ChildAssocRef) {
        self.parents.insert(assoc.child.clone(), assoc.clone());
        let parent = assoc.parent.clone();
        push_to(&mut self.children, &parent, assoc);
    }

    fn unlink_child(&mut self, assoc: &ChildAssocRef) {
        self.parents.remove(&assoc.child);
        remove_where(&mut self.children, &assoc.parent, |a| a.child == assoc.child);
    }

    /// The node and all of its descendants, breadth-first.
    fn subtree(&self, node: &NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([node.clone()]);
        while let Some(next) = queue.pop_front() {
            if let Some(children) = self.children.get(&next) {
                queue.extend(children.iter().map(|a| a.child.clone()));
            }
            out.push(next);
        }
        out
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Removes and returns the events recorded so far, oldest first.
    pub fn take_events(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.events).into_iter().collect()
    }

    /// Returns true if events are waiting to be taken.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }
}

fn push_to<T: Clone>(map: &mut im::HashMap<NodeRef, im::Vector<T>>, key: &NodeRef, item: T) {
    let mut list = map.get(key).cloned().unwrap_or_default();
    list.push_back(item);
    map.insert(key.clone(), list);
}

fn remove_where<T: Clone>(
    map: &mut im::HashMap<NodeRef, im::Vector<T>>,
    key: &NodeRef,
    pred: impl Fn(&T) -> bool,
) {
    if let Some(list) = map.get(key) {
        let kept: im::Vector<T> = list.iter().filter(|item| !pred(item)).cloned().collect();
        if kept.is_empty() {
            map.remove(key);
        } else {
            map.insert(key.clone(), kept);
        }
    }
}

fn filter_assocs(
    list: Option<&im::Vector<AssociationRef>>,
    assoc_type: Option<&QName>,
) -> Vec<AssociationRef> {
    list.map(|list| {
        list.iter()
            .filter(|a| assoc_type.is_none_or(|t| &a.assoc_type == t))
            .cloned()
            .collect()
    })
    .unwrap_or_default()
}

// =============================================================================
// Tests
// =============================================================================
