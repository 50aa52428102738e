//! Node lifecycle events.
//!
//! Every mutation of a [`NodeStore`](crate::NodeStore) records one event.
//! Events accumulate in the store until a unit of work takes them with
//! [`NodeStore::take_events`](crate::NodeStore::take_events) and dispatches
//! them to the behaviours bound to their [`EventKind`].

use ferrule_foundation::{NodeRef, QName};

use crate::association::{AssociationRef, ChildAssocRef};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A recorded node lifecycle event.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeEvent {
    /// A node was created under a parent.
    NodeCreated {
        /// The new primary child association.
        assoc: ChildAssocRef,
    },
    /// A node (and its primary descendants) was deleted.
    NodeDeleted {
        /// The deleted node.
        node: NodeRef,
        /// Its former primary parent association.
        primary_parent: Option<ChildAssocRef>,
    },
    /// A node moved to a new primary parent.
    NodeMoved {
        /// The former primary association.
        from: ChildAssocRef,
        /// The new primary association.
        to: ChildAssocRef,
    },
    /// A node was copied.
    NodeCopied {
        /// The node that was copied.
        source: NodeRef,
        /// Primary association of the copy.
        copy: ChildAssocRef,
    },
    /// One or more properties changed.
    PropertiesUpdated {
        /// The node whose properties changed.
        node: NodeRef,
        /// Names of the changed properties.
        changed: Vec<QName>,
    },
    /// An aspect was applied.
    AspectAdded {
        /// The node.
        node: NodeRef,
        /// The aspect.
        aspect: QName,
    },
    /// An aspect was removed.
    AspectRemoved {
        /// The node.
        node: NodeRef,
        /// The aspect.
        aspect: QName,
    },
    /// A peer association was created.
    AssociationCreated(AssociationRef),
    /// A peer association was removed.
    AssociationRemoved(AssociationRef),
}

/// Discriminant of a [`NodeEvent`], used to bind behaviours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventKind {
    /// See [`NodeEvent::NodeCreated`].
    NodeCreated,
    /// See [`NodeEvent::NodeDeleted`].
    NodeDeleted,
    /// See [`NodeEvent::NodeMoved`].
    NodeMoved,
    /// See [`NodeEvent::NodeCopied`].
    NodeCopied,
    /// See [`NodeEvent::PropertiesUpdated`].
    PropertiesUpdated,
    /// See [`NodeEvent::AspectAdded`].
    AspectAdded,
    /// See [`NodeEvent::AspectRemoved`].
    AspectRemoved,
    /// See [`NodeEvent::AssociationCreated`].
    AssociationCreated,
    /// See [`NodeEvent::AssociationRemoved`].
    AssociationRemoved,
}

impl NodeEvent {
    /// Returns the kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NodeCreated { .. } => EventKind::NodeCreated,
            Self::NodeDeleted { .. } => EventKind::NodeDeleted,
            Self::NodeMoved { .. } => EventKind::NodeMoved,
            Self::NodeCopied { .. } => EventKind::NodeCopied,
            Self::PropertiesUpdated { .. } => EventKind::PropertiesUpdated,
            Self::AspectAdded { .. } => EventKind::AspectAdded,
            Self::AspectRemoved { .. } => EventKind::AspectRemoved,
            Self::AssociationCreated(_) => EventKind::AssociationCreated,
            Self::AssociationRemoved(_) => EventKind::AssociationRemoved,
        }
    }

    /// Returns the node the event is primarily about.
    #[must_use]
    pub fn node(&self) -> &NodeRef {
        match self {
            Self::NodeCreated { assoc } => &assoc.child,
            Self::NodeMoved { to, .. } => &to.child,
            Self::NodeCopied { copy, .. } => &copy.child,
            Self::NodeDeleted { node, .. }
            | Self::PropertiesUpdated { node, .. }
            | Self::AspectAdded { node, .. }
            | Self::AspectRemoved { node, .. } => node,
            Self::AssociationCreated(assoc) | Self::AssociationRemoved(assoc) => &assoc.source,
        }
    }
}
