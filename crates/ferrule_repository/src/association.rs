//! Association references.
//!
//! Child associations form the containment tree: every node except a store
//! root has exactly one parent. Peer associations are typed edges with no
//! containment semantics.

use std::fmt;

use ferrule_foundation::{NodeRef, QName};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A parent-to-child association.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChildAssocRef {
    /// Association type (e.g. `cm:contains`).
    pub assoc_type: QName,
    /// The parent node.
    pub parent: NodeRef,
    /// Name of the child within the parent.
    pub qname: QName,
    /// The child node.
    pub child: NodeRef,
}

impl fmt::Display for ChildAssocRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{} {}]-> {}",
            self.parent, self.assoc_type, self.qname, self.child
        )
    }
}

/// A typed peer association between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AssociationRef {
    /// Source node.
    pub source: NodeRef,
    /// Target node.
    pub target: NodeRef,
    /// Association type.
    pub assoc_type: QName,
}

impl fmt::Display for AssociationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.assoc_type, self.target)
    }
}
