//! Store and node references.
//!
//! A [`NodeRef`] names a content item as `protocol://identifier/id`. The rule
//! engine treats it as an opaque value: two references are the same node
//! exactly when their store and id are equal.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind};

const PROTOCOL_SEPARATOR: &str = "://";

/// Reference to a store: a named, independent tree of nodes.
///
/// Displayed as `protocol://identifier`, e.g. `workspace://SpacesStore`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoreRef {
    protocol: Arc<str>,
    identifier: Arc<str>,
}

impl StoreRef {
    /// Protocol of the default workspace store.
    pub const WORKSPACE: &'static str = "workspace";

    /// Creates a store reference.
    #[must_use]
    pub fn new(protocol: &str, identifier: &str) -> Self {
        Self {
            protocol: Arc::from(protocol),
            identifier: Arc::from(identifier),
        }
    }

    /// Returns the store protocol.
    #[must_use]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Returns the store identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl fmt::Debug for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoreRef({self})")
    }
}

impl fmt::Display for StoreRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PROTOCOL_SEPARATOR}{}", self.protocol, self.identifier)
    }
}

impl FromStr for StoreRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, identifier) = s
            .split_once(PROTOCOL_SEPARATOR)
            .ok_or_else(|| invalid(s, "missing protocol separator"))?;
        if protocol.is_empty() || identifier.is_empty() || identifier.contains('/') {
            return Err(invalid(s, "expected protocol://identifier"));
        }
        Ok(Self::new(protocol, identifier))
    }
}

/// Reference to a single node within a store.
///
/// Equality and hashing are by `(store, id)`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeRef {
    store: StoreRef,
    id: Arc<str>,
}

impl NodeRef {
    /// Creates a node reference from a store and an id.
    #[must_use]
    pub fn new(store: StoreRef, id: &str) -> Self {
        Self {
            store,
            id: Arc::from(id),
        }
    }

    /// Allocates a reference with a fresh random id in the given store.
    #[must_use]
    pub fn generate(store: &StoreRef) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self::new(store.clone(), &id)
    }

    /// Returns the store this node lives in.
    #[must_use]
    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    /// Returns the node id, unique within its store.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({self})")
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.store, self.id)
    }
}

impl FromStr for NodeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, rest) = s
            .split_once(PROTOCOL_SEPARATOR)
            .ok_or_else(|| invalid(s, "missing protocol separator"))?;
        let split = rest
            .find('/')
            .ok_or_else(|| invalid(s, "missing node id"))?;
        let store_len = s.len() - rest.len() + split;
        let store: StoreRef = s[..store_len].parse()?;
        let id = &rest[split + 1..];
        if id.is_empty() || id.contains('/') {
            return Err(invalid(s, "expected protocol://identifier/id"));
        }
        Ok(Self::new(store, id))
    }
}

fn invalid(input: &str, reason: &str) -> Error {
    Error::new(ErrorKind::InvalidReference(format!("{input}: {reason}")))
}
