//! Committed repository state.
//!
//! A [`Repository`] holds the last committed [`NodeStore`] and a version
//! counter. Units of work check out an O(1) snapshot, mutate it privately
//! and install it with an optimistic version check, so concurrent units of
//! work never observe each other's uncommitted changes.

use ferrule_foundation::{Error, ErrorKind, Result, StoreRef};
use parking_lot::RwLock;
use tracing::debug;

use crate::store::NodeStore;

/// A snapshot checked out for a unit of work.
#[derive(Clone, Debug)]
pub struct Checkout {
    /// Private working copy of the node store.
    pub store: NodeStore,
    /// Committed version the copy was taken from.
    pub version: u64,
}

#[derive(Debug)]
struct Committed {
    store: NodeStore,
    version: u64,
}

/// Thread-safe holder of the committed node store.
#[derive(Debug)]
pub struct Repository {
    committed: RwLock<Committed>,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new(NodeStore::new())
    }
}

impl Repository {
    /// Creates a repository whose initial committed state is `store`.
    #[must_use]
    pub fn new(store: NodeStore) -> Self {
        Self {
            committed: RwLock::new(Committed { store, version: 0 }),
        }
    }

    /// Creates a repository containing a single store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be created.
    pub fn with_store(protocol: &str, identifier: &str) -> Result<(Self, StoreRef)> {
        let mut store = NodeStore::new();
        let store_ref = store.create_store(protocol, identifier)?;
        store.take_events();
        Ok((Self::new(store), store_ref))
    }

    /// Returns the current committed version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.committed.read().version
    }

    /// Returns a clone of the committed node store.
    #[must_use]
    pub fn snapshot(&self) -> NodeStore {
        self.committed.read().store.clone()
    }

    /// Checks out a private working copy and its base version.
    #[must_use]
    pub fn checkout(&self) -> Checkout {
        let committed = self.committed.read();
        Checkout {
            store: committed.store.clone(),
            version: committed.version,
        }
    }

    /// Installs `store` as the committed state and returns the new version.
    ///
    /// Any events still recorded in `store` are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::ConcurrentModification`] if another commit
    /// happened since `base_version` was checked out.
    pub fn commit(&self, base_version: u64, mut store: NodeStore) -> Result<u64> {
        store.take_events();
        let mut committed = self.committed.write();
        if committed.version != base_version {
            return Err(Error::new(ErrorKind::ConcurrentModification {
                expected: base_version,
                actual: committed.version,
            }));
        }
        committed.store = store;
        committed.version += 1;
        debug!(version = committed.version, "committed node store");
        Ok(committed.version)
    }
}
