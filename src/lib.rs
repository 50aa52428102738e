//! Ferrule - Transactional rule engine over a content repository
//!
//! This crate re-exports all layers of the Ferrule system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: ferrule_rules       - Rule definitions, units of work, pending-rule drain
//! Layer 1: ferrule_repository  - Node store, lifecycle events, committed repository
//! Layer 0: ferrule_foundation  - Core types (NodeRef, QName, Value, Error)
//! ```

pub use ferrule_foundation as foundation;
pub use ferrule_repository as repository;
pub use ferrule_rules as rules;
