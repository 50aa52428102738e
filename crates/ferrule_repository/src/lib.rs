//! In-memory content repository for Ferrule.
//!
//! This crate provides:
//! - [`NodeStore`] - Persistent node, aspect, property and association storage
//! - [`NodeEvent`] - Lifecycle events recorded by every store mutation
//! - [`Repository`] - Committed state shared between units of work
//! - [`model`] - Well-known content model names

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod association;
pub mod event;
pub mod model;
pub mod repository;
pub mod store;

pub use association::{AssociationRef, ChildAssocRef};
pub use event::{EventKind, NodeEvent};
pub use repository::{Checkout, Repository};
pub use store::NodeStore;
