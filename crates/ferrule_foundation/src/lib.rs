//! Core types for Ferrule.
//!
//! This crate provides:
//! - [`NodeRef`] / [`StoreRef`] - Opaque references to repository content
//! - [`QName`] - Namespace-qualified names for types, aspects and properties
//! - [`Value`] - Property values stored on nodes and passed as rule parameters
//! - [`Error`] - Rich error types with rule and node context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod node;
pub mod qname;
pub mod value;

pub use error::{Error, ErrorContext, ErrorKind, Result, SemanticLimit};
pub use node::{NodeRef, StoreRef};
pub use qname::QName;
pub use value::Value;
