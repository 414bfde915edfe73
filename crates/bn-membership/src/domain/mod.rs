//! # Domain Module
//!
//! Core domain types for business network membership: identifiers,
//! membership and group records, operation descriptors, invariants, group
//! naming and the per-node registry.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod naming;
pub mod operations;
pub mod registry;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use naming::{GroupNameGenerator, SUB_GROUP_PREFIX};
pub use operations::*;
pub use registry::MembershipRegistry;
pub use value_objects::*;
