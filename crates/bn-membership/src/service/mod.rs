//! # Service Module
//!
//! Application services implementing the inbound ports.

mod access;
pub mod coordinator;
pub mod groups;
pub mod verification;

pub use coordinator::MembershipCoordinator;
pub use groups::GroupCompositionManager;
pub use verification::{verify_active, verify_membership, verify_memberships};
