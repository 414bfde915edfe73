//! # Convergence Module
//!
//! Cross-node agreement detection: predicates over a node's local view and
//! the poller that waits for every node to satisfy one.

pub mod poller;
pub mod predicates;

pub use poller::{ConvergencePoller, ConvergenceReport};
pub use predicates::{ConvergencePredicate, GroupSizeReached, MembershipStatusIs, StatusObserved};
