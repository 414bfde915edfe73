//! # Business Network Membership
//!
//! Membership and group coordination for business networks whose nodes each
//! keep their own, eventually-consistent view of the ledger.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Authorized membership lifecycle: request, activate, suspend, re-activate
//! - Named groups of members, validated against membership records
//! - Convergence detection across independently updating nodes
//!
//! ## Status Machine
//!
//! | From | To | Operation | Who |
//! |------|----|-----------|-----|
//! | (none) | PENDING | request | candidate |
//! | PENDING | ACTIVE | activate | authority |
//! | ACTIVE | SUSPENDED | suspend | authority |
//! | SUSPENDED | ACTIVE | activate | authority |
//!
//! An authority is an ACTIVE member holding the permission the operation
//! needs; the network's founder holds the `BNO` role with all of them.
//!
//! ## Module Structure
//!
//! ```text
//! bn-membership/
//! ├── domain/        # Records, statuses, roles, invariants, registry, errors
//! ├── ports/         # Coordinator/composition APIs, NodeHandle, NodeProvisioner
//! ├── service/       # MembershipCoordinator, GroupCompositionManager, verification
//! ├── convergence/   # ConvergencePoller and predicates
//! ├── adapters/      # In-memory ledger platform, connection liveness
//! └── config.rs      # PollerConfig, LedgerConfig
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let network = InMemoryNetwork::new(LedgerConfig::default());
//! let bno = network.provision_node("bno").await?;
//! let coordinator = MembershipCoordinator::new();
//!
//! let founding = coordinator
//!     .create_network(bno.as_ref(), NetworkId::new(), LinearId::new(), "InitialGroup")
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod convergence;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{ConnectionMonitor, InMemoryLedger, InMemoryNetwork, InMemoryNode};
pub use config::{LedgerConfig, PollerConfig};
pub use convergence::{
    ConvergencePoller, ConvergencePredicate, ConvergenceReport, GroupSizeReached,
    MembershipStatusIs, StatusObserved,
};
pub use domain::{
    GroupNameGenerator, GroupState, LedgerRecord, LinearId, MembershipError, MembershipRegistry,
    MembershipState, MembershipStatus, NetworkId, Operation, OperationKind, Party, Permission,
    Query, Role, TransactionReceipt, AUTHORITY_ROLE_NAME,
};
pub use ports::{
    all_groups, group_by_id, groups_in_network, membership_by_id, membership_of,
    memberships_by_status, memberships_in_network, GroupCompositionApi, MembershipCoordinatorApi,
    MockNode, NodeHandle, NodeProvisioner,
};
pub use service::{
    verify_active, verify_membership, verify_memberships, GroupCompositionManager,
    MembershipCoordinator,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default name of a network's initial group.
pub const DEFAULT_GROUP_NAME: &str = "InitialGroup";

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
