//! # Domain Errors
//!
//! Failure taxonomy for membership and group coordination.

use std::time::Duration;
use thiserror::Error;

use super::value_objects::{LinearId, MembershipStatus, NetworkId, Party, Permission};

/// Membership coordination error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    /// The ledger platform refused the operation.
    #[error("Operation rejected: {0}")]
    OperationRejected(String),

    /// Caller lacks the authority the operation requires.
    #[error("Unauthorized: {party} lacks {permission}")]
    Unauthorized {
        /// Calling party
        party: Party,
        /// Permission the operation needed
        permission: Permission,
    },

    /// Referenced record does not exist in the caller's view.
    #[error("Not found: {0}")]
    NotFound(LinearId),

    /// Group participant does not resolve to a membership of the network.
    #[error("Unknown member {member} in network {network_id}")]
    UnknownMember {
        /// Unresolved participant id
        member: LinearId,
        /// Network the group belongs to
        network_id: NetworkId,
    },

    /// A pending or active membership already exists for the pair.
    #[error("Duplicate request: {party} already has a {status} membership in {network_id}")]
    DuplicateRequest {
        /// Requesting party
        party: Party,
        /// Target network
        network_id: NetworkId,
        /// Status of the existing membership
        status: MembershipStatus,
    },

    /// Status machine violation.
    #[error("Invalid membership transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: MembershipStatus,
        /// Attempted status
        to: MembershipStatus,
    },

    /// Party holds no membership in the network.
    #[error("{party} is not a member of business network {network_id}")]
    NotMember {
        /// Verified party
        party: Party,
        /// Network checked
        network_id: NetworkId,
    },

    /// Party is a member but its membership is not active.
    #[error("{party} is not an active member of business network {network_id} ({status})")]
    NotActive {
        /// Verified party
        party: Party,
        /// Network checked
        network_id: NetworkId,
        /// Observed status
        status: MembershipStatus,
    },

    /// Active member without the required permission.
    #[error("{party} is not authorised for {permission} in business network {network_id}")]
    MissingPermission {
        /// Verified party
        party: Party,
        /// Network checked
        network_id: NetworkId,
        /// Required permission
        permission: Permission,
    },

    /// Node transport is inactive.
    #[error("Node unavailable: {0}")]
    NodeUnavailable(String),

    /// Poller exceeded its deadline.
    #[error("Timed out after {elapsed:?} waiting for: {pending:?}")]
    TimedOut {
        /// Time spent polling
        elapsed: Duration,
        /// Nodes that never satisfied the predicate
        pending: Vec<String>,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MembershipError {
    /// Stable label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OperationRejected(_) => "operation_rejected",
            Self::Unauthorized { .. } => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::UnknownMember { .. } => "unknown_member",
            Self::DuplicateRequest { .. } => "duplicate_request",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotMember { .. } => "not_member",
            Self::NotActive { .. } => "not_active",
            Self::MissingPermission { .. } => "missing_permission",
            Self::NodeUnavailable(_) => "node_unavailable",
            Self::TimedOut { .. } => "timed_out",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }

    /// Whether a poller should retry the node on its next sweep.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NodeUnavailable(_))
    }
}
