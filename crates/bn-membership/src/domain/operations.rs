//! # Operation and Query Descriptors
//!
//! What a node handle accepts through `submit` and `query`, and the receipt
//! the ledger platform returns for a committed operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use super::entities::{GroupState, LedgerRecord, MembershipState};
use super::errors::MembershipError;
use super::value_objects::{LinearId, MembershipStatus, NetworkId, Party, Role};

/// Operation submitted to the ledger platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a network, the submitter's founding membership and the default group.
    CreateNetwork {
        /// New network id.
        network_id: NetworkId,
        /// Id of the default group.
        default_group_id: LinearId,
        /// Name of the default group.
        default_group_name: String,
    },
    /// Request a pending membership for the submitter.
    RequestMembership {
        /// Authority the request is addressed to.
        authority: Party,
        /// Target network.
        network_id: NetworkId,
    },
    /// PENDING or SUSPENDED to ACTIVE.
    ActivateMembership {
        /// Membership to activate.
        membership_id: LinearId,
    },
    /// ACTIVE to SUSPENDED.
    SuspendMembership {
        /// Membership to suspend.
        membership_id: LinearId,
    },
    /// Replace a membership's roles.
    ModifyRoles {
        /// Membership to change.
        membership_id: LinearId,
        /// New role set.
        roles: BTreeSet<Role>,
    },
    /// Create a group.
    CreateGroup {
        /// Network the group belongs to.
        network_id: NetworkId,
        /// New group id.
        group_id: LinearId,
        /// Group name.
        name: String,
        /// Initial participant membership ids.
        participants: BTreeSet<LinearId>,
    },
    /// Rename and/or replace a group's participants.
    ModifyGroup {
        /// Group to change.
        group_id: LinearId,
        /// New name, if renaming.
        name: Option<String>,
        /// New participant set, if replacing.
        participants: Option<BTreeSet<LinearId>>,
    },
}

impl Operation {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateNetwork { .. } => OperationKind::CreateNetwork,
            Self::RequestMembership { .. } => OperationKind::RequestMembership,
            Self::ActivateMembership { .. } => OperationKind::ActivateMembership,
            Self::SuspendMembership { .. } => OperationKind::SuspendMembership,
            Self::ModifyRoles { .. } => OperationKind::ModifyRoles,
            Self::CreateGroup { .. } => OperationKind::CreateGroup,
            Self::ModifyGroup { .. } => OperationKind::ModifyGroup,
        }
    }
}

/// Operation discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// See [`Operation::CreateNetwork`].
    CreateNetwork,
    /// See [`Operation::RequestMembership`].
    RequestMembership,
    /// See [`Operation::ActivateMembership`].
    ActivateMembership,
    /// See [`Operation::SuspendMembership`].
    SuspendMembership,
    /// See [`Operation::ModifyRoles`].
    ModifyRoles,
    /// See [`Operation::CreateGroup`].
    CreateGroup,
    /// See [`Operation::ModifyGroup`].
    ModifyGroup,
}

impl OperationKind {
    /// Snake-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateNetwork => "create_network",
            Self::RequestMembership => "request_membership",
            Self::ActivateMembership => "activate_membership",
            Self::SuspendMembership => "suspend_membership",
            Self::ModifyRoles => "modify_roles",
            Self::CreateGroup => "create_group",
            Self::ModifyGroup => "modify_group",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only query against a node's local vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// All groups of one network.
    GroupsInNetwork(NetworkId),
    /// Every group the node has observed.
    AllGroups,
    /// One group by id.
    GroupById(LinearId),
    /// Memberships whose status is in the set.
    MembershipsByStatus(Vec<MembershipStatus>),
    /// All memberships of one network.
    MembershipsInNetwork(NetworkId),
    /// One membership by id.
    MembershipById(LinearId),
}

/// Acknowledgment of a committed operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// Ledger transaction id.
    pub tx_id: Uuid,
    /// What was committed.
    pub operation: OperationKind,
    /// Party whose node signed the transaction.
    pub signer: Party,
    /// Output records.
    pub outputs: Vec<LedgerRecord>,
    /// Commit time.
    pub committed_at: DateTime<Utc>,
}

impl TransactionReceipt {
    /// The sole membership output.
    pub fn single_membership(&self) -> Result<MembershipState, MembershipError> {
        let mut memberships = self
            .outputs
            .iter()
            .filter_map(|record| record.clone().into_membership());
        match (memberships.next(), memberships.next()) {
            (Some(state), None) => Ok(state),
            _ => Err(MembershipError::OperationRejected(format!(
                "{} transaction {} did not produce exactly one membership",
                self.operation, self.tx_id
            ))),
        }
    }

    /// The sole group output.
    pub fn single_group(&self) -> Result<GroupState, MembershipError> {
        let mut groups = self
            .outputs
            .iter()
            .filter_map(|record| record.clone().into_group());
        match (groups.next(), groups.next()) {
            (Some(state), None) => Ok(state),
            _ => Err(MembershipError::OperationRejected(format!(
                "{} transaction {} did not produce exactly one group",
                self.operation, self.tx_id
            ))),
        }
    }
}
