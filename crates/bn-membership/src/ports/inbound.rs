//! # Inbound Ports
//!
//! API traits defining what the membership and group coordination layer can
//! do. Every operation is issued through the node that signs it and returns
//! once that node's ledger platform acknowledges; other nodes converge later.

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::outbound::NodeHandle;
use crate::domain::{
    GroupNameGenerator, GroupState, LinearId, MembershipError, MembershipState, NetworkId, Party,
    Role,
};

/// Membership lifecycle API - inbound port.
#[async_trait]
pub trait MembershipCoordinatorApi: Send + Sync {
    /// Create a network with the caller as founding authority and a default
    /// group containing only the caller.
    async fn create_network(
        &self,
        authority: &dyn NodeHandle,
        network_id: NetworkId,
        group_id: LinearId,
        group_name: &str,
    ) -> Result<MembershipState, MembershipError>;

    /// Submit a pending membership request for the candidate's own party.
    async fn request_membership(
        &self,
        candidate: &dyn NodeHandle,
        authority: &Party,
        network_id: NetworkId,
    ) -> Result<MembershipState, MembershipError>;

    /// PENDING or SUSPENDED to ACTIVE.
    async fn activate_membership(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
    ) -> Result<MembershipState, MembershipError>;

    /// ACTIVE to SUSPENDED.
    async fn suspend_membership(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
    ) -> Result<MembershipState, MembershipError>;

    /// Replace the roles of a membership.
    async fn modify_roles(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
        roles: BTreeSet<Role>,
    ) -> Result<MembershipState, MembershipError>;
}

/// Group composition API - inbound port.
#[async_trait]
pub trait GroupCompositionApi: Send + Sync {
    /// Create a group whose participants all resolve in `network_id`.
    async fn create_group(
        &self,
        authority: &dyn NodeHandle,
        network_id: NetworkId,
        group_id: LinearId,
        name: &str,
        initial_members: BTreeSet<LinearId>,
    ) -> Result<GroupState, MembershipError>;

    /// Rename and/or replace the participants of a group wholesale.
    async fn modify_group(
        &self,
        authority: &dyn NodeHandle,
        group_id: LinearId,
        new_name: Option<String>,
        new_members: Option<BTreeSet<LinearId>>,
    ) -> Result<GroupState, MembershipError>;

    /// Create a group of the authority plus `members` under a generated name.
    async fn create_sub_group(
        &self,
        authority: &dyn NodeHandle,
        authority_membership: &MembershipState,
        members: BTreeSet<LinearId>,
        names: &GroupNameGenerator,
    ) -> Result<GroupState, MembershipError>;
}
