//! Membership Coordinator
//!
//! Issues membership lifecycle operations through the node that signs them.
//! Pre-checks use that node's local view; the ledger platform has the final
//! word and its rejections propagate unchanged.

use async_trait::async_trait;
use bn_telemetry::log_membership_event;
use futures::future::try_join_all;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use super::access::{any_authority, authorize, record};
use crate::domain::{
    invariant_group_name, invariant_no_open_membership, invariant_not_self_suspension,
    invariant_retains_role_admin, invariant_transition, LinearId, MembershipError,
    MembershipState, MembershipStatus, NetworkId, Operation, OperationKind, Party, Permission,
    Role,
};
use crate::ports::{
    membership_by_id, membership_of, memberships_in_network, MembershipCoordinatorApi, NodeHandle,
};

/// Membership lifecycle service.
///
/// Stateless apart from its onboarding mode: it holds no copy of any
/// registry and asks nodes for their current view on every call.
#[derive(Clone, Debug, Default)]
pub struct MembershipCoordinator {
    concurrent_onboarding: bool,
}

impl MembershipCoordinator {
    /// Coordinator that onboards batches one member at a time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: issue independent batch operations concurrently.
    pub fn with_concurrent_onboarding(mut self, enabled: bool) -> Self {
        self.concurrent_onboarding = enabled;
        self
    }

    /// Whether batches run concurrently.
    pub fn concurrent_onboarding(&self) -> bool {
        self.concurrent_onboarding
    }

    /// Request membership for every candidate, in input order.
    pub async fn request_memberships(
        &self,
        candidates: &[Arc<dyn NodeHandle>],
        authority: &Party,
        network_id: NetworkId,
    ) -> Result<Vec<MembershipState>, MembershipError> {
        if self.concurrent_onboarding {
            return try_join_all(
                candidates
                    .iter()
                    .map(|node| self.request_membership(node.as_ref(), authority, network_id)),
            )
            .await;
        }

        let mut requested = Vec::with_capacity(candidates.len());
        for node in candidates {
            requested.push(
                self.request_membership(node.as_ref(), authority, network_id)
                    .await?,
            );
        }
        Ok(requested)
    }

    /// Activate every membership, in input order.
    pub async fn activate_memberships(
        &self,
        authority: &dyn NodeHandle,
        membership_ids: &[LinearId],
    ) -> Result<Vec<MembershipState>, MembershipError> {
        if self.concurrent_onboarding {
            return try_join_all(
                membership_ids
                    .iter()
                    .map(|id| self.activate_membership(authority, *id)),
            )
            .await;
        }

        let mut activated = Vec::with_capacity(membership_ids.len());
        for id in membership_ids {
            activated.push(self.activate_membership(authority, *id).await?);
        }
        Ok(activated)
    }

    /// Resolve `membership_id` on the caller's node and check the caller
    /// administers `permission` in its network.
    ///
    /// `None` when the caller's view lacks the record: the ledger then
    /// resolves it and runs every check against the canonical state.
    async fn administered_target(
        &self,
        node: &dyn NodeHandle,
        membership_id: LinearId,
        permission: &Permission,
    ) -> Result<Option<MembershipState>, MembershipError> {
        match membership_by_id(node, membership_id).await? {
            Some(target) => {
                authorize(node, target.network_id, permission).await?;
                Ok(Some(target))
            }
            None => {
                any_authority(node, permission).await?;
                Ok(None)
            }
        }
    }

    async fn submit_create_network(
        &self,
        authority: &dyn NodeHandle,
        network_id: NetworkId,
        group_id: LinearId,
        group_name: &str,
    ) -> Result<MembershipState, MembershipError> {
        invariant_group_name(group_name)?;
        if !memberships_in_network(authority, network_id).await?.is_empty() {
            return Err(MembershipError::OperationRejected(format!(
                "business network {} already exists",
                network_id
            )));
        }

        let receipt = authority
            .submit(Operation::CreateNetwork {
                network_id,
                default_group_id: group_id,
                default_group_name: group_name.to_string(),
            })
            .await?;
        let founding = receipt.single_membership()?;

        info!(
            network_id = %network_id,
            authority = %authority.name(),
            group_id = %group_id,
            group_name,
            "Business network created"
        );
        Ok(founding)
    }

    async fn submit_request(
        &self,
        candidate: &dyn NodeHandle,
        authority: &Party,
        network_id: NetworkId,
    ) -> Result<MembershipState, MembershipError> {
        let existing = membership_of(candidate, network_id, candidate.identity()).await?;
        invariant_no_open_membership(existing.as_ref(), candidate.identity(), network_id)?;

        let receipt = candidate
            .submit(Operation::RequestMembership {
                authority: authority.clone(),
                network_id,
            })
            .await?;
        let membership = receipt.single_membership()?;

        log_membership_event!(
            info,
            "Membership requested",
            network_id,
            membership.linear_id,
            party = %candidate.name()
        );
        Ok(membership)
    }

    async fn submit_activation(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
    ) -> Result<MembershipState, MembershipError> {
        let target = self
            .administered_target(authority, membership_id, &Permission::CanActivateMembership)
            .await?;
        if let Some(target) = &target {
            invariant_transition(target.status, MembershipStatus::Active)?;
        }

        let from = target.map(|t| t.status);
        let receipt = authority
            .submit(Operation::ActivateMembership { membership_id })
            .await?;
        let membership = receipt.single_membership()?;

        log_membership_event!(
            info,
            "Membership activated",
            membership.network_id,
            membership_id,
            party = %membership.party,
            from = ?from
        );
        Ok(membership)
    }

    async fn submit_suspension(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
    ) -> Result<MembershipState, MembershipError> {
        let target = self
            .administered_target(authority, membership_id, &Permission::CanSuspendMembership)
            .await?;
        if let Some(target) = &target {
            invariant_not_self_suspension(authority.identity(), target)?;
            invariant_transition(target.status, MembershipStatus::Suspended)?;
        }

        let receipt = authority
            .submit(Operation::SuspendMembership { membership_id })
            .await?;
        let membership = receipt.single_membership()?;

        log_membership_event!(
            info,
            "Membership suspended",
            membership.network_id,
            membership_id,
            party = %membership.party
        );
        Ok(membership)
    }

    async fn submit_roles(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
        roles: BTreeSet<Role>,
    ) -> Result<MembershipState, MembershipError> {
        let target = self
            .administered_target(authority, membership_id, &Permission::CanModifyRoles)
            .await?;
        if let Some(target) = &target {
            invariant_retains_role_admin(authority.identity(), target, &roles)?;
        }

        let role_count = roles.len();
        let receipt = authority
            .submit(Operation::ModifyRoles {
                membership_id,
                roles,
            })
            .await?;
        let membership = receipt.single_membership()?;

        log_membership_event!(
            info,
            "Membership roles modified",
            membership.network_id,
            membership_id,
            party = %membership.party,
            role_count
        );
        Ok(membership)
    }
}

#[async_trait]
impl MembershipCoordinatorApi for MembershipCoordinator {
    async fn create_network(
        &self,
        authority: &dyn NodeHandle,
        network_id: NetworkId,
        group_id: LinearId,
        group_name: &str,
    ) -> Result<MembershipState, MembershipError> {
        let result = self
            .submit_create_network(authority, network_id, group_id, group_name)
            .await;
        record(OperationKind::CreateNetwork, authority, result)
    }

    async fn request_membership(
        &self,
        candidate: &dyn NodeHandle,
        authority: &Party,
        network_id: NetworkId,
    ) -> Result<MembershipState, MembershipError> {
        let result = self.submit_request(candidate, authority, network_id).await;
        record(OperationKind::RequestMembership, candidate, result)
    }

    async fn activate_membership(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
    ) -> Result<MembershipState, MembershipError> {
        let result = self.submit_activation(authority, membership_id).await;
        record(OperationKind::ActivateMembership, authority, result)
    }

    async fn suspend_membership(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
    ) -> Result<MembershipState, MembershipError> {
        let result = self.submit_suspension(authority, membership_id).await;
        record(OperationKind::SuspendMembership, authority, result)
    }

    async fn modify_roles(
        &self,
        authority: &dyn NodeHandle,
        membership_id: LinearId,
        roles: BTreeSet<Role>,
    ) -> Result<MembershipState, MembershipError> {
        let result = self.submit_roles(authority, membership_id, roles).await;
        record(OperationKind::ModifyRoles, authority, result)
    }
}
