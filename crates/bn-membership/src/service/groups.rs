//! Group Composition Manager
//!
//! Maintains named subsets of a network's members. Participant sets are
//! replaced wholesale; concurrent modifications are not ordered here, the
//! last write the ledger commits wins.

use async_trait::async_trait;
use bn_telemetry::log_group_event;
use std::collections::{BTreeSet, HashSet};

use super::access::{any_authority, authorize, record};
use crate::domain::{
    invariant_group_change, invariant_group_name, invariant_participants_resolve,
    GroupNameGenerator, GroupState, LinearId, MembershipError, MembershipState, NetworkId,
    Operation, OperationKind, Permission,
};
use crate::ports::{group_by_id, memberships_in_network, GroupCompositionApi, NodeHandle};

/// Group composition service.
#[derive(Clone, Debug, Default)]
pub struct GroupCompositionManager;

impl GroupCompositionManager {
    /// Create a manager.
    pub fn new() -> Self {
        Self
    }

    /// Add `members` to a group, keeping its current participants.
    ///
    /// The current set comes from the caller's view, so a group the caller
    /// cannot see yet is `NotFound` for an authority.
    pub async fn add_participants(
        &self,
        authority: &dyn NodeHandle,
        group_id: LinearId,
        members: impl IntoIterator<Item = LinearId> + Send,
    ) -> Result<GroupState, MembershipError> {
        let current = match group_by_id(authority, group_id).await? {
            Some(group) => group,
            None => {
                any_authority(authority, &Permission::CanModifyGroups).await?;
                return Err(MembershipError::NotFound(group_id));
            }
        };
        let mut participants = current.participants;
        participants.extend(members);
        self.modify_group(authority, group_id, None, Some(participants))
            .await
    }

    /// Every id in `participants` must be a membership of `network_id` on the
    /// caller's node.
    async fn check_participants(
        &self,
        node: &dyn NodeHandle,
        network_id: NetworkId,
        participants: &BTreeSet<LinearId>,
    ) -> Result<(), MembershipError> {
        let known: HashSet<LinearId> = memberships_in_network(node, network_id)
            .await?
            .into_iter()
            .map(|m| m.linear_id)
            .collect();
        invariant_participants_resolve(network_id, participants, |id| {
            known.contains(id).then_some(network_id)
        })
    }

    async fn submit_create(
        &self,
        authority: &dyn NodeHandle,
        network_id: NetworkId,
        group_id: LinearId,
        name: &str,
        initial_members: BTreeSet<LinearId>,
    ) -> Result<GroupState, MembershipError> {
        authorize(authority, network_id, &Permission::CanModifyGroups).await?;
        invariant_group_name(name)?;
        if group_by_id(authority, group_id).await?.is_some() {
            return Err(MembershipError::OperationRejected(format!(
                "group {} already exists",
                group_id
            )));
        }
        self.check_participants(authority, network_id, &initial_members)
            .await?;

        let receipt = authority
            .submit(Operation::CreateGroup {
                network_id,
                group_id,
                name: name.to_string(),
                participants: initial_members,
            })
            .await?;
        let group = receipt.single_group()?;

        log_group_event!(
            info,
            "Group created",
            network_id,
            group_id,
            name = %group.name,
            size = group.size()
        );
        Ok(group)
    }

    async fn submit_modify(
        &self,
        authority: &dyn NodeHandle,
        group_id: LinearId,
        new_name: Option<String>,
        new_members: Option<BTreeSet<LinearId>>,
    ) -> Result<GroupState, MembershipError> {
        // A group missing from the caller's view is checked by the ledger.
        let current = group_by_id(authority, group_id).await?;
        match &current {
            Some(group) => {
                authorize(authority, group.network_id, &Permission::CanModifyGroups).await?;
                invariant_group_change(new_name.as_deref(), new_members.as_ref())?;
                if let Some(members) = &new_members {
                    self.check_participants(authority, group.network_id, members)
                        .await?;
                }
            }
            None => any_authority(authority, &Permission::CanModifyGroups).await?,
        }

        let previous_size = current.map(|g| g.size());
        let receipt = authority
            .submit(Operation::ModifyGroup {
                group_id,
                name: new_name,
                participants: new_members,
            })
            .await?;
        let group = receipt.single_group()?;

        log_group_event!(
            info,
            "Group modified",
            group.network_id,
            group_id,
            name = %group.name,
            previous_size = ?previous_size,
            size = group.size()
        );
        Ok(group)
    }
}

#[async_trait]
impl GroupCompositionApi for GroupCompositionManager {
    async fn create_group(
        &self,
        authority: &dyn NodeHandle,
        network_id: NetworkId,
        group_id: LinearId,
        name: &str,
        initial_members: BTreeSet<LinearId>,
    ) -> Result<GroupState, MembershipError> {
        let result = self
            .submit_create(authority, network_id, group_id, name, initial_members)
            .await;
        record(OperationKind::CreateGroup, authority, result)
    }

    async fn modify_group(
        &self,
        authority: &dyn NodeHandle,
        group_id: LinearId,
        new_name: Option<String>,
        new_members: Option<BTreeSet<LinearId>>,
    ) -> Result<GroupState, MembershipError> {
        let result = self
            .submit_modify(authority, group_id, new_name, new_members)
            .await;
        record(OperationKind::ModifyGroup, authority, result)
    }

    async fn create_sub_group(
        &self,
        authority: &dyn NodeHandle,
        authority_membership: &MembershipState,
        members: BTreeSet<LinearId>,
        names: &GroupNameGenerator,
    ) -> Result<GroupState, MembershipError> {
        let mut participants = members;
        participants.insert(authority_membership.linear_id);
        let name = names.next_name();
        self.create_group(
            authority,
            authority_membership.network_id,
            LinearId::new(),
            &name,
            participants,
        )
        .await
    }
}
