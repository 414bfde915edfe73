//! # Outbound Ports
//!
//! What the coordination layer needs from the outside world: node handles
//! over an external ledger platform, and a way to provision them.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::domain::{
    GroupState, LedgerRecord, LinearId, MembershipError, MembershipRegistry, MembershipState,
    MembershipStatus, NetworkId, Operation, Party, Query, TransactionReceipt,
};

/// Handle to one independently-operated node.
///
/// `submit` blocks only until the node's ledger platform acknowledges the
/// operation; other nodes observe the outputs later. `query` reads the
/// node's local vault and may lag behind other nodes.
#[async_trait]
pub trait NodeHandle: Send + Sync {
    /// Party operating the node.
    fn identity(&self) -> &Party;

    /// Display name used in logs and timeout reports.
    fn name(&self) -> &str {
        self.identity().name()
    }

    /// Submit an operation signed by this node and await acknowledgment.
    async fn submit(&self, operation: Operation) -> Result<TransactionReceipt, MembershipError>;

    /// Read-only query against the node's local vault.
    async fn query(&self, query: Query) -> Result<Vec<LedgerRecord>, MembershipError>;
}

/// Produces running node handles.
#[async_trait]
pub trait NodeProvisioner: Send + Sync {
    /// Provision one node for the given role (e.g. `"bno"`, `"member"`).
    async fn provision_node(&self, role_label: &str) -> Result<Arc<dyn NodeHandle>, MembershipError>;
}

// =============================================================================
// Typed Query Helpers
// =============================================================================

/// Memberships on `node` whose status is in `statuses`.
pub async fn memberships_by_status(
    node: &dyn NodeHandle,
    statuses: &[MembershipStatus],
) -> Result<Vec<MembershipState>, MembershipError> {
    let records = node
        .query(Query::MembershipsByStatus(statuses.to_vec()))
        .await?;
    Ok(memberships(records))
}

/// All memberships of a network visible on `node`.
pub async fn memberships_in_network(
    node: &dyn NodeHandle,
    network_id: NetworkId,
) -> Result<Vec<MembershipState>, MembershipError> {
    let records = node.query(Query::MembershipsInNetwork(network_id)).await?;
    Ok(memberships(records))
}

/// One membership by id, if `node` has observed it.
pub async fn membership_by_id(
    node: &dyn NodeHandle,
    membership_id: LinearId,
) -> Result<Option<MembershipState>, MembershipError> {
    let records = node.query(Query::MembershipById(membership_id)).await?;
    Ok(memberships(records).into_iter().next())
}

/// The membership `party` holds in `network_id`, as seen by `node`.
///
/// Prefers the open (pending or active) record when several exist.
pub async fn membership_of(
    node: &dyn NodeHandle,
    network_id: NetworkId,
    party: &Party,
) -> Result<Option<MembershipState>, MembershipError> {
    let mut candidates: Vec<MembershipState> = memberships_in_network(node, network_id)
        .await?
        .into_iter()
        .filter(|m| m.party == *party)
        .collect();
    candidates.sort_by_key(|m| !m.status.blocks_new_request());
    Ok(candidates.into_iter().next())
}

/// All groups of a network visible on `node`.
pub async fn groups_in_network(
    node: &dyn NodeHandle,
    network_id: NetworkId,
) -> Result<Vec<GroupState>, MembershipError> {
    let records = node.query(Query::GroupsInNetwork(network_id)).await?;
    Ok(groups(records))
}

/// Every group visible on `node`.
pub async fn all_groups(node: &dyn NodeHandle) -> Result<Vec<GroupState>, MembershipError> {
    let records = node.query(Query::AllGroups).await?;
    Ok(groups(records))
}

/// One group by id, if `node` has observed it.
pub async fn group_by_id(
    node: &dyn NodeHandle,
    group_id: LinearId,
) -> Result<Option<GroupState>, MembershipError> {
    let records = node.query(Query::GroupById(group_id)).await?;
    Ok(groups(records).into_iter().next())
}

fn memberships(records: Vec<LedgerRecord>) -> Vec<MembershipState> {
    records
        .into_iter()
        .filter_map(LedgerRecord::into_membership)
        .collect()
}

fn groups(records: Vec<LedgerRecord>) -> Vec<GroupState> {
    records
        .into_iter()
        .filter_map(LedgerRecord::into_group)
        .collect()
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

/// Mock node: a bare vault that never commits.
///
/// Records are placed directly with [`MockNode::observe`]; every `submit` is
/// recorded and rejected. Queries can be made to fail transiently.
pub struct MockNode {
    identity: Party,
    vault: RwLock<MembershipRegistry>,
    failing_queries: AtomicU32,
    submitted: Mutex<Vec<Operation>>,
}

impl MockNode {
    /// Empty mock node operated by `identity`.
    pub fn new(identity: Party) -> Self {
        Self {
            identity,
            vault: RwLock::new(MembershipRegistry::new()),
            failing_queries: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Place a record in the vault.
    pub fn observe(&self, record: impl Into<LedgerRecord>) {
        self.vault.write().observe(record.into());
    }

    /// Make the next `count` queries fail with `NodeUnavailable`.
    pub fn fail_next_queries(&self, count: u32) {
        self.failing_queries.store(count, Ordering::SeqCst);
    }

    /// Operations submitted so far.
    pub fn submitted(&self) -> Vec<Operation> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl NodeHandle for MockNode {
    fn identity(&self) -> &Party {
        &self.identity
    }

    async fn submit(&self, operation: Operation) -> Result<TransactionReceipt, MembershipError> {
        let kind = operation.kind();
        self.submitted.lock().push(operation);
        Err(MembershipError::OperationRejected(format!(
            "mock node {} does not commit {}",
            self.identity, kind
        )))
    }

    async fn query(&self, query: Query) -> Result<Vec<LedgerRecord>, MembershipError> {
        let failing = self
            .failing_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MembershipError::NodeUnavailable(self.identity.to_string()));
        }
        Ok(self.vault.read().query(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn party(n: u8) -> Party {
        Party::new(format!("O=Party{}, L=Dublin, C=IE", n))
    }

    #[tokio::test]
    async fn test_typed_helpers_filter_by_record_type() {
        let node = MockNode::new(party(0));
        let network_id = NetworkId::new();
        let bno = MembershipState::founding(network_id, party(0), Utc::now());
        let group = GroupState::new(
            LinearId::new(),
            network_id,
            "InitialGroup",
            BTreeSet::from([bno.linear_id]),
            Utc::now(),
        );
        node.observe(bno.clone());
        node.observe(group.clone());

        assert_eq!(memberships_in_network(&node, network_id).await.unwrap(), vec![bno.clone()]);
        assert_eq!(groups_in_network(&node, network_id).await.unwrap(), vec![group.clone()]);
        assert_eq!(all_groups(&node).await.unwrap().len(), 1);
        assert_eq!(group_by_id(&node, group.linear_id).await.unwrap(), Some(group));
        assert_eq!(membership_by_id(&node, bno.linear_id).await.unwrap(), Some(bno.clone()));
        assert_eq!(
            membership_of(&node, network_id, &party(0)).await.unwrap(),
            Some(bno)
        );
        assert!(membership_of(&node, network_id, &party(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memberships_by_status() {
        let node = MockNode::new(party(0));
        let network_id = NetworkId::new();
        node.observe(MembershipState::founding(network_id, party(0), Utc::now()));
        node.observe(MembershipState::pending(network_id, party(1), Utc::now()));

        let pending = memberships_by_status(&node, &[MembershipStatus::Pending]).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].party, party(1));
    }

    #[tokio::test]
    async fn test_mock_node_failing_queries() {
        let node = MockNode::new(party(0));
        node.fail_next_queries(2);
        assert!(node.query(Query::AllGroups).await.unwrap_err().is_transient());
        assert!(node.query(Query::AllGroups).await.is_err());
        assert!(node.query(Query::AllGroups).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_node_records_submissions() {
        let node = MockNode::new(party(0));
        let result = node
            .submit(Operation::ActivateMembership {
                membership_id: LinearId::new(),
            })
            .await;
        assert!(matches!(result, Err(MembershipError::OperationRejected(_))));
        assert_eq!(node.submitted().len(), 1);
        assert_eq!(node.name(), "O=Party0, L=Dublin, C=IE");
    }
}
