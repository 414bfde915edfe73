//! Predicates evaluated against one node's local view.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::{LinearId, MembershipError, MembershipStatus};
use crate::ports::{group_by_id, membership_by_id, memberships_by_status, NodeHandle};

/// A fact the poller waits for on each node.
#[async_trait]
pub trait ConvergencePredicate: Send + Sync {
    /// Short description for logs.
    fn describe(&self) -> String;

    /// Whether `node` currently observes the fact.
    async fn is_satisfied(&self, node: &dyn NodeHandle) -> Result<bool, MembershipError>;
}

/// The group's participant count equals `expected_size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSizeReached {
    /// Group to inspect.
    pub group_id: LinearId,
    /// Participant count to wait for.
    pub expected_size: usize,
}

impl GroupSizeReached {
    /// Wait for `group_id` to hold `expected_size` participants.
    pub fn new(group_id: LinearId, expected_size: usize) -> Self {
        Self {
            group_id,
            expected_size,
        }
    }
}

#[async_trait]
impl ConvergencePredicate for GroupSizeReached {
    fn describe(&self) -> String {
        format!("group {} has {} participants", self.group_id, self.expected_size)
    }

    async fn is_satisfied(&self, node: &dyn NodeHandle) -> Result<bool, MembershipError> {
        let observed = group_by_id(node, self.group_id)
            .await?
            .map(|group| group.size());
        match observed {
            Some(size) if size == self.expected_size => {
                info!(node = %node.name(), group_id = %self.group_id, "{} has correct group size", node.name());
                Ok(true)
            }
            Some(size) => {
                debug!(
                    node = %node.name(),
                    "{} still waiting... Group members: {} out of {}",
                    node.name(),
                    size,
                    self.expected_size
                );
                Ok(false)
            }
            None => {
                debug!(node = %node.name(), group_id = %self.group_id, "Group not yet visible");
                Ok(false)
            }
        }
    }
}

/// At least one membership with a status in `statuses` is visible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusObserved {
    /// Accepted statuses.
    pub statuses: Vec<MembershipStatus>,
}

impl StatusObserved {
    /// Wait for any record in one of `statuses`.
    pub fn new(statuses: impl IntoIterator<Item = MembershipStatus>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ConvergencePredicate for StatusObserved {
    fn describe(&self) -> String {
        let labels: Vec<&str> = self.statuses.iter().map(|s| s.as_str()).collect();
        format!("a membership in {}", labels.join("|"))
    }

    async fn is_satisfied(&self, node: &dyn NodeHandle) -> Result<bool, MembershipError> {
        Ok(!memberships_by_status(node, &self.statuses).await?.is_empty())
    }
}

/// A specific membership is visible with a specific status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipStatusIs {
    /// Membership to inspect.
    pub membership_id: LinearId,
    /// Status to wait for.
    pub status: MembershipStatus,
}

impl MembershipStatusIs {
    /// Wait for `membership_id` to be visible as `status`.
    pub fn new(membership_id: LinearId, status: MembershipStatus) -> Self {
        Self {
            membership_id,
            status,
        }
    }
}

#[async_trait]
impl ConvergencePredicate for MembershipStatusIs {
    fn describe(&self) -> String {
        format!("membership {} is {}", self.membership_id, self.status)
    }

    async fn is_satisfied(&self, node: &dyn NodeHandle) -> Result<bool, MembershipError> {
        Ok(membership_by_id(node, self.membership_id)
            .await?
            .is_some_and(|m| m.status == self.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupState, MembershipState, NetworkId, Party};
    use crate::ports::MockNode;
    use chrono::Utc;
    use std::collections::BTreeSet;

    #[tokio::test]
    async fn test_group_size_predicate() {
        let node = MockNode::new(Party::new("O=Party0, L=Dublin, C=IE"));
        let group_id = LinearId::new();
        let predicate = GroupSizeReached::new(group_id, 2);
        assert!(!predicate.is_satisfied(&node).await.unwrap());

        let mut group = GroupState::new(
            group_id,
            NetworkId::new(),
            "InitialGroup",
            BTreeSet::from([LinearId::new()]),
            Utc::now(),
        );
        node.observe(group.clone());
        assert!(!predicate.is_satisfied(&node).await.unwrap());

        group.replace(None, Some(BTreeSet::from([LinearId::new(), LinearId::new()])), Utc::now());
        node.observe(group);
        assert!(predicate.is_satisfied(&node).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_predicates() {
        let node = MockNode::new(Party::new("O=Party1, L=Dublin, C=IE"));
        let m = MembershipState::pending(NetworkId::new(), node.identity().clone(), Utc::now());
        node.observe(m.clone());

        assert!(StatusObserved::new([MembershipStatus::Pending])
            .is_satisfied(&node)
            .await
            .unwrap());
        assert!(!StatusObserved::new([MembershipStatus::Suspended])
            .is_satisfied(&node)
            .await
            .unwrap());
        assert!(MembershipStatusIs::new(m.linear_id, MembershipStatus::Pending)
            .is_satisfied(&node)
            .await
            .unwrap());
        assert!(!MembershipStatusIs::new(m.linear_id, MembershipStatus::Active)
            .is_satisfied(&node)
            .await
            .unwrap());
    }

    #[test]
    fn test_describe() {
        let p = StatusObserved::new([MembershipStatus::Active, MembershipStatus::Suspended]);
        assert_eq!(p.describe(), "a membership in ACTIVE|SUSPENDED");
    }
}
