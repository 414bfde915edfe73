//! Membership verification.
//!
//! Pre-condition checks that higher-level operations compose before acting
//! on behalf of a counterparty: partial verification (is the party a member
//! at all) and full verification (active, optionally holding a permission).

use crate::domain::{MembershipError, MembershipState, NetworkId, Party, Permission};
use crate::ports::{membership_of, memberships_in_network, NodeHandle};

/// The membership `party` holds in `network_id` as seen by `node`.
pub async fn verify_membership(
    node: &dyn NodeHandle,
    network_id: NetworkId,
    party: &Party,
) -> Result<MembershipState, MembershipError> {
    membership_of(node, network_id, party)
        .await?
        .ok_or_else(|| MembershipError::NotMember {
            party: party.clone(),
            network_id,
        })
}

/// Partial verification of several parties with a single query.
///
/// Fails on the first party that holds no membership.
pub async fn verify_memberships(
    node: &dyn NodeHandle,
    network_id: NetworkId,
    parties: &[Party],
) -> Result<Vec<MembershipState>, MembershipError> {
    let visible = memberships_in_network(node, network_id).await?;
    parties
        .iter()
        .map(|party| {
            let mut held: Vec<&MembershipState> =
                visible.iter().filter(|m| m.party == *party).collect();
            held.sort_by_key(|m| !m.status.blocks_new_request());
            held.first()
                .map(|m| (*m).clone())
                .ok_or_else(|| MembershipError::NotMember {
                    party: party.clone(),
                    network_id,
                })
        })
        .collect()
}

/// Full verification: member, ACTIVE, and holding `required` if given.
pub async fn verify_active(
    node: &dyn NodeHandle,
    network_id: NetworkId,
    party: &Party,
    required: Option<&Permission>,
) -> Result<MembershipState, MembershipError> {
    let membership = verify_membership(node, network_id, party).await?;
    if !membership.is_active() {
        return Err(MembershipError::NotActive {
            party: party.clone(),
            network_id,
            status: membership.status,
        });
    }
    if let Some(permission) = required {
        if !membership.has_permission(permission) {
            return Err(MembershipError::MissingPermission {
                party: party.clone(),
                network_id,
                permission: permission.clone(),
            });
        }
    }
    Ok(membership)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MembershipStatus, Role};
    use crate::ports::MockNode;
    use chrono::Utc;

    fn party(n: u8) -> Party {
        Party::new(format!("O=Party{}, L=Dublin, C=IE", n))
    }

    fn loan_issuer() -> Role {
        Role::new("LoanIssuer", [Permission::custom("CAN_ISSUE_LOAN")])
    }

    #[tokio::test]
    async fn test_partial_verification() {
        let network_id = NetworkId::new();
        let node = MockNode::new(party(0));
        node.observe(MembershipState::founding(network_id, party(0), Utc::now()));
        node.observe(MembershipState::pending(network_id, party(1), Utc::now()));

        assert!(verify_membership(&node, network_id, &party(1)).await.is_ok());
        assert_eq!(
            verify_membership(&node, network_id, &party(2)).await,
            Err(MembershipError::NotMember {
                party: party(2),
                network_id
            })
        );

        let both = verify_memberships(&node, network_id, &[party(0), party(1)])
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
        assert!(verify_memberships(&node, network_id, &[party(0), party(2)])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_full_verification_requires_active() {
        let network_id = NetworkId::new();
        let node = MockNode::new(party(0));
        node.observe(MembershipState::pending(network_id, party(1), Utc::now()));

        let err = verify_active(&node, network_id, &party(1), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MembershipError::NotActive {
                status: MembershipStatus::Pending,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_full_verification_checks_permission() {
        let network_id = NetworkId::new();
        let node = MockNode::new(party(0));
        let mut borrower = MembershipState::pending(network_id, party(1), Utc::now());
        borrower.transition_to(MembershipStatus::Active, Utc::now()).unwrap();
        let mut lender = MembershipState::pending(network_id, party(2), Utc::now());
        lender.transition_to(MembershipStatus::Active, Utc::now()).unwrap();
        lender.replace_roles([loan_issuer()].into(), Utc::now());
        node.observe(borrower);
        node.observe(lender);

        let issue_loan = Permission::custom("CAN_ISSUE_LOAN");
        assert!(verify_active(&node, network_id, &party(2), Some(&issue_loan))
            .await
            .is_ok());
        assert!(matches!(
            verify_active(&node, network_id, &party(1), Some(&issue_loan)).await,
            Err(MembershipError::MissingPermission { .. })
        ));
        assert!(verify_active(&node, network_id, &party(1), None).await.is_ok());
    }
}
