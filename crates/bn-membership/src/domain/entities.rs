//! # Domain Entities
//!
//! Membership and group records as stored in a node's vault.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::errors::MembershipError;
use super::value_objects::{LinearId, MembershipStatus, NetworkId, Party, Permission, Role};

/// One party's membership in one business network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipState {
    /// Unique, immutable identifier.
    pub linear_id: LinearId,
    /// Network the membership belongs to.
    pub network_id: NetworkId,
    /// Member identity.
    pub party: Party,
    /// Current status.
    pub status: MembershipStatus,
    /// Roles held by the member.
    pub roles: BTreeSet<Role>,
    /// Ledger version, bumped on every committed change.
    pub version: u64,
    /// When the membership was requested.
    pub issued_at: DateTime<Utc>,
    /// When the membership last changed.
    pub modified_at: DateTime<Utc>,
}

impl MembershipState {
    /// New pending membership request.
    pub fn pending(network_id: NetworkId, party: Party, now: DateTime<Utc>) -> Self {
        Self {
            linear_id: LinearId::new(),
            network_id,
            party,
            status: MembershipStatus::Pending,
            roles: BTreeSet::new(),
            version: 0,
            issued_at: now,
            modified_at: now,
        }
    }

    /// Founding membership of a network's authority: active, holding the
    /// authority role.
    pub fn founding(network_id: NetworkId, party: Party, now: DateTime<Utc>) -> Self {
        Self {
            status: MembershipStatus::Active,
            roles: BTreeSet::from([Role::authority()]),
            ..Self::pending(network_id, party, now)
        }
    }

    /// Check if the membership is active.
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }

    /// Check if the membership is pending.
    pub fn is_pending(&self) -> bool {
        self.status == MembershipStatus::Pending
    }

    /// Check if the membership is suspended.
    pub fn is_suspended(&self) -> bool {
        self.status == MembershipStatus::Suspended
    }

    /// Whether any held role grants `permission`.
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.roles.iter().any(|role| role.grants(permission))
    }

    /// Whether the member may act as an authority for `permission`.
    pub fn can_administer(&self, permission: &Permission) -> bool {
        self.is_active() && self.has_permission(permission)
    }

    /// Transition to a new status.
    pub fn transition_to(
        &mut self,
        next: MembershipStatus,
        now: DateTime<Utc>,
    ) -> Result<(), MembershipError> {
        if !self.status.can_transition_to(next) {
            return Err(MembershipError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch(now);
        Ok(())
    }

    /// Replace the role set.
    pub fn replace_roles(&mut self, roles: BTreeSet<Role>, now: DateTime<Utc>) {
        self.roles = roles;
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.modified_at = now;
    }
}

/// Named subset of a network's members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    /// Unique identifier.
    pub linear_id: LinearId,
    /// Network the group belongs to.
    pub network_id: NetworkId,
    /// Human-readable name.
    pub name: String,
    /// Membership ids of the participants.
    pub participants: BTreeSet<LinearId>,
    /// Ledger version, bumped on every committed change.
    pub version: u64,
    /// When the group was created.
    pub issued_at: DateTime<Utc>,
    /// When the group last changed.
    pub modified_at: DateTime<Utc>,
}

impl GroupState {
    /// Create a group.
    pub fn new(
        linear_id: LinearId,
        network_id: NetworkId,
        name: impl Into<String>,
        participants: BTreeSet<LinearId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            linear_id,
            network_id,
            name: name.into(),
            participants,
            version: 0,
            issued_at: now,
            modified_at: now,
        }
    }

    /// Number of participants.
    pub fn size(&self) -> usize {
        self.participants.len()
    }

    /// Check if `membership_id` participates in the group.
    pub fn contains(&self, membership_id: &LinearId) -> bool {
        self.participants.contains(membership_id)
    }

    /// Rename and/or replace the participant set wholesale.
    pub fn replace(
        &mut self,
        name: Option<String>,
        participants: Option<BTreeSet<LinearId>>,
        now: DateTime<Utc>,
    ) {
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(participants) = participants {
            self.participants = participants;
        }
        self.version += 1;
        self.modified_at = now;
    }
}

/// Any record a node's vault can hold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerRecord {
    /// A membership.
    Membership(MembershipState),
    /// A group.
    Group(GroupState),
}

impl LedgerRecord {
    /// Linear id of the wrapped record.
    pub fn linear_id(&self) -> LinearId {
        match self {
            Self::Membership(m) => m.linear_id,
            Self::Group(g) => g.linear_id,
        }
    }

    /// Network of the wrapped record.
    pub fn network_id(&self) -> NetworkId {
        match self {
            Self::Membership(m) => m.network_id,
            Self::Group(g) => g.network_id,
        }
    }

    /// Ledger version of the wrapped record.
    pub fn version(&self) -> u64 {
        match self {
            Self::Membership(m) => m.version,
            Self::Group(g) => g.version,
        }
    }

    /// The membership, if this is one.
    pub fn into_membership(self) -> Option<MembershipState> {
        match self {
            Self::Membership(m) => Some(m),
            Self::Group(_) => None,
        }
    }

    /// The group, if this is one.
    pub fn into_group(self) -> Option<GroupState> {
        match self {
            Self::Group(g) => Some(g),
            Self::Membership(_) => None,
        }
    }
}

impl From<MembershipState> for LedgerRecord {
    fn from(state: MembershipState) -> Self {
        Self::Membership(state)
    }
}

impl From<GroupState> for LedgerRecord {
    fn from(state: GroupState) -> Self {
        Self::Group(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(n: u8) -> Party {
        Party::new(format!("O=Party{}, L=Dublin, C=IE", n))
    }

    #[test]
    fn test_pending_membership() {
        let m = MembershipState::pending(NetworkId::new(), party(1), Utc::now());
        assert!(m.is_pending());
        assert!(m.roles.is_empty());
        assert_eq!(m.version, 0);
    }

    #[test]
    fn test_founding_membership_is_active_authority() {
        let m = MembershipState::founding(NetworkId::new(), party(0), Utc::now());
        assert!(m.is_active());
        assert!(m.can_administer(&Permission::CanActivateMembership));
        assert!(m.can_administer(&Permission::CanModifyGroups));
    }

    #[test]
    fn test_suspended_authority_cannot_administer() {
        let mut m = MembershipState::founding(NetworkId::new(), party(0), Utc::now());
        m.transition_to(MembershipStatus::Suspended, Utc::now()).unwrap();
        assert!(m.has_permission(&Permission::CanActivateMembership));
        assert!(!m.can_administer(&Permission::CanActivateMembership));
    }

    #[test]
    fn test_transition_bumps_version() {
        let mut m = MembershipState::pending(NetworkId::new(), party(1), Utc::now());
        m.transition_to(MembershipStatus::Active, Utc::now()).unwrap();
        assert_eq!(m.version, 1);
        m.transition_to(MembershipStatus::Suspended, Utc::now()).unwrap();
        m.transition_to(MembershipStatus::Active, Utc::now()).unwrap();
        assert_eq!(m.version, 3);
    }

    #[test]
    fn test_pending_cannot_be_suspended() {
        let mut m = MembershipState::pending(NetworkId::new(), party(1), Utc::now());
        let err = m
            .transition_to(MembershipStatus::Suspended, Utc::now())
            .unwrap_err();
        assert!(matches!(err, MembershipError::InvalidTransition { .. }));
        assert!(m.is_pending());
        assert_eq!(m.version, 0);
    }

    #[test]
    fn test_group_replace_is_wholesale() {
        let (a, b, c) = (LinearId::new(), LinearId::new(), LinearId::new());
        let mut g = GroupState::new(
            LinearId::new(),
            NetworkId::new(),
            "InitialGroup",
            BTreeSet::from([a, b]),
            Utc::now(),
        );
        g.replace(None, Some(BTreeSet::from([c])), Utc::now());
        assert_eq!(g.size(), 1);
        assert!(g.contains(&c));
        assert!(!g.contains(&a));
        assert_eq!(g.name, "InitialGroup");
        assert_eq!(g.version, 1);
    }

    #[test]
    fn test_group_rename_keeps_participants() {
        let a = LinearId::new();
        let mut g = GroupState::new(
            LinearId::new(),
            NetworkId::new(),
            "old",
            BTreeSet::from([a]),
            Utc::now(),
        );
        g.replace(Some("new".to_string()), None, Utc::now());
        assert_eq!(g.name, "new");
        assert!(g.contains(&a));
    }

    #[test]
    fn test_ledger_record_accessors() {
        let m = MembershipState::pending(NetworkId::new(), party(2), Utc::now());
        let id = m.linear_id;
        let record = LedgerRecord::from(m);
        assert_eq!(record.linear_id(), id);
        assert!(record.clone().into_group().is_none());
        assert!(record.into_membership().is_some());
    }
}

#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn status() -> impl Strategy<Value = MembershipStatus> {
        prop_oneof![
            Just(MembershipStatus::Pending),
            Just(MembershipStatus::Active),
            Just(MembershipStatus::Suspended),
        ]
    }

    proptest! {
        /// Property: only PENDING->ACTIVE, ACTIVE->SUSPENDED and SUSPENDED->ACTIVE
        /// are ever applied; anything else leaves the record untouched.
        #[test]
        fn prop_transitions_follow_state_machine(attempts in prop::collection::vec(status(), 0..40)) {
            let mut m = MembershipState::pending(
                NetworkId::new(),
                Party::new("O=Party1, L=Dublin, C=IE"),
                Utc::now(),
            );
            let mut applied = 0u64;

            for next in attempts {
                let before = m.clone();
                match m.transition_to(next, Utc::now()) {
                    Ok(()) => {
                        applied += 1;
                        prop_assert!(matches!(
                            (before.status, next),
                            (MembershipStatus::Pending, MembershipStatus::Active)
                                | (MembershipStatus::Active, MembershipStatus::Suspended)
                                | (MembershipStatus::Suspended, MembershipStatus::Active)
                        ));
                        prop_assert_eq!(m.status, next);
                    }
                    Err(_) => prop_assert_eq!(&m, &before),
                }
            }

            prop_assert_eq!(m.version, applied);
            if applied > 0 {
                prop_assert!(!m.is_pending());
            }
        }
    }
}
