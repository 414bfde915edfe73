//! # Domain Invariants
//!
//! Business rules shared by the coordinator's pre-checks (run against the
//! caller's local view) and the ledger contract (run against committed
//! state).

use std::collections::BTreeSet;

use super::entities::MembershipState;
use super::errors::MembershipError;
use super::value_objects::{LinearId, MembershipStatus, NetworkId, Party, Permission, Role};

/// Invariant: only an active holder of `permission` may administer.
///
/// `caller_membership` is the caller's own membership in the network the
/// operation targets, if it has one.
pub fn invariant_authorized(
    caller: &Party,
    caller_membership: Option<&MembershipState>,
    permission: &Permission,
) -> Result<(), MembershipError> {
    match caller_membership {
        Some(m) if m.party == *caller && m.can_administer(permission) => Ok(()),
        _ => Err(MembershipError::Unauthorized {
            party: caller.clone(),
            permission: permission.clone(),
        }),
    }
}

/// Invariant: at most one open (pending or active) membership per
/// (network, party).
///
/// A suspended party is reactivated, never re-onboarded, so a new request
/// over a suspended record is refused as well.
pub fn invariant_no_open_membership(
    existing: Option<&MembershipState>,
    party: &Party,
    network_id: NetworkId,
) -> Result<(), MembershipError> {
    match existing {
        None => Ok(()),
        Some(m) if m.status.blocks_new_request() => Err(MembershipError::DuplicateRequest {
            party: party.clone(),
            network_id,
            status: m.status,
        }),
        Some(m) => Err(MembershipError::OperationRejected(format!(
            "{} holds suspended membership {} in {}; it must be reactivated",
            party, m.linear_id, network_id
        ))),
    }
}

/// Invariant: status changes follow the state machine.
pub fn invariant_transition(
    current: MembershipStatus,
    next: MembershipStatus,
) -> Result<(), MembershipError> {
    if current.can_transition_to(next) {
        Ok(())
    } else {
        Err(MembershipError::InvalidTransition {
            from: current,
            to: next,
        })
    }
}

/// Invariant: every group participant is a membership of the group's network.
///
/// `network_of` resolves a membership id to the network it belongs to in
/// the view being checked.
pub fn invariant_participants_resolve<F>(
    network_id: NetworkId,
    participants: &BTreeSet<LinearId>,
    network_of: F,
) -> Result<(), MembershipError>
where
    F: Fn(&LinearId) -> Option<NetworkId>,
{
    for member in participants {
        if network_of(member) != Some(network_id) {
            return Err(MembershipError::UnknownMember {
                member: *member,
                network_id,
            });
        }
    }
    Ok(())
}

/// Invariant: a group modification changes something and keeps a usable name.
pub fn invariant_group_change(
    name: Option<&str>,
    participants: Option<&BTreeSet<LinearId>>,
) -> Result<(), MembershipError> {
    if name.is_none() && participants.is_none() {
        return Err(MembershipError::OperationRejected(
            "group modification must change the name or the participants".to_string(),
        ));
    }
    invariant_group_name(name.unwrap_or("unchanged"))
}

/// Invariant: group names are not blank.
pub fn invariant_group_name(name: &str) -> Result<(), MembershipError> {
    if name.trim().is_empty() {
        return Err(MembershipError::OperationRejected(
            "group name must not be blank".to_string(),
        ));
    }
    Ok(())
}

/// Invariant: an authority cannot suspend its own membership.
pub fn invariant_not_self_suspension(
    caller: &Party,
    target: &MembershipState,
) -> Result<(), MembershipError> {
    if target.party == *caller {
        return Err(MembershipError::OperationRejected(format!(
            "{} cannot suspend its own membership {}",
            caller, target.linear_id
        )));
    }
    Ok(())
}

/// Invariant: an authority cannot strip its own role administration.
pub fn invariant_retains_role_admin(
    caller: &Party,
    target: &MembershipState,
    roles: &BTreeSet<Role>,
) -> Result<(), MembershipError> {
    let keeps_admin = roles
        .iter()
        .any(|role| role.grants(&Permission::CanModifyRoles));
    if target.party == *caller && !keeps_admin {
        return Err(MembershipError::OperationRejected(format!(
            "{} cannot remove its own {} permission",
            caller,
            Permission::CanModifyRoles
        )));
    }
    Ok(())
}
