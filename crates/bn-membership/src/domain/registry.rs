//! # Membership Registry
//!
//! A node's local vault: the membership and group records it has observed.
//! Records arrive out of band (own commits, propagation, backfill), so
//! `observe` keeps only the newest version of each record.

use std::collections::HashMap;

use super::entities::{GroupState, LedgerRecord, MembershipState};
use super::operations::Query;
use super::value_objects::{LinearId, MembershipStatus, NetworkId, Party, Permission};

/// Per-node store of observed membership and group records.
#[derive(Clone, Debug, Default)]
pub struct MembershipRegistry {
    memberships: HashMap<LinearId, MembershipState>,
    groups: HashMap<LinearId, GroupState>,
}

impl MembershipRegistry {
    /// Empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observed state. Returns `true` if it replaced an older
    /// version (or was new); stale or equal versions are ignored.
    pub fn observe(&mut self, record: LedgerRecord) -> bool {
        match record {
            LedgerRecord::Membership(m) => upsert(&mut self.memberships, m.linear_id, m, |s| s.version),
            LedgerRecord::Group(g) => upsert(&mut self.groups, g.linear_id, g, |s| s.version),
        }
    }

    /// Observe a batch of records, returning how many changed the vault.
    pub fn observe_all(&mut self, records: impl IntoIterator<Item = LedgerRecord>) -> usize {
        let mut changed = 0;
        for record in records {
            if self.observe(record) {
                changed += 1;
            }
        }
        changed
    }

    /// Membership by id.
    pub fn membership(&self, id: &LinearId) -> Option<&MembershipState> {
        self.memberships.get(id)
    }

    /// The membership `party` holds in `network_id`.
    ///
    /// If several records exist for the pair, the open one (pending or active)
    /// is preferred.
    pub fn membership_of(&self, network_id: NetworkId, party: &Party) -> Option<&MembershipState> {
        let mut found: Option<&MembershipState> = None;
        for m in self.memberships.values() {
            if m.network_id != network_id || m.party != *party {
                continue;
            }
            match found {
                Some(current) if current.status.blocks_new_request() => {}
                _ => found = Some(m),
            }
        }
        found
    }

    /// All memberships of a network.
    pub fn memberships_in(&self, network_id: NetworkId) -> Vec<&MembershipState> {
        self.memberships
            .values()
            .filter(|m| m.network_id == network_id)
            .collect()
    }

    /// Memberships whose status is in `statuses`.
    pub fn memberships_by_status(&self, statuses: &[MembershipStatus]) -> Vec<&MembershipState> {
        self.memberships
            .values()
            .filter(|m| statuses.contains(&m.status))
            .collect()
    }

    /// Whether any membership of the network has been observed.
    pub fn knows_network(&self, network_id: NetworkId) -> bool {
        self.memberships.values().any(|m| m.network_id == network_id)
    }

    /// Networks in which `party` holds an active membership with `permission`.
    pub fn administered_by(&self, party: &Party, permission: &Permission) -> Vec<NetworkId> {
        let mut networks: Vec<NetworkId> = self
            .memberships
            .values()
            .filter(|m| m.party == *party && m.can_administer(permission))
            .map(|m| m.network_id)
            .collect();
        networks.sort();
        networks.dedup();
        networks
    }

    /// Parties holding an active administrative membership in the network.
    pub fn authorities_of(&self, network_id: NetworkId) -> Vec<Party> {
        let mut parties: Vec<Party> = self
            .memberships
            .values()
            .filter(|m| {
                m.network_id == network_id
                    && m.is_active()
                    && m.roles.iter().any(|r| r.permissions.iter().any(is_admin))
            })
            .map(|m| m.party.clone())
            .collect();
        parties.sort();
        parties.dedup();
        parties
    }

    /// Group by id.
    pub fn group(&self, id: &LinearId) -> Option<&GroupState> {
        self.groups.get(id)
    }

    /// All groups of a network.
    pub fn groups_in(&self, network_id: NetworkId) -> Vec<&GroupState> {
        self.groups
            .values()
            .filter(|g| g.network_id == network_id)
            .collect()
    }

    /// Number of memberships held.
    pub fn membership_count(&self) -> usize {
        self.memberships.len()
    }

    /// Number of groups held.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Answer a query descriptor.
    pub fn query(&self, query: &Query) -> Vec<LedgerRecord> {
        match query {
            Query::GroupsInNetwork(network_id) => records(self.groups_in(*network_id)),
            Query::AllGroups => records(self.groups.values()),
            Query::GroupById(id) => records(self.group(id)),
            Query::MembershipsByStatus(statuses) => records(self.memberships_by_status(statuses)),
            Query::MembershipsInNetwork(network_id) => records(self.memberships_in(*network_id)),
            Query::MembershipById(id) => records(self.membership(id)),
        }
    }
}

fn is_admin(permission: &Permission) -> bool {
    !matches!(permission, Permission::Custom(_))
}

fn upsert<S, F>(map: &mut HashMap<LinearId, S>, id: LinearId, state: S, version: F) -> bool
where
    F: Fn(&S) -> u64,
{
    match map.get(&id) {
        Some(existing) if version(existing) >= version(&state) => false,
        _ => {
            map.insert(id, state);
            true
        }
    }
}

fn records<'a, T, I>(states: I) -> Vec<LedgerRecord>
where
    T: Clone + Into<LedgerRecord> + 'a,
    I: IntoIterator<Item = &'a T>,
{
    states.into_iter().cloned().map(Into::into).collect()
}
