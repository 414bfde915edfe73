//! In-memory ledger platform.
//!
//! Stands in for the external ledger: a canonical registry validates and
//! commits operations, and every node keeps its own vault that learns about
//! commits out of band. The signer (and, for membership requests, the
//! addressed authority, which co-signs) is updated before `submit` returns;
//! everyone else entitled to a record receives it after
//! `propagation_delay + rand(0..=jitter)`, in commit order per node.
//!
//! Visibility:
//! - a membership reaches its own party, the network authorities and every
//!   ACTIVE member of the network;
//! - a group reaches the parties of its participants and the authorities,
//!   and a modification also reaches the participants it removed;
//! - a newly activated member is backfilled with the network's memberships
//!   and the groups visible to it.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, trace};
use uuid::Uuid;

use super::liveness::ConnectionMonitor;
use crate::config::LedgerConfig;
use crate::domain::{
    invariant_authorized, invariant_group_change, invariant_group_name,
    invariant_no_open_membership, invariant_not_self_suspension, invariant_participants_resolve,
    invariant_retains_role_admin, GroupState, LedgerRecord, LinearId, MembershipError,
    MembershipRegistry, MembershipState, MembershipStatus, NetworkId, Operation, Party, Permission,
    Query, TransactionReceipt,
};
use crate::ports::{NodeHandle, NodeProvisioner};

type Vault = Arc<RwLock<MembershipRegistry>>;

/// Records queued for one node.
#[derive(Debug)]
struct Delivery {
    records: Vec<LedgerRecord>,
    deliver_at: Instant,
}

struct Endpoint {
    vault: Vault,
    connection: Arc<ConnectionMonitor>,
    outbox: mpsc::UnboundedSender<Delivery>,
}

#[derive(Default)]
struct LedgerState {
    canonical: MembershipRegistry,
    networks: HashSet<NetworkId>,
    endpoints: HashMap<Party, Endpoint>,
    transactions: u64,
}

/// Validated commit waiting to be dispatched.
struct Commit {
    outputs: Vec<LedgerRecord>,
    co_signer: Option<Party>,
    backfill: Option<MembershipState>,
    replaced: Option<GroupState>,
}

/// Canonical ledger shared by all in-memory nodes.
pub struct InMemoryLedger {
    config: LedgerConfig,
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    /// Empty ledger.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> u64 {
        self.state.lock().transactions
    }

    /// Number of attached nodes.
    pub fn node_count(&self) -> usize {
        self.state.lock().endpoints.len()
    }

    fn attach(
        &self,
        party: Party,
        vault: Vault,
        connection: Arc<ConnectionMonitor>,
    ) -> Result<mpsc::UnboundedReceiver<Delivery>, MembershipError> {
        let mut state = self.state.lock();
        if state.endpoints.contains_key(&party) {
            return Err(MembershipError::OperationRejected(format!(
                "a node for {} is already attached",
                party
            )));
        }
        let (outbox, inbox) = mpsc::unbounded_channel();
        state.endpoints.insert(
            party,
            Endpoint {
                vault,
                connection,
                outbox,
            },
        );
        Ok(inbox)
    }

    /// Validate, apply and dispatch one operation signed by `signer`.
    pub fn commit(
        &self,
        signer: &Party,
        operation: Operation,
    ) -> Result<TransactionReceipt, MembershipError> {
        let kind = operation.kind();
        let mut state = self.state.lock();
        let commit = validate_and_apply(&mut state, signer, operation)?;
        state.transactions += 1;

        self.dispatch(&state, signer, &commit);

        let receipt = TransactionReceipt {
            tx_id: Uuid::new_v4(),
            operation: kind,
            signer: signer.clone(),
            outputs: commit.outputs,
            committed_at: Utc::now(),
        };
        debug!(
            tx_id = %receipt.tx_id,
            operation = %kind,
            signer = %signer,
            outputs = receipt.outputs.len(),
            "Transaction committed"
        );
        Ok(receipt)
    }

    fn dispatch(&self, state: &LedgerState, signer: &Party, commit: &Commit) {
        let canonical = &state.canonical;
        let mut per_party: BTreeMap<Party, Vec<LedgerRecord>> = BTreeMap::new();

        for record in &commit.outputs {
            for party in audience(canonical, record) {
                per_party.entry(party).or_default().push(record.clone());
            }
            // The signer always learns the outcome of its own transaction.
            let own = per_party.entry(signer.clone()).or_default();
            if !own.contains(record) {
                own.push(record.clone());
            }
        }

        // Removed participants learn they are no longer in the group.
        if let Some(previous) = &commit.replaced {
            for party in participant_parties(canonical, previous) {
                let entry = per_party.entry(party).or_default();
                for record in &commit.outputs {
                    if !entry.contains(record) {
                        entry.push(record.clone());
                    }
                }
            }
        }

        if let Some(member) = &commit.backfill {
            let entry = per_party.entry(member.party.clone()).or_default();
            for m in canonical.memberships_in(member.network_id) {
                entry.push(m.clone().into());
            }
            for g in canonical.groups_in(member.network_id) {
                let record = LedgerRecord::from(g.clone());
                if audience(canonical, &record).contains(&member.party) {
                    entry.push(record);
                }
            }
        }

        let now = Instant::now();
        for (party, records) in per_party {
            let Some(endpoint) = state.endpoints.get(&party) else {
                continue;
            };
            let synchronous = party == *signer || commit.co_signer.as_ref() == Some(&party);
            if synchronous {
                endpoint.vault.write().observe_all(records);
                continue;
            }
            let delivery = Delivery {
                records,
                deliver_at: now + self.propagation_delay(),
            };
            if endpoint.outbox.send(delivery).is_err() {
                trace!(party = %party, "Node delivery task has stopped");
            }
        }
    }

    fn propagation_delay(&self) -> Duration {
        let jitter_ms = self.config.propagation_jitter_ms;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.config.propagation_delay() + Duration::from_millis(jitter)
    }
}

// =============================================================================
// Contract Rules
// =============================================================================

fn validate_and_apply(
    state: &mut LedgerState,
    signer: &Party,
    operation: Operation,
) -> Result<Commit, MembershipError> {
    let now = Utc::now();
    let canonical = &mut state.canonical;

    match operation {
        Operation::CreateNetwork {
            network_id,
            default_group_id,
            default_group_name,
        } => {
            if state.networks.contains(&network_id) || canonical.knows_network(network_id) {
                return Err(MembershipError::OperationRejected(format!(
                    "business network {} already exists",
                    network_id
                )));
            }
            reject_existing_group(canonical, default_group_id)?;
            invariant_group_name(&default_group_name)?;

            let founding = MembershipState::founding(network_id, signer.clone(), now);
            let group = GroupState::new(
                default_group_id,
                network_id,
                default_group_name,
                BTreeSet::from([founding.linear_id]),
                now,
            );
            state.networks.insert(network_id);
            let outputs = vec![founding.into(), group.into()];
            canonical.observe_all(outputs.clone());
            Ok(Commit {
                outputs,
                co_signer: None,
                backfill: None,
                replaced: None,
            })
        }

        Operation::RequestMembership {
            authority,
            network_id,
        } => {
            if !state.networks.contains(&network_id) {
                return Err(MembershipError::OperationRejected(format!(
                    "unknown business network {}",
                    network_id
                )));
            }
            if !canonical.authorities_of(network_id).contains(&authority) {
                return Err(MembershipError::OperationRejected(format!(
                    "{} is not an authority of business network {}",
                    authority, network_id
                )));
            }
            invariant_no_open_membership(
                canonical.membership_of(network_id, signer),
                signer,
                network_id,
            )?;
            if let Some(endpoint) = state.endpoints.get(&authority) {
                if !endpoint.connection.active() {
                    return Err(MembershipError::NodeUnavailable(authority.to_string()));
                }
            }

            let membership = MembershipState::pending(network_id, signer.clone(), now);
            canonical.observe(membership.clone().into());
            Ok(Commit {
                outputs: vec![membership.into()],
                co_signer: Some(authority),
                backfill: None,
                replaced: None,
            })
        }

        Operation::ActivateMembership { membership_id } => {
            let mut target =
                administered_target(canonical, signer, membership_id, Permission::CanActivateMembership)?;
            target.transition_to(MembershipStatus::Active, now)?;
            canonical.observe(target.clone().into());
            Ok(Commit {
                outputs: vec![target.clone().into()],
                co_signer: None,
                backfill: Some(target),
                replaced: None,
            })
        }

        Operation::SuspendMembership { membership_id } => {
            let mut target =
                administered_target(canonical, signer, membership_id, Permission::CanSuspendMembership)?;
            invariant_not_self_suspension(signer, &target)?;
            target.transition_to(MembershipStatus::Suspended, now)?;
            canonical.observe(target.clone().into());
            Ok(Commit {
                outputs: vec![target.into()],
                co_signer: None,
                backfill: None,
                replaced: None,
            })
        }

        Operation::ModifyRoles {
            membership_id,
            roles,
        } => {
            let mut target =
                administered_target(canonical, signer, membership_id, Permission::CanModifyRoles)?;
            invariant_retains_role_admin(signer, &target, &roles)?;
            target.replace_roles(roles, now);
            canonical.observe(target.clone().into());
            Ok(Commit {
                outputs: vec![target.into()],
                co_signer: None,
                backfill: None,
                replaced: None,
            })
        }

        Operation::CreateGroup {
            network_id,
            group_id,
            name,
            participants,
        } => {
            invariant_authorized(
                signer,
                canonical.membership_of(network_id, signer),
                &Permission::CanModifyGroups,
            )?;
            reject_existing_group(canonical, group_id)?;
            invariant_group_name(&name)?;
            invariant_participants_resolve(network_id, &participants, |id| {
                canonical.membership(id).map(|m| m.network_id)
            })?;

            let group = GroupState::new(group_id, network_id, name, participants, now);
            canonical.observe(group.clone().into());
            Ok(Commit {
                outputs: vec![group.into()],
                co_signer: None,
                backfill: None,
                replaced: None,
            })
        }

        Operation::ModifyGroup {
            group_id,
            name,
            participants,
        } => {
            let mut group = match canonical.group(&group_id) {
                Some(group) => group.clone(),
                None => return Err(unresolved(canonical, signer, group_id, Permission::CanModifyGroups)),
            };
            invariant_authorized(
                signer,
                canonical.membership_of(group.network_id, signer),
                &Permission::CanModifyGroups,
            )?;
            invariant_group_change(name.as_deref(), participants.as_ref())?;
            if let Some(members) = &participants {
                invariant_participants_resolve(group.network_id, members, |id| {
                    canonical.membership(id).map(|m| m.network_id)
                })?;
            }

            let previous = group.clone();
            group.replace(name, participants, now);
            canonical.observe(group.clone().into());
            Ok(Commit {
                outputs: vec![group.into()],
                co_signer: None,
                backfill: None,
                replaced: Some(previous),
            })
        }
    }
}

fn administered_target(
    canonical: &MembershipRegistry,
    signer: &Party,
    membership_id: LinearId,
    permission: Permission,
) -> Result<MembershipState, MembershipError> {
    let target = match canonical.membership(&membership_id) {
        Some(target) => target.clone(),
        None => return Err(unresolved(canonical, signer, membership_id, permission)),
    };
    invariant_authorized(
        signer,
        canonical.membership_of(target.network_id, signer),
        &permission,
    )?;
    Ok(target)
}

fn unresolved(
    canonical: &MembershipRegistry,
    signer: &Party,
    id: LinearId,
    permission: Permission,
) -> MembershipError {
    if canonical.administered_by(signer, &permission).is_empty() {
        MembershipError::Unauthorized {
            party: signer.clone(),
            permission,
        }
    } else {
        MembershipError::NotFound(id)
    }
}

fn reject_existing_group(
    canonical: &MembershipRegistry,
    group_id: LinearId,
) -> Result<(), MembershipError> {
    if canonical.group(&group_id).is_some() {
        return Err(MembershipError::OperationRejected(format!(
            "group {} already exists",
            group_id
        )));
    }
    Ok(())
}

/// Parties entitled to see `record`.
fn audience(canonical: &MembershipRegistry, record: &LedgerRecord) -> BTreeSet<Party> {
    let network_id = record.network_id();
    let mut parties: BTreeSet<Party> = canonical.authorities_of(network_id).into_iter().collect();
    match record {
        LedgerRecord::Membership(m) => {
            parties.insert(m.party.clone());
            parties.extend(
                canonical
                    .memberships_in(network_id)
                    .into_iter()
                    .filter(|other| other.is_active())
                    .map(|other| other.party.clone()),
            );
        }
        LedgerRecord::Group(g) => parties.extend(participant_parties(canonical, g)),
    }
    parties
}

fn participant_parties<'a>(
    canonical: &'a MembershipRegistry,
    group: &'a GroupState,
) -> impl Iterator<Item = Party> + 'a {
    group
        .participants
        .iter()
        .filter_map(|id| canonical.membership(id))
        .map(|m| m.party.clone())
}

// =============================================================================
// Nodes
// =============================================================================

/// A node backed by the in-memory ledger.
pub struct InMemoryNode {
    identity: Party,
    role: String,
    ledger: Arc<InMemoryLedger>,
    vault: Vault,
    connection: Arc<ConnectionMonitor>,
}

impl InMemoryNode {
    /// Role label the node was provisioned with.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Transport liveness of this node.
    pub fn connection(&self) -> &ConnectionMonitor {
        &self.connection
    }

    /// Stop the transport: calls fail and inbound records are held back.
    pub fn stop(&self) {
        self.connection.set_active(false);
    }

    /// Restart the transport and release held-back records.
    pub fn start(&self) {
        self.connection.set_active(true);
    }

    /// Copy of the node's vault.
    pub fn vault_snapshot(&self) -> MembershipRegistry {
        self.vault.read().clone()
    }

    fn ensure_active(&self) -> Result<(), MembershipError> {
        if self.connection.active() {
            Ok(())
        } else {
            Err(MembershipError::NodeUnavailable(self.identity.to_string()))
        }
    }
}

#[async_trait]
impl NodeHandle for InMemoryNode {
    fn identity(&self) -> &Party {
        &self.identity
    }

    async fn submit(&self, operation: Operation) -> Result<TransactionReceipt, MembershipError> {
        self.ensure_active()?;
        self.ledger.commit(&self.identity, operation)
    }

    async fn query(&self, query: Query) -> Result<Vec<LedgerRecord>, MembershipError> {
        self.ensure_active()?;
        Ok(self.vault.read().query(&query))
    }
}

async fn run_delivery(
    name: String,
    mut inbox: mpsc::UnboundedReceiver<Delivery>,
    vault: Vault,
    connection: Arc<ConnectionMonitor>,
) {
    while let Some(delivery) = inbox.recv().await {
        time::sleep_until(delivery.deliver_at).await;
        connection.wait_until_active().await;
        let changed = vault.write().observe_all(delivery.records);
        trace!(node = %name, changed, "Delivered ledger records");
    }
    trace!(node = %name, "Delivery task finished");
}

// =============================================================================
// Provisioning
// =============================================================================

/// Provisions in-memory nodes named `O=Party<N>, L=Dublin, C=IE`.
pub struct InMemoryNetwork {
    ledger: Arc<InMemoryLedger>,
    next_index: AtomicUsize,
}

impl InMemoryNetwork {
    /// Network over a fresh ledger.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            ledger: Arc::new(InMemoryLedger::new(config)),
            next_index: AtomicUsize::new(0),
        }
    }

    /// The shared ledger.
    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    /// Start a node. Requires a running Tokio runtime to host its delivery
    /// task.
    pub fn provision(&self, role_label: &str) -> Result<Arc<InMemoryNode>, MembershipError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|err| {
            MembershipError::NodeUnavailable(format!("no runtime to host node: {}", err))
        })?;

        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let identity = Party::new(format!("O=Party{}, L=Dublin, C=IE", index));
        let vault: Vault = Arc::new(RwLock::new(MembershipRegistry::new()));
        let connection = Arc::new(ConnectionMonitor::new(identity.name()));
        let inbox = self
            .ledger
            .attach(identity.clone(), Arc::clone(&vault), Arc::clone(&connection))?;

        runtime.spawn(run_delivery(
            identity.to_string(),
            inbox,
            Arc::clone(&vault),
            Arc::clone(&connection),
        ));
        connection.set_active(true);

        debug!(node = %identity, role = role_label, "Provisioned in-memory node");
        Ok(Arc::new(InMemoryNode {
            identity,
            role: role_label.to_string(),
            ledger: Arc::clone(&self.ledger),
            vault,
            connection,
        }))
    }
}

impl Default for InMemoryNetwork {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[async_trait]
impl NodeProvisioner for InMemoryNetwork {
    async fn provision_node(&self, role_label: &str) -> Result<Arc<dyn NodeHandle>, MembershipError> {
        let node: Arc<dyn NodeHandle> = self.provision(role_label)?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{group_by_id, membership_by_id, memberships_in_network};

    fn network() -> InMemoryNetwork {
        InMemoryNetwork::new(
            LedgerConfig::default()
                .with_propagation(Duration::from_millis(100), Duration::from_millis(50)),
        )
    }

    fn create(network_id: NetworkId, group_id: LinearId) -> Operation {
        Operation::CreateNetwork {
            network_id,
            default_group_id: group_id,
            default_group_name: "InitialGroup".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_provisioned_names_are_sequential() {
        let net = network();
        let a = net.provision("bno").unwrap();
        let b = net.provision("member").unwrap();
        assert_eq!(a.name(), "O=Party0, L=Dublin, C=IE");
        assert_eq!(b.name(), "O=Party1, L=Dublin, C=IE");
        assert_eq!(b.role(), "member");
        assert!(a.connection().active());
        assert_eq!(net.ledger().node_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_network_rejected() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let network_id = NetworkId::new();
        bno.submit(create(network_id, LinearId::new())).await.unwrap();

        let other = net.provision("bno").unwrap();
        let err = other
            .submit(create(network_id, LinearId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::OperationRejected(_)));
        assert_eq!(net.ledger().transaction_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_reaches_authority_synchronously() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let member = net.provision("member").unwrap();
        let network_id = NetworkId::new();
        bno.submit(create(network_id, LinearId::new())).await.unwrap();

        let receipt = member
            .submit(Operation::RequestMembership {
                authority: bno.identity().clone(),
                network_id,
            })
            .await
            .unwrap();
        let pending = receipt.single_membership().unwrap();
        assert!(pending.is_pending());
        assert!(membership_by_id(bno.as_ref(), pending.linear_id)
            .await
            .unwrap()
            .is_some());
        assert!(membership_by_id(member.as_ref(), pending.linear_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_propagates_after_delay_with_backfill() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let member = net.provision("member").unwrap();
        let network_id = NetworkId::new();
        let group_id = LinearId::new();
        bno.submit(create(network_id, group_id)).await.unwrap();
        let pending = member
            .submit(Operation::RequestMembership {
                authority: bno.identity().clone(),
                network_id,
            })
            .await
            .unwrap()
            .single_membership()
            .unwrap();

        bno.submit(Operation::ActivateMembership {
            membership_id: pending.linear_id,
        })
        .await
        .unwrap();

        // The member's own view lags behind.
        let seen = membership_by_id(member.as_ref(), pending.linear_id)
            .await
            .unwrap()
            .unwrap();
        assert!(seen.is_pending());

        time::sleep(Duration::from_millis(200)).await;
        let seen = membership_by_id(member.as_ref(), pending.linear_id)
            .await
            .unwrap()
            .unwrap();
        assert!(seen.is_active());
        // Backfill: the founding membership is now visible to the member.
        assert_eq!(
            memberships_in_network(member.as_ref(), network_id)
                .await
                .unwrap()
                .len(),
            2
        );
        // The default group only holds the authority, so it stays hidden.
        assert!(group_by_id(member.as_ref(), group_id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_contract_rejects_non_authority() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let member = net.provision("member").unwrap();
        let network_id = NetworkId::new();
        let founding = bno
            .submit(create(network_id, LinearId::new()))
            .await
            .unwrap()
            .single_membership()
            .unwrap();

        let err = member
            .submit(Operation::SuspendMembership {
                membership_id: founding.linear_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::Unauthorized { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_contract_rejects_unknown_participant() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let network_id = NetworkId::new();
        let group_id = LinearId::new();
        bno.submit(create(network_id, group_id)).await.unwrap();
        let before = group_by_id(bno.as_ref(), group_id).await.unwrap();

        let err = bno
            .submit(Operation::ModifyGroup {
                group_id,
                name: None,
                participants: Some(BTreeSet::from([LinearId::new()])),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::UnknownMember { .. }));
        assert_eq!(group_by_id(bno.as_ref(), group_id).await.unwrap(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_participant_receives_replacement() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let member = net.provision("member").unwrap();
        let network_id = NetworkId::new();
        let group_id = LinearId::new();
        let founding = bno
            .submit(create(network_id, group_id))
            .await
            .unwrap()
            .single_membership()
            .unwrap();
        let pending = member
            .submit(Operation::RequestMembership {
                authority: bno.identity().clone(),
                network_id,
            })
            .await
            .unwrap()
            .single_membership()
            .unwrap();
        bno.submit(Operation::ActivateMembership {
            membership_id: pending.linear_id,
        })
        .await
        .unwrap();
        bno.submit(Operation::ModifyGroup {
            group_id,
            name: None,
            participants: Some(BTreeSet::from([founding.linear_id, pending.linear_id])),
        })
        .await
        .unwrap();
        time::sleep(Duration::from_millis(200)).await;
        let seen = group_by_id(member.as_ref(), group_id).await.unwrap().unwrap();
        assert_eq!(seen.size(), 2);

        bno.submit(Operation::ModifyGroup {
            group_id,
            name: None,
            participants: Some(BTreeSet::from([founding.linear_id])),
        })
        .await
        .unwrap();
        time::sleep(Duration::from_millis(200)).await;
        let seen = group_by_id(member.as_ref(), group_id).await.unwrap().unwrap();
        assert_eq!(seen.size(), 1);
        assert!(!seen.contains(&pending.linear_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_contract_rejects_authority_of_other_network() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let other_bno = net.provision("bno").unwrap();
        let member = net.provision("member").unwrap();
        let network_id = NetworkId::new();
        let group_id = LinearId::new();
        bno.submit(create(network_id, group_id)).await.unwrap();
        other_bno
            .submit(create(NetworkId::new(), LinearId::new()))
            .await
            .unwrap();
        let pending = member
            .submit(Operation::RequestMembership {
                authority: bno.identity().clone(),
                network_id,
            })
            .await
            .unwrap()
            .single_membership()
            .unwrap();

        let err = other_bno
            .submit(Operation::ActivateMembership {
                membership_id: pending.linear_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::Unauthorized { .. }));

        // Authorization is checked before the shape of the change.
        let err = other_bno
            .submit(Operation::ModifyGroup {
                group_id,
                name: None,
                participants: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::Unauthorized { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_node_is_unavailable_and_catches_up() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let member = net.provision("member").unwrap();
        let network_id = NetworkId::new();
        bno.submit(create(network_id, LinearId::new())).await.unwrap();
        let pending = member
            .submit(Operation::RequestMembership {
                authority: bno.identity().clone(),
                network_id,
            })
            .await
            .unwrap()
            .single_membership()
            .unwrap();

        member.stop();
        assert!(member.query(Query::AllGroups).await.unwrap_err().is_transient());
        bno.submit(Operation::ActivateMembership {
            membership_id: pending.linear_id,
        })
        .await
        .unwrap();

        time::sleep(Duration::from_millis(500)).await;
        let held_back = member.vault_snapshot();
        assert!(held_back
            .membership(&pending.linear_id)
            .is_some_and(|m| m.is_pending()));

        member.start();
        time::sleep(Duration::from_millis(1)).await;
        let seen = membership_by_id(member.as_ref(), pending.linear_id)
            .await
            .unwrap()
            .unwrap();
        assert!(seen.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_authority_cannot_co_sign() {
        let net = network();
        let bno = net.provision("bno").unwrap();
        let member = net.provision("member").unwrap();
        let network_id = NetworkId::new();
        bno.submit(create(network_id, LinearId::new())).await.unwrap();

        bno.stop();
        let err = member
            .submit(Operation::RequestMembership {
                authority: bno.identity().clone(),
                network_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MembershipError::NodeUnavailable(_)));
    }

    #[tokio::test]
    async fn test_provision_through_port() {
        let net = InMemoryNetwork::default();
        let node = net.provision_node("bno").await.unwrap();
        assert_eq!(node.name(), "O=Party0, L=Dublin, C=IE");
    }

    #[test]
    fn test_provision_requires_runtime() {
        let net = InMemoryNetwork::default();
        assert!(matches!(
            net.provision("bno"),
            Err(MembershipError::NodeUnavailable(_))
        ));
    }
}
