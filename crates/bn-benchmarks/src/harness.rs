//! Benchmark Harness
//!
//! Runs the "one more member joins an existing network" scenario against
//! freshly provisioned nodes and times each phase:
//!
//! 1. Authority creates the network (default group holds only itself)
//! 2. N participants request membership and are activated
//! 3. Default group is set to the authority plus all participants
//! 4. A late joiner requests membership
//! 5. Late joiner is activated, added to the group, then suspended
//! 6. The poller waits for the suspension to reach the joiner's vault
//!
//! Phases are timed with wall-clock deltas. Cutoff violations are reported
//! after every phase has been logged, never mid-run.

use bn_membership::{
    ConvergencePoller, GroupCompositionApi, GroupCompositionManager, LinearId,
    MembershipCoordinator, MembershipCoordinatorApi, MembershipError, MembershipStatus, NetworkId,
    NodeHandle, NodeProvisioner, PollerConfig, DEFAULT_GROUP_NAME,
};
use bn_telemetry::{metric_set, BENCHMARK_PHASE_DURATION_MS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::report::{BenchmarkReport, Phase, PhaseTiming};

/// Harness errors.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A scenario step failed.
    #[error(transparent)]
    Membership(#[from] MembershipError),

    /// One or more phases took longer than the cutoff.
    #[error("{} exceeded the benchmark of {}ms", describe(.violations), .cutoff_ms)]
    CutoffExceeded {
        /// Cutoff in milliseconds.
        cutoff_ms: u64,
        /// Every phase over the cutoff.
        violations: Vec<PhaseTiming>,
    },

    /// Invalid harness configuration.
    #[error("Invalid harness configuration: {0}")]
    Config(String),
}

fn describe(violations: &[PhaseTiming]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Scenario parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Initial participants besides the authority.
    pub participants: usize,
    /// Maximum allowed duration of any single phase (ms).
    pub cutoff_ms: u64,
    /// Name of the network's default group.
    pub default_group_name: String,
    /// Onboard the initial participants concurrently.
    pub concurrent_onboarding: bool,
    /// Poller used for the vault wait.
    pub poller: PollerConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            participants: 5,
            cutoff_ms: 300_000,
            default_group_name: DEFAULT_GROUP_NAME.to_string(),
            concurrent_onboarding: false,
            poller: PollerConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Builder: number of initial participants.
    pub fn with_participants(mut self, participants: usize) -> Self {
        self.participants = participants;
        self
    }

    /// Builder: per-phase cutoff.
    pub fn with_cutoff(mut self, cutoff: Duration) -> Self {
        self.cutoff_ms = u64::try_from(cutoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Builder: concurrent onboarding of the initial participants.
    pub fn with_concurrent_onboarding(mut self, enabled: bool) -> Self {
        self.concurrent_onboarding = enabled;
        self
    }

    /// Builder: poller configuration.
    pub fn with_poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    /// Per-phase cutoff.
    pub fn cutoff(&self) -> Duration {
        Duration::from_millis(self.cutoff_ms)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.cutoff_ms == 0 {
            return Err(HarnessError::Config("cutoff_ms cannot be 0".to_string()));
        }
        if self.default_group_name.trim().is_empty() {
            return Err(HarnessError::Config(
                "default_group_name cannot be blank".to_string(),
            ));
        }
        self.poller.validate()?;
        Ok(())
    }
}

/// Drives the scenario through a node provisioner.
pub struct BenchmarkHarness<P> {
    provisioner: P,
    config: HarnessConfig,
    coordinator: MembershipCoordinator,
    groups: GroupCompositionManager,
    poller: ConvergencePoller,
}

impl<P: NodeProvisioner> BenchmarkHarness<P> {
    /// Harness over `provisioner` with a validated configuration.
    pub fn new(provisioner: P, config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let poller = ConvergencePoller::new(config.poller.clone())?;
        let coordinator =
            MembershipCoordinator::new().with_concurrent_onboarding(config.concurrent_onboarding);
        Ok(Self {
            provisioner,
            config,
            coordinator,
            groups: GroupCompositionManager::new(),
            poller,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run the scenario once and return its phase timings.
    pub async fn run_scenario(&self) -> Result<BenchmarkReport, HarnessError> {
        let mut report = BenchmarkReport::new(self.config.participants);
        let bno = self.provisioner.provision_node("bno").await?;
        let network_id = NetworkId::new();
        let group_id = LinearId::new();

        info!(participants = self.config.participants, "Setting up Business Network");
        let founding = timed(&mut report, Phase::NetworkSetup, async {
            self.coordinator
                .create_network(
                    bno.as_ref(),
                    network_id,
                    group_id,
                    &self.config.default_group_name,
                )
                .await
        })
        .await?;

        let mut members: Vec<Arc<dyn NodeHandle>> = Vec::with_capacity(self.config.participants);
        for _ in 0..self.config.participants {
            members.push(self.provisioner.provision_node("member").await?);
        }

        let onboarded = timed(&mut report, Phase::MemberOnboarding, async {
            let requested = self
                .coordinator
                .request_memberships(&members, bno.identity(), network_id)
                .await?;
            let ids: Vec<LinearId> = requested.iter().map(|m| m.linear_id).collect();
            self.coordinator
                .activate_memberships(bno.as_ref(), &ids)
                .await
        })
        .await?;

        let mut group_members: BTreeSet<LinearId> =
            onboarded.iter().map(|m| m.linear_id).collect();
        group_members.insert(founding.linear_id);
        timed(&mut report, Phase::DefaultGroupSetup, async {
            self.groups
                .modify_group(bno.as_ref(), group_id, None, Some(group_members))
                .await
        })
        .await?;

        info!("Adding New Single Node");
        let new_node = self.provisioner.provision_node("member").await?;
        let joiner = timed(&mut report, Phase::NewMemberRequest, async {
            self.coordinator
                .request_membership(new_node.as_ref(), bno.identity(), network_id)
                .await
        })
        .await?;

        timed(&mut report, Phase::MembershipActivation, async {
            self.coordinator
                .activate_membership(bno.as_ref(), joiner.linear_id)
                .await
        })
        .await?;

        timed(&mut report, Phase::GroupAddition, async {
            self.groups
                .add_participants(bno.as_ref(), group_id, [joiner.linear_id])
                .await
        })
        .await?;

        timed(&mut report, Phase::SuspendMembershipFlow, async {
            self.coordinator
                .suspend_membership(bno.as_ref(), joiner.linear_id)
                .await
        })
        .await?;

        let watched = [new_node];
        timed(&mut report, Phase::SuspensionInVault, async {
            self.poller
                .await_status(&watched, &[MembershipStatus::Suspended])
                .await
        })
        .await?;

        Ok(report)
    }

    /// Run the scenario, log every phase, then fail if any phase exceeded
    /// the cutoff.
    pub async fn run_benchmark(&self) -> Result<BenchmarkReport, HarnessError> {
        let report = self.run_scenario().await?;

        for timing in &report.phases {
            info!(
                phase = %timing.phase,
                elapsed_ms = timing.elapsed_ms,
                "{} BenchMark {}",
                timing.phase,
                timing.elapsed_ms
            );
        }

        let violations = report.violations(self.config.cutoff());
        if !violations.is_empty() {
            for timing in &violations {
                warn!(
                    phase = %timing.phase,
                    elapsed_ms = timing.elapsed_ms,
                    cutoff_ms = self.config.cutoff_ms,
                    "Phase exceeded the benchmark cutoff"
                );
            }
            return Err(HarnessError::CutoffExceeded {
                cutoff_ms: self.config.cutoff_ms,
                violations,
            });
        }
        Ok(report)
    }
}

/// Await `step`, recording its duration under `phase` if it succeeds.
async fn timed<T, F>(
    report: &mut BenchmarkReport,
    phase: Phase,
    step: F,
) -> Result<T, MembershipError>
where
    F: Future<Output = Result<T, MembershipError>>,
{
    let started = Instant::now();
    let value = step.await?;
    let elapsed = started.elapsed();
    metric_set!(
        BENCHMARK_PHASE_DURATION_MS,
        &[phase.label()],
        elapsed.as_secs_f64() * 1_000.0
    );
    report.record(phase, elapsed);
    Ok(value)
}
