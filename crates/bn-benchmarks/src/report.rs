//! Phase timings of one benchmark run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A timed step of the scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Founding membership and default group.
    #[serde(rename = "Business Network Setup Time")]
    NetworkSetup,
    /// Request and activation of the initial participants.
    #[serde(rename = "Member Onboarding Time")]
    MemberOnboarding,
    /// Default group replaced with every initial member.
    #[serde(rename = "Default Group Setup Time")]
    DefaultGroupSetup,
    /// Membership request of the late joiner.
    #[serde(rename = "New Member Request Time")]
    NewMemberRequest,
    /// Activation of the late joiner.
    #[serde(rename = "Membership Activation Time")]
    MembershipActivation,
    /// Late joiner added to the default group.
    #[serde(rename = "Group Addition Time")]
    GroupAddition,
    /// Suspension committed by the authority.
    #[serde(rename = "Time taken to Run Suspend Membership Flow")]
    SuspendMembershipFlow,
    /// Suspension visible in the suspended member's vault.
    #[serde(rename = "Time taken to Register Suspension In Vault")]
    SuspensionInVault,
}

impl Phase {
    /// Every phase, in scenario order.
    pub const ALL: [Phase; 8] = [
        Phase::NetworkSetup,
        Phase::MemberOnboarding,
        Phase::DefaultGroupSetup,
        Phase::NewMemberRequest,
        Phase::MembershipActivation,
        Phase::GroupAddition,
        Phase::SuspendMembershipFlow,
        Phase::SuspensionInVault,
    ];

    /// Human-readable label, also used as the metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NetworkSetup => "Business Network Setup Time",
            Self::MemberOnboarding => "Member Onboarding Time",
            Self::DefaultGroupSetup => "Default Group Setup Time",
            Self::NewMemberRequest => "New Member Request Time",
            Self::MembershipActivation => "Membership Activation Time",
            Self::GroupAddition => "Group Addition Time",
            Self::SuspendMembershipFlow => "Time taken to Run Suspend Membership Flow",
            Self::SuspensionInVault => "Time taken to Register Suspension In Vault",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Elapsed time of one phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTiming {
    /// Which phase.
    pub phase: Phase,
    /// Wall-clock milliseconds.
    pub elapsed_ms: u64,
}

impl fmt::Display for PhaseTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}ms)", self.phase, self.elapsed_ms)
    }
}

/// Timings of a scenario run, in the order the phases ran.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Initial participants, excluding the authority and the late joiner.
    pub participants: usize,
    /// Recorded phases.
    pub phases: Vec<PhaseTiming>,
}

impl BenchmarkReport {
    /// Empty report for a run with `participants` initial members.
    pub fn new(participants: usize) -> Self {
        Self {
            participants,
            phases: Vec::with_capacity(Phase::ALL.len()),
        }
    }

    /// Record a phase. A phase recorded twice keeps the later timing.
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        match self.phases.iter_mut().find(|t| t.phase == phase) {
            Some(timing) => timing.elapsed_ms = elapsed_ms,
            None => self.phases.push(PhaseTiming { phase, elapsed_ms }),
        }
    }

    /// Elapsed time of `phase`, if it ran.
    pub fn elapsed(&self, phase: Phase) -> Option<Duration> {
        self.phases
            .iter()
            .find(|t| t.phase == phase)
            .map(|t| Duration::from_millis(t.elapsed_ms))
    }

    /// Phase label to elapsed milliseconds.
    pub fn as_millis_map(&self) -> BTreeMap<&'static str, u64> {
        self.phases
            .iter()
            .map(|t| (t.phase.label(), t.elapsed_ms))
            .collect()
    }

    /// Phases that took longer than `cutoff`. Equal to the cutoff passes.
    pub fn violations(&self, cutoff: Duration) -> Vec<PhaseTiming> {
        let cutoff_ms = u64::try_from(cutoff.as_millis()).unwrap_or(u64::MAX);
        self.phases
            .iter()
            .filter(|t| t.elapsed_ms > cutoff_ms)
            .copied()
            .collect()
    }
}
