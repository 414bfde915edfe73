//! Convergence Poller
//!
//! Re-reads each node's local view until every node satisfies a predicate.
//! Nodes are removed from the working set as they converge. Between
//! incomplete sweeps the poller sleeps with capped exponential backoff (or
//! yields, for a zero interval), and gives up with `TimedOut` once the
//! optional deadline passes.

use bn_telemetry::{
    metric_inc, metric_observe, CONVERGENCE_DURATION, CONVERGENCE_QUERY_FAILURES,
    CONVERGENCE_SWEEPS,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use super::predicates::{ConvergencePredicate, GroupSizeReached, StatusObserved};
use crate::config::PollerConfig;
use crate::domain::{LinearId, MembershipError, MembershipStatus};
use crate::ports::NodeHandle;

/// Outcome of a successful wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvergenceReport {
    /// Nodes that were polled.
    pub nodes: usize,
    /// Sweeps over the working set, including the final one.
    pub sweeps: u32,
    /// Time from the first query until the working set emptied.
    pub elapsed: Duration,
}

struct Pending<'a> {
    node: &'a dyn NodeHandle,
    consecutive_failures: u32,
}

/// Waits for a set of nodes to converge on a predicate.
#[derive(Clone, Debug, Default)]
pub struct ConvergencePoller {
    config: PollerConfig,
}

impl ConvergencePoller {
    /// Poller with a validated configuration.
    pub fn new(config: PollerConfig) -> Result<Self, MembershipError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Poller without deadline or failure bound.
    pub fn unbounded() -> Self {
        Self {
            config: PollerConfig::unbounded(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Wait until every node in `nodes` satisfies `predicate`.
    pub async fn await_convergence<P>(
        &self,
        nodes: &[Arc<dyn NodeHandle>],
        predicate: &P,
    ) -> Result<ConvergenceReport, MembershipError>
    where
        P: ConvergencePredicate + ?Sized,
    {
        let started = Instant::now();
        let deadline = self.config.deadline().map(|d| started + d);
        let mut pending: Vec<Pending<'_>> = nodes
            .iter()
            .map(|node| Pending {
                node: node.as_ref(),
                consecutive_failures: 0,
            })
            .collect();
        let mut sweeps = 0u32;

        debug!(
            nodes = nodes.len(),
            predicate = %predicate.describe(),
            "Waiting for convergence"
        );

        while !pending.is_empty() {
            sweeps += 1;
            metric_inc!(CONVERGENCE_SWEEPS);

            let mut remaining = Vec::with_capacity(pending.len());
            for mut entry in pending {
                match self.evaluate(entry.node, predicate, deadline).await {
                    Ok(true) => {
                        debug!(node = %entry.node.name(), sweep = sweeps, "Node converged");
                    }
                    Ok(false) => {
                        entry.consecutive_failures = 0;
                        remaining.push(entry);
                    }
                    Err(err) if err.is_transient() => {
                        metric_inc!(CONVERGENCE_QUERY_FAILURES);
                        entry.consecutive_failures += 1;
                        warn!(
                            node = %entry.node.name(),
                            failures = entry.consecutive_failures,
                            error = %err,
                            "Query failed, retrying next sweep"
                        );
                        if self
                            .config
                            .max_consecutive_failures
                            .is_some_and(|max| entry.consecutive_failures >= max)
                        {
                            return Err(err);
                        }
                        remaining.push(entry);
                    }
                    Err(err) => return Err(err),
                }
            }
            pending = remaining;
            if pending.is_empty() {
                break;
            }

            let now = Instant::now();
            let mut pause = self.config.interval_after(sweeps);
            if let Some(deadline) = deadline {
                if now >= deadline {
                    return Err(timed_out(started, &pending));
                }
                pause = pause.min(deadline - now);
            }
            if pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                time::sleep(pause).await;
            }
        }

        let elapsed = started.elapsed();
        metric_observe!(CONVERGENCE_DURATION, elapsed.as_secs_f64());
        info!(
            nodes = nodes.len(),
            sweeps,
            elapsed_ms = elapsed.as_millis() as u64,
            predicate = %predicate.describe(),
            "Nodes converged"
        );
        Ok(ConvergenceReport {
            nodes: nodes.len(),
            sweeps,
            elapsed,
        })
    }

    /// Wait for `group_id` to hold `expected_size` participants on every node.
    pub async fn await_group_size(
        &self,
        nodes: &[Arc<dyn NodeHandle>],
        group_id: LinearId,
        expected_size: usize,
    ) -> Result<ConvergenceReport, MembershipError> {
        self.await_convergence(nodes, &GroupSizeReached::new(group_id, expected_size))
            .await
    }

    /// Wait for every node to observe a membership in one of `statuses`.
    pub async fn await_status(
        &self,
        nodes: &[Arc<dyn NodeHandle>],
        statuses: &[MembershipStatus],
    ) -> Result<ConvergenceReport, MembershipError> {
        self.await_convergence(nodes, &StatusObserved::new(statuses.iter().copied()))
            .await
    }

    async fn evaluate<P>(
        &self,
        node: &dyn NodeHandle,
        predicate: &P,
        deadline: Option<Instant>,
    ) -> Result<bool, MembershipError>
    where
        P: ConvergencePredicate + ?Sized,
    {
        match deadline {
            // A query that outlives the deadline counts as not yet converged;
            // the sweep loop then reports the timeout.
            Some(deadline) => time::timeout_at(deadline, predicate.is_satisfied(node))
                .await
                .unwrap_or(Ok(false)),
            None => predicate.is_satisfied(node).await,
        }
    }
}

fn timed_out(started: Instant, pending: &[Pending<'_>]) -> MembershipError {
    let pending: Vec<String> = pending
        .iter()
        .map(|entry| entry.node.name().to_string())
        .collect();
    warn!(pending = ?pending, "Convergence deadline exceeded");
    MembershipError::TimedOut {
        elapsed: started.elapsed(),
        pending,
    }
}
