//! Prometheus metrics for business network coordination.
//!
//! All metrics follow the naming convention: `bn_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., operations_total)
//! - **Gauge**: Value that can go up or down (e.g., phase duration of the last run)
//! - **Histogram**: Distribution of values (e.g., convergence_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // MEMBERSHIP / GROUP OPERATIONS
    // =========================================================================

    /// Operations submitted by the coordinator and the composition manager
    pub static ref MEMBERSHIP_OPERATIONS: CounterVec = CounterVec::new(
        Opts::new("bn_membership_operations_total", "Membership and group operations submitted"),
        &["operation", "outcome"]  // outcome: committed or the error kind
    ).expect("metric creation failed");

    // =========================================================================
    // CONVERGENCE POLLING
    // =========================================================================

    /// Full sweeps over the pending node set
    pub static ref CONVERGENCE_SWEEPS: Counter = Counter::new(
        "bn_convergence_sweeps_total",
        "Total sweeps performed by the convergence poller"
    ).expect("metric creation failed");

    /// Node queries that failed during polling
    pub static ref CONVERGENCE_QUERY_FAILURES: Counter = Counter::new(
        "bn_convergence_query_failures_total",
        "Node queries that failed while waiting for convergence"
    ).expect("metric creation failed");

    /// Time until every node satisfied the predicate
    pub static ref CONVERGENCE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "bn_convergence_duration_seconds",
            "Time spent waiting for nodes to converge"
        ).buckets(exponential_buckets(0.001, 2.0, 18).expect("valid bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // BENCHMARK HARNESS
    // =========================================================================

    /// Duration of each phase of the last benchmark run
    pub static ref BENCHMARK_PHASE_DURATION_MS: GaugeVec = GaugeVec::new(
        Opts::new("bn_benchmark_phase_duration_ms", "Elapsed milliseconds per benchmark phase"),
        &["phase"]
    ).expect("metric creation failed");
}

/// Handle to the registry the metrics were registered with.
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Render all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        encode_registry(&self.registry)
    }
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(MEMBERSHIP_OPERATIONS.clone()),
        Box::new(CONVERGENCE_SWEEPS.clone()),
        Box::new(CONVERGENCE_QUERY_FAILURES.clone()),
        Box::new(CONVERGENCE_DURATION.clone()),
        Box::new(BENCHMARK_PHASE_DURATION_MS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_twice() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_operation_counter() {
        MEMBERSHIP_OPERATIONS
            .with_label_values(&["activate_membership", "committed"])
            .inc();
        assert!(
            MEMBERSHIP_OPERATIONS
                .with_label_values(&["activate_membership", "committed"])
                .get()
                >= 1.0
        );
    }

    #[test]
    fn test_encode_contains_registered_metric() {
        let handle = register_metrics().unwrap();
        CONVERGENCE_SWEEPS.inc();
        let text = handle.encode().unwrap();
        assert!(text.contains("bn_convergence_sweeps_total"));
    }
}
