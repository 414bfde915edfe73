//! # Business Network Telemetry
//!
//! Logging and metrics for the business network coordination tooling.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` registry with an `EnvFilter` and a
//!   pretty or JSON `fmt` layer
//! - **Metrics**: Prometheus counters, gauges and histograms for operations,
//!   convergence polling and benchmark phases
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bn_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//!
//!     // Logs and metrics are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BN_SERVICE_NAME` | `bn-coordinator` | Service name in log lines |
//! | `BN_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honoured) |
//! | `BN_JSON_LOGS` | `false` | JSON formatted logs |
//! | `BN_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `BN_NETWORK_LABEL` | `local` | Deployment label |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, StructuredLogger};
pub use metrics::{
    register_metrics, MetricsHandle, BENCHMARK_PHASE_DURATION_MS,
    CONVERGENCE_DURATION, CONVERGENCE_QUERY_FAILURES, CONVERGENCE_SWEEPS, MEMBERSHIP_OPERATIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so early log lines can already be counted against them
    let metrics = register_metrics()?;
    let logger = init_logging(&config)?;

    Ok(TelemetryGuard { logger, metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    logger: StructuredLogger,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Metrics registered at initialization.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.logger.service_name(), "Shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).observe($value)
    };
}

/// Convenience macro for setting a labelled gauge.
#[macro_export]
macro_rules! metric_set {
    ($metric:expr, $labels:expr, $value:expr) => {
        $metric.with_label_values($labels).set($value)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::SubscriberInit("already set".to_string());
        assert!(err.to_string().contains("already set"));
    }

    #[test]
    fn test_metric_macros() {
        metric_inc!(CONVERGENCE_SWEEPS);
        metric_inc!(MEMBERSHIP_OPERATIONS, &["create_group", "committed"]);
        metric_observe!(CONVERGENCE_DURATION, 0.25);
        metric_set!(BENCHMARK_PHASE_DURATION_MS, &["Group Addition Time"], 12.0);
        assert_eq!(
            BENCHMARK_PHASE_DURATION_MS
                .with_label_values(&["Group Addition Time"])
                .get(),
            12.0
        );
    }
}
