//! Structured logging setup.
//!
//! Log lines carry a consistent field set so they can be filtered per
//! network, membership or group:
//! - `network_id`: Business network the event belongs to
//! - `membership_id` / `group_id`: Linear id of the affected record
//! - `node`: Name of the node the operation ran against

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{TelemetryConfig, TelemetryError};

/// Handle returned once the global subscriber is installed.
#[derive(Debug)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    /// Service name the subscriber was installed for.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// Build the filter from `RUST_LOG`, falling back to the configured level.
pub(crate) fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Config(e.to_string()))
}

/// Install the global tracing subscriber.
///
/// Fails with [`TelemetryError::SubscriberInit`] if a global subscriber is
/// already set (for example by a previous call in the same process).
pub fn init_logging(config: &TelemetryConfig) -> Result<StructuredLogger, TelemetryError> {
    let filter = env_filter(config)?;

    let output = if !config.console_output {
        None
    } else if config.json_logs {
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
        )
    } else {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(true)
                .boxed(),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?;

    tracing::info!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        "Structured logging initialized"
    );

    Ok(StructuredLogger {
        service_name: config.full_service_name(),
    })
}

/// Log a membership-related event with standard fields.
#[macro_export]
macro_rules! log_membership_event {
    ($level:ident, $msg:expr, $network_id:expr, $membership_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            network_id = %$network_id,
            membership_id = %$membership_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a group-related event with standard fields.
#[macro_export]
macro_rules! log_group_event {
    ($level:ident, $msg:expr, $network_id:expr, $group_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            network_id = %$network_id,
            group_id = %$group_id,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_accepts_directives() {
        let config = TelemetryConfig {
            log_level: "bn_membership=debug,info".to_string(),
            ..TelemetryConfig::default()
        };
        assert!(env_filter(&config).is_ok());
    }

    #[test]
    fn test_log_macros_expand() {
        let network = "net-1";
        let membership = "m-1";
        log_membership_event!(info, "Membership activated", network, membership);
        log_group_event!(debug, "Group modified", network, "g-1", size = 3);
    }
}
