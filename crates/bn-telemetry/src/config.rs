//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive string
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Label of the deployment the tooling runs against (docker, azure, local)
    pub network_label: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "bn-coordinator".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network_label: "local".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BN_SERVICE_NAME`: Service name (default: bn-coordinator)
    /// - `BN_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `BN_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `BN_JSON_LOGS`: Enable JSON logs (default: false locally, true in containers)
    /// - `BN_NETWORK_LABEL`: Deployment label (default: local)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("BN_SERVICE_NAME")
                .unwrap_or_else(|_| "bn-coordinator".to_string()),

            log_level: env::var("BN_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("BN_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v, true))
                .unwrap_or(true),

            json_logs: env::var("BN_JSON_LOGS")
                .map(|v| parse_flag(&v, false))
                .unwrap_or(is_container),

            network_label: env::var("BN_NETWORK_LABEL").unwrap_or_else(|_| "local".to_string()),
        }
    }

    /// Configuration for a named tool, keeping the rest of the environment.
    pub fn for_tool(tool_name: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = format!("bn-{}", tool_name);
        config
    }

    /// Service name qualified with the deployment label.
    pub fn full_service_name(&self) -> String {
        if self.network_label == "local" {
            self.service_name.clone()
        } else {
            format!("{}@{}", self.service_name, self.network_label)
        }
    }
}

fn parse_flag(value: &str, default: bool) -> bool {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}
