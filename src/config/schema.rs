//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from `config.toml`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default listen address; a leading `:` binds every interface.
pub const DEFAULT_ADDR: &str = ":8080";
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 15_000;

/// Root configuration for the player data service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Handler fault channel settings.
    pub sink: SinkConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address in `host:port` form (e.g. "0.0.0.0:8080" or ":8080").
    pub addr: String,

    /// Maximum time to read a request body, in milliseconds.
    pub read_timeout_ms: u64,

    /// Maximum time to produce a response, in milliseconds.
    pub write_timeout_ms: u64,

    /// Keep-alive idle allowance, in milliseconds.
    pub idle_timeout_ms: u64,

    /// Graceful shutdown deadline, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// What a handler does when the fault channel is already full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the new fault and log it.
    #[default]
    DropNewest,
    /// Wait up to `block_timeout_ms` for room, then drop.
    Block,
}

/// Handler fault channel configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Number of unobserved faults the channel holds.
    pub capacity: usize,

    /// Overflow behaviour when the channel is full.
    pub overflow: OverflowPolicy,

    /// Upper bound on a blocking report, in milliseconds.
    pub block_timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            overflow: OverflowPolicy::DropNewest,
            block_timeout_ms: 100,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
