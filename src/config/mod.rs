//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! <config-dir>/config.toml
//!     → loader.rs (read & deserialize, missing file means defaults)
//!     → loader::resolve (fill unset values, normalize the address)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → handed to Service::new by value
//! ```
//!
//! # Design Decisions
//! - No global config state; the entry point owns the loaded value
//! - All fields have defaults to allow minimal or absent configs
//! - Zero durations and empty strings count as unset
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, resolve, ConfigError, CONFIG_FILE_NAME};
pub use schema::{ObservabilityConfig, OverflowPolicy, ServerConfig, ServiceConfig, SinkConfig};
