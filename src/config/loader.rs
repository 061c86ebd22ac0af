//! Configuration loading from disk.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::schema::{
    ServiceConfig, DEFAULT_ADDR, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_SHUTDOWN_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS,
};
use crate::config::validation::{validate_config, ValidationError};

/// File looked up inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load `config.toml` from `dir`, falling back to defaults when it is absent.
pub fn load_config(dir: &Path) -> Result<ServiceConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    match fs::read_to_string(&path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            let config = resolve(ServiceConfig::default());
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
        Err(e) => Err(ConfigError::Io(e)),
    }
}

/// Parse, resolve and validate a TOML document.
pub fn parse_config(content: &str) -> Result<ServiceConfig, ConfigError> {
    let raw: ServiceConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    let config = resolve(raw);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Fill unset values with defaults and normalize the listen address.
///
/// Pure: the result depends only on `config`.
pub fn resolve(mut config: ServiceConfig) -> ServiceConfig {
    let server = &mut config.server;

    if server.addr.trim().is_empty() {
        tracing::warn!(addr = DEFAULT_ADDR, "Address missing in configuration, falling back to default");
        server.addr = DEFAULT_ADDR.to_string();
    }
    server.addr = normalize_addr(server.addr.trim());

    fallback(&mut server.read_timeout_ms, DEFAULT_READ_TIMEOUT_MS);
    fallback(&mut server.write_timeout_ms, DEFAULT_WRITE_TIMEOUT_MS);
    fallback(&mut server.idle_timeout_ms, DEFAULT_IDLE_TIMEOUT_MS);
    fallback(&mut server.shutdown_timeout_ms, DEFAULT_SHUTDOWN_TIMEOUT_MS);

    config
}

/// `:8080` → `0.0.0.0:8080`; anything else is returned as is.
pub fn normalize_addr(addr: &str) -> String {
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => addr.to_string(),
    }
}

fn fallback(value: &mut u64, default: u64) {
    if *value == 0 {
        *value = default;
    }
}
