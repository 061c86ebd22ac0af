//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const BOOTSTRAP_LEVEL: &str = "info";

/// Install the global subscriber. `level` is used when `RUST_LOG` is unset.
pub fn init_logging(level: &str) {
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter(level))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Run `f` with a temporary stdout subscriber, for work done before the
/// configured level is known.
pub fn bootstrap<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::registry()
        .with(filter(BOOTSTRAP_LEVEL))
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::with_default(subscriber, f)
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("player_data_service={level},tower_http={level}"))
    })
}
