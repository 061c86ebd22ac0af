use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use player_data_service::config::load_config;
use player_data_service::lifecycle::signals::{run_until_signal, wait_for_shutdown_signal};
use player_data_service::observability::{logging, metrics};
use player_data_service::Service;

const DEFAULT_CONFIG_DIR: &str = "/etc/player-data-service";

#[derive(Parser)]
#[command(name = "player-data-service")]
#[command(about = "Serves player data over HTTP", long_about = None)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The configured log level is only known after loading, so loading logs
    // through a temporary subscriber.
    let loaded = logging::bootstrap(|| {
        let config_dir = cli.config_dir.clone().unwrap_or_else(|| {
            tracing::warn!(config_dir = DEFAULT_CONFIG_DIR, "Config directory flag not provided; using default");
            PathBuf::from(DEFAULT_CONFIG_DIR)
        });
        load_config(&config_dir)
    });
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!("player-data-service v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let cancel = CancellationToken::new();
    let run = tokio::spawn(Service::mocker(config).run(cancel.clone()));

    let outcome = run_until_signal(run, cancel, wait_for_shutdown_signal()).await;
    if outcome.is_clean() {
        tracing::info!("Shutdown complete");
    } else {
        eprintln!("{}", outcome);
    }
    outcome.exit_code()
}
