//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT/SIGTERM handlers
//! - Resolve once the process has been asked to stop, so the entry point can
//!   fire the cancellation token
//! - Race the signal against the service and turn the result into an exit
//!   status

use std::fmt;
use std::future::Future;
use std::io;
use std::process::ExitCode;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use super::controller::ServeError;

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C");
    Ok(())
}

/// How the process-level run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Stopped cleanly after cancellation.
    Clean,
    /// The service returned an error.
    Failed(ServeError),
    /// Signal handlers could not be registered; the service was stopped.
    SignalSetup(io::Error),
    /// The service task panicked or was aborted.
    Crashed(JoinError),
}

impl RunOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, RunOutcome::Clean)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_clean() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Clean => write!(f, "shutdown complete"),
            RunOutcome::Failed(e) => write!(f, "{}", e),
            RunOutcome::SignalSetup(e) => write!(f, "failed to install signal handlers: {}", e),
            RunOutcome::Crashed(e) => write!(f, "service task failed: {}", e),
        }
    }
}

/// Wait for `signal` or for the service to finish on its own.
///
/// A signal cancels `cancel` and waits for the service. If `signal` fails,
/// the service is still stopped, but the outcome is never clean.
pub async fn run_until_signal<S>(
    mut run: JoinHandle<Result<(), ServeError>>,
    cancel: CancellationToken,
    signal: S,
) -> RunOutcome
where
    S: Future<Output = io::Result<()>>,
{
    let signalled = tokio::select! {
        signal = signal => Some(signal),
        finished = &mut run => return finished_outcome(finished),
    };

    cancel.cancel();
    let finished = run.await;

    match signalled {
        Some(Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            if let Ok(Err(serve)) = &finished {
                tracing::error!(error = %serve, "Service stopped with an error");
            }
            RunOutcome::SignalSetup(e)
        }
        _ => {
            tracing::info!("Shutdown signal received");
            finished_outcome(finished)
        }
    }
}

fn finished_outcome(finished: Result<Result<(), ServeError>, JoinError>) -> RunOutcome {
    match finished {
        Ok(Ok(())) => RunOutcome::Clean,
        Ok(Err(e)) => RunOutcome::Failed(e),
        Err(e) => RunOutcome::Crashed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn service(cancel: &CancellationToken) -> JoinHandle<Result<(), ServeError>> {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            Ok(())
        })
    }

    #[tokio::test]
    async fn signal_stops_the_service_cleanly() {
        let cancel = CancellationToken::new();
        let run = service(&cancel);

        let outcome = run_until_signal(run, cancel.clone(), async { Ok(()) }).await;

        assert!(outcome.is_clean(), "{outcome}");
        assert!(cancel.is_cancelled());
        assert_eq!(outcome.exit_code(), ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn failed_signal_setup_stops_the_service_and_is_not_clean() {
        let cancel = CancellationToken::new();
        let run = service(&cancel);

        let outcome = run_until_signal(run, cancel.clone(), async {
            Err(io::Error::other("no signal driver"))
        })
        .await;

        assert!(cancel.is_cancelled());
        assert!(matches!(outcome, RunOutcome::SignalSetup(_)), "{outcome}");
        assert_eq!(outcome.exit_code(), ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn service_failure_without_signal_is_reported() {
        let cancel = CancellationToken::new();
        let run = tokio::spawn(async { Err(ServeError::ClosedChannel) });

        let outcome = run_until_signal(run, cancel.clone(), async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        })
        .await;

        assert!(matches!(outcome, RunOutcome::Failed(ServeError::ClosedChannel)));
        assert!(!cancel.is_cancelled());
    }
}
