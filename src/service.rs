//! Service facade: composes the router, the HTTP listener and the lifecycle
//! controller, and hands the controller's result back unchanged.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::http::{build_router, AppState};
use crate::lifecycle::{outcome_channel, LifecycleController, OutcomeReceiver, ServeError, SinkPolicy};
use crate::net::{ConnectionTimeouts, HttpListener, Listener, ListenerError};
use crate::repository::{MockRepository, PlayerDataRepository};

/// The player data service.
pub struct Service {
    config: ServiceConfig,
    repository: Arc<dyn PlayerDataRepository>,
}

impl Service {
    pub fn new(config: ServiceConfig, repository: Arc<dyn PlayerDataRepository>) -> Self {
        Self { config, repository }
    }

    /// A service backed by the in-memory mock repository.
    pub fn mocker(config: ServiceConfig) -> Self {
        Self::new(config, Arc::new(MockRepository::new()))
    }

    /// Serve on the configured address until `cancel` fires or the listener
    /// fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ServeError> {
        let (router, faults) = self.assemble();
        let listener = HttpListener::new(self.config.server.addr.clone(), router)
            .with_timeouts(ConnectionTimeouts::from(&self.config.server));
        self.drive(listener, faults, cancel).await
    }

    /// Like [`Service::run`], on a socket the caller has already bound.
    pub async fn run_on(self, tcp: TcpListener, cancel: CancellationToken) -> Result<(), ServeError> {
        let (router, faults) = self.assemble();
        let listener = HttpListener::from_tcp(tcp, router)
            .map_err(|e| ServeError::Listen {
                addr: self.config.server.addr.clone(),
                source: ListenerError::Bind(e),
            })?
            .with_timeouts(ConnectionTimeouts::from(&self.config.server));
        self.drive(listener, faults, cancel).await
    }

    fn assemble(&self) -> (Router, OutcomeReceiver) {
        let (faults, receiver) = outcome_channel(SinkPolicy::from(&self.config.sink));
        let state = AppState {
            faults,
            repository: Arc::clone(&self.repository),
        };
        (build_router(&self.config.server, state), receiver)
    }

    async fn drive<L: Listener>(
        self,
        listener: L,
        faults: OutcomeReceiver,
        cancel: CancellationToken,
    ) -> Result<(), ServeError> {
        let server = &self.config.server;
        tracing::info!(
            address = %listener.addr(),
            read_timeout = ?server.read_timeout(),
            write_timeout = ?server.write_timeout(),
            idle_timeout = ?server.idle_timeout(),
            shutdown_timeout = ?server.shutdown_timeout(),
            "Starting player data server"
        );

        LifecycleController::new(listener, faults, server.shutdown_timeout())
            .serve(cancel)
            .await
    }
}
