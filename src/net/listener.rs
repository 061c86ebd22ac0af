//! Listener contract and the hyper-backed HTTP implementation.
//!
//! # Responsibilities
//! - Bind to the configured address (or adopt a pre-bound socket)
//! - Run the accept/serve loop on an independent task
//! - Report the loop's terminal value exactly once
//! - Stop accepting and drain connections within a deadline
//!
//! # Design Decisions
//! - Connections run in a `JoinSet` owned by the serve loop, so aborting the
//!   loop on a missed deadline also tears down every open connection
//! - A failure raised after stop was requested is returned by `stop`, not
//!   sent on the terminal channel

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use super::connection::{connection_builder, serve_connection, ConnectionTimeouts};

/// Receiver for a listener's terminal value.
pub type Terminal = oneshot::Receiver<ListenerError>;

/// Ways a listener stops or fails to stop.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The serve loop ended because stop was requested.
    #[error("listener closed")]
    Closed,

    /// The address could not be opened.
    #[error("bind: {0}")]
    Bind(#[source] io::Error),

    /// The serve loop failed while running.
    #[error("serve: {0}")]
    Serve(#[source] io::Error),

    /// Draining did not finish before the deadline.
    #[error("shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),
}

impl ListenerError {
    /// Whether this terminal value is the expected result of a requested stop.
    pub fn is_closed(&self) -> bool {
        matches!(self, ListenerError::Closed)
    }
}

/// A network accept/serve loop driven by the lifecycle controller.
#[async_trait]
pub trait Listener: Send {
    /// The address this listener serves, as configured.
    fn addr(&self) -> &str;

    /// Launch the serve loop on its own task.
    ///
    /// Called at most once. The returned channel yields the loop's terminal
    /// value; if the sender is dropped without a value the channel reads as
    /// closed.
    fn start(&mut self) -> Terminal;

    /// Stop accepting new connections and drain in-flight ones within
    /// `deadline`.
    async fn stop(&mut self, deadline: Duration) -> Result<(), ListenerError>;
}

/// HTTP listener serving an axum [`Router`].
pub struct HttpListener {
    addr: String,
    router: Option<Router>,
    bound: Option<TcpListener>,
    timeouts: ConnectionTimeouts,
    stop: CancellationToken,
    /// Yields a failure that happened after stop was requested.
    task: Option<JoinHandle<Option<ListenerError>>>,
}

impl HttpListener {
    /// Create a listener that binds `addr` when started.
    pub fn new(addr: impl Into<String>, router: Router) -> Self {
        Self {
            addr: addr.into(),
            router: Some(router),
            bound: None,
            timeouts: ConnectionTimeouts::default(),
            stop: CancellationToken::new(),
            task: None,
        }
    }

    /// Create a listener around an already bound socket.
    pub fn from_tcp(listener: TcpListener, router: Router) -> io::Result<Self> {
        let addr = listener.local_addr()?.to_string();
        Ok(Self {
            addr,
            router: Some(router),
            bound: Some(listener),
            timeouts: ConnectionTimeouts::default(),
            stop: CancellationToken::new(),
            task: None,
        })
    }

    /// Apply header-read and idle limits to every accepted connection.
    pub fn with_timeouts(mut self, timeouts: ConnectionTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[async_trait]
impl Listener for HttpListener {
    fn addr(&self) -> &str {
        &self.addr
    }

    fn start(&mut self) -> Terminal {
        let (tx, rx) = oneshot::channel();

        let Some(router) = self.router.take() else {
            tracing::warn!(address = %self.addr, "Listener already started");
            return rx;
        };

        let addr = self.addr.clone();
        let bound = self.bound.take();
        let timeouts = self.timeouts;
        let stop = self.stop.clone();

        self.task = Some(tokio::spawn(async move {
            let terminal = serve(addr, bound, router, timeouts, stop.clone()).await;
            if stop.is_cancelled() && !terminal.is_closed() {
                return Some(terminal);
            }
            let _ = tx.send(terminal);
            None
        }));

        rx
    }

    async fn stop(&mut self, deadline: Duration) -> Result<(), ListenerError> {
        self.stop.cancel();

        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };

        match tokio::time::timeout(deadline, task).await {
            Ok(joined) => {
                self.task = None;
                match joined {
                    Ok(None) => Ok(()),
                    Ok(Some(failure)) => Err(failure),
                    Err(e) => Err(ListenerError::Serve(io::Error::other(e.to_string()))),
                }
            }
            Err(_) => {
                if let Some(task) = self.task.take() {
                    task.abort();
                }
                tracing::warn!(
                    address = %self.addr,
                    deadline = ?deadline,
                    "Connections still open at shutdown deadline, aborting serve loop"
                );
                Err(ListenerError::ShutdownTimeout(deadline))
            }
        }
    }
}

impl Drop for HttpListener {
    fn drop(&mut self) {
        // A stop cut short by the caller must not leave the serve loop running.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn serve(
    addr: String,
    bound: Option<TcpListener>,
    router: Router,
    timeouts: ConnectionTimeouts,
    stop: CancellationToken,
) -> ListenerError {
    let listener = match bound {
        Some(listener) => listener,
        None => match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => return ListenerError::Bind(e),
        },
    };

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listening for connections");
    }

    let builder = connection_builder(&timeouts);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, remote) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!(address = %addr, error = %e, "Failed to accept connection");
                        continue;
                    }
                };
                connections.spawn(serve_connection(
                    socket,
                    remote,
                    router.clone(),
                    builder.clone(),
                    timeouts.idle,
                    stop.clone(),
                ));
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = stop.cancelled() => break,
        }
    }

    drop(listener);
    tracing::info!(address = %addr, open = connections.len(), "Draining connections");
    while connections.join_next().await.is_some() {}

    tracing::info!(address = %addr, "HTTP server stopped");
    ListenerError::Closed
}
