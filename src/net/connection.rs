//! Per-connection serving on top of hyper.
//!
//! # Responsibilities
//! - Drive one accepted TCP connection through hyper (HTTP/1 and HTTP/2)
//! - Bound how long a client may take to send request headers
//! - Close keep-alive connections that sit idle with no request in flight
//! - Close gracefully when the listener is asked to stop
//!
//! # Design Decisions
//! - Idleness is tracked by counting in-flight requests in the service
//!   wrapper; the idle window restarts every time that count drops to zero
//! - Stop and idle expiry both use hyper's graceful shutdown, so a response
//!   already being written is finished before the socket closes

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::Router;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower::Service;

use crate::config::ServerConfig;

/// Connection-level time limits applied by [`super::HttpListener`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConnectionTimeouts {
    /// Longest a client may take to deliver a request's headers.
    pub header_read: Option<Duration>,
    /// Longest a connection may stay open with no request in flight.
    pub idle: Option<Duration>,
}

impl From<&ServerConfig> for ConnectionTimeouts {
    fn from(config: &ServerConfig) -> Self {
        Self {
            header_read: Some(config.read_timeout()),
            idle: Some(config.idle_timeout()),
        }
    }
}

/// Build the hyper connection builder shared by every accepted socket.
pub(crate) fn connection_builder(timeouts: &ConnectionTimeouts) -> AutoBuilder<TokioExecutor> {
    let mut builder = AutoBuilder::new(TokioExecutor::new());
    builder.http1().timer(TokioTimer::new());
    if let Some(header_read) = timeouts.header_read {
        builder.http1().header_read_timeout(header_read);
    }
    builder
}

/// Serve `socket` until the client goes away, the connection idles out, or
/// `stop` fires and in-flight work has drained.
pub(crate) async fn serve_connection(
    socket: TcpStream,
    remote: SocketAddr,
    router: Router,
    builder: AutoBuilder<TokioExecutor>,
    idle_timeout: Option<Duration>,
    stop: CancellationToken,
) {
    if let Err(e) = socket.set_nodelay(true) {
        tracing::warn!(remote = %remote, error = %e, "Failed to set TCP_NODELAY");
    }

    let (activity, in_flight) = Activity::new();
    let service = hyper::service::service_fn(move |request: hyper::Request<Incoming>| {
        let mut router = router.clone();
        let guard = activity.begin();
        async move {
            let response = router.call(request.map(Body::new)).await;
            drop(guard);
            response
        }
    });

    let conn = builder
        .serve_connection_with_upgrades(TokioIo::new(socket), service)
        .into_owned();
    tokio::pin!(conn);

    let idle = idle_expiry(in_flight, idle_timeout);
    tokio::pin!(idle);

    let mut closing = false;
    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(remote = %remote, error = %e, "Connection closed with error");
                }
                return;
            }
            _ = stop.cancelled(), if !closing => {
                conn.as_mut().graceful_shutdown();
                closing = true;
            }
            _ = &mut idle, if !closing => {
                tracing::debug!(remote = %remote, "Closing idle connection");
                conn.as_mut().graceful_shutdown();
                closing = true;
            }
        }
    }
}

/// Counts requests in flight on one connection.
#[derive(Clone)]
struct Activity(Arc<watch::Sender<usize>>);

impl Activity {
    fn new() -> (Self, watch::Receiver<usize>) {
        let (tx, rx) = watch::channel(0);
        (Self(Arc::new(tx)), rx)
    }

    fn begin(&self) -> InFlight {
        self.0.send_modify(|n| *n += 1);
        InFlight(Arc::clone(&self.0))
    }
}

struct InFlight(Arc<watch::Sender<usize>>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Resolves once the connection has gone `timeout` with nothing in flight.
async fn idle_expiry(mut in_flight: watch::Receiver<usize>, timeout: Option<Duration>) {
    let Some(timeout) = timeout else {
        return std::future::pending().await;
    };

    loop {
        if in_flight.wait_for(|n| *n == 0).await.is_err() {
            return std::future::pending().await;
        }
        match tokio::time::timeout(timeout, in_flight.changed()).await {
            Err(_) => return,
            Ok(Ok(())) => continue,
            Ok(Err(_)) => return std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_expiry_waits_for_requests_to_finish() {
        let (activity, in_flight) = Activity::new();
        let guard = activity.begin();
        let idle = tokio::spawn(idle_expiry(in_flight, Some(Duration::from_millis(100))));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!idle.is_finished());

        drop(guard);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(idle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_window_restarts_after_each_request() {
        let (activity, in_flight) = Activity::new();
        let idle = tokio::spawn(idle_expiry(in_flight, Some(Duration::from_millis(100))));

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(60)).await;
            drop(activity.begin());
        }
        assert!(!idle.is_finished());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(idle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn no_idle_timeout_never_expires() {
        let (_activity, in_flight) = Activity::new();
        let idle = tokio::spawn(idle_expiry(in_flight, None));

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(!idle.is_finished());
    }

    #[test]
    fn timeouts_follow_server_config() {
        let timeouts = ConnectionTimeouts::from(&ServerConfig::default());
        assert_eq!(timeouts.header_read, Some(Duration::from_millis(500)));
        assert_eq!(timeouts.idle, Some(Duration::from_secs(15)));
    }
}
