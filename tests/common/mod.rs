//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use player_data_service::config::{resolve, ServiceConfig};
use player_data_service::{ServeError, Service};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A service running on an ephemeral loopback port.
pub struct RunningService {
    pub addr: SocketAddr,
    pub cancel: CancellationToken,
    pub handle: JoinHandle<Result<(), ServeError>>,
}

impl RunningService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Cancel and wait for the service to return, bounded by `limit`.
    pub async fn stop(self, limit: Duration) -> Result<(), ServeError> {
        self.cancel.cancel();
        tokio::time::timeout(limit, self.handle)
            .await
            .expect("service did not stop in time")
            .expect("service task panicked")
    }
}

pub fn test_config() -> ServiceConfig {
    let mut config = resolve(ServiceConfig::default());
    config.server.addr = "127.0.0.1:0".to_string();
    config
}

/// Start the mock-backed service on 127.0.0.1 with an OS-assigned port.
pub async fn start_service(config: ServiceConfig) -> RunningService {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(Service::mocker(config).run_on(tcp, cancel.clone()));

    RunningService {
        addr,
        cancel,
        handle,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
