//! Player data service library.
//!
//! # Architecture Overview
//!
//! ```text
//!   main ──CancellationToken──▶ Service::run
//!                                   │
//!                                   ▼
//!                        lifecycle::LifecycleController
//!                          │            │            │
//!               start/stop │   observe  │   select   │
//!                          ▼            ▼            ▼
//!                   net::HttpListener  OutcomeSink  token vs terminal
//!                          │            ▲
//!                          ▼            │ report
//!                      http router ─────┘
//!                          │
//!                          ▼
//!                  repository (players)
//! ```

pub mod config;
pub mod domain;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod repository;
pub mod service;

pub use config::ServiceConfig;
pub use lifecycle::{LifecycleController, ServeError};
pub use service::Service;
