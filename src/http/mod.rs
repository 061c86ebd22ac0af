//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Connection accepted by net::HttpListener
//!     → request.rs (assign x-request-id)
//!     → TraceLayer (request span)
//!     → timeouts (body read, total response)
//!     → handlers::report_faults (fault → OutcomeSink)
//!     → handlers (route table)
//!     → Send to client
//! ```

pub mod handlers;
pub mod players;
pub mod request;
pub mod server;

pub use handlers::{HandlerFault, UPDATE_PLAYER_DATA_PATH};
pub use request::X_REQUEST_ID;
pub use server::{build_router, AppState};
