//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! LifecycleController
//!     → Listener::start (spawn accept/serve loop, hand back terminal channel)
//!     → hyper accept loop (HTTP/1.1 + HTTP/2, one task per connection,
//!       header-read and idle limits per connection)
//!     → Listener::stop (stop accepting, drain in-flight, bounded by deadline)
//!
//! Terminal values:
//!     Closed   → loop ended because stop was requested
//!     Bind     → address could not be opened
//!     Serve    → loop failed while running
//!
//! A failure after stop was requested is returned by Listener::stop.
//! ```
//!
//! # Design Decisions
//! - The serve loop always runs on its own task; start never blocks
//! - Exactly one terminal value per listener, delivered over a oneshot
//! - A stop that overruns its deadline aborts the serve task instead of
//!   leaking it

pub mod connection;
pub mod listener;

pub use connection::ConnectionTimeouts;
pub use listener::{HttpListener, Listener, ListenerError, Terminal};
