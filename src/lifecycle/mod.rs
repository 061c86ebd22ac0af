//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs):
//!     Start listener task → Start fault observer → Active
//!
//! Shutdown (controller.rs):
//!     Token cancelled → Observer stops → Fault channel closed
//!         → Listener stop (bounded by shutdown timeout) → Stopped | Failed
//!     Listener fails on its own → Failed (no stop attempt)
//!
//! Faults (sink.rs):
//!     Request handler → OutcomeSink::report → observer logs
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel the process token
//! ```
//!
//! # Design Decisions
//! - Cancellation flows top-down only; the controller never cancels the token
//! - Shutdown has a deadline: a stop that overruns it is an error, not a hang
//! - The fault channel is closed once, after its observer has stopped

pub mod controller;
pub mod signals;
pub mod sink;

pub use controller::{ControllerState, LifecycleController, ServeError};
pub use sink::{outcome_channel, HandlerError, OutcomeReceiver, OutcomeSink, Overflow, Reported, SinkPolicy};
