//! Server lifecycle controller.
//!
//! # States
//! ```text
//! Starting → Active → ShuttingDown → Stopped
//!                                  → Failed
//! ```
//!
//! While `Active` the controller races two signals:
//! - the external cancellation token firing, which leads to a bounded
//!   graceful stop of the listener (`Stopped`, or `Failed` on timeout/error)
//! - the listener's serve loop ending on its own, which is always fatal and
//!   leads straight to `Failed` without a stop attempt
//!
//! Whichever the select observes first wins; exactly one path runs.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::sink::OutcomeReceiver;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;

/// Controller state, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Starting,
    Active,
    ShuttingDown,
    Stopped,
    Failed,
}

impl ControllerState {
    fn code(self) -> f64 {
        match self {
            ControllerState::Starting => 0.0,
            ControllerState::Active => 1.0,
            ControllerState::ShuttingDown => 2.0,
            ControllerState::Stopped => 3.0,
            ControllerState::Failed => 4.0,
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Starting => "starting",
            ControllerState::Active => "active",
            ControllerState::ShuttingDown => "shutting_down",
            ControllerState::Stopped => "stopped",
            ControllerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Fatal outcomes of [`LifecycleController::serve`].
#[derive(Debug, Error)]
pub enum ServeError {
    /// The serve loop ended without being asked to (bind or socket fault).
    #[error("listen and serve on {addr:?}: {source}")]
    Listen { addr: String, source: ListenerError },

    /// The graceful stop errored or overran its deadline.
    #[error("shutdown of {addr:?}: {source}")]
    Shutdown { addr: String, source: ListenerError },

    /// The terminal channel closed without delivering a value.
    #[error("reading on closed listener outcome channel")]
    ClosedChannel,
}

impl ServeError {
    /// True when the graceful stop ran out of time.
    pub fn is_shutdown_timeout(&self) -> bool {
        matches!(
            self,
            ServeError::Shutdown {
                source: ListenerError::ShutdownTimeout(_),
                ..
            }
        )
    }

    /// The listener address the error refers to, if any.
    pub fn addr(&self) -> Option<&str> {
        match self {
            ServeError::Listen { addr, .. } | ServeError::Shutdown { addr, .. } => Some(addr),
            ServeError::ClosedChannel => None,
        }
    }
}

/// Drives a [`Listener`] from start to shutdown.
pub struct LifecycleController<L> {
    listener: L,
    faults: OutcomeReceiver,
    shutdown_timeout: Duration,
    state: watch::Sender<ControllerState>,
}

impl<L: Listener> LifecycleController<L> {
    pub fn new(listener: L, faults: OutcomeReceiver, shutdown_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ControllerState::Starting);
        Self {
            listener,
            faults,
            shutdown_timeout,
            state,
        }
    }

    /// Subscribe to state transitions.
    pub fn state(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    /// Run the listener until `cancel` fires or the listener fails.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), ServeError> {
        let Self {
            mut listener,
            faults,
            shutdown_timeout,
            state,
        } = self;
        let addr = listener.addr().to_string();

        transition(&state, ControllerState::Starting, &addr);
        let mut terminal = listener.start();
        let observer = tokio::spawn(faults.observe(cancel.clone()));
        transition(&state, ControllerState::Active, &addr);

        tokio::select! {
            _ = cancel.cancelled() => {
                transition(&state, ControllerState::ShuttingDown, &addr);
                match shutdown(&mut listener, observer, shutdown_timeout).await {
                    Ok(()) => {
                        transition(&state, ControllerState::Stopped, &addr);
                        Ok(())
                    }
                    Err(source) => {
                        transition(&state, ControllerState::Failed, &addr);
                        tracing::error!(address = %addr, error = %source, "Graceful shutdown failed");
                        Err(ServeError::Shutdown { addr, source })
                    }
                }
            }
            terminal = &mut terminal => {
                transition(&state, ControllerState::ShuttingDown, &addr);
                let err = match terminal {
                    Ok(source) => ServeError::Listen { addr: addr.clone(), source },
                    Err(_) => ServeError::ClosedChannel,
                };
                transition(&state, ControllerState::Failed, &addr);
                tracing::error!(address = %addr, error = %err, "Listener terminated");
                Err(err)
            }
        }
    }
}

async fn shutdown<L: Listener>(
    listener: &mut L,
    observer: JoinHandle<OutcomeReceiver>,
    deadline: Duration,
) -> Result<(), ListenerError> {
    // The observer watches the same token; wait for it so the close below
    // cannot race a read.
    match observer.await {
        Ok(faults) => {
            for fault in faults.close() {
                tracing::warn!(error = %fault, "Handler fault left unobserved at shutdown");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Fault observer ended abnormally"),
    }

    tracing::info!(deadline = ?deadline, "Stopping listener");
    match tokio::time::timeout(deadline, listener.stop(deadline)).await {
        Ok(result) => result,
        Err(_) => Err(ListenerError::ShutdownTimeout(deadline)),
    }
}

fn transition(state: &watch::Sender<ControllerState>, next: ControllerState, addr: &str) {
    state.send_replace(next);
    metrics::record_controller_state(next.code());
    tracing::info!(address = %addr, state = %next, "Lifecycle transition");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::sink::{outcome_channel, HandlerError, Reported, SinkPolicy};
    use async_trait::async_trait;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Healthy,
        FailOnStart,
        DropTerminal,
        HangOnStop,
    }

    struct FakeListener {
        behaviour: Behaviour,
        stop_calls: Arc<AtomicUsize>,
        terminal: Option<oneshot::Sender<ListenerError>>,
    }

    impl FakeListener {
        fn new(behaviour: Behaviour) -> (Self, Arc<AtomicUsize>) {
            let stop_calls = Arc::new(AtomicUsize::new(0));
            let listener = Self {
                behaviour,
                stop_calls: stop_calls.clone(),
                terminal: None,
            };
            (listener, stop_calls)
        }
    }

    #[async_trait]
    impl Listener for FakeListener {
        fn addr(&self) -> &str {
            "127.0.0.1:7777"
        }

        fn start(&mut self) -> oneshot::Receiver<ListenerError> {
            let (tx, rx) = oneshot::channel();
            match self.behaviour {
                Behaviour::FailOnStart => {
                    let _ = tx.send(ListenerError::Bind(io::Error::new(
                        io::ErrorKind::AddrInUse,
                        "address already in use",
                    )));
                }
                Behaviour::DropTerminal => drop(tx),
                Behaviour::Healthy | Behaviour::HangOnStop => self.terminal = Some(tx),
            }
            rx
        }

        async fn stop(&mut self, _deadline: Duration) -> Result<(), ListenerError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            if let Behaviour::HangOnStop = self.behaviour {
                std::future::pending::<()>().await;
            }
            if let Some(tx) = self.terminal.take() {
                let _ = tx.send(ListenerError::Closed);
            }
            Ok(())
        }
    }

    fn controller(behaviour: Behaviour, timeout: Duration) -> (LifecycleController<FakeListener>, Arc<AtomicUsize>) {
        let (listener, stop_calls) = FakeListener::new(behaviour);
        let (_, faults) = outcome_channel(SinkPolicy::default());
        (LifecycleController::new(listener, faults, timeout), stop_calls)
    }

    #[tokio::test]
    async fn cancellation_shuts_down_cleanly() {
        let (controller, stop_calls) = controller(Behaviour::Healthy, Duration::from_secs(15));
        let state = controller.state();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = tokio::time::timeout(Duration::from_secs(15), controller.serve(cancel))
            .await
            .expect("controller did not stop within the shutdown window");

        assert!(result.is_ok());
        assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*state.borrow(), ControllerState::Stopped);
    }

    #[tokio::test]
    async fn listener_fault_is_wrapped_without_shutdown() {
        let (controller, stop_calls) = controller(Behaviour::FailOnStart, Duration::from_secs(15));
        let state = controller.state();

        let err = controller.serve(CancellationToken::new()).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("127.0.0.1:7777"), "{message}");
        assert!(message.contains("address already in use"), "{message}");
        assert!(matches!(err, ServeError::Listen { .. }));
        assert!(!err.is_shutdown_timeout());
        assert_eq!(stop_calls.load(Ordering::SeqCst), 0);
        assert_eq!(*state.borrow(), ControllerState::Failed);
    }

    #[tokio::test]
    async fn hanging_stop_times_out() {
        let (controller, stop_calls) = controller(Behaviour::HangOnStop, Duration::from_millis(50));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = tokio::time::timeout(Duration::from_secs(5), controller.serve(cancel))
            .await
            .expect("controller hung past the shutdown deadline")
            .unwrap_err();

        assert!(err.is_shutdown_timeout());
        assert_eq!(err.addr(), Some("127.0.0.1:7777"));
        assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropped_terminal_sender_is_reported() {
        let (controller, stop_calls) = controller(Behaviour::DropTerminal, Duration::from_secs(1));

        let err = controller.serve(CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ServeError::ClosedChannel));
        assert_eq!(stop_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn simultaneous_signals_take_exactly_one_path() {
        for _ in 0..20 {
            let (controller, stop_calls) = controller(Behaviour::FailOnStart, Duration::from_secs(1));
            let cancel = CancellationToken::new();
            cancel.cancel();

            let result = controller.serve(cancel).await;
            let stops = stop_calls.load(Ordering::SeqCst);
            match result {
                Ok(()) => assert_eq!(stops, 1),
                Err(ServeError::Listen { .. }) => assert_eq!(stops, 0),
                Err(other) => panic!("unexpected outcome: {other}"),
            }
        }
    }

    #[tokio::test]
    async fn fault_channel_closed_after_shutdown() {
        let (listener, _) = FakeListener::new(Behaviour::Healthy);
        let (sink, faults) = outcome_channel(SinkPolicy::default());
        let controller = LifecycleController::new(listener, faults, Duration::from_secs(1));
        let cancel = CancellationToken::new();

        let fault = HandlerError::new("GET", "/update-player-data", "not implemented");
        assert_eq!(sink.report(fault.clone()).await, Reported::Queued);

        let serving = tokio::spawn(controller.serve(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        serving.await.unwrap().unwrap();

        assert_eq!(sink.report(fault).await, Reported::Closed);
    }
}
