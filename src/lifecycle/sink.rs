//! Handler fault channel (request outcome sink).
//!
//! Request handlers run on per-request tasks and report failures here; the
//! lifecycle controller owns the receiving end, observes it while the server
//! is active and closes it during shutdown.
//!
//! # Overflow
//! The channel is bounded. What a reporter does when it is full is chosen
//! explicitly through [`Overflow`]:
//! - [`Overflow::DropNewest`] never waits; the new fault is logged and dropped
//! - [`Overflow::Block`] waits up to the given duration, then drops
//!
//! Reporting into a closed channel never panics; it returns
//! [`Reported::Closed`].

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::config::{OverflowPolicy, SinkConfig};
use crate::observability::metrics;

/// A single request-handling failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("handle {method} {uri:?}: {message}")]
pub struct HandlerError {
    pub method: String,
    pub uri: String,
    pub message: String,
}

impl HandlerError {
    pub fn new(method: impl Into<String>, uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            message: message.into(),
        }
    }
}

/// Behaviour of [`OutcomeSink::report`] when the channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    DropNewest,
    Block(Duration),
}

/// Capacity and overflow policy of the fault channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkPolicy {
    pub capacity: usize,
    pub overflow: Overflow,
}

impl Default for SinkPolicy {
    fn default() -> Self {
        Self {
            capacity: 1,
            overflow: Overflow::DropNewest,
        }
    }
}

impl From<&SinkConfig> for SinkPolicy {
    fn from(config: &SinkConfig) -> Self {
        let overflow = match config.overflow {
            OverflowPolicy::DropNewest => Overflow::DropNewest,
            OverflowPolicy::Block => Overflow::Block(Duration::from_millis(config.block_timeout_ms)),
        };
        Self {
            capacity: config.capacity,
            overflow,
        }
    }
}

/// What happened to a reported fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reported {
    Queued,
    Dropped,
    Closed,
}

/// Create a fault channel with the given policy.
pub fn outcome_channel(policy: SinkPolicy) -> (OutcomeSink, OutcomeReceiver) {
    let (tx, rx) = mpsc::channel(policy.capacity.max(1));
    (
        OutcomeSink {
            tx,
            overflow: policy.overflow,
        },
        OutcomeReceiver { rx },
    )
}

/// Writing end, cloned into request handlers.
#[derive(Debug, Clone)]
pub struct OutcomeSink {
    tx: mpsc::Sender<HandlerError>,
    overflow: Overflow,
}

impl OutcomeSink {
    /// Enqueue a fault without blocking past the configured policy.
    pub async fn report(&self, fault: HandlerError) -> Reported {
        let rejected = match self.overflow {
            Overflow::DropNewest => self.tx.try_send(fault).err().map(|e| match e {
                TrySendError::Full(fault) => (Reported::Dropped, fault),
                TrySendError::Closed(fault) => (Reported::Closed, fault),
            }),
            Overflow::Block(limit) => self.tx.send_timeout(fault, limit).await.err().map(|e| match e {
                SendTimeoutError::Timeout(fault) => (Reported::Dropped, fault),
                SendTimeoutError::Closed(fault) => (Reported::Closed, fault),
            }),
        };

        match rejected {
            None => Reported::Queued,
            Some((Reported::Dropped, fault)) => {
                tracing::warn!(error = %fault, "Fault channel full, dropping handler fault");
                metrics::record_fault_dropped();
                Reported::Dropped
            }
            Some((outcome, fault)) => {
                tracing::warn!(error = %fault, "Fault channel closed, handler fault not observed");
                metrics::record_fault_dropped();
                outcome
            }
        }
    }
}

/// Reading end, owned by the lifecycle controller.
#[derive(Debug)]
pub struct OutcomeReceiver {
    rx: mpsc::Receiver<HandlerError>,
}

impl OutcomeReceiver {
    /// Log every reported fault until `cancel` fires or all writers are gone.
    ///
    /// Hands the receiver back so the caller can close it once observation
    /// has ended.
    pub async fn observe(mut self, cancel: CancellationToken) -> Self {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Fault observer: cancelled");
                    break;
                }
                fault = self.rx.recv() => match fault {
                    Some(fault) => {
                        tracing::error!(error = %fault, "Request handler failed");
                        metrics::record_fault_observed();
                    }
                    None => {
                        tracing::debug!("Fault observer: all reporters gone");
                        break;
                    }
                },
            }
        }
        self
    }

    /// Close the channel and return faults that were queued but never observed.
    ///
    /// Consumes the receiver, so the channel closes at most once.
    pub fn close(mut self) -> Vec<HandlerError> {
        self.rx.close();
        let mut leftover = Vec::new();
        while let Ok(fault) = self.rx.try_recv() {
            leftover.push(fault);
        }
        leftover
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault(n: u32) -> HandlerError {
        HandlerError::new("GET", "/update-player-data", format!("fault {n}"))
    }

    #[test]
    fn display_names_method_and_uri() {
        let err = HandlerError::new("GET", "/update-player-data", "not implemented");
        assert_eq!(
            err.to_string(),
            r#"handle GET "/update-player-data": not implemented"#
        );
    }

    #[tokio::test]
    async fn drop_newest_never_waits() {
        let (sink, receiver) = outcome_channel(SinkPolicy::default());

        assert_eq!(sink.report(fault(1)).await, Reported::Queued);
        assert_eq!(sink.report(fault(2)).await, Reported::Dropped);

        assert_eq!(receiver.close(), vec![fault(1)]);
    }

    #[tokio::test]
    async fn block_gives_up_after_limit() {
        let (sink, _receiver) = outcome_channel(SinkPolicy {
            capacity: 1,
            overflow: Overflow::Block(Duration::from_millis(20)),
        });

        assert_eq!(sink.report(fault(1)).await, Reported::Queued);
        assert_eq!(sink.report(fault(2)).await, Reported::Dropped);
    }

    #[tokio::test]
    async fn block_succeeds_once_drained() {
        let (sink, mut receiver) = outcome_channel(SinkPolicy {
            capacity: 1,
            overflow: Overflow::Block(Duration::from_secs(5)),
        });
        assert_eq!(sink.report(fault(1)).await, Reported::Queued);

        let writer = sink.clone();
        let pending = tokio::spawn(async move { writer.report(fault(2)).await });

        assert_eq!(receiver.rx.recv().await, Some(fault(1)));
        assert_eq!(pending.await.unwrap(), Reported::Queued);
    }

    #[tokio::test]
    async fn report_after_close_does_not_panic() {
        let (sink, receiver) = outcome_channel(SinkPolicy::default());
        assert!(receiver.close().is_empty());

        assert_eq!(sink.report(fault(1)).await, Reported::Closed);
    }

    #[tokio::test]
    async fn observer_drains_until_cancelled() {
        let (sink, receiver) = outcome_channel(SinkPolicy {
            capacity: 4,
            overflow: Overflow::DropNewest,
        });
        let cancel = CancellationToken::new();
        let observer = tokio::spawn(receiver.observe(cancel.clone()));

        for n in 0..3 {
            assert_eq!(sink.report(fault(n)).await, Reported::Queued);
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        cancel.cancel();
        let receiver = observer.await.unwrap();
        assert!(receiver.close().is_empty());
    }

    #[test]
    fn policy_from_config() {
        let config = SinkConfig {
            capacity: 3,
            overflow: OverflowPolicy::Block,
            block_timeout_ms: 250,
        };
        assert_eq!(
            SinkPolicy::from(&config),
            SinkPolicy {
                capacity: 3,
                overflow: Overflow::Block(Duration::from_millis(250)),
            }
        );
    }
}
