//! Signal hub — listener registry with robust (failure-isolated) fan-out.
//!
//! Two named signals exist: `"filtered"` and `"dropped"`. A listener error is
//! logged and skipped; it never stops delivery to the remaining listeners and
//! never aborts the record pipeline.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

use crate::error::SignalError;
use crate::types::Project;

/// An internal notification forwarded for an actionable outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// An event was dropped by an inbound filter.
    Filtered {
        project: Project,
        remote_addr: Option<String>,
    },
    /// An event was dropped by a rate limiter.
    Dropped {
        project: Project,
        remote_addr: Option<String>,
        reason: Option<String>,
    },
}

impl Signal {
    /// The signal's registered name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Filtered { .. } => "filtered",
            Self::Dropped { .. } => "dropped",
        }
    }

    /// The project the signal is tagged with.
    pub fn project(&self) -> &Project {
        match self {
            Self::Filtered { project, .. } | Self::Dropped { project, .. } => project,
        }
    }
}

/// Trait for signal consumers (accounting, billing, notification fan-out).
#[async_trait]
pub trait SignalListener: Send + Sync {
    /// Called once per forwarded signal.
    async fn receive(&self, signal: &Signal) -> Result<(), SignalError>;

    /// Listener name, used to attribute failures in logs.
    fn name(&self) -> &str {
        "listener"
    }
}

/// Registry of signal listeners.
#[derive(Default)]
pub struct SignalHub {
    listeners: Vec<Arc<dyn SignalListener>>,
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners receive every signal in registration
    /// order.
    pub fn register(&mut self, listener: Arc<dyn SignalListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Dispatch a signal to every listener.
    ///
    /// Robust semantics: a failing listener is logged and skipped, so one
    /// broken consumer cannot starve the others of signals.
    pub async fn send(&self, signal: &Signal) {
        for listener in &self.listeners {
            if let Err(e) = listener.receive(signal).await {
                error!(
                    listener = listener.name(),
                    signal = signal.name(),
                    project_id = signal.project().id,
                    error = %e,
                    "Signal listener failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counting(Arc<AtomicU32>);

    #[async_trait]
    impl SignalListener for Counting {
        async fn receive(&self, _signal: &Signal) -> Result<(), SignalError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    struct Failing;

    #[async_trait]
    impl SignalListener for Failing {
        async fn receive(&self, _signal: &Signal) -> Result<(), SignalError> {
            Err(SignalError::Rejected {
                reason: "always broken".into(),
            })
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    fn filtered(project_id: u64) -> Signal {
        Signal::Filtered {
            project: Project::new(project_id, "acme"),
            remote_addr: Some("1.2.3.4".into()),
        }
    }

    #[tokio::test]
    async fn dispatch_reaches_all_listeners() {
        let count = Arc::new(AtomicU32::new(0));
        let mut hub = SignalHub::new();
        hub.register(Arc::new(Counting(count.clone())));
        hub.register(Arc::new(Counting(count.clone())));

        hub.send(&filtered(1)).await;
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn failing_listener_does_not_stop_dispatch() {
        let count = Arc::new(AtomicU32::new(0));
        let mut hub = SignalHub::new();
        hub.register(Arc::new(Failing));
        hub.register(Arc::new(Counting(count.clone())));
        hub.register(Arc::new(Failing));

        hub.send(&filtered(1)).await;
        // The healthy listener still got the signal despite both failures.
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn signal_names() {
        let f = filtered(1);
        assert_eq!(f.name(), "filtered");
        let d = Signal::Dropped {
            project: Project::new(1, "acme"),
            remote_addr: None,
            reason: Some("key_quota".into()),
        };
        assert_eq!(d.name(), "dropped");
    }
}
