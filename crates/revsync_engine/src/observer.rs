//! Progress reporting for multi-repository syncs.

use crate::session::ExchangeStats;
use parking_lot::Mutex;
use std::sync::Arc;

/// Something that happened while syncing a repository tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A repository exists only on the local side.
    LocalOnly {
        /// Relative repository name.
        name: String,
    },
    /// A repository exists only on the remote side.
    RemoteOnly {
        /// Relative repository name.
        name: String,
    },
    /// A repository pair is about to be exchanged.
    PairStarted {
        /// Relative repository name.
        name: String,
    },
    /// A repository pair was exchanged.
    PairFinished {
        /// Relative repository name.
        name: String,
        /// Counters for both directions.
        stats: ExchangeStats,
    },
    /// A repository pair failed.
    PairFailed {
        /// Relative repository name.
        name: String,
        /// Error description.
        error: String,
    },
    /// A repository pair was not attempted because the channel is unusable.
    PairSkipped {
        /// Relative repository name.
        name: String,
    },
}

impl SyncEvent {
    /// Returns the repository the event is about.
    pub fn name(&self) -> &str {
        match self {
            SyncEvent::LocalOnly { name }
            | SyncEvent::RemoteOnly { name }
            | SyncEvent::PairStarted { name }
            | SyncEvent::PairFinished { name, .. }
            | SyncEvent::PairFailed { name, .. }
            | SyncEvent::PairSkipped { name } => name,
        }
    }

    /// Returns true for events a user should be warned about.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            SyncEvent::LocalOnly { .. }
                | SyncEvent::RemoteOnly { .. }
                | SyncEvent::PairFailed { .. }
                | SyncEvent::PairSkipped { .. }
        )
    }
}

/// Receives sync events.
pub trait SyncObserver {
    /// Called once per event, in order.
    fn on_event(&self, event: &SyncEvent);
}

impl<O: SyncObserver + ?Sized> SyncObserver for &O {
    fn on_event(&self, event: &SyncEvent) {
        (**self).on_event(event);
    }
}

impl<O: SyncObserver + ?Sized> SyncObserver for Arc<O> {
    fn on_event(&self, event: &SyncEvent) {
        (**self).on_event(event);
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::LocalOnly { name } => {
                tracing::warn!(repository = %name, "only present locally, skipped");
            }
            SyncEvent::RemoteOnly { name } => {
                tracing::warn!(repository = %name, "only present remotely, skipped");
            }
            SyncEvent::PairStarted { name } => {
                tracing::info!(repository = %name, "syncing");
            }
            SyncEvent::PairFinished { name, stats } => {
                tracing::info!(
                    repository = %name,
                    sent = stats.sent.need,
                    received = stats.received.need,
                    "synced"
                );
            }
            SyncEvent::PairFailed { name, error } => {
                tracing::warn!(repository = %name, %error, "sync failed");
            }
            SyncEvent::PairSkipped { name } => {
                tracing::warn!(repository = %name, "skipped after channel failure");
            }
        }
    }
}

/// Collects events for later inspection.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all events seen so far.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }

    /// Returns the warning events seen so far.
    pub fn warnings(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is_warning())
            .cloned()
            .collect()
    }
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_classified() {
        assert!(SyncEvent::LocalOnly { name: "x.git".into() }.is_warning());
        assert!(SyncEvent::PairSkipped { name: "x.git".into() }.is_warning());
        assert!(!SyncEvent::PairStarted { name: "x.git".into() }.is_warning());
    }

    #[test]
    fn recorder_keeps_order() {
        let recorder = RecordingObserver::new();
        let observer: &dyn SyncObserver = &recorder;
        observer.on_event(&SyncEvent::PairStarted { name: "a".into() });
        observer.on_event(&SyncEvent::RemoteOnly { name: "b".into() });

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "a");
        assert_eq!(recorder.warnings(), vec![SyncEvent::RemoteOnly { name: "b".into() }]);
    }
}
