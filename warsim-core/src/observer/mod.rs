//! Observer pattern for game events.
//!
//! Observers receive the events each successful command produced, after the
//! new state is committed. They cannot touch the state, so attaching or
//! removing observers never changes an outcome.
//!
//! # Example
//!
//! ```ignore
//! let mut game = Game::new(rules, SimConfig::default(), 42);
//! game.register_observer(Box::new(EventLogObserver::file("events.jsonl")?));
//! game.end_phase()?; // events are written as they happen
//! ```

pub mod event_log;

pub use event_log::{DestroyCause, DieRoll, EventLogObserver, GameEvent, LoggedEvent};

use thiserror::Error;

/// Errors that can occur during observation.
#[derive(Error, Debug)]
pub enum ObserverError {
    /// I/O error (e.g., writing the log file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error (e.g., JSON output)
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Formatting or lock error
    #[error("Render error: {0}")]
    Render(String),
}

/// Trait for game observers.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a game can be moved to another
/// thread with its observers attached.
///
/// # Error Handling
///
/// Errors returned from `on_events` are logged but do not fail the command.
pub trait SimObserver: Send + Sync {
    /// Called once per successful command with the events it produced.
    fn on_events(&self, events: &[LoggedEvent]) -> Result<(), ObserverError>;

    /// Human-readable name for logging/debugging.
    fn name(&self) -> &str;

    /// Called when the game is dropped.
    fn on_shutdown(&self) {}
}

/// Registry for managing multiple observers.
pub struct ObserverRegistry {
    observers: Vec<Box<dyn SimObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self { observers: vec![] }
    }

    pub fn register(&mut self, observer: Box<dyn SimObserver>) {
        log::info!("Registered observer: {}", observer.name());
        self.observers.push(observer);
    }

    /// Deliver a batch of events to every observer.
    pub fn notify(&self, events: &[LoggedEvent]) {
        for observer in &self.observers {
            if let Err(e) = observer.on_events(events) {
                log::warn!("Observer '{}' error: {}", observer.name(), e);
            }
        }
    }

    pub fn shutdown(&self) {
        for observer in &self.observers {
            observer.on_shutdown();
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObserverRegistry {
    fn drop(&mut self) {
        // Flush buffered writers
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Phase;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct SharedCounter(Arc<AtomicU64>);

    impl SharedCounter {
        fn new() -> Self {
            Self(Arc::new(AtomicU64::new(0)))
        }

        fn get(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct CountingObserver {
        events: SharedCounter,
        shutdowns: SharedCounter,
    }

    impl SimObserver for CountingObserver {
        fn on_events(&self, events: &[LoggedEvent]) -> Result<(), ObserverError> {
            self.events.0.fetch_add(events.len() as u64, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "CountingObserver"
        }

        fn on_shutdown(&self) {
            self.shutdowns.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FailingObserver;

    impl SimObserver for FailingObserver {
        fn on_events(&self, _events: &[LoggedEvent]) -> Result<(), ObserverError> {
            Err(ObserverError::Render("always fails".into()))
        }

        fn name(&self) -> &str {
            "FailingObserver"
        }
    }

    fn sample() -> LoggedEvent {
        LoggedEvent {
            round: 1,
            faction: "Red".to_string(),
            phase: Phase::Purchase,
            event: GameEvent::VictoryPointsToggled { enabled: true },
        }
    }

    #[test]
    fn test_observer_notification() {
        let events = SharedCounter::new();
        let shutdowns = SharedCounter::new();
        let mut registry = ObserverRegistry::new();
        registry.register(Box::new(FailingObserver));
        registry.register(Box::new(CountingObserver {
            events: events.clone(),
            shutdowns: shutdowns.clone(),
        }));

        registry.notify(&[sample(), sample()]);
        registry.notify(&[sample()]);
        assert_eq!(events.get(), 3);

        drop(registry);
        assert_eq!(shutdowns.get(), 1);
    }

    #[test]
    fn test_registry_len() {
        let mut registry = ObserverRegistry::default();
        assert!(registry.is_empty());
        registry.register(Box::new(FailingObserver));
        assert_eq!(registry.len(), 1);
    }
}
