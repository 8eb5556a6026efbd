//! Observability port for the traceability core.
//!
//! Core components never touch a global logger. They receive an
//! [`Observer`] and report structured [`ObserverEvent`]s through it. The
//! default is [`NoopObserver`]; the CLI wires in [`TracingObserver`], and
//! tests use [`RecordingObserver`] to assert on what was reported.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Severity of an observer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A structured event emitted by a core component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverEvent {
    pub level: EventLevel,
    /// Stable event name (e.g. `kpi.uncovered_mismatch`).
    pub name: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl ObserverEvent {
    pub fn new(level: EventLevel, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn debug(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Debug, name, message)
    }

    pub fn info(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Info, name, message)
    }

    pub fn warn(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Warn, name, message)
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventLevel::Error, name, message)
    }

    /// Attach a key/value field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }

    /// Look up a field value by key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn fields_display(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Sink for core events.
pub trait Observer {
    fn event(&self, event: &ObserverEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn event(&self, _event: &ObserverEvent) {}
}

/// Forwards events to `tracing` under the `tctc` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn event(&self, event: &ObserverEvent) {
        let fields = event.fields_display();
        match event.level {
            EventLevel::Debug => {
                tracing::debug!(target: "tctc", event = %event.name, %fields, "{}", event.message)
            }
            EventLevel::Info => {
                tracing::info!(target: "tctc", event = %event.name, %fields, "{}", event.message)
            }
            EventLevel::Warn => {
                tracing::warn!(target: "tctc", event = %event.name, %fields, "{}", event.message)
            }
            EventLevel::Error => {
                tracing::error!(target: "tctc", event = %event.name, %fields, "{}", event.message)
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events with the given name.
    pub fn named(&self, name: &str) -> Vec<ObserverEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.name == name)
            .collect()
    }

    pub fn count_at(&self, level: EventLevel) -> usize {
        self.events()
            .iter()
            .filter(|event| event.level == level)
            .count()
    }
}

impl Observer for RecordingObserver {
    fn event(&self, event: &ObserverEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

impl<T: Observer + ?Sized> Observer for &T {
    fn event(&self, event: &ObserverEvent) {
        (**self).event(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let observer = RecordingObserver::new();
        observer.event(&ObserverEvent::info("a", "first"));
        observer.event(&ObserverEvent::warn("b", "second").with_field("count", 2));

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "a");
        assert_eq!(events[1].field("count"), Some("2"));
        assert_eq!(observer.count_at(EventLevel::Warn), 1);
        assert_eq!(observer.named("b").len(), 1);
    }

    #[test]
    fn test_noop_and_tracing_observers_do_not_panic() {
        let event = ObserverEvent::error("x", "boom").with_field("k", "v");
        NoopObserver.event(&event);
        TracingObserver.event(&event);
    }

    #[test]
    fn test_fields_display() {
        let event = ObserverEvent::debug("x", "m")
            .with_field("a", 1)
            .with_field("b", "two");
        assert_eq!(event.fields_display(), "a=1 b=two");
    }
}
