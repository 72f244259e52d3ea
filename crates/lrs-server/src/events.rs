//! Lifecycle and domain event dispatch.
//!
//! Listeners are collected during the single-threaded boot phase (core and
//! extension listeners share one table, with no core precedence) and frozen
//! into an immutable [`EventBus`] before the server accepts traffic.
//! Dispatch is synchronous: `emit` runs every listener registered for the
//! event name before returning, in descending priority order, ties broken
//! by registration order.
//!
//! # Event Names
//!
//! - `request.received` / `request.completed`: request lifecycle, fired by
//!   the pipeline middleware
//! - `statement.stored`: fired when a statement document is persisted

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Well-known event names emitted by the core.
pub mod names {
    pub const REQUEST_RECEIVED: &str = "request.received";
    pub const REQUEST_COMPLETED: &str = "request.completed";
    pub const STATEMENT_STORED: &str = "statement.stored";
}

/// An event passing through the bus: a name plus structured data.
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub data: Value,
}

impl Event {
    #[must_use]
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// A registered listener callable.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

/// One listener registration: event name, callable, priority.
#[derive(Clone)]
pub struct ListenerEntry {
    pub event: String,
    pub priority: i32,
    pub listener: Listener,
}

impl ListenerEntry {
    pub fn new(event: impl Into<String>, priority: i32, listener: Listener) -> Self {
        Self {
            event: event.into(),
            priority,
            listener,
        }
    }
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("event", &self.event)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Boot-phase collector for listener registrations.
#[derive(Debug, Default)]
pub struct EventBusBuilder {
    entries: Vec<ListenerEntry>,
}

impl EventBusBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one listener. Boot phase only.
    pub fn subscribe(&mut self, event: impl Into<String>, priority: i32, listener: Listener) {
        self.entries.push(ListenerEntry::new(event, priority, listener));
    }

    /// Merge a batch of entries (e.g. everything one extension contributed).
    pub fn extend(&mut self, entries: Vec<ListenerEntry>) {
        self.entries.extend(entries);
    }

    /// Freeze the table. Registration order is preserved as the tiebreaker
    /// within equal priorities.
    #[must_use]
    pub fn freeze(self) -> EventBus {
        let mut table: HashMap<String, Vec<(i32, usize, Listener)>> = HashMap::new();
        for (seq, entry) in self.entries.into_iter().enumerate() {
            table
                .entry(entry.event)
                .or_default()
                .push((entry.priority, seq, entry.listener));
        }

        let table = table
            .into_iter()
            .map(|(event, mut listeners)| {
                listeners.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
                let ordered = listeners.into_iter().map(|(_, _, l)| l).collect();
                (event, ordered)
            })
            .collect();

        EventBus { table }
    }
}

/// Frozen, read-only listener table. Shared by all requests.
#[derive(Default)]
pub struct EventBus {
    table: HashMap<String, Vec<Listener>>,
}

impl EventBus {
    /// An empty bus, for tests and minimal deployments.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Dispatch `event` to every listener registered for its name,
    /// synchronously, in priority-then-registration order.
    pub fn emit(&self, event: &Event) {
        let Some(listeners) = self.table.get(&event.name) else {
            return;
        };
        tracing::trace!(event = %event.name, listeners = listeners.len(), "Dispatching event");
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of listeners registered for `event_name`.
    #[must_use]
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.table.get(event_name).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Listener {
        let log = Arc::clone(log);
        Arc::new(move |_event| log.lock().unwrap().push(tag))
    }

    #[test]
    fn test_priority_order_descending() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = EventBusBuilder::new();
        builder.subscribe("statement.stored", 5, recorder(&log, "low"));
        builder.subscribe("statement.stored", 10, recorder(&log, "high"));
        let bus = builder.freeze();

        bus.emit(&Event::new("statement.stored", Value::Null));

        assert_eq!(*log.lock().unwrap(), vec!["high", "low"]);
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = EventBusBuilder::new();
        builder.subscribe("e", 0, recorder(&log, "first"));
        builder.subscribe("e", 0, recorder(&log, "second"));
        builder.subscribe("e", 0, recorder(&log, "third"));
        let bus = builder.freeze();

        bus.emit(&Event::new("e", Value::Null));

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unknown_event_is_a_noop() {
        let bus = EventBusBuilder::new().freeze();
        bus.emit(&Event::new("nobody.listens", Value::Null));
        assert_eq!(bus.listener_count("nobody.listens"), 0);
    }

    #[test]
    fn test_listeners_only_fire_for_their_event() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut builder = EventBusBuilder::new();
        builder.subscribe("a", 0, recorder(&log, "a"));
        builder.subscribe("b", 0, recorder(&log, "b"));
        let bus = builder.freeze();

        bus.emit(&Event::new("b", Value::Null));

        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }
}
