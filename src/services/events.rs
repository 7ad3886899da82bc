//! Typed pre/post hooks around resource operations.
//!
//! Listeners are registered while the bus is built; after `build()` the bus
//! is immutable and can be shared across requests. `trigger` is synchronous
//! and runs listeners in registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Fetch,
    FetchAll,
    Update,
    Patch,
    PatchList,
    ReplaceList,
    Delete,
    DeleteList,
    Options,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::Create,
        EventKind::Fetch,
        EventKind::FetchAll,
        EventKind::Update,
        EventKind::Patch,
        EventKind::PatchList,
        EventKind::ReplaceList,
        EventKind::Delete,
        EventKind::DeleteList,
        EventKind::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Fetch => "fetch",
            EventKind::FetchAll => "fetch_all",
            EventKind::Update => "update",
            EventKind::Patch => "patch",
            EventKind::PatchList => "patch_list",
            EventKind::ReplaceList => "replace_list",
            EventKind::Delete => "delete",
            EventKind::DeleteList => "delete_list",
            EventKind::Options => "options",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Pre,
    Post,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Pre => "pre",
            Phase::Post => "post",
        }
    }
}

/// Inputs/results attached to an event. Which fields are set depends on
/// the operation (e.g. `fetch.post` carries `id` and `resource`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPayload {
    pub id: Option<String>,
    pub data: Option<Value>,
    pub resource: Option<Value>,
    pub collection: Option<Value>,
}

impl EventPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_resource(mut self, resource: Value) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn with_collection(mut self, collection: Value) -> Self {
        self.collection = Some(collection);
        self
    }
}

#[derive(Debug)]
pub struct Event<'a> {
    pub kind: EventKind,
    pub phase: Phase,
    // Route name of the controller that fired the event.
    pub source: &'a str,
    pub payload: &'a EventPayload,
}

impl Event<'_> {
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.as_str(), self.phase.as_str())
    }
}

pub type Listener = Arc<dyn Fn(&Event<'_>) + Send + Sync>;

#[derive(Clone, Default)]
pub struct EventBus {
    listeners: HashMap<(EventKind, Phase), Vec<Listener>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count: usize = self.listeners.values().map(Vec::len).sum();
        f.debug_struct("EventBus").field("listeners", &count).finish()
    }
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    pub fn trigger(&self, kind: EventKind, phase: Phase, source: &str, payload: &EventPayload) {
        let Some(listeners) = self.listeners.get(&(kind, phase)) else {
            return;
        };
        let event = Event {
            kind,
            phase,
            source,
            payload,
        };
        for listener in listeners {
            listener(&event);
        }
    }
}

#[derive(Default)]
pub struct EventBusBuilder {
    listeners: HashMap<(EventKind, Phase), Vec<Listener>>,
}

impl EventBusBuilder {
    pub fn on<F>(mut self, kind: EventKind, phase: Phase, listener: F) -> Self
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        self.listeners
            .entry((kind, phase))
            .or_default()
            .push(Arc::new(listener));
        self
    }

    /// Register one listener for every kind and both phases.
    pub fn on_every<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Event<'_>) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        for kind in EventKind::ALL {
            for phase in [Phase::Pre, Phase::Post] {
                self.listeners
                    .entry((kind, phase))
                    .or_default()
                    .push(listener.clone());
            }
        }
        self
    }

    pub fn build(self) -> EventBus {
        EventBus {
            listeners: self.listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn listeners_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());

        let bus = EventBus::builder()
            .on(EventKind::Create, Phase::Pre, move |e| {
                a.lock().unwrap().push(format!("first:{e}"))
            })
            .on(EventKind::Create, Phase::Pre, move |e| {
                b.lock().unwrap().push(format!("second:{}", e.source))
            })
            .build();

        bus.trigger(EventKind::Create, Phase::Pre, "widgets", &EventPayload::new());
        bus.trigger(EventKind::Create, Phase::Post, "widgets", &EventPayload::new());

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:create.pre".to_string(), "second:widgets".to_string()]
        );
    }

    #[test]
    fn on_every_sees_all_kinds_and_phases() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let bus = EventBus::builder()
            .on_every(move |e| sink.lock().unwrap().push(e.name()))
            .build();

        bus.trigger(EventKind::FetchAll, Phase::Pre, "w", &EventPayload::new());
        bus.trigger(EventKind::DeleteList, Phase::Post, "w", &EventPayload::new());

        assert_eq!(*seen.lock().unwrap(), vec!["fetch_all.pre", "delete_list.post"]);
    }

    #[test]
    fn payload_passes_through() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let bus = EventBus::builder()
            .on(EventKind::Fetch, Phase::Post, move |e| {
                *sink.lock().unwrap() = Some(e.payload.clone())
            })
            .build();

        let payload = EventPayload::new()
            .with_id("7")
            .with_resource(serde_json::json!({"id": "7"}));
        bus.trigger(EventKind::Fetch, Phase::Post, "w", &payload);

        assert_eq!(seen.lock().unwrap().as_ref(), Some(&payload));
    }
}
