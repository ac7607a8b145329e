//! Run events and listener registry
//!
//! JSON-serializable events describing a run, dispatched by kind to
//! registered callbacks. Registering returns a [`Disposer`]; disposing it
//! removes exactly that callback.

use crate::core::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Events emitted while a run is in progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Process task spawned
    ProcessStarted { label: String },
    /// A complete line reached the render surface
    LineRendered {
        label: String,
        stream: Stream,
        message: String,
    },
    /// Process task settled; `error` is set when it failed
    ProcessSettled {
        label: String,
        error: Option<String>,
    },
    /// Overall outcome left its previous state
    OutcomeChanged {
        outcome: String,
        error: Option<String>,
    },
}

/// Discriminant of [`RunEvent`], used as the registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProcessStarted,
    LineRendered,
    ProcessSettled,
    OutcomeChanged,
}

impl RunEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ProcessStarted { .. } => EventKind::ProcessStarted,
            Self::LineRendered { .. } => EventKind::LineRendered,
            Self::ProcessSettled { .. } => EventKind::ProcessSettled,
            Self::OutcomeChanged { .. } => EventKind::OutcomeChanged,
        }
    }

    /// Serialize to JSON line
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

type Listener = Arc<dyn Fn(&RunEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(u64, Listener)>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registry of event callbacks, cheap to clone
#[derive(Clone, Default)]
pub struct EventHub {
    registry: Arc<Mutex<Registry>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`
    pub fn on<F>(&self, kind: EventKind, listener: F) -> Disposer
    where
        F: Fn(&RunEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));

        Disposer {
            registry: Arc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    /// Call every listener registered for the event's kind.
    ///
    /// Listeners run outside the registry lock and may register or dispose.
    pub fn emit(&self, event: &RunEvent) {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .get(&event.kind())
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        lock(&self.registry)
            .listeners
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = lock(&self.registry);
        let total: usize = registry.listeners.values().map(Vec::len).sum();
        f.debug_struct("EventHub").field("listeners", &total).finish()
    }
}

/// Removes one registration from an [`EventHub`].
///
/// Dropping a disposer without calling [`Disposer::dispose`] keeps the
/// listener registered.
#[must_use = "keep the disposer to be able to remove the listener"]
#[derive(Debug)]
pub struct Disposer {
    registry: Weak<Mutex<Registry>>,
    kind: EventKind,
    id: u64,
}

impl Disposer {
    pub fn dispose(self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = lock(&registry);
        if let Some(entries) = registry.listeners.get_mut(&self.kind) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                registry.listeners.remove(&self.kind);
            }
        }
    }
}
