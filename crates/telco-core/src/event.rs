//! Observable side channel of the simulation.
//!
//! Companies and the market record events in their own outboxes while a
//! phase runs. Between phases the game moves them, in order, into the
//! [`EventBus`], which holds a single ring buffer so that the order and
//! multiplicity of events survive across kinds (a split cable is always one
//! removal followed by two additions). Buffered events are delivered to
//! passive listeners once per tick.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`]. Suppressed events
//! are dropped on emit and never reach listeners.

use telco_tech_tree::TechId;

use crate::customer::CustomerStatus;
use crate::id::*;
use crate::network::Status;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // -- Placement --
    CableAdded {
        company: CompanyId,
        cable: CableId,
    },
    CableRemoved {
        company: CompanyId,
        cable: CableId,
    },
    /// A cable was trimmed in place.
    CableUpdated {
        company: CompanyId,
        cable: CableId,
    },
    NodeAdded {
        company: CompanyId,
        node: NodeId,
    },
    NodeRemoved {
        company: CompanyId,
        node: NodeId,
    },
    TruckAdded {
        company: CompanyId,
        truck: TruckId,
    },
    TruckRemoved {
        company: CompanyId,
        truck: TruckId,
    },

    // -- Network --
    StatusChanged {
        company: CompanyId,
        target: InfrastructureId,
        status: Status,
    },
    ServiceAreaChanged {
        company: CompanyId,
        tiles: usize,
    },

    // -- Market --
    CustomerChanged {
        customer: CustomerId,
        provider: Option<CompanyId>,
        status: CustomerStatus,
    },

    // -- Research --
    ResearchStarted {
        company: CompanyId,
        tech: TechId,
    },
    ResearchCompleted {
        company: CompanyId,
        tech: TechId,
    },
}

/// Discriminant tag for event types, used for suppression and subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CableAdded,
    CableRemoved,
    CableUpdated,
    NodeAdded,
    NodeRemoved,
    TruckAdded,
    TruckRemoved,
    StatusChanged,
    ServiceAreaChanged,
    CustomerChanged,
    ResearchStarted,
    ResearchCompleted,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 12;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::CableAdded { .. } => EventKind::CableAdded,
            Event::CableRemoved { .. } => EventKind::CableRemoved,
            Event::CableUpdated { .. } => EventKind::CableUpdated,
            Event::NodeAdded { .. } => EventKind::NodeAdded,
            Event::NodeRemoved { .. } => EventKind::NodeRemoved,
            Event::TruckAdded { .. } => EventKind::TruckAdded,
            Event::TruckRemoved { .. } => EventKind::TruckRemoved,
            Event::StatusChanged { .. } => EventKind::StatusChanged,
            Event::ServiceAreaChanged { .. } => EventKind::ServiceAreaChanged,
            Event::CustomerChanged { .. } => EventKind::CustomerChanged,
            Event::ResearchStarted { .. } => EventKind::ResearchStarted,
            Event::ResearchCompleted { .. } => EventKind::ResearchCompleted,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
    /// Events overwritten before they were read.
    dropped: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        if self.len == self.capacity() {
            self.dropped += 1;
        }
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events that were dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> + '_ {
        // Once full, head is the next write position and therefore the oldest.
        let start = if self.len < self.capacity() { 0 } else { self.head };
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

struct ListenerEntry {
    listener: PassiveListener,
    filter: Option<EventFilter>,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// The central event bus: one ordered buffer, listeners per kind, and
/// suppression flags.
#[derive(Debug)]
pub struct EventBus {
    buffer: EventBuffer,
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    emitted: [u64; EVENT_KIND_COUNT],
}

impl EventBus {
    /// Create a new event bus holding at most `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: EventBuffer::new(capacity),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            emitted: [0; EVENT_KIND_COUNT],
        }
    }

    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-ops if the event kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        self.emitted[idx] += 1;
        self.buffer.push(event);
    }

    /// Buffer events in order.
    pub fn emit_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Register a listener for an event kind. Listeners of a kind are called
    /// in registration order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners[kind.index()].push(ListenerEntry {
            listener,
            filter: None,
        });
    }

    /// Register a listener that only sees events accepted by `filter`.
    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        filter: EventFilter,
        listener: PassiveListener,
    ) {
        self.listeners[kind.index()].push(ListenerEntry {
            listener,
            filter: Some(filter),
        });
    }

    /// Deliver all buffered events oldest first, then clear the buffer.
    pub fn deliver(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let events: Vec<Event> = self.buffer.iter().cloned().collect();
        self.buffer.clear();

        for event in &events {
            for entry in &mut self.listeners[event.kind().index()] {
                if let Some(filter) = &entry.filter
                    && !filter(event)
                {
                    continue;
                }
                (entry.listener)(event);
            }
        }
    }

    /// Events waiting for delivery, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Event> + '_ {
        self.buffer.iter()
    }

    pub fn pending_count(&self) -> usize {
        self.buffer.len()
    }

    /// Events of a kind emitted since creation, including delivered and dropped.
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.emitted[kind.index()]
    }

    pub fn dropped_count(&self) -> u64 {
        self.buffer.dropped_count()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(4096)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
