//! Event emission system.
//!
//! Verifier events are republished to subscribers as JSON objects
//! `{seq, event_type, timestamp, payload}`. The verifier keeps only the
//! latest record, so price history is reconstructed from this stream; a gap
//! in `seq` means the subscriber lagged and missed events. Each
//! subscriber has an independent buffer; a slow subscriber lags rather than
//! blocking the ledger.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use veriprice_types::events::VerifierEvent;
use veriprice_types::UnixSeconds;

/// Default per-subscriber buffer.
pub const DEFAULT_CAPACITY: usize = 1000;

/// An event published by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the bus stream, starting at 1. Zero until emitted.
    #[serde(default)]
    pub seq: u64,
    /// Event type name (e.g. "Updated", "ThresholdBreached").
    pub event_type: String,
    pub timestamp: UnixSeconds,
    pub payload: serde_json::Value,
}

impl Event {
    /// A daemon-originated event.
    pub fn system(event_type: impl Into<String>, timestamp: UnixSeconds, payload: serde_json::Value) -> Self {
        Self {
            seq: 0,
            event_type: event_type.into(),
            timestamp,
            payload,
        }
    }

    /// Wrap a verifier event. The payload is the event's fields as JSON.
    pub fn from_verifier(event: &VerifierEvent, timestamp: UnixSeconds) -> Self {
        let payload = serde_json::to_value(event)
            .ok()
            .and_then(|mut v| v.get_mut("payload").map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null);
        Self::system(event.name(), timestamp, payload)
    }
}

/// Broadcast fan-out of daemon events.
///
/// Clones share the channel and the sequence counter.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    next_seq: Arc<AtomicU64>,
}

impl EventBus {
    /// `capacity` is the per-subscriber backlog before it starts lagging.
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
            next_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Stamp `event` with the next sequence number and publish it.
    ///
    /// Returns the assigned number. Publishing with no subscribers is fine.
    pub fn emit(&self, mut event: Event) -> u64 {
        event.seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let seq = event.seq;
        let _ = self.tx.send(event);
        seq
    }

    /// Publish verifier events in emission order.
    pub fn emit_verifier_events(&self, events: &[VerifierEvent], timestamp: UnixSeconds) {
        for event in events {
            self.emit(Event::from_verifier(event, timestamp));
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of events emitted so far.
    pub fn emitted(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst) - 1
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("emitted", &self.emitted())
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
