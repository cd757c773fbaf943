//! Event types and broadcast bus for journal entry lifecycle notifications
//!
//! Consumers (UI layers, the CLI, tests) subscribe to the [`EventBus`] to learn
//! when an entry appears, when its analysis status moves, and when it goes away.
//! Events are notifications only; the entry store remains the source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::AnalysisStatus;

/// Kind of journal entry, as carried in events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKindTag {
    Text,
    Video,
}

/// Journal lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JournalEvent {
    /// Entry persisted and inserted at the head of the local collection
    EntryCreated {
        entry_id: Uuid,
        kind: EntryKindTag,
        timestamp: DateTime<Utc>,
    },

    /// Entry analysis status changed
    AnalysisStatusChanged {
        entry_id: Uuid,
        old_status: AnalysisStatus,
        new_status: AnalysisStatus,
        timestamp: DateTime<Utc>,
    },

    /// Video analysis job accepted by the emotion provider
    AnalysisJobSubmitted {
        entry_id: Uuid,
        job_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Entry deleted from the repository and the local collection
    EntryRemoved {
        entry_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl JournalEvent {
    /// Entry the event refers to
    pub fn entry_id(&self) -> Uuid {
        match self {
            JournalEvent::EntryCreated { entry_id, .. }
            | JournalEvent::AnalysisStatusChanged { entry_id, .. }
            | JournalEvent::AnalysisJobSubmitted { entry_id, .. }
            | JournalEvent::EntryRemoved { entry_id, .. } => *entry_id,
        }
    }
}

/// Broadcast bus for [`JournalEvent`]s
///
/// Cloning the bus shares the underlying channel. Slow subscribers lag and
/// lose the oldest events once `capacity` is exceeded.
///
/// # Examples
///
/// ```
/// use moodlog_common::events::{EventBus, JournalEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(JournalEvent::EntryRemoved {
///     entry_id: uuid::Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(JournalEvent::EntryRemoved { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JournalEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<JournalEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: JournalEvent,
    ) -> Result<usize, broadcast::error::SendError<JournalEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: JournalEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
