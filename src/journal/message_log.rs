//! Bounded FIFO message log with viewer fan-out.
//!
//! Appends happen on the broker connector's event-loop task while gateway
//! viewers read snapshots and receive live events on their own tasks. One
//! mutex serializes all mutation; fan-out is a non-blocking `try_send` into
//! each viewer's bounded queue so a stalled viewer can never stall broker
//! message processing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::log_entry::{EntryKind, LogEntry};

/// Per-viewer event queue depth. A viewer further behind than this loses
/// events rather than blocking the append path.
const VIEWER_QUEUE_CAPACITY: usize = 64;

/// Handle identifying one registered subscriber
pub type SubscriberId = u64;

/// Event fanned out to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A finalized entry was appended
    Entry(LogEntry),
    /// The log was emptied; viewers discard their local view
    Cleared,
}

struct LogInner {
    entries: VecDeque<LogEntry>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<LogEvent>>,
    next_subscriber_id: SubscriberId,
}

/// Bounded, ordered, timestamped record of all relayed events
pub struct MessageLog {
    capacity: usize,
    inner: Mutex<LogInner>,
}

impl MessageLog {
    /// Creates an empty log holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(LogInner {
                entries: VecDeque::with_capacity(capacity),
                subscribers: HashMap::new(),
                next_subscriber_id: 0,
            }),
        }
    }

    /// Timestamps and appends an entry, evicting the oldest entry beyond
    /// capacity, then fans the finalized entry out to every subscriber.
    ///
    /// Returns the finalized entry.
    pub fn append(&self, kind: EntryKind, content: String, topic: String, raw: String) -> LogEntry {
        let entry = LogEntry {
            kind,
            content,
            topic,
            raw,
            timestamp: LogEntry::format_timestamp(),
        };

        info!("[{}] {}: {}", entry.timestamp, entry.kind, entry.content);

        let mut inner = self.inner.lock().unwrap();
        inner.entries.push_back(entry.clone());
        while inner.entries.len() > self.capacity {
            inner.entries.pop_front();
        }
        Self::fan_out(&mut inner, LogEvent::Entry(entry.clone()));
        entry
    }

    /// Point-in-time copy of the log in insertion order.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        let inner = self.inner.lock().unwrap();
        inner.entries.iter().cloned().collect()
    }

    /// Atomically empties the log and notifies all subscribers.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        info!("Message log cleared");
        Self::fan_out(&mut inner, LogEvent::Cleared);
    }

    /// Registers a subscriber.
    ///
    /// The receiver sees only events that happen after registration; viewer
    /// connections use [`subscribe_with_snapshot`](Self::subscribe_with_snapshot)
    /// to get history atomically as well.
    pub(crate) fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<LogEvent>) {
        let (tx, rx) = mpsc::channel(VIEWER_QUEUE_CAPACITY);
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner.subscribers.insert(id, tx);
        debug!(subscriber = id, "log subscriber registered");
        (id, rx)
    }

    /// Registers a subscriber and takes a snapshot under the same lock.
    ///
    /// The snapshot plus the event stream together deliver every entry
    /// exactly once: nothing appended between snapshot and registration can
    /// be missed or duplicated.
    pub fn subscribe_with_snapshot(
        &self,
    ) -> (SubscriberId, mpsc::Receiver<LogEvent>, Vec<LogEntry>) {
        let (tx, rx) = mpsc::channel(VIEWER_QUEUE_CAPACITY);
        let mut inner = self.inner.lock().unwrap();
        let history = inner.entries.iter().cloned().collect();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner.subscribers.insert(id, tx);
        debug!(subscriber = id, "log subscriber registered with snapshot");
        (id, rx, history)
    }

    /// Removes a subscriber. Safe to call for an already-removed id.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut inner = self.inner.lock().unwrap();
        if inner.subscribers.remove(&id).is_some() {
            debug!(subscriber = id, "log subscriber removed");
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// True when the log holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-blocking delivery to every subscriber; queues that are full lose
    /// the event, closed queues are pruned.
    fn fan_out(inner: &mut LogInner, event: LogEvent) {
        let mut closed = Vec::new();
        for (id, tx) in &inner.subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = *id, "viewer queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    closed.push(*id);
                }
            }
        }
        for id in closed {
            inner.subscribers.remove(&id);
            debug!(subscriber = id, "pruned closed log subscriber");
        }
    }
}
