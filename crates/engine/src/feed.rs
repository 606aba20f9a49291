//! Change feed: one event per committed mutation.
//!
//! The database publishes strictly after each commit, while still holding
//! the writer lock, so events are delivered in commit order.
//!
//! Every [`ChangeStream`] owns a bounded queue created when it subscribes.
//! A published event is copied into each live subscriber's queue, so every
//! subscriber sees every event committed after it subscribed and nothing
//! from before. With no subscribers, events are numbered and discarded.
//!
//! When a subscriber's queue is full the configured [`OverflowPolicy`]
//! decides what happens for that subscriber. Every committed mutation gets a
//! sequence number whether or not its event survives, so dropped events show
//! up as gaps.

use parking_lot::{Condvar, Mutex as ParkingMutex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use suitestore_core::{Collection, Document, Error, Result};
use thiserror::Error as ThisError;
use tracing::{debug, warn};

/// What a publish does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait until a subscriber takes an event. Writers stall meanwhile.
    Block,
    /// Discard the oldest queued event.
    #[default]
    DropOldest,
    /// Discard the event being published.
    DropNewest,
}

/// Kind of mutation an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    /// A document was inserted
    Insert,
    /// A document was patched or soft-deleted
    Update,
}

/// One committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Position in commit order, starting at 1
    pub sequence: u64,
    /// Kind of mutation
    pub op: ChangeOp,
    /// Collection of the changed document
    pub collection: Collection,
    /// The document as committed
    pub document: serde_json::Value,
}

impl Change {
    /// Id of the changed document
    pub fn id(&self) -> Option<&str> {
        self.document.get("id").and_then(|v| v.as_str())
    }

    /// Decode the document as `T`
    ///
    /// Fails with `InvalidModel` if the event belongs to another collection.
    pub fn decode<T: Document>(&self) -> Result<T> {
        if self.collection != T::COLLECTION {
            return Err(Error::invalid_model(format!(
                "change for '{}' decoded as '{}'",
                self.collection,
                T::COLLECTION
            )));
        }
        Ok(serde_json::from_value(self.document.clone())?)
    }
}

/// Change recorded inside a write transaction, published after commit.
#[derive(Debug, Clone)]
pub(crate) struct PendingChange {
    pub(crate) op: ChangeOp,
    pub(crate) collection: Collection,
    pub(crate) document: serde_json::Value,
}

/// Error returned when publishing to a closed feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[error("change feed is closed")]
pub struct FeedClosed;

/// Feed metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStats {
    /// Live subscribers
    pub subscribers: usize,
    /// Events waiting in the fullest subscriber queue
    pub queue_depth: usize,
    /// Per-subscriber capacity
    pub capacity: usize,
    /// Committed changes published to the feed
    pub published: u64,
    /// Events discarded by the overflow policy, summed over subscribers
    pub dropped: u64,
    /// True once the feed is closed
    pub closed: bool,
}

struct QueueState {
    events: VecDeque<Change>,
    // Blocked publishers give up waiting and enqueue past capacity
    sealed: bool,
    closed: bool,
    // The stream was dropped; nothing is delivered any more
    detached: bool,
    dropped: u64,
}

/// One subscriber's bounded queue.
struct SubscriberQueue {
    state: ParkingMutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl SubscriberQueue {
    fn new(sealed: bool, closed: bool, capacity: usize) -> Self {
        Self {
            state: ParkingMutex::new(QueueState {
                events: VecDeque::with_capacity(capacity.min(64)),
                sealed,
                closed,
                detached: false,
                dropped: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }
}

struct FeedState {
    next_sequence: u64,
    sealed: bool,
    closed: bool,
    subscribers: Vec<Weak<SubscriberQueue>>,
}

impl FeedState {
    fn live_subscribers(&mut self) -> Vec<Arc<SubscriberQueue>> {
        self.subscribers.retain(|w| w.strong_count() > 0);
        self.subscribers.iter().filter_map(Weak::upgrade).collect()
    }
}

struct FeedShared {
    state: ParkingMutex<FeedState>,
    capacity: usize,
    policy: OverflowPolicy,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl FeedShared {
    fn deliver(&self, queue: &SubscriberQueue, change: Change) {
        let mut state = queue.state.lock();
        if state.detached {
            return;
        }
        if state.events.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::Block => {
                    while state.events.len() >= self.capacity && !state.sealed && !state.detached {
                        queue.not_full.wait(&mut state);
                    }
                    if state.detached {
                        return;
                    }
                }
                OverflowPolicy::DropOldest => {
                    if let Some(oldest) = state.events.pop_front() {
                        state.dropped += 1;
                        self.dropped.fetch_add(1, AtomicOrdering::Relaxed);
                        warn!(
                            target: "suitestore::feed",
                            sequence = oldest.sequence,
                            capacity = self.capacity,
                            "Subscriber queue full, dropped oldest event"
                        );
                    }
                }
                OverflowPolicy::DropNewest => {
                    state.dropped += 1;
                    self.dropped.fetch_add(1, AtomicOrdering::Relaxed);
                    warn!(
                        target: "suitestore::feed",
                        sequence = change.sequence,
                        capacity = self.capacity,
                        "Subscriber queue full, dropped newest event"
                    );
                    return;
                }
            }
        }
        state.events.push_back(change);
        queue.not_empty.notify_one();
    }

    fn stats(&self) -> FeedStats {
        let (subscribers, closed) = {
            let mut state = self.state.lock();
            (state.live_subscribers(), state.closed)
        };
        let queue_depth = subscribers
            .iter()
            .map(|q| q.state.lock().events.len())
            .max()
            .unwrap_or(0);
        FeedStats {
            subscribers: subscribers.len(),
            queue_depth,
            capacity: self.capacity,
            published: self.published.load(AtomicOrdering::Relaxed),
            dropped: self.dropped.load(AtomicOrdering::Relaxed),
            closed,
        }
    }
}

/// Fan-out change feed owned by the database.
pub struct ChangeFeed {
    shared: Arc<FeedShared>,
}

impl ChangeFeed {
    /// Create a feed; each subscriber holds at most `capacity` undelivered
    /// events.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            shared: Arc::new(FeedShared {
                state: ParkingMutex::new(FeedState {
                    next_sequence: 1,
                    sealed: false,
                    closed: false,
                    subscribers: Vec::new(),
                }),
                capacity: capacity.max(1),
                policy,
                published: AtomicU64::new(0),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// A new subscriber receiving every event published from now on.
    ///
    /// Subscribing to a closed feed yields a stream that has already ended.
    pub fn subscribe(&self) -> ChangeStream {
        let mut state = self.shared.state.lock();
        let queue = Arc::new(SubscriberQueue::new(
            state.sealed,
            state.closed,
            self.shared.capacity,
        ));
        state.subscribers.push(Arc::downgrade(&queue));
        debug!(
            target: "suitestore::feed",
            subscribers = state.subscribers.len(),
            "Subscribed to change feed"
        );
        ChangeStream {
            shared: Arc::clone(&self.shared),
            queue,
        }
    }

    /// Deliver one committed change to every subscriber. Returns its
    /// sequence number.
    pub(crate) fn publish(&self, change: PendingChange) -> std::result::Result<u64, FeedClosed> {
        let (sequence, subscribers) = {
            let mut state = self.shared.state.lock();
            if state.closed {
                warn!(
                    target: "suitestore::feed",
                    collection = %change.collection,
                    "Publish rejected after close"
                );
                return Err(FeedClosed);
            }
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            (sequence, state.live_subscribers())
        };
        self.shared.published.fetch_add(1, AtomicOrdering::Relaxed);

        let change = Change {
            sequence,
            op: change.op,
            collection: change.collection,
            document: change.document,
        };
        for queue in &subscribers {
            self.shared.deliver(queue, change.clone());
        }
        Ok(sequence)
    }

    /// Release publishers blocked on a full queue.
    ///
    /// After sealing, publishes no longer wait for room.
    pub(crate) fn seal(&self) {
        let subscribers = {
            let mut state = self.shared.state.lock();
            state.sealed = true;
            state.live_subscribers()
        };
        for queue in &subscribers {
            queue.state.lock().sealed = true;
            queue.not_full.notify_all();
        }
    }

    /// Close the feed. Idempotent.
    ///
    /// Queued events stay readable; once drained, subscribers observe the
    /// end of the stream.
    pub fn close(&self) {
        let subscribers = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.sealed = true;
            state.closed = true;
            state.live_subscribers()
        };
        for queue in &subscribers {
            let mut state = queue.state.lock();
            state.sealed = true;
            state.closed = true;
            queue.not_full.notify_all();
            queue.not_empty.notify_all();
        }
        debug!(
            target: "suitestore::feed",
            subscribers = subscribers.len(),
            "Change feed closed"
        );
    }

    /// Return a snapshot of feed metrics.
    pub fn stats(&self) -> FeedStats {
        self.shared.stats()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("capacity", &self.shared.capacity)
            .field("policy", &self.shared.policy)
            .finish()
    }
}

/// One subscriber of the change feed.
///
/// Iterating blocks for each event and ends when the feed is closed and
/// this subscriber's queue is drained. Dropping the stream unsubscribes it.
pub struct ChangeStream {
    shared: Arc<FeedShared>,
    queue: Arc<SubscriberQueue>,
}

impl ChangeStream {
    /// Block until an event is available. `None` once closed and drained.
    pub fn recv(&self) -> Option<Change> {
        let mut state = self.queue.state.lock();
        loop {
            if let Some(change) = state.events.pop_front() {
                self.queue.not_full.notify_one();
                return Some(change);
            }
            if state.closed {
                return None;
            }
            self.queue.not_empty.wait(&mut state);
        }
    }

    /// Take an event if one is queued.
    pub fn try_recv(&self) -> Option<Change> {
        let mut state = self.queue.state.lock();
        let change = state.events.pop_front();
        if change.is_some() {
            self.queue.not_full.notify_one();
        }
        change
    }

    /// Wait up to `timeout` for an event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Change> {
        let deadline = Instant::now() + timeout;
        let mut state = self.queue.state.lock();
        loop {
            if let Some(change) = state.events.pop_front() {
                self.queue.not_full.notify_one();
                return Some(change);
            }
            if state.closed {
                return None;
            }
            if self
                .queue
                .not_empty
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                let change = state.events.pop_front();
                if change.is_some() {
                    self.queue.not_full.notify_one();
                }
                return change;
            }
        }
    }

    /// Take every queued event without blocking.
    pub fn drain(&self) -> Vec<Change> {
        let mut state = self.queue.state.lock();
        let changes: Vec<Change> = state.events.drain(..).collect();
        if !changes.is_empty() {
            self.queue.not_full.notify_all();
        }
        changes
    }

    /// Events waiting in this subscriber's queue
    pub fn pending(&self) -> usize {
        self.queue.state.lock().events.len()
    }

    /// Events this subscriber lost to the overflow policy
    pub fn dropped(&self) -> u64 {
        self.queue.state.lock().dropped
    }

    /// True once the feed is closed and no events remain.
    pub fn is_finished(&self) -> bool {
        let state = self.queue.state.lock();
        state.closed && state.events.is_empty()
    }

    /// Return a snapshot of feed-wide metrics.
    pub fn stats(&self) -> FeedStats {
        self.shared.stats()
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        let mut state = self.queue.state.lock();
        state.detached = true;
        state.events.clear();
        self.queue.not_full.notify_all();
    }
}

impl Iterator for ChangeStream {
    type Item = Change;

    fn next(&mut self) -> Option<Change> {
        self.recv()
    }
}

impl std::fmt::Debug for ChangeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeStream")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}
