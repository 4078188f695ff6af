//! Typed, priority-ordered, TTL-bounded in-process message bus (spec §4.1).
//!
//! Subscribers register interest by message kind and an optional predicate.
//! Delivery is per-subscriber: a slow or dead subscriber only back-pressures
//! or is skipped for its own queue, never for the bus as a whole.

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{Message, MessageKind, Recipient};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("message bus has been shut down")]
    Closed,
}

pub type SubscriptionId = Uuid;

/// A predicate a subscriber can apply on top of its kind filter.
pub type MessagePredicate = Arc<dyn Fn(&Message) -> bool + Send + Sync>;

struct Subscription {
    kinds: Vec<MessageKind>,
    predicate: Option<MessagePredicate>,
    tx: mpsc::Sender<Message>,
}

/// Orders queued messages by priority (higher first), then FIFO by sequence.
struct QueuedMessage {
    message: Message,
    sequence: u64,
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.message.priority == other.message.priority && self.sequence == other.sequence
    }
}
impl Eq for QueuedMessage {}

impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.message
            .priority
            .cmp(&other.message.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default, Clone)]
pub struct BusStats {
    pub delivered: u64,
    pub ttl_dropped: u64,
    pub dead_subscriber_skips: u64,
}

struct SubscriberQueue {
    heap: Mutex<BinaryHeap<QueuedMessage>>,
    notify: Notify,
}

/// In-process message bus. Each subscription owns a priority heap plus a
/// background task (spawned in `subscribe`) that drains it into the
/// subscriber's bounded mpsc channel. Draining is decoupled from `publish`
/// so a backlog built up while a subscriber's channel was full keeps
/// draining in priority order as capacity frees up, rather than sitting
/// stuck until some unrelated later publish happens to touch that
/// subscriber again.
pub struct MessageBus {
    subscriptions: DashMap<SubscriptionId, Subscription>,
    closed: AtomicBool,
    sequence: AtomicU64,
    delivered: Arc<AtomicU64>,
    ttl_dropped: Arc<AtomicU64>,
    dead_subscriber_skips: Arc<AtomicU64>,
    queues: DashMap<SubscriptionId, Arc<SubscriberQueue>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            closed: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
            delivered: Arc::new(AtomicU64::new(0)),
            ttl_dropped: Arc::new(AtomicU64::new(0)),
            dead_subscriber_skips: Arc::new(AtomicU64::new(0)),
            queues: DashMap::new(),
        }
    }

    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Register interest in one or more kinds, with an optional predicate,
    /// and return a bounded receiving channel. Spawns the drain task that
    /// owns this subscription's delivery for its lifetime.
    pub fn subscribe(
        &self,
        kinds: Vec<MessageKind>,
        predicate: Option<MessagePredicate>,
        capacity: usize,
    ) -> (SubscriptionId, mpsc::Receiver<Message>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Arc::new(SubscriberQueue {
            heap: Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
        });
        self.queues.insert(id, queue.clone());
        self.subscriptions
            .insert(id, Subscription { kinds, predicate, tx: tx.clone() });

        tokio::spawn(drain_loop(
            id,
            queue,
            tx,
            self.delivered.clone(),
            self.ttl_dropped.clone(),
        ));

        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.remove(&id);
        if let Some((_, queue)) = self.queues.remove(&id) {
            queue.notify.notify_waiters();
        }
    }

    /// Enqueue a message for delivery to every matching subscriber.
    /// Publish-order is preserved per (sender, recipient) pair: the sequence
    /// counter is global and monotonic, and ties in priority break FIFO.
    /// Enqueueing never blocks on a slow subscriber; delivery order across
    /// whatever is pending for that subscriber is handled by its drain task.
    pub async fn publish(&self, message: Message) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }

        let now = Utc::now();
        if message.is_expired(now) {
            self.ttl_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(message_id = %message.id, "dropping TTL-expired message at publish time");
            return Ok(());
        }

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let mut dead = Vec::new();

        for entry in self.subscriptions.iter() {
            let (sub_id, sub) = (*entry.key(), entry.value());
            if !sub.kinds.contains(&message.kind) {
                continue;
            }
            let matches_recipient = match (&message.to, sub_id) {
                (Recipient::Broadcast, _) => true,
                (Recipient::Unicast(_), _) => true, // filtered by predicate/consumer identity
            };
            if !matches_recipient {
                continue;
            }
            if let Some(pred) = &sub.predicate {
                if !pred(&message) {
                    continue;
                }
            }
            if sub.tx.is_closed() {
                dead.push(sub_id);
                continue;
            }

            if let Some(queue) = self.queues.get(&sub_id) {
                {
                    let mut heap = queue.heap.lock().await;
                    heap.push(QueuedMessage {
                        message: message.clone(),
                        sequence,
                    });
                }
                queue.notify.notify_waiters();
            }
        }

        for sub_id in dead {
            self.dead_subscriber_skips.fetch_add(1, Ordering::Relaxed);
            warn!(subscription = %sub_id, "dropping message for closed subscriber");
            self.unsubscribe(sub_id);
        }

        Ok(())
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            ttl_dropped: self.ttl_dropped.load(Ordering::Relaxed),
            dead_subscriber_skips: self.dead_subscriber_skips.load(Ordering::Relaxed),
        }
    }
}

/// Owns one subscriber's delivery for the lifetime of its subscription.
/// Waits for a message to be queued, waits for the channel to have room
/// (so one slow subscriber never blocks fan-out to the others in
/// `publish`), then sends in priority order. Exits once the channel is
/// closed, since that means `unsubscribe` or receiver drop already ran.
async fn drain_loop(
    sub_id: SubscriptionId,
    queue: Arc<SubscriberQueue>,
    tx: mpsc::Sender<Message>,
    delivered: Arc<AtomicU64>,
    ttl_dropped: Arc<AtomicU64>,
) {
    loop {
        let queued = loop {
            let next = {
                let mut heap = queue.heap.lock().await;
                heap.pop()
            };
            match next {
                Some(queued) => break queued,
                None => queue.notify.notified().await,
            }
        };

        if queued.message.is_expired(Utc::now()) {
            ttl_dropped.fetch_add(1, Ordering::Relaxed);
            continue;
        }

        match tx.reserve().await {
            Ok(permit) => {
                permit.send(queued.message);
                delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                debug!(subscription = %sub_id, "drain task exiting, channel closed");
                return;
            }
        }
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
