//! Live subscription tracking

use crate::hub::update::Update;
use crate::topic::TopicSelector;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Lifecycle of a subscription. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Created, not yet registered.
    Pending,
    /// Registered and receiving.
    Active,
    /// Unregistered; never reactivated.
    Closed,
}

/// One live subscriber connection.
///
/// `authorized` is derived once from the verified token at subscribe time and
/// never escalated afterward.
#[derive(Debug)]
pub struct Subscription {
    pub id: Uuid,
    interest: Vec<TopicSelector>,
    authorized: Vec<TopicSelector>,
    state: RwLock<SubscriptionState>,
    /// Taken on close so the receiving end observes end-of-stream.
    tx: Mutex<Option<mpsc::Sender<Update>>>,
}

/// Outcome of offering an update to a subscription.
pub enum DeliveryOutcome {
    Delivered,
    /// Bounded buffer is full; the subscriber is too slow.
    BufferFull,
    /// The subscription is closed or its receiver is gone.
    Gone,
}

impl Subscription {
    pub fn new(
        interest: Vec<TopicSelector>,
        authorized: Vec<TopicSelector>,
        tx: mpsc::Sender<Update>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            interest,
            authorized,
            state: RwLock::new(SubscriptionState::Pending),
            tx: Mutex::new(Some(tx)),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        *self.state.read()
    }

    /// Pending -> Active. Returns false if the subscription was already
    /// closed (registration raced a disconnect).
    fn activate(&self) -> bool {
        let mut state = self.state.write();
        match *state {
            SubscriptionState::Pending => {
                *state = SubscriptionState::Active;
                true
            }
            SubscriptionState::Active => true,
            SubscriptionState::Closed => false,
        }
    }

    /// Any state -> Closed. Drops the sender so a draining receiver ends.
    fn close(&self) {
        *self.state.write() = SubscriptionState::Closed;
        self.tx.lock().take();
    }

    /// Whether this subscription should receive an update addressed to the
    /// given topics.
    ///
    /// Some topic must be both wanted and authorized; private updates require
    /// the authorizing selector to be explicit (not `*`).
    pub fn wants(&self, topics: &[String], private: bool) -> bool {
        topics.iter().any(|topic| {
            self.interest.iter().any(|s| s.matches(topic))
                && self
                    .authorized
                    .iter()
                    .any(|s| s.matches(topic) && !(private && s.is_all()))
        })
    }

    /// Non-blocking delivery into the bounded buffer.
    pub fn offer(&self, update: Update) -> DeliveryOutcome {
        let tx = self.tx.lock();
        let Some(tx) = tx.as_ref() else {
            return DeliveryOutcome::Gone;
        };

        match tx.try_send(update) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => DeliveryOutcome::BufferFull,
            Err(mpsc::error::TrySendError::Closed(_)) => DeliveryOutcome::Gone,
        }
    }
}

/// Tracks all live subscriptions.
///
/// Registration and removal are concurrent-safe; a concurrent `matching`
/// call sees each subscription either fully registered or not at all.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Arc<DashMap<Uuid, Arc<Subscription>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate and register a subscription. Returns false when the
    /// subscription was closed before registration completed.
    pub fn register(&self, subscription: Arc<Subscription>) -> bool {
        if !subscription.activate() {
            return false;
        }
        self.subscriptions.insert(subscription.id, subscription);
        true
    }

    /// Remove and close a subscription. Idempotent.
    pub fn unregister(&self, id: Uuid) {
        if let Some((_, subscription)) = self.subscriptions.remove(&id) {
            subscription.close();
            debug!(subscription_id = %id, "subscription closed");
        }
    }

    /// Every active subscription that should receive an update addressed to
    /// `topics`.
    pub fn matching(&self, topics: &[String], private: bool) -> Vec<Arc<Subscription>> {
        self.subscriptions
            .iter()
            .filter(|entry| {
                entry.value().state() == SubscriptionState::Active
                    && entry.value().wants(topics, private)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.subscriptions.len()
    }
}
