//! The update hub: authorized publication, bounded retention, fan-out, and
//! resumable subscriptions.

mod directory;
mod registry;
mod store;
mod update;

pub use directory::HubRegistry;
pub use registry::{DeliveryOutcome, Subscription, SubscriptionRegistry, SubscriptionState};
pub use store::{RetentionPolicy, UpdateStore};
pub use update::{Update, UpdateId};

use crate::auth::AuthGateway;
use crate::error::{Error, Result};
use crate::topic::TopicSelector;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Hub tuning knobs.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Public URL of the hub endpoint (used for discovery and cookies).
    pub public_url: String,
    /// Update retention for resume support.
    pub retention: RetentionPolicy,
    /// Per-subscriber delivery buffer. A subscriber that falls this far
    /// behind is closed rather than blocking publishers.
    pub subscriber_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            public_url: "https://localhost/.well-known/tidings".to_string(),
            retention: RetentionPolicy::default(),
            subscriber_buffer: 64,
        }
    }
}

/// Accepts authenticated publications and fans updates out to live
/// subscriber connections.
#[derive(Debug)]
pub struct Hub {
    gateway: AuthGateway,
    store: UpdateStore,
    registry: SubscriptionRegistry,
    config: HubConfig,
}

impl Hub {
    pub fn new(gateway: AuthGateway, config: HubConfig) -> Self {
        Self {
            gateway,
            store: UpdateStore::new(config.retention),
            registry: SubscriptionRegistry::new(),
            config,
        }
    }

    pub fn public_url(&self) -> &str {
        &self.config.public_url
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.count()
    }

    /// Number of currently retained updates.
    pub fn retained_updates(&self) -> usize {
        self.store.len()
    }

    /// Authorize, append, and fan out one update. Returns the assigned id.
    ///
    /// Every topic must be covered by the token's publish claim; otherwise
    /// the publish is rejected and nothing is appended.
    pub fn publish(
        &self,
        token: &str,
        topics: &[String],
        payload: Vec<u8>,
        private: bool,
    ) -> Result<UpdateId> {
        if topics.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one topic is required".to_string(),
            ));
        }

        let auth = self.gateway.publisher_claims(token)?;
        for topic in topics {
            if !auth.covers(topic) {
                return Err(Error::Forbidden(format!(
                    "publish claim does not cover topic \"{topic}\""
                )));
            }
        }

        let update = self.store.append(topics.to_vec(), payload, private);
        self.fan_out(&update);

        Ok(update.id)
    }

    fn fan_out(&self, update: &Update) {
        let matched = self.registry.matching(&update.topics, update.private);
        if matched.is_empty() {
            debug!(id = %update.id, "no subscribers for update");
            return;
        }

        let mut delivered = 0usize;
        for subscription in matched {
            match subscription.offer(update.clone()) {
                DeliveryOutcome::Delivered => delivered += 1,
                DeliveryOutcome::BufferFull => {
                    // Bounded policy: a subscriber that cannot keep up is
                    // closed; it can resume from its last event id.
                    warn!(subscription_id = %subscription.id, "subscriber buffer full, closing");
                    self.registry.unregister(subscription.id);
                }
                DeliveryOutcome::Gone => {
                    self.registry.unregister(subscription.id);
                }
            }
        }

        debug!(id = %update.id, delivered, "update fanned out");
    }

    /// Authorize and register a subscription, optionally replaying retained
    /// updates newer than `last_event_id`.
    ///
    /// The returned [`Subscriber`] yields replayed then live updates in
    /// ascending id order with no gaps and no duplicates. A cursor that has
    /// been evicted fails with `StaleCursor` and registers nothing.
    pub fn subscribe(
        &self,
        token: &str,
        topic_patterns: &[String],
        last_event_id: Option<&str>,
    ) -> Result<Subscriber> {
        if topic_patterns.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one topic is required".to_string(),
            ));
        }

        let auth = self.gateway.subscriber_claims(token)?;
        let cursor = match last_event_id {
            Some(raw) => Some(UpdateId::parse(raw)?),
            None => None,
        };

        let interest = TopicSelector::compile(topic_patterns);
        let (tx, rx) = mpsc::channel(self.config.subscriber_buffer);
        let subscription = Arc::new(Subscription::new(interest, auth.selectors, tx));
        let id = subscription.id;

        // Register before snapshotting the store: anything appended after
        // this point reaches the live buffer, so the replay/live seam cannot
        // drop updates.
        self.registry.register(subscription.clone());

        let (replay, cutoff) = match cursor {
            Some(cursor) => match self.store.since(cursor) {
                Ok(retained) => {
                    let cutoff = retained.last().map(|u| u.id.value()).unwrap_or(cursor.value());
                    let replay: VecDeque<Update> = retained
                        .into_iter()
                        .filter(|u| subscription.wants(&u.topics, u.private))
                        .collect();
                    (replay, cutoff)
                }
                Err(err) => {
                    self.registry.unregister(id);
                    return Err(err);
                }
            },
            None => (VecDeque::new(), 0),
        };

        debug!(subscription_id = %id, replayed = replay.len(), "subscription registered");

        Ok(Subscriber {
            id,
            payload: auth.payload,
            replay,
            cutoff,
            rx,
            registry: self.registry.clone(),
        })
    }
}

/// Consumer half of a subscription.
///
/// Dropping the subscriber unregisters it promptly, so an abandoned
/// connection never leaks a registry entry.
#[derive(Debug)]
pub struct Subscriber {
    id: Uuid,
    payload: Option<serde_json::Value>,
    replay: VecDeque<Update>,
    /// Live updates with id at or below this were covered by the replay
    /// snapshot and are discarded to avoid duplicates.
    cutoff: u64,
    rx: mpsc::Receiver<Update>,
    registry: SubscriptionRegistry,
}

impl Subscriber {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Free-form claims from the subscriber's token.
    pub fn claims_payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    /// Next update in ascending id order, or `None` once the subscription is
    /// closed and drained.
    pub async fn next(&mut self) -> Option<Update> {
        if let Some(update) = self.replay.pop_front() {
            return Some(update);
        }

        while let Some(update) = self.rx.recv().await {
            if update.id.value() > self.cutoff {
                return Some(update);
            }
        }

        None
    }

    /// Explicitly close the subscription.
    pub fn close(&mut self) {
        self.registry.unregister(self.id);
        self.rx.close();
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

/// Publication seam: anything that can accept an authorized update.
///
/// [`Hub`] implements it directly; wrappers like [`InstrumentedHub`] compose
/// around any implementation at construction time.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        token: &str,
        topics: &[String],
        payload: Vec<u8>,
        private: bool,
    ) -> Result<UpdateId>;
}

#[async_trait]
impl Publisher for Hub {
    async fn publish(
        &self,
        token: &str,
        topics: &[String],
        payload: Vec<u8>,
        private: bool,
    ) -> Result<UpdateId> {
        Hub::publish(self, token, topics, payload, private)
    }
}

/// Metrics-collecting adapter around any [`Publisher`].
pub struct InstrumentedHub<P> {
    inner: P,
    published: AtomicU64,
    rejected: AtomicU64,
}

impl<P: Publisher> InstrumentedHub<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            published: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Publisher> Publisher for InstrumentedHub<P> {
    async fn publish(
        &self,
        token: &str,
        topics: &[String],
        payload: Vec<u8>,
        private: bool,
    ) -> Result<UpdateId> {
        match self.inner.publish(token, topics, payload, private).await {
            Ok(id) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                debug!(id = %id, "publish accepted");
                Ok(id)
            }
            Err(err) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }
}
