//! Append-only, id-ordered update log with bounded retention

use crate::error::{Error, Result};
use crate::hub::update::{Update, UpdateId};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long updates stay available for resume.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Maximum number of retained updates.
    pub capacity: usize,
    /// Optional age bound; older updates are evicted on the next append.
    pub max_age: Option<Duration>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            capacity: 4096,
            max_age: None,
        }
    }
}

impl RetentionPolicy {
    /// Reject unusable retention settings. Fatal at startup: a hub with no
    /// retained updates can never serve a resume.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config(
                "retention capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory update log supporting resume-from-id.
///
/// Id assignment and insertion happen in one write-lock critical section, so
/// ids reflect a single global total order even under concurrent publishes
/// and the buffer order always agrees with id order.
#[derive(Debug)]
pub struct UpdateStore {
    retention: RetentionPolicy,
    inner: RwLock<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    updates: VecDeque<Update>,
    /// Next id to assign; ids start at 1.
    next_id: u64,
    /// Highest id ever evicted (0 = nothing evicted yet).
    evicted_through: u64,
}

impl UpdateStore {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            retention,
            inner: RwLock::new(StoreInner {
                updates: VecDeque::with_capacity(retention.capacity.min(1024)),
                next_id: 1,
                evicted_through: 0,
            }),
        }
    }

    /// Append a new update, assigning the next id atomically.
    pub fn append(&self, topics: Vec<String>, payload: Vec<u8>, private: bool) -> Update {
        let mut inner = self.inner.write();

        if let Some(max_age) = self.retention.max_age {
            while let Some(front) = inner.updates.front() {
                if front.appended_at.elapsed() <= max_age {
                    break;
                }
                let evicted = inner.updates.pop_front().unwrap();
                inner.evicted_through = evicted.id.value();
            }
        }

        while inner.updates.len() >= self.retention.capacity {
            let Some(evicted) = inner.updates.pop_front() else {
                break;
            };
            inner.evicted_through = evicted.id.value();
        }

        let id = UpdateId::new(inner.next_id);
        inner.next_id += 1;

        let update = Update {
            id,
            topics,
            payload,
            private,
            appended_at: Instant::now(),
        };

        inner.updates.push_back(update.clone());
        update
    }

    /// All retained updates with id strictly greater than `cursor`, ascending.
    ///
    /// Returns an empty vector when `cursor` is the newest id or newer, and
    /// `StaleCursor` when updates after `cursor` have already been evicted.
    pub fn since(&self, cursor: UpdateId) -> Result<Vec<Update>> {
        let inner = self.inner.read();

        // Updates in (cursor, evicted_through] are gone; resuming from there
        // would silently skip history.
        if cursor.value() < inner.evicted_through {
            return Err(Error::StaleCursor {
                cursor: cursor.to_string(),
            });
        }

        let start = binary_search_after(&inner.updates, cursor.value());
        Ok(inner.updates.iter().skip(start).cloned().collect())
    }

    /// The most recently assigned id, or [`UpdateId::ZERO`] before any append.
    pub fn latest_id(&self) -> UpdateId {
        UpdateId::new(self.inner.read().next_id - 1)
    }

    /// The oldest retained id, if any update is retained.
    pub fn oldest_retained(&self) -> Option<UpdateId> {
        self.inner.read().updates.front().map(|u| u.id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().updates.is_empty()
    }
}

/// Index of the first update with id > target. Updates are id-ordered, so a
/// binary search applies.
fn binary_search_after(updates: &VecDeque<Update>, target: u64) -> usize {
    if let Some(first) = updates.front() {
        if first.id.value() > target {
            return 0;
        }
    }
    if let Some(last) = updates.back() {
        if last.id.value() <= target {
            return updates.len();
        }
    }

    let mut left = 0;
    let mut right = updates.len();

    while left < right {
        let mid = left + (right - left) / 2;
        if updates[mid].id.value() <= target {
            left = mid + 1;
        } else {
            right = mid;
        }
    }

    left
}
