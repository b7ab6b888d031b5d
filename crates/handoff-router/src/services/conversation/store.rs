use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::types::ConversationState;

/// Per-user slot. The mutex serializes messages from the same user.
struct UserSlot {
    state: Arc<Mutex<ConversationState>>,
    /// Milliseconds since the store origin
    last_active_ms: AtomicU64,
}

impl UserSlot {
    fn new(now_ms: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConversationState::Start)),
            last_active_ms: AtomicU64::new(now_ms),
        }
    }

    fn touch(&self, now_ms: u64) {
        self.last_active_ms.fetch_max(now_ms, Ordering::Relaxed);
    }

    fn last_active(&self) -> u64 {
        self.last_active_ms.load(Ordering::Relaxed)
    }
}

/// In-memory conversation store keyed by channel user id.
///
/// Messages for one user run one at a time through [`ConversationStore::lock`];
/// different users never contend on the same lock. A slot is only evicted
/// while nobody holds a handle to it, so an in-flight message can't lose its
/// update to a sweep.
///
/// `max_users` is enforced after every insert and on every sweep. It can be
/// exceeded while every extra slot is busy; the next insert or sweep trims
/// the overshoot.
#[derive(Clone)]
pub struct ConversationStore {
    slots: Arc<DashMap<String, Arc<UserSlot>>>,
    origin: Instant,
    max_users: usize,
}

/// Exclusive access to one user's state until dropped
pub struct ConversationGuard {
    state: OwnedMutexGuard<ConversationState>,
    slot: Arc<UserSlot>,
    origin: Instant,
}

impl ConversationGuard {
    pub fn state(&self) -> ConversationState {
        *self.state
    }

    pub fn set(&mut self, next: ConversationState) {
        *self.state = next;
        self.slot.touch(elapsed_ms(self.origin));
    }
}

fn elapsed_ms(origin: Instant) -> u64 {
    origin.elapsed().as_millis() as u64
}

impl ConversationStore {
    pub fn new(max_users: usize) -> Self {
        info!("Initializing conversation store (max_users={})", max_users);
        Self {
            slots: Arc::new(DashMap::new()),
            origin: Instant::now(),
            max_users: max_users.max(1),
        }
    }

    /// Lock the user's slot, creating it in `Start` if absent
    pub async fn lock(&self, user_id: &str) -> ConversationGuard {
        let slot = self.slot_for(user_id);
        let state = slot.state.clone().lock_owned().await;
        slot.touch(elapsed_ms(self.origin));

        ConversationGuard {
            state,
            slot,
            origin: self.origin,
        }
    }

    /// Current state; absent users read as `Start`
    pub async fn get(&self, user_id: &str) -> ConversationState {
        let slot = match self.slots.get(user_id) {
            Some(entry) => entry.value().clone(),
            None => return ConversationState::Start,
        };
        let state = *slot.state.lock().await;
        state
    }

    pub async fn set(&self, user_id: &str, state: ConversationState) {
        self.lock(user_id).await.set(state);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop conversations idle for at least `ttl`, then trim to the cap.
    /// Returns number removed.
    pub fn sweep_idle(&self, ttl: Duration) -> usize {
        let now = elapsed_ms(self.origin);
        let ttl_ms = ttl.as_millis() as u64;
        let start_len = self.slots.len();

        self.slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || now.saturating_sub(slot.last_active()) < ttl_ms
        });

        let idle = start_len.saturating_sub(self.slots.len());
        if idle > 0 {
            info!("Swept {} idle conversations", idle);
        }
        idle + self.enforce_cap()
    }

    /// Tracked users per state label; slots handling a message count as `busy`
    pub fn state_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for entry in self.slots.iter() {
            let label = match entry.value().state.try_lock() {
                Ok(state) => state.as_str(),
                Err(_) => "busy",
            };
            *counts.entry(label).or_insert(0) += 1;
        }
        counts
    }

    fn slot_for(&self, user_id: &str) -> Arc<UserSlot> {
        if let Some(entry) = self.slots.get(user_id) {
            return entry.value().clone();
        }

        let now = elapsed_ms(self.origin);
        let slot = self
            .slots
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!("New conversation for user {}", user_id);
                Arc::new(UserSlot::new(now))
            })
            .value()
            .clone();

        // the new slot is held here, so it is never its own eviction candidate
        self.enforce_cap();
        slot
    }

    /// Evict least recently active idle slots until within `max_users`.
    /// Returns number removed.
    fn enforce_cap(&self) -> usize {
        let excess = self.slots.len().saturating_sub(self.max_users);
        let mut removed = 0;
        for _ in 0..excess {
            match self.evict_least_recent() {
                Eviction::Removed => removed += 1,
                Eviction::Raced => {}
                Eviction::AllBusy => break,
            }
        }
        removed
    }

    /// Evict the least recently active idle slot
    fn evict_least_recent(&self) -> Eviction {
        let candidate = self
            .slots
            .iter()
            .filter(|entry| Arc::strong_count(entry.value()) == 1)
            .min_by_key(|entry| entry.value().last_active())
            .map(|entry| entry.key().clone());

        let Some(key) = candidate else {
            warn!(
                "Conversation store over capacity ({} users) and every slot is busy",
                self.slots.len()
            );
            return Eviction::AllBusy;
        };

        if self
            .slots
            .remove_if(&key, |_, slot| Arc::strong_count(slot) == 1)
            .is_some()
        {
            debug!("Evicted least recent conversation {} (store full)", key);
            Eviction::Removed
        } else {
            Eviction::Raced
        }
    }
}

enum Eviction {
    Removed,
    /// Candidate was picked up by a message before removal
    Raced,
    AllBusy,
}
