use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error as ThisError;
use tokio::time::{Duration, Instant};

use crate::glob::Pattern;
use crate::sorted_set::SortedSet;

#[derive(Debug, ThisError, PartialEq)]
pub enum StoreError {
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,
}

/// Write condition of `SET`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetCondition {
    /// Only set the key if it does not already exist (`NX`).
    IfNotExists,
    /// Only set the key if it already exists (`XX`).
    IfExists,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetOptions {
    pub condition: Option<SetCondition>,
    pub ttl: Option<Duration>,
}

/// The Store holds every key of the database together with its optional expiration.
///
/// All the data lives behind a single reader/writer lock and every operation holds the lock for
/// its whole duration, so operations are atomic with respect to each other. The store is cheap to
/// clone: clones share the same data.
///
/// Expiration is lazy. An expired key is treated as absent by every operation, and it is only
/// removed from memory when an operation touches it.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<State>>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

enum Value {
    String(Bytes),
    SortedSet(SortedSet),
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl State {
    fn purge_if_expired(&mut self, key: &str, now: Instant) {
        if self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(now))
        {
            self.entries.remove(key);
        }
    }

    fn get_live_mut(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        self.purge_if_expired(key, now);
        self.entries.get_mut(key)
    }
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    /// Runs `f` over the live entry of `key` while holding the read lock. An expired entry is
    /// handed to `f` as absent and then purged.
    fn with_entry<T>(&self, key: &str, f: impl FnOnce(Option<&Entry>, Instant) -> T) -> T {
        let now = Instant::now();

        let state = self.inner.read();
        match state.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {}
            entry => return f(entry, now),
        }
        drop(state);

        let res = f(None, now);
        // Re-checked under the write lock, the key may have been written in between.
        self.inner.write().purge_if_expired(key, Instant::now());
        res
    }

    /// Sets `key` to hold `value`, replacing any previous value of any type. Any previous
    /// expiration is discarded. Returns false if the write was prevented by the condition.
    ///
    /// A TTL too large to be represented is treated as no expiration.
    pub fn set(&self, key: String, value: Bytes, options: SetOptions) -> bool {
        let now = Instant::now();
        let mut state = self.inner.write();

        state.purge_if_expired(&key, now);
        let exists = state.entries.contains_key(&key);

        match options.condition {
            Some(SetCondition::IfNotExists) if exists => return false,
            Some(SetCondition::IfExists) if !exists => return false,
            _ => {}
        }

        let entry = Entry {
            value: Value::String(value),
            expires_at: options.ttl.and_then(|ttl| now.checked_add(ttl)),
        };
        state.entries.insert(key, entry);

        true
    }

    pub fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError> {
        self.with_entry(key, |entry, _| match entry.map(|entry| &entry.value) {
            Some(Value::String(data)) => Ok(Some(data.clone())),
            Some(Value::SortedSet(_)) => Err(StoreError::WrongType),
            None => Ok(None),
        })
    }

    /// Removes the given keys. Returns how many of them existed.
    pub fn del(&self, keys: &[String]) -> usize {
        let now = Instant::now();
        let mut state = self.inner.write();

        keys.iter()
            .filter_map(|key| state.entries.remove(key))
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    /// Returns all the live keys matching the glob `pattern`, in no particular order.
    pub fn keys(&self, pattern: &str) -> Vec<String> {
        let pattern = Pattern::compile(pattern);
        let now = Instant::now();
        let state = self.inner.read();

        state
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Sets a timeout of `seconds` on `key`. A non positive timeout deletes the key right away.
    /// Returns false if the key does not exist.
    pub fn expire(&self, key: &str, seconds: i64) -> bool {
        let now = Instant::now();
        let mut state = self.inner.write();

        let Some(entry) = state.get_live_mut(key, now) else {
            return false;
        };

        if seconds <= 0 {
            state.entries.remove(key);
        } else {
            entry.expires_at = now.checked_add(Duration::from_secs(seconds as u64));
        }

        true
    }

    /// Remaining time to live of `key` in seconds, rounded to the nearest second. Returns -2 if
    /// the key does not exist and -1 if it exists without an expiration.
    pub fn ttl(&self, key: &str) -> i64 {
        self.with_entry(key, |entry, now| match entry {
            Some(Entry {
                expires_at: Some(expires_at),
                ..
            }) => {
                let millis = expires_at.saturating_duration_since(now).as_millis();
                ((millis + 500) / 1000) as i64
            }
            Some(_) => -1,
            None => -2,
        })
    }

    /// Adds `member` with `score` to the sorted set at `key`, creating the set if needed.
    /// Returns true if the member is new, false if only its score was updated.
    pub fn zadd(&self, key: String, score: f64, member: String) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.inner.write();

        state.purge_if_expired(&key, now);
        let entry = state.entries.entry(key).or_insert_with(|| Entry {
            value: Value::SortedSet(SortedSet::new()),
            expires_at: None,
        });

        match &mut entry.value {
            Value::SortedSet(set) => Ok(set.add(member, score)),
            Value::String(_) => Err(StoreError::WrongType),
        }
    }

    /// Members of the sorted set at `key` within the inclusive rank window `[start, stop]`,
    /// ordered by ascending score.
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        self.with_entry(key, |entry, _| match entry.map(|entry| &entry.value) {
            Some(Value::SortedSet(set)) => Ok(set.range(start, stop)),
            Some(Value::String(_)) => Err(StoreError::WrongType),
            None => Ok(vec![]),
        })
    }

    /// Number of keys held in memory, including expired keys not purged yet.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
