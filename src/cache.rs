//! Cache clé → valeur avec expiration, partagé entre tâches.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use crate::clock::Clock;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// An entry stays fresh while `now - stored_at <= ttl`.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, Entry<V>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let stale = match self.entries.get(key) {
            Some(entry) if now - entry.stored_at <= self.ttl => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if stale {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        let stored_at = self.clock.now();
        self.entries.insert(key.into(), Entry { value, stored_at });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
