//! Deadline-ordered index of armed timers.
//!
//! Entries are kept in a `BTreeMap` keyed by `(next_fire, insertion_seq)`, so
//! the earliest deadline is always first and equal deadlines come out in the
//! order they were inserted. A side map from id to key makes removal by id
//! O(log n) without scanning. The registry holds ids and deadlines only; the
//! timer callbacks live in the service's timer table.

use std::collections::{BTreeMap, HashMap};

use super::TimerId;
use crate::util::clock::Micros;

/// An armed timer as stored in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEntry {
    /// Timer identity.
    pub id: TimerId,
    /// Absolute monotonic fire time in microseconds.
    pub next_fire: Micros,
}

type Key = (Micros, u64);

/// Priority-ordered collection of armed timers.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    by_deadline: BTreeMap<Key, TimerId>,
    keys: HashMap<TimerId, Key>,
    next_seq: u64,
}

impl TimerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `id` at `next_fire`, replacing any earlier schedule for it.
    pub fn insert(&mut self, id: TimerId, next_fire: Micros) {
        self.remove(id);
        let key = (next_fire, self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);
        self.by_deadline.insert(key, id);
        self.keys.insert(id, key);
    }

    /// Remove and return the earliest entry if it is due at `now`.
    /// Nothing is removed when the earliest entry is still in the future.
    pub fn pop_if_ready(&mut self, now: Micros) -> Option<ScheduledEntry> {
        let (&(next_fire, _), _) = self.by_deadline.first_key_value()?;
        if next_fire > now {
            return None;
        }
        let ((next_fire, _), id) = self.by_deadline.pop_first()?;
        self.keys.remove(&id);
        Some(ScheduledEntry { id, next_fire })
    }

    /// Unschedule `id`. Returns whether it was present.
    pub fn remove(&mut self, id: TimerId) -> bool {
        match self.keys.remove(&id) {
            Some(key) => {
                self.by_deadline.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Whether `id` is currently scheduled.
    #[must_use]
    pub fn contains(&self, id: TimerId) -> bool {
        self.keys.contains_key(&id)
    }

    /// Earliest scheduled fire time.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Micros> {
        self.by_deadline.first_key_value().map(|(&(at, _), _)| at)
    }

    /// Number of scheduled entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether nothing is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.by_deadline.clear();
        self.keys.clear();
    }
}
