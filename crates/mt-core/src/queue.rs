//! `TickQueue` — sparse queue of items keyed by the tick they take effect.
//!
//! Most ticks carry no commands, so items are bucketed in a `BTreeMap` and
//! each tick drains only the buckets that are due: O(log W) per operation
//! where W is the number of distinct future ticks.

use std::collections::BTreeMap;

use crate::Tick;

#[derive(Debug, Clone)]
pub struct TickQueue<T> {
    inner: BTreeMap<Tick, Vec<T>>,
    /// Cached item count for O(1) `len()`.
    total: usize,
}

impl<T> Default for TickQueue<T> {
    fn default() -> Self {
        Self { inner: BTreeMap::new(), total: 0 }
    }
}

impl<T> TickQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `item` to take effect at `tick`.  Items sharing a tick keep
    /// their insertion order.
    pub fn push(&mut self, tick: Tick, item: T) {
        self.inner.entry(tick).or_default().push(item);
        self.total += 1;
    }

    /// Remove and return every item due at or before `tick`, oldest tick
    /// first.  Items scheduled for a tick that has already passed are
    /// applied late rather than dropped.
    pub fn drain_due(&mut self, tick: Tick) -> Vec<T> {
        let later = match tick.0.checked_add(1) {
            Some(next) => self.inner.split_off(&Tick(next)),
            None => BTreeMap::new(),
        };
        let due = std::mem::replace(&mut self.inner, later);
        let items: Vec<T> = due.into_values().flatten().collect();
        self.total -= items.len();
        items
    }

    /// The earliest tick with at least one queued item.
    pub fn next_tick(&self) -> Option<Tick> {
        self.inner.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Iterate `(tick, item)` pairs in tick order without removing them.
    pub fn iter(&self) -> impl Iterator<Item = (Tick, &T)> + '_ {
        self.inner.iter().flat_map(|(t, items)| items.iter().map(move |i| (*t, i)))
    }
}
