//! `RouteCache` — reuse of found routes between identical requests.
//!
//! Keys are `(origin, destination, mode)`.  Only `Found` routes are cached.
//! A blockage evicts the entries whose route crosses the target; anything
//! that lowers costs (an unblock) or reshuffles them (a congestion sample)
//! empties the cache.

use rustc_hash::FxHashMap;

use mt_core::{NodeId, TravelMode};
use mt_network::BarrierTarget;

use crate::Route;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub origin:      NodeId,
    pub destination: NodeId,
    pub mode:        TravelMode,
}

impl RouteKey {
    pub fn new(origin: NodeId, destination: NodeId, mode: TravelMode) -> Self {
        Self { origin, destination, mode }
    }
}

#[derive(Debug, Default)]
pub struct RouteCache {
    entries: FxHashMap<RouteKey, Route>,
    hits:    u64,
    misses:  u64,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a route, counting the hit or miss.
    pub fn get(&mut self, key: &RouteKey) -> Option<Route> {
        match self.entries.get(key) {
            Some(route) => {
                self.hits += 1;
                Some(route.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: RouteKey, route: Route) {
        self.entries.insert(key, route);
    }

    /// Evict every cached route that crosses `target`.  Returns the number
    /// of evicted entries.
    pub fn invalidate_target(&mut self, target: BarrierTarget) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, route| !route.traverses(target));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
