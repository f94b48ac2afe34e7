//! Per-tick views handed to external consumers.

use mt_agent::AgentRecord;
use mt_core::Tick;

/// Aggregate counts at the end of one tick.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickSummary {
    pub tick:    Tick,
    /// Live agents before retirement at the end of the tick.
    pub live:    usize,
    pub pending: usize,
    pub moving:  usize,
    pub stalled: usize,
    /// Agents that arrived or failed during this tick.
    pub arrived: usize,
    pub failed:  usize,
    /// Edge hops taken by all agents this tick.
    pub hops:    u64,
    /// Sum of occupancy units over all edges.
    pub occupancy:      u64,
    pub lights_toggled: usize,
    /// Path requests still unanswered after this tick.
    pub routes_pending: usize,
    /// `true` on ticks where the congestion snapshot was refreshed.
    pub sampled: bool,
}

/// Render records for every live agent at one tick.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    pub tick:    Tick,
    pub records: Vec<AgentRecord>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
