//! `CongestionTracker` — per-edge occupancy and capacity enforcement.
//!
//! Occupancy is live and exact: every admission and release goes through
//! [`enter`](CongestionTracker::enter) / [`leave`](CongestionTracker::leave),
//! and an admission that would exceed capacity is refused.
//!
//! Edge *costs* do not read live occupancy.  They read the
//! [`CongestionSnapshot`] taken every K ticks by
//! [`sample`](CongestionTracker::sample), so path weights are recomputed
//! once per K ticks instead of once per tick.

use log::trace;

use mt_core::{EdgeId, Tick};
use mt_network::RoadNetwork;

use crate::{TrafficError, TrafficResult};

/// Cost multiplier for an edge at `ratio = occupancy / capacity`.
///
/// `1 + 2·ratio²`: free-flow at 1.0, rising slowly at low load and reaching
/// 3.0 when the edge is full.  Ratios outside `[0, 1]` are clamped.
#[inline]
pub fn congestion_penalty(ratio: f32) -> f32 {
    let r = ratio.clamp(0.0, 1.0);
    1.0 + 2.0 * r * r
}

/// Result of an [`CongestionTracker::enter`] attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// The edge lacks room for the requested footprint; nothing changed.
    Refused,
}

impl Admission {
    pub fn is_admitted(self) -> bool {
        self == Admission::Admitted
    }
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Per-edge occupancy frozen at a sampling tick.
#[derive(Clone, Debug, Default)]
pub struct CongestionSnapshot {
    tick:      Tick,
    occupancy: Vec<u32>,
}

impl CongestionSnapshot {
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn occupancy(&self, edge: EdgeId) -> u32 {
        self.occupancy[edge.index()]
    }

    /// Cost multiplier per edge, ready for `EdgeWeights::set_congestion`.
    pub fn multipliers(&self, capacity: &[u32]) -> Vec<f32> {
        self.occupancy
            .iter()
            .zip(capacity)
            .map(|(&occ, &cap)| congestion_penalty(occ as f32 / cap.max(1) as f32))
            .collect()
    }
}

// ── Tracker ───────────────────────────────────────────────────────────────────

pub struct CongestionTracker {
    capacity:        Vec<u32>,
    occupancy:       Vec<u32>,
    sample_interval: u64,
    snapshot:        CongestionSnapshot,
    refusals:        u64,
}

impl CongestionTracker {
    /// Empty tracker for every edge of `network`, sampling every
    /// `sample_interval` ticks.
    pub fn new(network: &RoadNetwork, sample_interval: u64) -> TrafficResult<Self> {
        if sample_interval == 0 {
            return Err(TrafficError::ZeroSampleInterval);
        }
        let edges = network.edge_count();
        Ok(Self {
            capacity: network.edge_capacity.clone(),
            occupancy: vec![0; edges],
            sample_interval,
            snapshot: CongestionSnapshot { tick: Tick::ZERO, occupancy: vec![0; edges] },
            refusals: 0,
        })
    }

    /// Units a `footprint` occupies on `edge`.  Clamped to the edge's
    /// capacity so any agent fits an empty edge.
    #[inline]
    pub fn units(&self, edge: EdgeId, footprint: u32) -> u32 {
        footprint.min(self.capacity[edge.index()])
    }

    /// Admit `footprint` units onto `edge` if they fit.
    pub fn enter(&mut self, edge: EdgeId, footprint: u32) -> Admission {
        let i = edge.index();
        let units = self.units(edge, footprint);
        if self.occupancy[i] + units <= self.capacity[i] {
            self.occupancy[i] += units;
            Admission::Admitted
        } else {
            self.refusals += 1;
            trace!("{edge} refused {units} units ({}/{})", self.occupancy[i], self.capacity[i]);
            Admission::Refused
        }
    }

    /// Release `footprint` units from `edge`.
    pub fn leave(&mut self, edge: EdgeId, footprint: u32) {
        let units = self.units(edge, footprint);
        let slot = &mut self.occupancy[edge.index()];
        debug_assert!(*slot >= units, "{edge}: releasing more than occupied");
        *slot = slot.saturating_sub(units);
    }

    /// `true` on ticks where the snapshot is due (`tick mod K == 0`).
    #[inline]
    pub fn should_sample(&self, tick: Tick) -> bool {
        tick.is_multiple_of(self.sample_interval)
    }

    /// Freeze current occupancy into the snapshot.
    pub fn sample(&mut self, tick: Tick) -> &CongestionSnapshot {
        self.snapshot.occupancy.copy_from_slice(&self.occupancy);
        self.snapshot.tick = tick;
        &self.snapshot
    }

    pub fn snapshot(&self) -> &CongestionSnapshot {
        &self.snapshot
    }

    /// Cost multipliers from the latest snapshot.
    pub fn multipliers(&self) -> Vec<f32> {
        self.snapshot.multipliers(&self.capacity)
    }

    #[inline]
    pub fn occupancy(&self, edge: EdgeId) -> u32 {
        self.occupancy[edge.index()]
    }

    #[inline]
    pub fn capacity(&self, edge: EdgeId) -> u32 {
        self.capacity[edge.index()]
    }

    pub fn sample_interval(&self) -> u64 {
        self.sample_interval
    }

    /// Sum of occupied units over all edges.
    pub fn total_occupancy(&self) -> u64 {
        self.occupancy.iter().map(|&o| o as u64).sum()
    }

    /// Refused admissions since the run started.
    pub fn refusals(&self) -> u64 {
        self.refusals
    }

    /// `true` if no edge holds more than its capacity.
    pub fn within_capacity(&self) -> bool {
        self.occupancy.iter().zip(&self.capacity).all(|(o, c)| o <= c)
    }
}
