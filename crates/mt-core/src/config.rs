//! Run-level configuration.
//!
//! Typically loaded from a JSON file by the application crate (with the
//! `serde` feature) and handed to `mt_sim::SimBuilder`.  Every struct
//! implements `Default`, so a config file only needs the fields it changes.

use crate::{CoreError, CoreResult, EdgeId, GeoPoint, NodeId};

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Tick-loop and worker-pool settings.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Ticks to simulate.  The run also ends early once every agent has
    /// arrived or failed and no commands remain scheduled.
    pub total_ticks: u64,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Congestion sampling interval K: the snapshot used for edge costs is
    /// refreshed on ticks where `tick mod K == 0`.
    pub sample_interval: u64,

    /// Path-computation worker threads.  `None` uses all logical cores.
    pub worker_count: Option<usize>,

    /// Toggle period for automatically placed traffic lights.
    pub default_toggle_period: u64,

    /// Emit a snapshot to observers every N ticks (1 = every tick).
    pub snapshot_interval: u64,

    /// Block each tick until all outstanding path requests are answered.
    /// When `false`, agents stay pending until their route arrives.
    pub await_routes: bool,

    /// Reuse computed routes for identical (origin, destination, mode)
    /// requests until a blockage or congestion sample invalidates them.
    pub route_cache: bool,

    /// Soft ceiling on process memory.  Exceeding it marks the run as
    /// degraded (reported, not fatal).
    pub memory_budget_mb: Option<u64>,

    /// Simulated seconds per tick, used only for log output.
    pub secs_per_tick: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            total_ticks:           150,
            seed:                  42,
            sample_interval:       5,
            worker_count:          None,
            default_toggle_period: 15,
            snapshot_interval:     1,
            await_routes:          true,
            route_cache:           true,
            memory_budget_mb:      None,
            secs_per_tick:         1,
        }
    }
}

impl SimConfig {
    /// Reject settings that would make the tick loop meaningless.
    pub fn validate(&self) -> CoreResult<()> {
        if self.sample_interval == 0 {
            return Err(CoreError::Config("sample_interval must be at least 1".into()));
        }
        if self.default_toggle_period == 0 {
            return Err(CoreError::Config("default_toggle_period must be at least 1".into()));
        }
        if self.snapshot_interval == 0 {
            return Err(CoreError::Config("snapshot_interval must be at least 1".into()));
        }
        if self.worker_count == Some(0) {
            return Err(CoreError::Config("worker_count must be at least 1".into()));
        }
        Ok(())
    }

    /// Worker count after resolving `None` to the machine's parallelism.
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        })
    }
}

// ── Population ────────────────────────────────────────────────────────────────

/// How spawn destinations are drawn.  Origins are always uniform.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpawnDistribution {
    /// Every node of the class's subgraph is equally likely.
    #[default]
    Uniform,
    /// Weight `out_degree + 1`, multiplied by `factor` for nodes within
    /// `radius_deg` of the network centroid.  Models the morning inbound flow.
    CenterWeighted { radius_deg: f32, factor: f32 },
}

impl SpawnDistribution {
    /// The morning commute profile: strong pull towards the centre.
    pub fn morning() -> Self {
        SpawnDistribution::CenterWeighted { radius_deg: 0.008, factor: 8.0 }
    }
}

/// Agent population per class.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PopulationConfig {
    pub pedestrians:    u32,
    pub cars:           u32,
    pub heavy_vehicles: u32,
    pub spawn:          SpawnDistribution,
    /// Spread spawns uniformly over ticks `1..=spawn_window_ticks`.
    /// 0 spawns everyone before the first tick.
    pub spawn_window_ticks: u64,
}

impl PopulationConfig {
    /// Split `vehicles` drive agents into cars and heavy vehicles using
    /// `heavy_share` (0.15 in the morning peak, 0.05 otherwise).
    pub fn with_vehicle_mix(vehicles: u32, heavy_share: f32, pedestrians: u32) -> Self {
        let heavy = (vehicles as f32 * heavy_share.clamp(0.0, 1.0)).round() as u32;
        Self {
            pedestrians,
            cars: vehicles - heavy,
            heavy_vehicles: heavy,
            ..Self::default()
        }
    }

    pub fn total(&self) -> u32 {
        self.pedestrians + self.cars + self.heavy_vehicles
    }
}

// ── Traffic lights ────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LightConfig {
    /// Install a light at every node with more than two drivable out-edges.
    pub auto_place: bool,
    /// Explicit `(node, toggle_period)` lights; override auto placement.
    pub overrides: Vec<(NodeId, u64)>,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self { auto_place: true, overrides: Vec::new() }
    }
}

// ── Blockages ─────────────────────────────────────────────────────────────────

/// What a block / unblock command refers to.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlockTarget {
    Node(NodeId),
    Edge(EdgeId),
    /// Resolved to the nearest network node when the command is applied.
    NearestNode(GeoPoint),
}

impl std::fmt::Display for BlockTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockTarget::Node(n)        => write!(f, "{n}"),
            BlockTarget::Edge(e)        => write!(f, "{e}"),
            BlockTarget::NearestNode(p) => write!(f, "node nearest {p}"),
        }
    }
}
