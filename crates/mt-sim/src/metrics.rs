//! Run counters for benchmark and metrics consumers.
//!
//! The engine exposes these read-only; it never persists them.

use std::time::Duration;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Resident memory of this process in MiB, or `None` where the platform
/// does not report it.
pub fn memory_usage_mb() -> Option<f64> {
    memory_stats::memory_stats().map(|s| s.physical_mem as f64 / BYTES_PER_MB)
}

/// Outcome of the soft memory-budget check.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemoryHealth {
    /// No reading yet, or the platform gives none.
    #[default]
    Unknown,
    Ok,
    /// Resident memory exceeded `SimConfig::memory_budget_mb`.  The run
    /// continues; consumers are expected to act on it.
    Degraded { used_mb: f64, budget_mb: u64 },
}

impl MemoryHealth {
    /// Classify a reading against an optional budget.
    pub fn assess(used_mb: Option<f64>, budget_mb: Option<u64>) -> Self {
        match (used_mb, budget_mb) {
            (None, _) => MemoryHealth::Unknown,
            (Some(used), Some(budget)) if used > budget as f64 => {
                MemoryHealth::Degraded { used_mb: used, budget_mb: budget }
            }
            (Some(_), _) => MemoryHealth::Ok,
        }
    }

    pub fn is_degraded(self) -> bool {
        matches!(self, MemoryHealth::Degraded { .. })
    }
}

/// Counters accumulated over a run.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunMetrics {
    /// Last completed tick.
    pub ticks:   u64,
    /// Wall time spent inside `step`.
    pub elapsed: Duration,

    /// Render records handed to observers.
    pub records:    u64,
    /// `records` per wall-clock second.
    pub throughput: f64,

    pub memory_mb:      Option<f64>,
    pub peak_memory_mb: Option<f64>,
    pub memory_health:  MemoryHealth,

    pub spawned:     u64,
    pub arrived:     u64,
    pub failed:      u64,
    /// Agents currently stalled (live, not terminal).
    pub stalled:     usize,
    pub stall_ticks: u64,
    pub reroutes:    u64,

    /// Route outcomes delivered by the worker pool.
    pub routes_computed:   u64,
    pub cache_hits:        u64,
    pub worker_restarts:   usize,
    pub lights_toggled:    u64,
    pub blockages_applied: u64,
    pub rejected_commands: u64,
}

impl RunMetrics {
    /// Record one memory reading and re-assess health.
    pub(crate) fn observe_memory(&mut self, used_mb: Option<f64>, budget_mb: Option<u64>) {
        if let Some(used) = used_mb {
            self.memory_mb = Some(used);
            self.peak_memory_mb = Some(self.peak_memory_mb.map_or(used, |p| p.max(used)));
        }
        self.memory_health = MemoryHealth::assess(used_mb, budget_mb);
    }

    pub(crate) fn update_throughput(&mut self) {
        let secs = self.elapsed.as_secs_f64();
        self.throughput = if secs > 0.0 { self.records as f64 / secs } else { 0.0 };
    }
}

impl std::fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ticks in {:.2?}: {} spawned, {} arrived, {} failed, {} records ({:.0}/s), \
             {} routes, {} cache hits",
            self.ticks,
            self.elapsed,
            self.spawned,
            self.arrived,
            self.failed,
            self.records,
            self.throughput,
            self.routes_computed,
            self.cache_hits,
        )?;
        if let Some(mb) = self.peak_memory_mb {
            write!(f, ", peak {mb:.1} MiB")?;
        }
        Ok(())
    }
}
