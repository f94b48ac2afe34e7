//! `mt-sim` — tick loop orchestrator for the meso_traffic engine.
//!
//! # Tick loop
//!
//! ```text
//! for tick in 1..=config.total_ticks:
//!   ① Clock     — advance the tick counter.
//!   ② Lights    — toggle lights whose period divides the tick.
//!   ③ Sample    — every K ticks: occupancy snapshot → edge multipliers,
//!                 publish weights to the path service, clear the route cache.
//!   ④ Commands  — due block/unblock changes (evict cached routes, reroute
//!                 affected agents), due spawns, then collect path results.
//!   ⑤ Advance   — every live agent in ascending AgentId order.
//!   ⑥ Snapshot  — every `snapshot_interval` ticks: one record per agent.
//! ```
//!
//! The run ends after `total_ticks`, or earlier once every agent has arrived
//! or failed and no spawns remain scheduled.
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Builds snapshot records on Rayon's thread pool.         |
//! | `serde`    | Derives `Serialize`/`Deserialize` on commands, snapshots and metrics. |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use mt_core::{PopulationConfig, SimConfig};
//! use mt_sim::{NoopObserver, SimBuilder};
//!
//! let mut sim = SimBuilder::new(SimConfig::default(), network)
//!     .population(PopulationConfig::with_vehicle_mix(500, 0.05, 100))
//!     .build()?;
//! let metrics = sim.run(&mut NoopObserver)?;
//! println!("{metrics}");
//! ```

pub mod builder;
pub mod command;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod sim;
pub mod snapshot;
pub mod spawn;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use command::{Command, SpawnRequest};
pub use error::{SimError, SimResult};
pub use metrics::{memory_usage_mb, MemoryHealth, RunMetrics};
pub use observer::{NoopObserver, SimObserver};
pub use sim::Simulation;
pub use snapshot::{Snapshot, TickSummary};
pub use spawn::plan_population;
