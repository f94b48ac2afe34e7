//! `mt-core` — foundational types for the `meso_traffic` simulation engine.
//!
//! This crate is a dependency of every other `mt-*` crate.  It intentionally
//! has no `mt-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`ids`]     | `AgentId`, `NodeId`, `EdgeId`, `RequestId`                |
//! | [`geo`]     | `GeoPoint`, `Axis`, haversine distance                    |
//! | [`time`]    | `Tick`, `SimClock`                                        |
//! | [`rng`]     | `SimRng` (seeded, reproducible)                           |
//! | [`mode`]    | `TravelMode` (drive / walk subgraph selector)             |
//! | [`class`]   | `AgentClass` with speed and footprint constants           |
//! | [`config`]  | `SimConfig`, `PopulationConfig`, `LightConfig`, `BlockTarget` |
//! | [`queue`]   | `TickQueue<T>` (commands keyed by effective tick)          |
//! | [`error`]   | `CoreError`, `CoreResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod class;
pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod mode;
pub mod queue;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use class::AgentClass;
pub use config::{BlockTarget, LightConfig, PopulationConfig, SimConfig, SpawnDistribution};
pub use error::{CoreError, CoreResult};
pub use geo::{Axis, GeoPoint};
pub use ids::{AgentId, EdgeId, NodeId, RequestId};
pub use mode::TravelMode;
pub use queue::TickQueue;
pub use rng::SimRng;
pub use time::{SimClock, Tick};
