//! `mt-traffic` — the components that decide whether an agent may move.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`congestion`] | `CongestionTracker`, `CongestionSnapshot`, `Admission`, `congestion_penalty` |
//! | [`lights`]     | `TrafficLightController`, `TrafficLight`, `Phase`         |
//! | [`barrier`]    | `BarrierManager`, `Blockage`, `BarrierChange`             |
//! | [`error`]      | `TrafficError`, `TrafficResult<T>`                        |
//!
//! All three components are owned by the tick loop and mutated only through
//! their own methods.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `Phase` and `BarrierChange`. |

pub mod barrier;
pub mod congestion;
pub mod error;
pub mod lights;

#[cfg(test)]
mod tests;

pub use barrier::{BarrierChange, BarrierManager, Blockage};
pub use congestion::{congestion_penalty, Admission, CongestionSnapshot, CongestionTracker};
pub use error::{TrafficError, TrafficResult};
pub use lights::{Phase, TrafficLight, TrafficLightController};
