//! `mt-network` — the road network arena and its mutable cost overlay.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`network`] | `RoadNetwork` (CSR + R-tree), `RoadNetworkBuilder`          |
//! | [`weights`] | `EdgeWeights`: blocked flags, congestion multipliers, `edge_cost` |
//! | [`error`]   | `NetworkError`, `NetworkResult<T>`                          |
//!
//! `RoadNetwork` is immutable once built and cheap to clone per routing
//! worker.  Everything that changes during a run (blockages, the congestion
//! snapshot) lives in `EdgeWeights`, which is published to workers as an
//! `Arc` and mutated copy-on-write by the tick loop.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public value types.     |

pub mod error;
pub mod network;
pub mod weights;


pub use error::{NetworkError, NetworkResult};
pub use network::{capacity_for_length, RoadNetwork, RoadNetworkBuilder, VEHICLE_SPACE_M};
pub use weights::{BarrierTarget, EdgeWeights};
