//! `mt-agent` — agent lifecycle and movement along precomputed routes.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                          |
//! |-------------|-------------------------------------------------------------------|
//! | [`agent`]   | `Agent`, `AgentStatus`, `AgentRecord`, `AgentSummary`             |
//! | [`manager`] | `AgentManager`: spawn, route assignment, advancement, retirement |
//! | [`error`]   | `AgentError`, `AgentResult<T>`                                    |
//!
//! # Movement model (mesoscopic hop model)
//!
//! 1. `AgentManager::spawn` creates a `Pending` agent; the tick loop submits
//!    its path request to the routing pool.
//! 2. `assign_route` hands the agent a [`Route`][mt_routing::Route]: plain
//!    ids and coordinates, no reference into the network.
//! 3. `advance_all` moves every agent up to `class.speed()` edges per tick,
//!    subject to capacity, lights, and blockages.
//! 4. Arrived and failed agents are removed by `retire_finished` after the
//!    tick's snapshot has been taken.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | `snapshot_records` builds records with Rayon.             |
//! | `serde`    | Derives `Serialize`/`Deserialize` on status and records.  |

pub mod agent;
pub mod error;
pub mod manager;


pub use agent::{Agent, AgentRecord, AgentStatus, AgentSummary, FailReason};
pub use error::{AgentError, AgentResult};
pub use manager::{AdvanceReport, AgentCounters, AgentManager, Movement, RerouteRequest};
