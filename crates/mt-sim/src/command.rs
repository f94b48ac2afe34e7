//! External commands accepted by a running simulation.
//!
//! Consumers (a dashboard, a scripted scenario, a test) hand the engine
//! discrete commands tagged with the tick they take effect on.  Commands due
//! at or before the current tick are applied in step 4 of that tick; an
//! invalid command is rejected with a logged reason and changes nothing.

use mt_core::{AgentClass, BlockTarget, NodeId};
use mt_traffic::BarrierChange;

/// One agent to create.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnRequest {
    pub class:       AgentClass,
    pub origin:      NodeId,
    pub destination: NodeId,
}

impl SpawnRequest {
    pub fn new(class: AgentClass, origin: NodeId, destination: NodeId) -> Self {
        Self { class, origin, destination }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    Block(BlockTarget),
    Unblock(BlockTarget),
    Spawn(SpawnRequest),
}

impl From<BarrierChange> for Command {
    fn from(change: BarrierChange) -> Self {
        match change {
            BarrierChange::Block(t)   => Command::Block(t),
            BarrierChange::Unblock(t) => Command::Unblock(t),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Block(t)   => write!(f, "block {t}"),
            Command::Unblock(t) => write!(f, "unblock {t}"),
            Command::Spawn(s)   => write!(f, "spawn {} {} → {}", s.class, s.origin, s.destination),
        }
    }
}
