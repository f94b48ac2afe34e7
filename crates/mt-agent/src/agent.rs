//! Per-agent state.

use mt_core::{AgentClass, AgentId, EdgeId, GeoPoint, NodeId, Tick};
use mt_network::BarrierTarget;
use mt_routing::Route;

/// Lifecycle status.
///
/// `Pending → Moving → {Moving, Stalled}* → {Arrived | Failed}`.  The two
/// terminal states never change again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgentStatus {
    /// Spawned; first route not yet delivered.  Consumes no capacity.
    Pending,
    Moving,
    /// Could not advance this tick (full edge, red light, or waiting for a
    /// reroute).  Keeps the edge it occupies.
    Stalled,
    Arrived,
    Failed,
}

impl AgentStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Arrived | AgentStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Pending => "pending",
            AgentStatus::Moving  => "moving",
            AgentStatus::Stalled => "stalled",
            AgentStatus::Arrived => "arrived",
            AgentStatus::Failed  => "failed",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an agent failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FailReason {
    /// No route exists between the agent's position and its destination.
    NoPath,
    /// A delivered route did not start where the agent stands.
    RouteMismatch,
}

/// One agent.
///
/// Holds plain path data only: the route's ids and coordinates were copied
/// out of the network when the route was computed, so an agent has no
/// borrow of or handle to the graph.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id:          AgentId,
    pub class:       AgentClass,
    pub origin:      NodeId,
    pub destination: NodeId,
    pub status:      AgentStatus,

    pub(crate) route:          Option<Route>,
    /// Index into `route.nodes`; the agent stands at `nodes[index]`.
    pub(crate) index:          usize,
    /// Edge the agent currently holds capacity on (`edges[index - 1]`).
    pub(crate) occupied:       Option<EdgeId>,
    pub(crate) awaiting_route: bool,
    pub(crate) position:       GeoPoint,

    pub spawned_at:    Tick,
    pub finished_at:   Option<Tick>,
    pub fail_reason:   Option<FailReason>,
    pub stalled_ticks: u32,
    pub ticks_alive:   u32,
    pub reroutes:      u32,
}

impl Agent {
    pub(crate) fn new(
        id: AgentId,
        class: AgentClass,
        origin: NodeId,
        destination: NodeId,
        position: GeoPoint,
        tick: Tick,
    ) -> Self {
        Self {
            id,
            class,
            origin,
            destination,
            status: AgentStatus::Pending,
            route: None,
            index: 0,
            occupied: None,
            awaiting_route: true,
            position,
            spawned_at: tick,
            finished_at: None,
            fail_reason: None,
            stalled_ticks: 0,
            ticks_alive: 0,
            reroutes: 0,
        }
    }

    /// Current coordinate.
    #[inline]
    pub fn position(&self) -> GeoPoint {
        self.position
    }

    /// Node the agent stands at (end of its occupied edge).
    pub fn current_node(&self) -> NodeId {
        self.route.as_ref().map_or(self.origin, |r| r.nodes[self.index])
    }

    /// Edge the agent currently holds capacity on.
    #[inline]
    pub fn occupied_edge(&self) -> Option<EdgeId> {
        self.occupied
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    /// Position in the route's node sequence.
    #[inline]
    pub fn path_index(&self) -> usize {
        self.index
    }

    /// `true` while a path request for this agent is outstanding.
    #[inline]
    pub fn awaiting_route(&self) -> bool {
        self.awaiting_route
    }

    /// `true` if the agent stands on the final node of its route.
    pub fn at_destination(&self) -> bool {
        self.route.as_ref().is_some_and(|r| self.index + 1 == r.nodes.len())
    }

    /// `true` if the untravelled part of the route crosses `target`.
    pub fn remaining_route_crosses(&self, target: BarrierTarget) -> bool {
        self.route.as_ref().is_some_and(|r| r.traverses_from(self.index, target))
    }
}

/// Compact record of a retired agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentSummary {
    pub id:            AgentId,
    pub class:         AgentClass,
    pub status:        AgentStatus,
    pub spawned_at:    Tick,
    pub finished_at:   Tick,
    pub stalled_ticks: u32,
    pub reroutes:      u32,
}

impl From<&Agent> for AgentSummary {
    fn from(a: &Agent) -> Self {
        Self {
            id:            a.id,
            class:         a.class,
            status:        a.status,
            spawned_at:    a.spawned_at,
            finished_at:   a.finished_at.unwrap_or(a.spawned_at),
            stalled_ticks: a.stalled_ticks,
            reroutes:      a.reroutes,
        }
    }
}

/// Per-tick render record for external consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgentRecord {
    pub tick:     Tick,
    pub agent:    AgentId,
    pub class:    AgentClass,
    pub position: GeoPoint,
    pub status:   AgentStatus,
}
