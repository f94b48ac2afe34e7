//! Route values exchanged between the worker pool and the tick loop.
//!
//! A `Route` is plain data: node and edge ids plus the coordinate sequence
//! derived from the network once.  It holds no reference into the network,
//! so agents can keep it for as long as they live.

use mt_core::{EdgeId, GeoPoint, NodeId, RequestId, TravelMode};
use mt_network::BarrierTarget;

// ── Route ─────────────────────────────────────────────────────────────────────

/// Lowest-cost path between two nodes.
///
/// `nodes.len() == coords.len() == edges.len() + 1`; `edges[i]` joins
/// `nodes[i]` to `nodes[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    pub nodes:  Vec<NodeId>,
    pub edges:  Vec<EdgeId>,
    pub coords: Vec<GeoPoint>,
    /// Sum of `edge_cost` over `edges` under the weights the search used.
    pub cost:   f32,
}

impl Route {
    /// A zero-length route that starts and ends at `node`.
    pub fn trivial(node: NodeId, pos: GeoPoint) -> Self {
        Self { nodes: vec![node], edges: Vec::new(), coords: vec![pos], cost: 0.0 }
    }

    /// `true` if the origin and destination are the same node.
    #[inline]
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    /// Number of edges to traverse.
    #[inline]
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    pub fn origin(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn destination(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// `true` if the route crosses `target` anywhere along its length.
    pub fn traverses(&self, target: BarrierTarget) -> bool {
        self.traverses_from(0, target)
    }

    /// `true` if the part of the route from position `index` onwards crosses
    /// `target`.  Position `i` sits on `nodes[i]`; the remaining edges are
    /// `edges[index..]`.
    pub fn traverses_from(&self, index: usize, target: BarrierTarget) -> bool {
        match target {
            BarrierTarget::Edge(e) => self.edges.get(index..).is_some_and(|rest| rest.contains(&e)),
            BarrierTarget::Node(n) => self.nodes.get(index..).is_some_and(|rest| rest.contains(&n)),
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Result of one path search.  "No path" is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Found(Route),
    /// Origin and destination are disconnected under the current weights.
    NoPath,
}

impl RouteOutcome {
    pub fn route(&self) -> Option<&Route> {
        match self {
            RouteOutcome::Found(r) => Some(r),
            RouteOutcome::NoPath   => None,
        }
    }

    pub fn into_route(self) -> Option<Route> {
        match self {
            RouteOutcome::Found(r) => Some(r),
            RouteOutcome::NoPath   => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RouteOutcome::Found(_))
    }
}

// ── Request / response ────────────────────────────────────────────────────────

/// The lightweight payload sent to a worker: ids only, never the graph.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct RouteRequest {
    pub id:          RequestId,
    pub origin:      NodeId,
    pub destination: NodeId,
    pub mode:        TravelMode,
}

/// A completed request as returned by `PathService::poll` / `wait_all`.
#[derive(Debug, Clone)]
pub struct RouteResponse {
    pub request: RouteRequest,
    pub outcome: RouteOutcome,
}
