//! `EdgeWeights` — the mutable overlay on top of an immutable `RoadNetwork`.
//!
//! Edge cost is `length × congestion multiplier`, where the multiplier comes
//! from the most recent congestion sample rather than live occupancy.  A
//! blocked edge, or an edge touching a blocked node, costs `f32::INFINITY`
//! and is skipped by path search.
//!
//! Every mutation bumps `epoch`.  The routing pool holds `Arc<EdgeWeights>`
//! handles, so the tick loop mutates through `Arc::make_mut`: batches already
//! dispatched keep the version they were issued with.

use mt_core::{EdgeId, NodeId, Tick};

use crate::RoadNetwork;

/// A node or edge that has been resolved against a concrete network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BarrierTarget {
    Node(NodeId),
    Edge(EdgeId),
}

impl std::fmt::Display for BarrierTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarrierTarget::Node(n) => write!(f, "{n}"),
            BarrierTarget::Edge(e) => write!(f, "{e}"),
        }
    }
}

/// Per-edge cost inputs that change during a run.
#[derive(Clone, Debug)]
pub struct EdgeWeights {
    blocked_edge: Vec<bool>,
    blocked_node: Vec<bool>,
    multiplier:   Vec<f32>,
    sampled_at:   Tick,
    epoch:        u64,
}

impl EdgeWeights {
    /// Free-flow weights: nothing blocked, every multiplier 1.0.
    pub fn new(network: &RoadNetwork) -> Self {
        Self {
            blocked_edge: vec![false; network.edge_count()],
            blocked_node: vec![false; network.node_count()],
            multiplier:   vec![1.0; network.edge_count()],
            sampled_at:   Tick::ZERO,
            epoch:        0,
        }
    }

    /// Monotonic version counter, bumped on every change.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Tick of the congestion sample the multipliers come from.
    #[inline]
    pub fn sampled_at(&self) -> Tick {
        self.sampled_at
    }

    #[inline]
    pub fn is_edge_blocked(&self, edge: EdgeId) -> bool {
        self.blocked_edge[edge.index()]
    }

    #[inline]
    pub fn is_node_blocked(&self, node: NodeId) -> bool {
        self.blocked_node[node.index()]
    }

    /// `true` when neither the edge nor either endpoint is blocked.
    #[inline]
    pub fn is_traversable(&self, network: &RoadNetwork, edge: EdgeId) -> bool {
        let i = edge.index();
        !self.blocked_edge[i]
            && !self.blocked_node[network.edge_from[i].index()]
            && !self.blocked_node[network.edge_to[i].index()]
    }

    /// Congestion multiplier currently applied to `edge`.
    #[inline]
    pub fn multiplier(&self, edge: EdgeId) -> f32 {
        self.multiplier[edge.index()]
    }

    /// Cost of traversing `edge`: `length × multiplier`, or infinity when
    /// the edge is not traversable.
    #[inline]
    pub fn edge_cost(&self, network: &RoadNetwork, edge: EdgeId) -> f32 {
        if !self.is_traversable(network, edge) {
            return f32::INFINITY;
        }
        network.edge_length_m[edge.index()] * self.multiplier[edge.index()]
    }

    /// Set the blocked flag on `target`.  Returns `false` if it was already set.
    pub fn apply_blockage(&mut self, target: BarrierTarget) -> bool {
        let changed = self.set_flag(target, true);
        if changed {
            self.epoch += 1;
        }
        changed
    }

    /// Clear the blocked flag on `target`.  Returns `false` if it was not set.
    pub fn clear_blockage(&mut self, target: BarrierTarget) -> bool {
        let changed = self.set_flag(target, false);
        if changed {
            self.epoch += 1;
        }
        changed
    }

    /// Replace all congestion multipliers with a fresh sample.
    ///
    /// # Panics
    /// Panics if `multipliers` does not have one entry per edge.
    pub fn set_congestion(&mut self, multipliers: &[f32], tick: Tick) {
        assert_eq!(multipliers.len(), self.multiplier.len(), "one multiplier per edge");
        self.multiplier.copy_from_slice(multipliers);
        self.sampled_at = tick;
        self.epoch += 1;
    }

    fn set_flag(&mut self, target: BarrierTarget, value: bool) -> bool {
        let slot = match target {
            BarrierTarget::Node(n) => &mut self.blocked_node[n.index()],
            BarrierTarget::Edge(e) => &mut self.blocked_edge[e.index()],
        };
        let changed = *slot != value;
        *slot = value;
        changed
    }
}
