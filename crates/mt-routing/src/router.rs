//! Routing trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! The worker pool calls routing via the [`Router`] trait, so applications
//! can swap in A* or a contraction hierarchy without touching the pool.
//! Each worker owns one router instance, which lets implementations keep
//! per-worker scratch buffers between searches.
//!
//! # Cost units
//!
//! Costs are `f32` metres scaled by the congestion multiplier, exactly as
//! returned by [`EdgeWeights::edge_cost`].  Infinite edges are never relaxed.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use mt_core::{EdgeId, NodeId, TravelMode};
use mt_network::{EdgeWeights, RoadNetwork};

use crate::{Route, RouteOutcome, RoutingError, RoutingResult};

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable routing engine.
///
/// Implementations must be `Send` so they can be moved into a worker thread.
pub trait Router: Send {
    /// Compute the lowest-cost route from `from` to `to` over the `mode`
    /// subgraph.  `from == to` yields a trivial route, not `NoPath`.
    fn route(
        &mut self,
        network: &RoadNetwork,
        weights: &EdgeWeights,
        from: NodeId,
        to: NodeId,
        mode: TravelMode,
    ) -> RoutingResult<RouteOutcome>;
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Standard Dijkstra's algorithm over the CSR road graph.
///
/// The distance and predecessor arrays are allocated once per router and
/// reset sparsely after each search, so repeated queries on a large network
/// cost O(visited) rather than O(nodes).
pub struct DijkstraRouter {
    dist:      Vec<f32>,
    prev_edge: Vec<EdgeId>,
    touched:   Vec<NodeId>,
    heap:      BinaryHeap<Reverse<(Cost, NodeId)>>,
}

impl DijkstraRouter {
    pub fn new(network: &RoadNetwork) -> Self {
        let n = network.node_count();
        Self {
            dist:      vec![f32::INFINITY; n],
            prev_edge: vec![EdgeId::INVALID; n],
            touched:   Vec::new(),
            heap:      BinaryHeap::new(),
        }
    }

    fn ensure_size(&mut self, n: usize) {
        if self.dist.len() < n {
            self.dist.resize(n, f32::INFINITY);
            self.prev_edge.resize(n, EdgeId::INVALID);
        }
    }

    fn reset(&mut self) {
        for node in self.touched.drain(..) {
            self.dist[node.index()] = f32::INFINITY;
            self.prev_edge[node.index()] = EdgeId::INVALID;
        }
        self.heap.clear();
    }

    fn relax(&mut self, node: NodeId, cost: f32, via: EdgeId) {
        let slot = &mut self.dist[node.index()];
        if cost < *slot {
            if slot.is_infinite() {
                self.touched.push(node);
            }
            *slot = cost;
            self.prev_edge[node.index()] = via;
            self.heap.push(Reverse((Cost(cost), node)));
        }
    }

    fn search(
        &mut self,
        network: &RoadNetwork,
        weights: &EdgeWeights,
        from: NodeId,
        to: NodeId,
        mode: TravelMode,
    ) -> Option<f32> {
        self.relax(from, 0.0, EdgeId::INVALID);

        while let Some(Reverse((Cost(cost), node))) = self.heap.pop() {
            if node == to {
                return Some(cost);
            }
            // Skip stale heap entries.
            if cost > self.dist[node.index()] {
                continue;
            }
            for (edge, neighbor) in network.neighbors(node, mode) {
                let w = weights.edge_cost(network, edge);
                if w.is_infinite() {
                    continue;
                }
                self.relax(neighbor, cost + w, edge);
            }
        }
        None
    }

    fn reconstruct(&self, network: &RoadNetwork, from: NodeId, to: NodeId, cost: f32) -> Route {
        let mut edges = Vec::new();
        let mut cur = to;
        while cur != from {
            let e = self.prev_edge[cur.index()];
            edges.push(e);
            cur = network.edge_from[e.index()];
        }
        edges.reverse();

        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(from);
        nodes.extend(edges.iter().map(|e| network.edge_to[e.index()]));
        let coords = nodes.iter().map(|&n| network.node_pos(n)).collect();

        Route { nodes, edges, coords, cost }
    }
}

impl Router for DijkstraRouter {
    fn route(
        &mut self,
        network: &RoadNetwork,
        weights: &EdgeWeights,
        from: NodeId,
        to: NodeId,
        mode: TravelMode,
    ) -> RoutingResult<RouteOutcome> {
        for node in [from, to] {
            if !network.contains_node(node) {
                return Err(RoutingError::NodeNotFound(node));
            }
        }
        if from == to {
            return Ok(RouteOutcome::Found(Route::trivial(from, network.node_pos(from))));
        }

        self.ensure_size(network.node_count());
        let outcome = match self.search(network, weights, from, to, mode) {
            Some(cost) => RouteOutcome::Found(self.reconstruct(network, from, to, cost)),
            None       => RouteOutcome::NoPath,
        };
        self.reset();
        Ok(outcome)
    }
}

// ── Heap key ──────────────────────────────────────────────────────────────────

/// Finite `f32` path cost with a total order for the binary heap.
/// Secondary key `NodeId` in the heap tuple keeps tie-breaking deterministic.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Cost(f32);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
