//! Road network representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the `EdgeId` range:
//!
//! ```text
//! node_out_start[n] .. node_out_start[n+1]
//! ```
//!
//! All edge arrays (`edge_from`, `edge_to`, `edge_length_m`, `edge_mode`,
//! `edge_capacity`) are sorted by source node and indexed by `EdgeId`.
//! Drive and walk edges share one arena; the mode column partitions them into
//! two subgraphs and [`RoadNetwork::neighbors`] filters by it.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lat, lon)` to the nearest `NodeId`.  Used
//! to resolve coordinate-based blockage commands to a node.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use mt_core::{Axis, BlockTarget, EdgeId, GeoPoint, NodeId, TravelMode};

use crate::{BarrierTarget, NetworkError, NetworkResult};

/// Road space one passenger-car equivalent needs, in metres.
pub const VEHICLE_SPACE_M: f32 = 7.0;

/// Default edge capacity for an edge of `length_m` metres: one unit per
/// `VEHICLE_SPACE_M`, never less than one.
#[inline]
pub fn capacity_for_length(length_m: f32) -> u32 {
    ((length_m / VEHICLE_SPACE_M) as u32).max(1)
}

// ── R-tree node entry ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct NodeEntry {
    point: [f32; 2], // [lat, lon]
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared Euclidean distance in lat/lon space.
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed, mode-partitioned road graph in CSR format plus a spatial index.
///
/// Fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`RoadNetworkBuilder`].
#[derive(Clone)]
pub struct RoadNetwork {
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    /// CSR row pointer.  Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    /// Source node of each edge.
    pub edge_from: Vec<NodeId>,

    /// Destination node of each edge.
    pub edge_to: Vec<NodeId>,

    /// Physical length of each edge in metres.  The base of `edge_cost`.
    pub edge_length_m: Vec<f32>,

    /// Subgraph each edge belongs to.
    pub edge_mode: Vec<TravelMode>,

    /// Base capacity in passenger-car-equivalent units.
    pub edge_capacity: Vec<u32>,

    /// Weakly connected component label of every node, one table per mode
    /// (indexed like `TravelMode::ALL`).
    components: [Vec<u32>; 2],

    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    /// Construct an empty network with no nodes or edges.
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    #[inline]
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.node_count()
    }

    #[inline]
    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        edge.index() < self.edge_count()
    }

    /// Position of `node`.
    ///
    /// # Panics
    /// Panics if `node` is out of range; check with [`contains_node`](Self::contains_node).
    #[inline]
    pub fn node_pos(&self, node: NodeId) -> GeoPoint {
        self.node_pos[node.index()]
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over the `EdgeId`s of all outgoing edges from `node`, any mode.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// Outgoing `(edge, neighbour)` pairs of `node` within the `mode` subgraph.
    #[inline]
    pub fn neighbors(
        &self,
        node: NodeId,
        mode: TravelMode,
    ) -> impl Iterator<Item = (EdgeId, NodeId)> + '_ {
        self.out_edges(node)
            .filter(move |e| self.edge_mode[e.index()] == mode)
            .map(|e| (e, self.edge_to[e.index()]))
    }

    /// Number of outgoing edges of `node` in the `mode` subgraph.
    pub fn out_degree(&self, node: NodeId, mode: TravelMode) -> usize {
        self.neighbors(node, mode).count()
    }

    /// The first edge `from → to` of the given mode, if any.
    pub fn find_edge(&self, from: NodeId, to: NodeId, mode: TravelMode) -> Option<EdgeId> {
        self.neighbors(from, mode)
            .find(|&(_, n)| n == to)
            .map(|(e, _)| e)
    }

    /// `false` if `a` and `b` lie in different pieces of the `mode`
    /// subgraph, so no route joins them whatever is blocked.  `true` does
    /// not promise a route: edges are directed.
    pub fn connected(&self, a: NodeId, b: NodeId, mode: TravelMode) -> bool {
        let labels = &self.components[mode_slot(mode)];
        match (labels.get(a.index()), labels.get(b.index())) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Compass axis the edge mostly follows.
    #[inline]
    pub fn edge_axis(&self, edge: EdgeId) -> Axis {
        let from = self.node_pos[self.edge_from[edge.index()].index()];
        let to   = self.node_pos[self.edge_to[edge.index()].index()];
        from.axis_to(to)
    }

    /// Nodes touched by at least one edge of `mode`, ascending.  These are
    /// the valid spawn points for classes travelling on that subgraph.
    pub fn nodes_with_mode(&self, mode: TravelMode) -> Vec<NodeId> {
        let mut touched = vec![false; self.node_count()];
        for i in 0..self.edge_count() {
            if self.edge_mode[i] == mode {
                touched[self.edge_from[i].index()] = true;
                touched[self.edge_to[i].index()] = true;
            }
        }
        touched
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t)
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    /// Straight-line geometry of every edge of `mode`, for map consumers that
    /// draw the road layer once per run.
    pub fn segments(&self, mode: TravelMode) -> Vec<[GeoPoint; 2]> {
        (0..self.edge_count())
            .filter(|&i| self.edge_mode[i] == mode)
            .map(|i| {
                [
                    self.node_pos[self.edge_from[i].index()],
                    self.node_pos[self.edge_to[i].index()],
                ]
            })
            .collect()
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Return the `NodeId` of the nearest road node to `pos`.
    ///
    /// Returns `None` only if the network has no nodes.
    pub fn snap_to_node(&self, pos: GeoPoint) -> Option<NodeId> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lat, pos.lon])
            .map(|e| e.id)
    }

    /// Return up to `k` nearest nodes to `pos`, sorted by ascending distance.
    pub fn k_nearest_nodes(&self, pos: GeoPoint, k: usize) -> Vec<NodeId> {
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.lat, pos.lon])
            .take(k)
            .map(|e| e.id)
            .collect()
    }

    // ── Validation ────────────────────────────────────────────────────────

    pub fn check_node(&self, node: NodeId) -> NetworkResult<()> {
        if self.contains_node(node) { Ok(()) } else { Err(NetworkError::NodeNotFound(node)) }
    }

    pub fn check_edge(&self, edge: EdgeId) -> NetworkResult<()> {
        if self.contains_edge(edge) { Ok(()) } else { Err(NetworkError::EdgeNotFound(edge)) }
    }

    /// Resolve a command target to a concrete node or edge of this network.
    pub fn resolve_target(&self, target: BlockTarget) -> NetworkResult<BarrierTarget> {
        match target {
            BlockTarget::Node(n) => {
                self.check_node(n)?;
                Ok(BarrierTarget::Node(n))
            }
            BlockTarget::Edge(e) => {
                self.check_edge(e)?;
                Ok(BarrierTarget::Edge(e))
            }
            BlockTarget::NearestNode(pos) => self
                .snap_to_node(pos)
                .map(BarrierTarget::Node)
                .ok_or(NetworkError::EmptyNetwork),
        }
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// The builder accepts nodes and directed edges in any order.  `build()`
/// stable-sorts edges by source node (so edges of one node keep insertion
/// order), constructs the CSR arrays, and bulk-loads the R-tree.
///
/// # Example
///
/// ```
/// use mt_core::{GeoPoint, TravelMode};
/// use mt_network::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_node(GeoPoint::new(51.50, -0.12));
/// let c = b.add_node(GeoPoint::new(51.51, -0.12));
/// b.add_road(a, c, 140.0, TravelMode::Drive);
/// let net = b.build();
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// assert_eq!(net.edge_capacity[0], 20); // 140 m / 7 m
/// ```
pub struct RoadNetworkBuilder {
    nodes:     Vec<GeoPoint>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from:     NodeId,
    to:       NodeId,
    length_m: f32,
    mode:     TravelMode,
    capacity: u32,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), raw_edges: Vec::new() }
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add an intersection and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a **directed** edge whose capacity follows from its length.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, length_m: f32, mode: TravelMode) {
        self.add_edge_with_capacity(from, to, length_m, mode, capacity_for_length(length_m));
    }

    /// Add a **directed** edge with an explicit capacity (clamped to ≥ 1).
    pub fn add_edge_with_capacity(
        &mut self,
        from:     NodeId,
        to:       NodeId,
        length_m: f32,
        mode:     TravelMode,
        capacity: u32,
    ) {
        debug_assert!(from.index() < self.nodes.len() && to.index() < self.nodes.len());
        self.raw_edges.push(RawEdge { from, to, length_m, mode, capacity: capacity.max(1) });
    }

    /// Convenience: add edges in **both directions** for a two-way segment.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, length_m: f32, mode: TravelMode) {
        self.add_edge(a, b, length_m, mode);
        self.add_edge(b, a, length_m, mode);
    }

    /// Two-way segment whose length is the haversine distance between the
    /// two node positions.
    pub fn add_street(&mut self, a: NodeId, b: NodeId, mode: TravelMode) {
        let len = self.node_pos(a).distance_m(self.node_pos(b));
        self.add_road(a, b, len, mode);
    }

    /// Look up the position of a node added earlier.
    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// Time complexity: O(E log E) for edge sort + O(N log N) for R-tree bulk
    /// load.
    pub fn build(self) -> RoadNetwork {
        let node_count = self.nodes.len();
        let edge_count = self.raw_edges.len();

        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| e.from.0);

        let edge_from:     Vec<NodeId>     = raw.iter().map(|e| e.from).collect();
        let edge_to:       Vec<NodeId>     = raw.iter().map(|e| e.to).collect();
        let edge_length_m: Vec<f32>        = raw.iter().map(|e| e.length_m).collect();
        let edge_mode:     Vec<TravelMode> = raw.iter().map(|e| e.mode).collect();
        let edge_capacity: Vec<u32>        = raw.iter().map(|e| e.capacity).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry {
                point: [pos.lat, pos.lon],
                id: NodeId(i as u32),
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);
        let components = TravelMode::ALL.map(|mode| label_components(node_count, &raw, mode));

        RoadNetwork {
            node_pos: self.nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            edge_mode,
            edge_capacity,
            components,
            spatial_idx,
        }
    }
}

#[inline]
fn mode_slot(mode: TravelMode) -> usize {
    match mode {
        TravelMode::Drive => 0,
        TravelMode::Walk  => 1,
    }
}

/// Union-find over the `mode` edges, ignoring direction.  Every node gets
/// the smallest node index of its piece; nodes without `mode` edges stand
/// alone.
fn label_components(node_count: usize, raw: &[RawEdge], mode: TravelMode) -> Vec<u32> {
    fn root(parent: &mut [u32], mut x: u32) -> u32 {
        while parent[x as usize] != x {
            parent[x as usize] = parent[parent[x as usize] as usize];
            x = parent[x as usize];
        }
        x
    }

    let mut parent: Vec<u32> = (0..node_count as u32).collect();
    for e in raw.iter().filter(|e| e.mode == mode) {
        let (a, b) = (root(&mut parent, e.from.0), root(&mut parent, e.to.0));
        if a != b {
            parent[a.max(b) as usize] = a.min(b);
        }
    }
    (0..node_count as u32).map(|n| root(&mut parent, n)).collect()
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
