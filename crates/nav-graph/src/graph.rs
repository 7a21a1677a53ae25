//! Waypoint graph representation and builder.
//!
//! # Data layout
//!
//! Outgoing edges are stored in **Compressed Sparse Row (CSR)** form.  Given
//! a `NodeId n`, its outgoing edges are the `EdgeId`s
//!
//! ```text
//! node_out_start[n] .. node_out_start[n+1]
//! ```
//!
//! All edge arrays (`edge_from`, `edge_to`, `edge_length`, `edge_tag`) are
//! sorted by source node and indexed by `EdgeId`, so expanding a node during
//! search is a contiguous scan.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over the nodes' in-plane coordinates maps a world
//! point to the nearest `NodeId`.  Used to snap request endpoints.

use glam::Vec3;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use nav_core::geom::closest_point_on_segment_factor;
use nav_core::{EdgeId, MovementPlane, NodeId, PathConstraints};

// ── R-tree node entry ─────────────────────────────────────────────────────────

/// Entry stored in the R-tree: a node's in-plane position and its id.
#[derive(Clone)]
struct NodeEntry {
    point: [f32; 2],
    id:    NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── WaypointGraph ─────────────────────────────────────────────────────────────

/// Directed waypoint graph in CSR format plus a spatial index for snapping.
///
/// Fields are `pub` for direct indexed access in the search loop.  Build one
/// with [`WaypointGraphBuilder`].
pub struct WaypointGraph {
    pub plane: MovementPlane,

    // ── Node data ─────────────────────────────────────────────────────────
    /// World position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<Vec3>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// Length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    // ── Edge data (indexed by EdgeId) ─────────────────────────────────────
    pub edge_from:   Vec<NodeId>,
    pub edge_to:     Vec<NodeId>,
    /// Euclidean length of each edge; the search cost.
    pub edge_length: Vec<f32>,
    /// Traversal tag (0–31) checked against `PathConstraints`.
    pub edge_tag:    Vec<u8>,

    spatial_idx: RTree<NodeEntry>,
}

impl WaypointGraph {
    /// A graph with no nodes.  Every search against it fails.
    pub fn empty(plane: MovementPlane) -> Self {
        WaypointGraphBuilder::new(plane).build()
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

    pub fn node_position(&self, node: NodeId) -> Option<Vec3> {
        self.node_pos.get(node.index()).copied()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// `EdgeId`s of all outgoing edges from `node`.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nearest node to `point` in the movement plane, with its planar
    /// distance.  `None` if the graph is empty.
    pub fn nearest_node(&self, point: Vec3) -> Option<(NodeId, f32)> {
        let p = self.plane.to_plane(point);
        self.spatial_idx
            .nearest_neighbor(&[p.x, p.y])
            .map(|e| (e.id, e.distance_2(&[p.x, p.y]).sqrt()))
    }

    /// Nearest node no further than `constraints.max_snap_distance`.
    pub fn snap(&self, point: Vec3, constraints: &PathConstraints) -> Option<NodeId> {
        self.nearest_node(point)
            .filter(|&(_, d)| d <= constraints.max_snap_distance)
            .map(|(id, _)| id)
    }

    /// Up to `k` nearest nodes to `point`, nearest first.
    pub fn k_nearest_nodes(&self, point: Vec3, k: usize) -> Vec<NodeId> {
        let p = self.plane.to_plane(point);
        self.spatial_idx
            .nearest_neighbor_iter(&[p.x, p.y])
            .take(k)
            .map(|e| e.id)
            .collect()
    }

    /// Closest point to `point` (measured in the plane) on any edge the
    /// constraints allow.  `None` if no edge qualifies.
    pub fn closest_point_on_edges(&self, point: Vec3, constraints: &PathConstraints) -> Option<Vec3> {
        let plane = self.plane;
        let flat = plane.flatten(point);
        let mut best: Option<(f32, Vec3)> = None;
        for e in 0..self.edge_count() {
            if !constraints.allows_tag(self.edge_tag[e]) {
                continue;
            }
            let a = self.node_pos[self.edge_from[e].index()];
            let b = self.node_pos[self.edge_to[e].index()];
            let t = closest_point_on_segment_factor(plane.flatten(a), plane.flatten(b), flat);
            let candidate = a.lerp(b, t);
            let d = plane.planar_distance(point, candidate);
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, candidate));
            }
        }
        best.map(|(_, p)| p)
    }
}

// ── WaypointGraphBuilder ──────────────────────────────────────────────────────

/// Construct a [`WaypointGraph`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use glam::Vec3;
/// use nav_core::MovementPlane;
/// use nav_graph::WaypointGraphBuilder;
///
/// let mut b = WaypointGraphBuilder::new(MovementPlane::XZ);
/// let a = b.add_node(Vec3::ZERO);
/// let c = b.add_node(Vec3::new(10.0, 0.0, 0.0));
/// b.add_link(a, c, 0);
/// let graph = b.build();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 2); // both directions
/// ```
pub struct WaypointGraphBuilder {
    plane:     MovementPlane,
    nodes:     Vec<Vec3>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from: NodeId,
    to:   NodeId,
    tag:  u8,
}

impl WaypointGraphBuilder {
    pub fn new(plane: MovementPlane) -> Self {
        Self { plane, nodes: Vec::new(), raw_edges: Vec::new() }
    }

    pub fn with_capacity(plane: MovementPlane, nodes: usize, edges: usize) -> Self {
        Self {
            plane,
            nodes:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add a node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: Vec3) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a **directed** edge.  Its length is the distance between the
    /// two nodes.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, tag: u8) {
        self.raw_edges.push(RawEdge { from, to, tag });
    }

    /// Add edges in both directions.
    pub fn add_link(&mut self, a: NodeId, b: NodeId, tag: u8) {
        self.add_directed_edge(a, b, tag);
        self.add_directed_edge(b, a, tag);
    }

    /// Add nodes at `points` linked in sequence.  Returns their ids.
    pub fn add_chain(&mut self, points: &[Vec3], tag: u8) -> Vec<NodeId> {
        let ids: Vec<NodeId> = points.iter().map(|&p| self.add_node(p)).collect();
        for pair in ids.windows(2) {
            self.add_link(pair[0], pair[1], tag);
        }
        ids
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Consume the builder and produce a [`WaypointGraph`].
    ///
    /// Edges referring to nodes that were never added are dropped with a
    /// warning.
    pub fn build(self) -> WaypointGraph {
        let node_count = self.nodes.len();

        let mut raw: Vec<RawEdge> = self
            .raw_edges
            .into_iter()
            .filter(|e| {
                let ok = e.from.index() < node_count && e.to.index() < node_count;
                if !ok {
                    log::warn!("dropping edge {} -> {}: unknown node", e.from, e.to);
                }
                ok
            })
            .collect();
        raw.sort_by_key(|e| e.from.0);

        let nodes = self.nodes;
        let edge_from: Vec<NodeId> = raw.iter().map(|e| e.from).collect();
        let edge_to:   Vec<NodeId> = raw.iter().map(|e| e.to).collect();
        let edge_tag:  Vec<u8>     = raw.iter().map(|e| e.tag).collect();
        let edge_length: Vec<f32>  = raw
            .iter()
            .map(|e| nodes[e.from.index()].distance(nodes[e.to.index()]))
            .collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, raw.len());

        let entries: Vec<NodeEntry> = nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| {
                let p = self.plane.to_plane(pos);
                NodeEntry { point: [p.x, p.y], id: NodeId(i as u32) }
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        WaypointGraph {
            plane: self.plane,
            node_pos: nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_length,
            edge_tag,
            spatial_idx,
        }
    }
}
