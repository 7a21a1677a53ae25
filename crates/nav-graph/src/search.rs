//! Search trait and the default A* implementation.
//!
//! # Pluggability
//!
//! Engines call searches through the [`Pathfinder`] trait, so tests and
//! demos can swap in a custom search without touching the engines.
//!
//! # Cost
//!
//! Edge cost is the Euclidean edge length; the heuristic is the straight-line
//! distance to the goal node, which never overestimates, so A* returns the
//! same path length as Dijkstra.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use glam::Vec3;

use nav_core::{EdgeId, NodeId, PathConstraints};

use crate::{GraphError, GraphResult, WaypointGraph};

// ── GraphPath ─────────────────────────────────────────────────────────────────

/// A search result: nodes in order, their positions, and the total length.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphPath {
    pub nodes:  Vec<NodeId>,
    pub points: Vec<Vec3>,
    pub length: f32,
}

impl GraphPath {
    /// `true` if the start and goal are the same node.
    pub fn is_trivial(&self) -> bool {
        self.nodes.len() <= 1
    }
}

// ── Pathfinder trait ──────────────────────────────────────────────────────────

/// Pluggable graph search.
///
/// `Send + Sync` so one instance can be shared by `ThreadedEngine` workers.
pub trait Pathfinder: Send + Sync {
    /// Shortest path from `from` to `to` over edges `constraints` allows.
    /// `from == to` is a one-node path, not an error.
    fn find(
        &self,
        graph:       &WaypointGraph,
        from:        NodeId,
        to:          NodeId,
        constraints: &PathConstraints,
    ) -> GraphResult<GraphPath>;

    /// Snap both endpoints to the graph and search between them.
    fn find_between(
        &self,
        graph:       &WaypointGraph,
        start:       Vec3,
        end:         Vec3,
        constraints: &PathConstraints,
    ) -> GraphResult<GraphPath> {
        let from = graph.snap(start, constraints).ok_or(GraphError::NoNearbyNode { point: start })?;
        let to = graph.snap(end, constraints).ok_or(GraphError::NoNearbyNode { point: end })?;
        self.find(graph, from, to, constraints)
    }
}

// ── AStar ─────────────────────────────────────────────────────────────────────

/// A* over the CSR waypoint graph.
#[derive(Copy, Clone, Debug, Default)]
pub struct AStar;

impl Pathfinder for AStar {
    fn find(
        &self,
        graph:       &WaypointGraph,
        from:        NodeId,
        to:          NodeId,
        constraints: &PathConstraints,
    ) -> GraphResult<GraphPath> {
        astar(graph, from, to, constraints)
    }
}

// ── A* internals ──────────────────────────────────────────────────────────────

/// Total order over non-NaN costs for the heap.
#[derive(Copy, Clone, PartialEq, Debug)]
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

fn astar(
    graph:       &WaypointGraph,
    from:        NodeId,
    to:          NodeId,
    constraints: &PathConstraints,
) -> GraphResult<GraphPath> {
    let n = graph.node_count();
    if from.index() >= n {
        return Err(GraphError::NodeNotFound(from));
    }
    if to.index() >= n {
        return Err(GraphError::NodeNotFound(to));
    }
    let goal = graph.node_pos[to.index()];
    if from == to {
        return Ok(GraphPath { nodes: vec![from], points: vec![goal], length: 0.0 });
    }

    let heuristic = |node: NodeId| graph.node_pos[node.index()].distance(goal);

    // g[v] = best known cost to reach v.
    let mut g = vec![f32::INFINITY; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];
    let mut closed = vec![false; n];
    g[from.index()] = 0.0;

    // Min-heap on f = g + h.  NodeId breaks ties deterministically.
    let mut heap: BinaryHeap<Reverse<(Cost, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((Cost(heuristic(from)), from)));

    while let Some(Reverse((_, node))) = heap.pop() {
        if node == to {
            return Ok(reconstruct(graph, &prev_edge, from, to, g[to.index()]));
        }
        if std::mem::replace(&mut closed[node.index()], true) {
            continue;
        }

        let cost = g[node.index()];
        for edge in graph.out_edges(node) {
            if !constraints.allows_tag(graph.edge_tag[edge.index()]) {
                continue;
            }
            let neighbor = graph.edge_to[edge.index()];
            let new_cost = cost + graph.edge_length[edge.index()];
            if new_cost < g[neighbor.index()] {
                g[neighbor.index()] = new_cost;
                prev_edge[neighbor.index()] = edge;
                heap.push(Reverse((Cost(new_cost + heuristic(neighbor)), neighbor)));
            }
        }
    }

    Err(GraphError::NoPath { from, to })
}

fn reconstruct(graph: &WaypointGraph, prev_edge: &[EdgeId], from: NodeId, to: NodeId, length: f32) -> GraphPath {
    let mut nodes = vec![to];
    let mut cur = to;
    while cur != from {
        let e = prev_edge[cur.index()];
        if !e.is_valid() {
            break;
        }
        cur = graph.edge_from[e.index()];
        nodes.push(cur);
    }
    nodes.reverse();
    let points = nodes.iter().map(|n| graph.node_pos[n.index()]).collect();
    GraphPath { nodes, points, length }
}
