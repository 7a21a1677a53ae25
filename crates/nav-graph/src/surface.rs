//! `GroundQuery` implementations.

use std::sync::Arc;

use glam::Vec3;

use nav_core::{MovementPlane, PathConstraints};
use nav_motion::GroundQuery;

use crate::WaypointGraph;

/// Intersect the ray with the level `elevation` of `plane`.
fn ray_to_level(plane: MovementPlane, origin: Vec3, direction: Vec3, max_distance: f32, elevation: f32) -> Option<Vec3> {
    let rate = plane.elevation(direction);
    if rate.abs() < 1e-6 {
        return None;
    }
    let t = (elevation - plane.elevation(origin)) / rate;
    (0.0..=max_distance).contains(&t).then(|| origin + direction * t)
}

// ── FlatGround ────────────────────────────────────────────────────────────────

/// An infinite walkable plane at a fixed elevation.
#[derive(Copy, Clone, Debug)]
pub struct FlatGround {
    pub plane:     MovementPlane,
    pub elevation: f32,
}

impl FlatGround {
    pub fn new(plane: MovementPlane, elevation: f32) -> Self {
        Self { plane, elevation }
    }
}

impl Default for FlatGround {
    fn default() -> Self {
        Self::new(MovementPlane::XZ, 0.0)
    }
}

impl GroundQuery for FlatGround {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Vec3> {
        ray_to_level(self.plane, origin, direction, max_distance, self.elevation)
    }

    fn nearest_on_surface(&self, point: Vec3, _constraints: &PathConstraints) -> Option<Vec3> {
        Some(self.plane.to_world(self.plane.to_plane(point), self.elevation))
    }
}

// ── GraphSurface ──────────────────────────────────────────────────────────────

/// Walkable corridors of `half_width` around every graph edge.
///
/// The ground under a point is at the elevation of the closest edge point.
/// Points outside every corridor are clamped to the nearest corridor edge.
pub struct GraphSurface {
    graph:      Arc<WaypointGraph>,
    half_width: f32,
}

impl GraphSurface {
    pub fn new(graph: Arc<WaypointGraph>, half_width: f32) -> Self {
        Self { graph, half_width: half_width.max(0.0) }
    }

    pub fn half_width(&self) -> f32 {
        self.half_width
    }
}

impl GroundQuery for GraphSurface {
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Vec3> {
        let plane = self.graph.plane;
        let on_edge = self.graph.closest_point_on_edges(origin, &PathConstraints::default())?;
        if plane.planar_distance(origin, on_edge) > self.half_width {
            return None;
        }
        ray_to_level(plane, origin, direction, max_distance, plane.elevation(on_edge))
    }

    fn nearest_on_surface(&self, point: Vec3, constraints: &PathConstraints) -> Option<Vec3> {
        let plane = self.graph.plane;
        let on_edge = self.graph.closest_point_on_edges(point, constraints)?;
        let elevation = plane.elevation(on_edge);
        let offset = plane.to_plane(point - on_edge);
        let planar = if offset.length() <= self.half_width {
            plane.to_plane(point)
        } else {
            plane.to_plane(on_edge) + offset.normalize_or_zero() * self.half_width
        };
        Some(plane.to_world(planar, elevation))
    }
}
