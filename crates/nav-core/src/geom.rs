//! Movement-plane projection and small geometric helpers.
//!
//! Agents steer in two dimensions even when the world is three-dimensional.
//! [`MovementPlane`] names the 2D subspace used for that math and converts
//! between world-space `Vec3` and plane-space `Vec2`.

use glam::{Quat, Vec2, Vec3};

/// Below this length a direction is treated as "no direction".
pub const DIRECTION_EPSILON: f32 = 1e-6;

// ── MovementPlane ─────────────────────────────────────────────────────────────

/// The plane agents move in.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementPlane {
    /// Horizontal ground plane of a Y-up 3D world.  Forward is local +Z.
    #[default]
    XZ,
    /// The screen plane of a 2D world.  Forward is local +Y, up is +Z.
    XY,
}

impl MovementPlane {
    /// World-space normal of the plane.
    #[inline]
    pub fn up(self) -> Vec3 {
        match self {
            MovementPlane::XZ => Vec3::Y,
            MovementPlane::XY => Vec3::Z,
        }
    }

    /// Local axis that a rotation maps onto the agent's facing direction.
    #[inline]
    pub fn local_forward(self) -> Vec3 {
        match self {
            MovementPlane::XZ => Vec3::Z,
            MovementPlane::XY => Vec3::Y,
        }
    }

    /// Project a world vector onto plane coordinates.
    #[inline]
    pub fn to_plane(self, v: Vec3) -> Vec2 {
        match self {
            MovementPlane::XZ => Vec2::new(v.x, v.z),
            MovementPlane::XY => Vec2::new(v.x, v.y),
        }
    }

    /// Component of `v` along [`up`](Self::up).
    #[inline]
    pub fn elevation(self, v: Vec3) -> f32 {
        match self {
            MovementPlane::XZ => v.y,
            MovementPlane::XY => v.z,
        }
    }

    /// Inverse of [`to_plane`](Self::to_plane) at the given elevation.
    #[inline]
    pub fn to_world(self, p: Vec2, elevation: f32) -> Vec3 {
        match self {
            MovementPlane::XZ => Vec3::new(p.x, elevation, p.y),
            MovementPlane::XY => Vec3::new(p.x, p.y, elevation),
        }
    }

    /// Drop the out-of-plane component of `v`.
    #[inline]
    pub fn flatten(self, v: Vec3) -> Vec3 {
        self.to_world(self.to_plane(v), 0.0)
    }

    /// Distance between two points measured in the plane.
    #[inline]
    pub fn planar_distance(self, a: Vec3, b: Vec3) -> f32 {
        self.to_plane(b - a).length()
    }

    /// Facing direction of `rotation`, in plane coordinates.
    #[inline]
    pub fn forward(self, rotation: Quat) -> Vec2 {
        self.to_plane(rotation * self.local_forward())
    }

    /// Rotation about [`up`](Self::up) that faces along `direction`.
    ///
    /// Returns `None` when `direction` has no in-plane component.
    pub fn look_rotation(self, direction: Vec3) -> Option<Quat> {
        let d = self.to_plane(direction);
        if d.length_squared() < DIRECTION_EPSILON * DIRECTION_EPSILON {
            return None;
        }
        Some(match self {
            MovementPlane::XZ => Quat::from_rotation_y(d.x.atan2(d.y)),
            MovementPlane::XY => Quat::from_rotation_z((-d.x).atan2(d.y)),
        })
    }
}

// ── Segment helpers ───────────────────────────────────────────────────────────

/// Parameter `t ∈ [0, 1]` of the point on segment `a..b` closest to `p`.
///
/// Degenerate segments (`a == b`) return 0.
#[inline]
pub fn closest_point_on_segment_factor(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

/// The point on segment `a..b` closest to `p`.
#[inline]
pub fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    a.lerp(b, closest_point_on_segment_factor(a, b, p))
}

/// Parameter along segment `a..b` where it leaves the circle around
/// `center` with the given `radius`.
///
/// The result is not clamped: values above 1 mean the whole segment lies
/// inside the circle, values below 0 mean it has already left.  When the
/// line misses the circle entirely, the parameter of the closest approach is
/// returned.  Zero-length segments return 1.
pub fn line_circle_intersection_factor(center: Vec2, a: Vec2, b: Vec2, radius: f32) -> f32 {
    let segment = b - a;
    let length = segment.length();
    if length <= 1e-5 {
        return 1.0;
    }
    let dir = segment / length;
    let to_start = a - center;
    let dot = to_start.dot(dir);
    let discriminant = (dot * dot - (to_start.length_squared() - radius * radius)).max(0.0);
    (-dot + discriminant.sqrt()) / length
}

// ── Vectors & rotations ───────────────────────────────────────────────────────

/// `v` with its length capped at `max`.
#[inline]
pub fn clamp_magnitude(v: Vec2, max: f32) -> Vec2 {
    v.clamp_length_max(max.max(0.0))
}

/// Rotate `from` toward `to` by at most `max_radians`.
pub fn rotate_towards(from: Quat, to: Quat, max_radians: f32) -> Quat {
    let angle = from.angle_between(to);
    if angle <= max_radians.max(0.0) || angle < 1e-6 {
        return to;
    }
    from.slerp(to, max_radians.max(0.0) / angle)
}
