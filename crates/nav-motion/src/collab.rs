//! Host-side collaborators: ground queries and the agent's transform.

use glam::{Quat, Vec3};

use nav_core::PathConstraints;

// ── GroundQuery ───────────────────────────────────────────────────────────────

/// Read-only questions about the walkable world.
///
/// Shared by every controller of a crowd, possibly across threads.
pub trait GroundQuery: Send + Sync {
    /// First hit of the ray `origin + t * direction`, `t ∈ [0, max_distance]`.
    /// `direction` is unit length.
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Vec3>;

    /// Closest point on the walkable surface that `constraints` allow, or
    /// `None` if there is no surface to clamp to.
    fn nearest_on_surface(&self, point: Vec3, constraints: &PathConstraints) -> Option<Vec3>;
}

/// A world with no ground: rays never hit, nothing is clamped.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoGround;

impl GroundQuery for NoGround {
    fn raycast(&self, _origin: Vec3, _direction: Vec3, _max_distance: f32) -> Option<Vec3> {
        None
    }

    fn nearest_on_surface(&self, _point: Vec3, _constraints: &PathConstraints) -> Option<Vec3> {
        None
    }
}

// ── TransformSync ─────────────────────────────────────────────────────────────

/// The agent's externally owned transform.
///
/// Which channels the controller reads and writes is governed by
/// `ControllerConfig::update_position` / `update_rotation`.
pub trait TransformSync: Send {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn set_position(&mut self, position: Vec3);
    fn set_rotation(&mut self, rotation: Quat);
}

/// A plain transform value.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self { position, rotation: Quat::IDENTITY }
    }
}

impl TransformSync for Transform {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> Quat {
        self.rotation
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }
}

// ── MotionEnv ─────────────────────────────────────────────────────────────────

/// What a controller may touch outside itself during a tick.
pub struct MotionEnv<'a> {
    pub ground:    &'a dyn GroundQuery,
    pub transform: Option<&'a mut dyn TransformSync>,
}

impl<'a> MotionEnv<'a> {
    /// No transform: the controller's own state is the only position.
    pub fn new(ground: &'a dyn GroundQuery) -> Self {
        Self { ground, transform: None }
    }

    pub fn with_transform(ground: &'a dyn GroundQuery, transform: &'a mut dyn TransformSync) -> Self {
        Self { ground, transform: Some(transform) }
    }
}
