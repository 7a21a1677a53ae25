//! The `Follower` trait: how an agent turns a path into motion.
//!
//! The controller owns the shared state (position, velocity, path cursor,
//! repath bookkeeping) and hands the follower a [`FrameContext`] once per
//! movement frame.  The follower answers with a [`FrameOutput`]; the
//! controller then applies external displacement, gravity and transform
//! write-back.

use glam::{Quat, Vec3};

use nav_core::{MovementPlane, PathConstraints};
use nav_path::PathCursor;

use crate::{GroundQuery, InterpolationFollower, SteeringFollower};

/// Inputs of one movement frame.
pub struct FrameContext<'a> {
    pub dt:    f32,
    pub plane: MovementPlane,

    pub position: Vec3,
    pub rotation: Quat,
    /// In-plane velocity as a world vector.
    pub velocity: Vec3,

    /// Invalid when the agent has no path.
    pub cursor: &'a mut PathCursor,

    pub end_reached_distance: f32,
    /// The agent should come to rest rather than follow the path.
    pub is_stopped: bool,
}

/// Result of one movement frame.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct FrameOutput {
    pub position:    Vec3,
    pub rotation:    Quat,
    pub velocity:    Vec3,
    pub reached_end: bool,
}

/// The old path as it was just before a new one replaced it.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PathSnapshot {
    /// Unnormalised tangent at the old cursor position.
    pub tangent:            Vec3,
    pub remaining_distance: f32,
}

/// Inputs when a new path has just been bound to the cursor.
pub struct InstallContext<'a> {
    pub plane: MovementPlane,
    /// Already snapped to the point closest to `position`.
    pub cursor:   &'a mut PathCursor,
    pub position: Vec3,
    /// `None` if the agent had no path.
    pub previous: Option<PathSnapshot>,
    pub end_reached_distance: f32,
}

/// A path-following strategy.
///
/// # Required methods
///
/// `next_frame`, `on_path_installed` and `uses_gravity`.  The remaining
/// hooks default to no-ops.
pub trait Follower: Send {
    /// Integrate one movement frame.
    fn next_frame(&mut self, ctx: FrameContext<'_>) -> FrameOutput;

    /// A new path was bound.  Returns whether its end already counts as
    /// reached.
    fn on_path_installed(&mut self, ctx: InstallContext<'_>) -> bool;

    /// The path was dropped without a replacement.
    fn on_path_cleared(&mut self) {}

    /// The agent was moved discontinuously to `position`; the path is kept.
    fn on_teleport(&mut self, _cursor: &mut PathCursor, _position: Vec3) {}

    /// Whether the controller applies gravity and ground snapping.
    fn uses_gravity(&self) -> bool;

    /// Optionally move `position` back onto the walkable surface, adjusting
    /// `velocity` to match.  Returns the new position.
    fn clamp_to_surface(
        &mut self,
        _ground:      &dyn GroundQuery,
        _constraints: &PathConstraints,
        _plane:       MovementPlane,
        position:     Vec3,
        _velocity:    &mut Vec3,
    ) -> Vec3 {
        position
    }

    /// The point the follower was heading for in the last frame.
    fn steering_target(&self) -> Option<Vec3> {
        None
    }
}

// ── FollowerKind ──────────────────────────────────────────────────────────────

/// Either built-in follower, for hosts that mix both in one crowd.
#[derive(Clone, Debug)]
pub enum FollowerKind {
    Steering(SteeringFollower),
    Interpolation(InterpolationFollower),
}

impl From<SteeringFollower> for FollowerKind {
    fn from(f: SteeringFollower) -> Self {
        FollowerKind::Steering(f)
    }
}

impl From<InterpolationFollower> for FollowerKind {
    fn from(f: InterpolationFollower) -> Self {
        FollowerKind::Interpolation(f)
    }
}

macro_rules! dispatch {
    ($target:expr, $f:ident => $body:expr) => {
        match $target {
            FollowerKind::Steering($f) => $body,
            FollowerKind::Interpolation($f) => $body,
        }
    };
}

impl Follower for FollowerKind {
    fn next_frame(&mut self, ctx: FrameContext<'_>) -> FrameOutput {
        dispatch!(self, f => f.next_frame(ctx))
    }

    fn on_path_installed(&mut self, ctx: InstallContext<'_>) -> bool {
        dispatch!(self, f => f.on_path_installed(ctx))
    }

    fn on_path_cleared(&mut self) {
        dispatch!(self, f => f.on_path_cleared())
    }

    fn on_teleport(&mut self, cursor: &mut PathCursor, position: Vec3) {
        dispatch!(self, f => f.on_teleport(cursor, position))
    }

    fn uses_gravity(&self) -> bool {
        dispatch!(self, f => f.uses_gravity())
    }

    fn clamp_to_surface(
        &mut self,
        ground:      &dyn GroundQuery,
        constraints: &PathConstraints,
        plane:       MovementPlane,
        position:    Vec3,
        velocity:    &mut Vec3,
    ) -> Vec3 {
        dispatch!(self, f => f.clamp_to_surface(ground, constraints, plane, position, velocity))
    }

    fn steering_target(&self) -> Option<Vec3> {
        dispatch!(self, f => f.steering_target())
    }
}
