//! `SteeringFollower`: acceleration-limited steering toward a lookahead point.
//!
//! # Per-frame steps
//!
//! 1. Re-anchor the cursor near the agent, then advance it to where the path
//!    leaves a circle of `lookahead_distance` around the agent.  That point is
//!    the steering target.
//! 2. `distance_to_end = |target - position| + remaining_distance`.
//! 3. Inside `slowdown_distance` of the end, scale the speed limit by
//!    `sqrt(distance_to_end / slowdown_distance)`.
//! 4. Accelerate (bounded by `max_acceleration`) toward
//!    `direction.normalize() * max_speed`, or brake when stopping.
//! 5. Clamp the velocity, optionally biased toward the facing direction.
//! 6. Move by `velocity * dt`, never past the end of the path, and turn
//!    toward the velocity.
//!
//! All of this happens in plane coordinates; vertical motion belongs to the
//! controller's gravity pass.

use glam::{Quat, Vec2, Vec3};

use nav_core::geom::{DIRECTION_EPSILON, clamp_magnitude, rotate_towards};
use nav_core::{MovementPlane, PathConstraints};
use nav_path::PathCursor;

use crate::{
    CloseToDestinationMode, FrameContext, FrameOutput, Follower, GroundQuery, InstallContext,
    MotionResult, SteeringConfig,
};

/// Facing bias: speed factor is `clamp(dot + FACING_OFFSET, FACING_MIN, 1)`.
const FACING_OFFSET: f32 = 0.707;
const FACING_MIN: f32 = 0.2;

/// Minimum allowed deviation of velocity from facing, in degrees, at full
/// speed.  Grows to 200° as the slowdown factor reaches zero.
const FACING_TURN_LIMIT_DEG: f32 = 20.0;

/// Below this planar clamp offset the surface clamp leaves velocity alone.
const CLAMP_EPSILON: f32 = 1e-3;

#[derive(Clone, Debug)]
pub struct SteeringFollower {
    config:          SteeringConfig,
    steering_target: Option<Vec3>,
    last_slowdown:   f32,
}

impl SteeringFollower {
    pub fn new(config: SteeringConfig) -> MotionResult<Self> {
        config.validate()?;
        Ok(Self { config, steering_target: None, last_slowdown: 1.0 })
    }

    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    /// Speed-limit factor applied in the last frame (1 outside the slowdown
    /// radius).
    pub fn last_slowdown_factor(&self) -> f32 {
        self.last_slowdown
    }

    /// `sqrt(distance_to_end / slowdown_distance)` inside the slowdown
    /// radius, 1 outside.
    pub fn slowdown_factor(&self, distance_to_end: f32) -> f32 {
        let radius = self.config.slowdown_distance;
        if radius > 0.0 && distance_to_end < radius {
            (distance_to_end / radius).max(0.0).sqrt()
        } else {
            1.0
        }
    }

    /// Cap `velocity` at `max_speed * slowdown`.
    ///
    /// With `slow_when_not_facing_target` the cap shrinks while the agent
    /// faces away from the velocity, and the velocity direction is limited
    /// to a cone around `forward` that widens as the agent slows down.
    pub fn clamp_velocity(&self, velocity: Vec2, slowdown: f32, forward: Vec2) -> Vec2 {
        let max_speed = self.config.max_speed * slowdown;
        if !self.config.slow_when_not_facing_target || forward.length_squared() < DIRECTION_EPSILON {
            return clamp_magnitude(velocity, max_speed);
        }
        let magnitude = velocity.length();
        if magnitude < DIRECTION_EPSILON {
            return Vec2::ZERO;
        }
        let direction = velocity / magnitude;
        let forward = forward.normalize();
        let dot = direction.dot(forward);

        let max_speed = max_speed * (dot + FACING_OFFSET).clamp(FACING_MIN, 1.0);
        let magnitude = magnitude.min(max_speed);

        let limit = (FACING_TURN_LIMIT_DEG + 180.0 * (1.0 - slowdown * slowdown)).to_radians();
        let angle = dot.clamp(-1.0, 1.0).acos();
        let direction = if angle > limit {
            let side = if forward.perp_dot(direction) >= 0.0 { 1.0 } else { -1.0 };
            Vec2::from_angle(side * limit).rotate(forward)
        } else {
            direction
        };
        direction * magnitude
    }

    fn turn_toward(&self, rotation: Quat, velocity: Vec2, slowdown: f32, dt: f32, plane: MovementPlane) -> Quat {
        let Some(target) = plane.look_rotation(plane.to_world(velocity, 0.0)) else {
            return rotation;
        };
        // Turning fades out over the last part of the slowdown.
        let scale = ((slowdown - 0.3) / 0.7).max(0.0);
        rotate_towards(rotation, target, self.config.rotation_speed.to_radians() * scale * dt)
    }
}

impl Follower for SteeringFollower {
    fn next_frame(&mut self, ctx: FrameContext<'_>) -> FrameOutput {
        let FrameContext {
            dt, plane, position, rotation, velocity, cursor, end_reached_distance, is_stopped,
        } = ctx;
        if dt <= 0.0 {
            return FrameOutput { position, rotation, velocity, reached_end: false };
        }

        let (target, distance_to_end, direction) = if cursor.is_valid() {
            cursor.move_to_locally_closest_point(position, true, false);
            let target = cursor.advance_to_circle_intersection(
                position,
                self.config.lookahead_distance,
                plane,
            );
            let direction = plane.to_plane(target - position);
            (Some(target), direction.length() + cursor.remaining_distance(), direction)
        } else {
            (None, f32::INFINITY, Vec2::ZERO)
        };
        self.steering_target = target;

        let reached_end = target.is_some() && distance_to_end <= end_reached_distance;
        let slowdown = if target.is_some() { self.slowdown_factor(distance_to_end) } else { 1.0 };
        self.last_slowdown = slowdown;

        let mut v = plane.to_plane(velocity);
        let max_delta_v = self.config.max_acceleration * dt;
        let braking = target.is_none()
            || is_stopped
            || (reached_end && self.config.close_to_destination == CloseToDestinationMode::Stop);
        if braking {
            v -= clamp_magnitude(v, max_delta_v);
        } else {
            let desired = direction.normalize_or_zero() * self.config.max_speed;
            v += clamp_magnitude(desired - v, max_delta_v);
        }
        v = self.clamp_velocity(v, slowdown, plane.forward(rotation));

        let mut delta = v * dt;
        if target.is_some() {
            delta = clamp_magnitude(delta, distance_to_end);
        }

        FrameOutput {
            position: position + plane.to_world(delta, 0.0),
            rotation: self.turn_toward(rotation, v, slowdown, dt, plane),
            velocity: plane.to_world(v, 0.0),
            reached_end,
        }
    }

    fn on_path_installed(&mut self, ctx: InstallContext<'_>) -> bool {
        let target =
            ctx.cursor.advance_to_circle_intersection(ctx.position, self.config.lookahead_distance, ctx.plane);
        self.steering_target = Some(target);
        let distance_to_end = ctx.plane.planar_distance(ctx.position, target) + ctx.cursor.remaining_distance();
        distance_to_end <= ctx.end_reached_distance
    }

    fn on_path_cleared(&mut self) {
        self.steering_target = None;
        self.last_slowdown = 1.0;
    }

    fn on_teleport(&mut self, _cursor: &mut PathCursor, _position: Vec3) {
        self.steering_target = None;
    }

    fn uses_gravity(&self) -> bool {
        true
    }

    fn clamp_to_surface(
        &mut self,
        ground:      &dyn GroundQuery,
        constraints: &PathConstraints,
        plane:       MovementPlane,
        position:    Vec3,
        velocity:    &mut Vec3,
    ) -> Vec3 {
        if !self.config.constrain_to_surface {
            return position;
        }
        let Some(clamped) = ground.nearest_on_surface(position, constraints) else {
            return position;
        };
        let difference = plane.to_plane(clamped - position);
        let sq = difference.length_squared();
        if sq > CLAMP_EPSILON * CLAMP_EPSILON {
            // Drop the velocity component that pushed into the boundary.
            let mut v = plane.to_plane(*velocity);
            v -= difference * (difference.dot(v) / sq);
            *velocity = plane.to_world(v, 0.0);
        }
        plane.to_world(plane.to_plane(clamped), plane.elevation(position))
    }

    fn steering_target(&self) -> Option<Vec3> {
        self.steering_target
    }
}
