//! `InterpolationFollower`: moves exactly along the path at constant speed.
//!
//! No physics: the agent's position each frame is the cursor point after
//! advancing `speed * dt`.  When a new path replaces an unfinished one the
//! follower blends, over `switch_path_interpolation_secs`, from "keep going
//! along the old path's last direction" to "the cursor point on the new
//! path".  While blending the agent never moves further than `speed * dt`
//! in one frame; a blend that has run its time but not yet closed the gap
//! keeps heading onto the new path until it does.

use glam::Vec3;

use nav_core::geom::{DIRECTION_EPSILON, rotate_towards};
use nav_path::PathCursor;

use crate::{
    FrameContext, FrameOutput, Follower, InstallContext, InterpolationConfig, MotionResult,
    PathSnapshot,
};

/// Remaining distance at which the end of the path counts as reached.
pub const REACHED_EPSILON: f32 = 1e-4;

/// Distance from the new path at which a finished blend hands over to it.
const SWITCH_EPSILON: f32 = 1e-3;

/// An in-progress blend from an old path onto the current one.
#[derive(Copy, Clone, Debug, PartialEq)]
struct PathSwitch {
    /// Agent position when the new path was installed.
    origin:    Vec3,
    /// Old tangent, normalised and scaled to the old remaining distance.
    direction: Vec3,
    elapsed:   f32,
}

#[derive(Clone, Debug)]
pub struct InterpolationFollower {
    config: InterpolationConfig,
    switch: Option<PathSwitch>,
}

impl InterpolationFollower {
    pub fn new(config: InterpolationConfig) -> MotionResult<Self> {
        config.validate()?;
        Ok(Self { config, switch: None })
    }

    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// `true` while blending from a previous path.
    pub fn is_switching_path(&self) -> bool {
        self.switch.is_some()
    }
}

impl Follower for InterpolationFollower {
    fn next_frame(&mut self, ctx: FrameContext<'_>) -> FrameOutput {
        let FrameContext { dt, plane, position, rotation, cursor, is_stopped, .. } = ctx;
        if !cursor.is_valid() || is_stopped || dt <= 0.0 {
            let reached_end = cursor.is_valid() && cursor.remaining_distance() <= REACHED_EPSILON;
            return FrameOutput { position, rotation, velocity: Vec3::ZERO, reached_end };
        }

        let speed = self.config.speed;
        let max_step = speed * dt;
        cursor.move_to(cursor.distance() + max_step);
        let on_path = cursor.current_point();

        let next = match self.switch.as_mut() {
            Some(switch) => {
                switch.elapsed += dt;
                let secs = self.config.switch_path_interpolation_secs;
                let alpha = if secs > 0.0 { (switch.elapsed / secs).clamp(0.0, 1.0) } else { 1.0 };
                let along_old = switch.origin + switch.direction.clamp_length_max(speed * switch.elapsed);
                let blended = along_old.lerp(on_path, alpha);
                let next = position + (blended - position).clamp_length_max(max_step);

                // Progress along the new path is wherever the agent projects
                // onto it, so a capped step leaves the cursor no further ahead.
                cursor.move_to_locally_closest_point(next, false, true);
                if alpha >= 1.0 && next.distance(cursor.current_point()) <= SWITCH_EPSILON {
                    self.switch = None;
                }
                next
            }
            None => on_path,
        };

        let mut next_rotation = rotation;
        if self.config.enable_rotation {
            if let Some(target) = plane.look_rotation(cursor.tangent()) {
                let max_turn = self.config.rotation_speed.to_radians() * dt;
                next_rotation = rotate_towards(rotation, target, max_turn);
            }
        }

        FrameOutput {
            position:    next,
            rotation:    next_rotation,
            velocity:    plane.flatten(next - position) / dt,
            reached_end: self.switch.is_none() && cursor.remaining_distance() <= REACHED_EPSILON,
        }
    }

    fn on_path_installed(&mut self, ctx: InstallContext<'_>) -> bool {
        self.switch = match ctx.previous {
            Some(PathSnapshot { tangent, remaining_distance })
                if remaining_distance > REACHED_EPSILON
                    && tangent.length_squared() > DIRECTION_EPSILON * DIRECTION_EPSILON =>
            {
                Some(PathSwitch {
                    origin:    ctx.position,
                    direction: tangent.normalize() * remaining_distance,
                    elapsed:   0.0,
                })
            }
            _ => None,
        };
        ctx.cursor.remaining_distance() <= REACHED_EPSILON
    }

    fn on_path_cleared(&mut self) {
        self.switch = None;
    }

    fn on_teleport(&mut self, cursor: &mut PathCursor, position: Vec3) {
        self.switch = None;
        cursor.snap_to_closest_point(position);
    }

    fn uses_gravity(&self) -> bool {
        false
    }
}
