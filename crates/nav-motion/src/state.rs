//! Per-agent motion state.

use glam::{Quat, Vec3};

/// Coarse controller phase, derived from the pending request and the cursor.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ControllerPhase {
    /// No path and nothing requested.
    Idle,
    /// A request is with the engine.  The previous path, if any, is still
    /// being followed.
    AwaitingPath,
    /// Following a path.
    Following,
}

/// Everything the controller integrates from frame to frame.
///
/// Owned by exactly one controller.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionState {
    pub position: Vec3,
    pub rotation: Quat,
    /// In-plane velocity, stored as a world vector with no up component.
    pub velocity: Vec3,
    /// Speed along the plane normal (gravity).
    pub vertical_velocity: f32,

    /// Controller time of the last repath; `-inf` before the first one.
    pub last_repath_time: f64,

    pub awaiting_path_computation: bool,
    pub reached_end_of_path:       bool,
    pub is_stopped:                bool,

    /// External displacement (`move_by`) applied at the next finalize.
    pub accumulated_movement_delta: Vec3,
}

impl MotionState {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation:                   Quat::IDENTITY,
            velocity:                   Vec3::ZERO,
            vertical_velocity:          0.0,
            last_repath_time:           f64::NEG_INFINITY,
            awaiting_path_computation:  false,
            reached_end_of_path:        false,
            is_stopped:                 false,
            accumulated_movement_delta: Vec3::ZERO,
        }
    }
}
