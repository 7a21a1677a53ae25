//! Controller and follower configuration.
//!
//! Every struct carries the tuned defaults in its `Default` impl and a
//! `validate()` that rejects values the integrators cannot work with.

use nav_core::{MovementPlane, PathConstraints};

use crate::{MotionError, MotionResult, RepathPolicy};

fn require(ok: bool, what: &str) -> MotionResult<()> {
    if ok { Ok(()) } else { Err(MotionError::Config(what.to_string())) }
}

// ── Enums ─────────────────────────────────────────────────────────────────────

/// Which tick runs the movement frame.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementCadence {
    /// Move in `tick_logic` (variable frame time).
    #[default]
    Logic,
    /// Move in `tick_physics` (fixed step).
    Physics,
}

/// What a steering agent does once it is within `end_reached_distance`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CloseToDestinationMode {
    /// Decelerate to rest where it is.
    #[default]
    Stop,
    /// Keep moving until the exact end of the path.
    ContinueToExactEndOfPath,
}

// ── ControllerConfig ──────────────────────────────────────────────────────────

/// Settings shared by every follower.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    pub plane:   MovementPlane,
    pub cadence: MovementCadence,

    /// Run the follower at all.  When `false` only external displacement
    /// and gravity move the agent.
    pub can_move:   bool,
    /// Allow repaths driven by the repath policy.  `search_path` ignores it.
    pub can_search: bool,

    /// The controller owns the transform's position: it reads it at the
    /// start of each movement frame and writes it at the end.
    pub update_position: bool,
    /// Same for rotation.
    pub update_rotation: bool,

    /// Acceleration along the plane normal (negative pulls down).
    pub gravity: f32,
    /// Agent height; the ground ray starts half a height above the feet.
    pub height:  f32,
    /// Per-second decay of vertical velocity while grounded.
    pub vertical_decay_rate: f32,

    /// Distance to the end of the path at which it counts as reached.
    pub end_reached_distance: f32,

    pub constraints: PathConstraints,
    pub repath:      RepathPolicy,

    /// Seed for the agent's repath jitter.
    pub seed: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            plane:                MovementPlane::XZ,
            cadence:              MovementCadence::Logic,
            can_move:             true,
            can_search:           true,
            update_position:      true,
            update_rotation:      true,
            gravity:              -9.81,
            height:               2.0,
            vertical_decay_rate:  5.0,
            end_reached_distance: 0.2,
            constraints:          PathConstraints::default(),
            repath:               RepathPolicy::default(),
            seed:                 0,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> MotionResult<()> {
        require(self.gravity.is_finite(), "gravity must be finite")?;
        require(self.height > 0.0, "height must be > 0")?;
        require(self.vertical_decay_rate >= 0.0, "vertical_decay_rate must be >= 0")?;
        require(self.end_reached_distance >= 0.0, "end_reached_distance must be >= 0")?;
        self.repath.validate()
    }
}

// ── SteeringConfig ────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SteeringConfig {
    /// Units per second.
    pub max_speed:          f32,
    /// Units per second squared.
    pub max_acceleration:   f32,
    /// Degrees per second.
    pub rotation_speed:     f32,
    /// Radius of the lookahead circle used to pick the steering target.
    pub lookahead_distance: f32,
    /// Distance to the end of the path below which the agent slows down.
    pub slowdown_distance:  f32,

    pub close_to_destination:        CloseToDestinationMode,
    /// Slow down and limit turning while the agent faces away from its
    /// direction of travel.
    pub slow_when_not_facing_target: bool,
    /// Clamp the agent onto the walkable surface after each frame.
    pub constrain_to_surface:        bool,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            max_speed:                   5.0,
            max_acceleration:            20.0,
            rotation_speed:              360.0,
            lookahead_distance:          2.0,
            slowdown_distance:           0.6,
            close_to_destination:        CloseToDestinationMode::Stop,
            slow_when_not_facing_target: true,
            constrain_to_surface:        false,
        }
    }
}

impl SteeringConfig {
    pub fn validate(&self) -> MotionResult<()> {
        require(self.max_speed >= 0.0, "max_speed must be >= 0")?;
        require(self.max_acceleration > 0.0, "max_acceleration must be > 0")?;
        require(self.rotation_speed >= 0.0, "rotation_speed must be >= 0")?;
        require(self.lookahead_distance > 0.0, "lookahead_distance must be > 0")?;
        require(self.slowdown_distance >= 0.0, "slowdown_distance must be >= 0")
    }
}

// ── InterpolationConfig ───────────────────────────────────────────────────────

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterpolationConfig {
    /// Units per second along the path.
    pub speed:           f32,
    /// Degrees per second.
    pub rotation_speed:  f32,
    pub enable_rotation: bool,
    /// Duration of the blend from the old path onto a new one.  Zero
    /// switches instantly.
    pub switch_path_interpolation_secs: f32,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            speed:                          3.0,
            rotation_speed:                 360.0,
            enable_rotation:                true,
            switch_path_interpolation_secs: 0.2,
        }
    }
}

impl InterpolationConfig {
    pub fn validate(&self) -> MotionResult<()> {
        require(self.speed >= 0.0, "speed must be >= 0")?;
        require(self.rotation_speed >= 0.0, "rotation_speed must be >= 0")?;
        require(
            self.switch_path_interpolation_secs >= 0.0,
            "switch_path_interpolation_secs must be >= 0",
        )
    }
}
