//! Crowd-level configuration.

use crate::{CrowdError, CrowdResult};

/// Frame loop settings shared by every agent of a [`Crowd`][crate::Crowd].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrowdConfig {
    /// Seconds per frame.
    pub frame_dt: f32,
    /// Frames `Crowd::run` executes.
    pub total_frames: u64,
    /// Physics ticks per frame for controllers on the `Physics` cadence.
    pub physics_substeps: u32,
    /// Global seed; each controller derives its repath jitter from it.
    pub seed: u64,
    /// Emit `on_snapshot` every this many frames.  0 disables snapshots.
    pub snapshot_interval: u64,
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            frame_dt:          1.0 / 60.0,
            total_frames:      600,
            physics_substeps:  1,
            seed:              0,
            snapshot_interval: 0,
        }
    }
}

impl CrowdConfig {
    pub fn validate(&self) -> CrowdResult<()> {
        if !(self.frame_dt.is_finite() && self.frame_dt > 0.0) {
            return Err(CrowdError::Config(format!("frame_dt must be finite and > 0, got {}", self.frame_dt)));
        }
        if self.physics_substeps == 0 {
            return Err(CrowdError::Config("physics_substeps must be >= 1".into()));
        }
        Ok(())
    }

    /// Seconds covered by `total_frames`.
    pub fn duration_secs(&self) -> f64 {
        self.total_frames as f64 * self.frame_dt as f64
    }
}
