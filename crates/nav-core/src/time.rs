//! Frame time model.
//!
//! # Design
//!
//! Unlike a fixed-step simulation, a frame loop advances by a *variable*
//! `dt` every frame.  `FrameClock` keeps both the integer frame counter (for
//! exact comparisons and logging) and the accumulated elapsed time in `f64`
//! seconds (repath timers compare against it; `f32` would drift after a few
//! hours of play).

use std::fmt;

// ── Frame ─────────────────────────────────────────────────────────────────────

/// An absolute frame counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame(pub u64);

impl Frame {
    pub const ZERO: Frame = Frame(0);

    /// Frames elapsed from `earlier` to `self`.
    #[inline]
    pub fn since(self, earlier: Frame) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Frame {
    type Output = Frame;
    #[inline]
    fn add(self, rhs: u64) -> Frame {
        Frame(self.0 + rhs)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "F{}", self.0)
    }
}

// ── FrameClock ────────────────────────────────────────────────────────────────

/// Frame counter plus elapsed seconds.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameClock {
    /// The current frame, advanced by [`FrameClock::advance`].
    pub frame: Frame,
    /// Seconds since frame 0.
    pub elapsed_secs: f64,
    /// `dt` passed to the most recent `advance`.
    pub last_delta: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one frame of `dt` seconds.  Negative `dt` is treated as 0.
    #[inline]
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.frame = self.frame + 1;
        self.elapsed_secs += dt as f64;
        self.last_delta = dt;
    }

    /// Seconds elapsed since `earlier` (a previous `elapsed_secs` reading).
    #[inline]
    pub fn secs_since(&self, earlier: f64) -> f64 {
        self.elapsed_secs - earlier
    }
}

impl fmt::Display for FrameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3}s)", self.frame, self.elapsed_secs)
    }
}
