//! Crowd observer trait for progress reporting and data collection.

use glam::Vec3;

use nav_core::{AgentId, Frame};
use nav_motion::{ControllerPhase, MotionEvent};

/// One agent's state at a snapshot frame.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AgentSnapshot {
    pub agent:              AgentId,
    pub position:           Vec3,
    pub velocity:           Vec3,
    pub phase:              ControllerPhase,
    /// Infinite while the agent has no path.
    pub remaining_distance: f32,
    pub reached:            bool,
}

/// Callbacks invoked by [`Crowd::run`][crate::Crowd::run] at key points in
/// the frame loop.
///
/// Every method has a no-op default.
///
/// # Example
///
/// ```rust,ignore
/// struct Arrivals(usize);
///
/// impl CrowdObserver for Arrivals {
///     fn on_event(&mut self, _frame: Frame, event: &MotionEvent) {
///         if matches!(event, MotionEvent::TargetReached { .. }) {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait CrowdObserver {
    /// Start of a frame, before deliveries are routed.
    fn on_frame_start(&mut self, _frame: Frame) {}

    /// End of a frame.  `deliveries` is the number of completed requests
    /// routed this frame.
    fn on_frame_end(&mut self, _frame: Frame, _deliveries: usize) {}

    /// One controller event, in ascending agent order.
    fn on_event(&mut self, _frame: Frame, _event: &MotionEvent) {}

    /// Every `config.snapshot_interval` frames.
    fn on_snapshot(&mut self, _frame: Frame, _agents: &[AgentSnapshot]) {}

    /// Once after the final frame of `run`.
    fn on_crowd_end(&mut self, _final_frame: Frame) {}
}

/// A [`CrowdObserver`] that does nothing.
pub struct NoopObserver;

impl CrowdObserver for NoopObserver {}
