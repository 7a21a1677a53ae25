//! Notifications a controller queues for its host.

use nav_core::{AgentId, RequestId};

/// Drained with `MotionController::drain_events`.
#[derive(Clone, Debug, PartialEq)]
pub enum MotionEvent {
    /// A new path was installed.
    PathInstalled {
        agent:     AgentId,
        request:   RequestId,
        waypoints: usize,
    },
    /// A search failed; the previous path, if any, is still followed.
    PathFailed {
        agent:      AgentId,
        request:    RequestId,
        diagnostic: String,
    },
    /// The end of the current path was reached.  Fires once per path.
    TargetReached { agent: AgentId },
}
