//! `nav-core`: foundational types for the `nav` path-following stack.
//!
//! This crate is a dependency of every other `nav-*` crate.  It has no
//! `nav-*` dependencies and few external ones (`glam`, `rand`, plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                |
//! |-----------------|---------------------------------------------------------|
//! | [`ids`]         | `AgentId`, `RequestId`, `NodeId`, `EdgeId`              |
//! | [`geom`]        | `MovementPlane`, segment / circle / rotation helpers    |
//! | [`constraints`] | `PathConstraints`: what a path may traverse             |
//! | [`time`]        | `Frame`, `FrameClock`                                   |
//! | [`rng`]         | `AgentRng` (per-agent)                                  |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types and     |
//! |         | enables `glam/serde`.                                      |

pub mod constraints;
pub mod geom;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use constraints::PathConstraints;
pub use geom::MovementPlane;
pub use ids::{AgentId, EdgeId, NodeId, RequestId};
pub use rng::AgentRng;
pub use time::{Frame, FrameClock};

pub use glam::{Quat, Vec2, Vec3};
