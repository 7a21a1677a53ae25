//! `nav-motion`: per-agent motion control on top of `nav-request`.
//!
//! # Crate layout
//!
//! | Module            | Contents                                                  |
//! |-------------------|-----------------------------------------------------------|
//! | [`config`]        | `ControllerConfig`, `SteeringConfig`, `InterpolationConfig` |
//! | [`repath`]        | `RepathPolicy`, `RepathSchedule`                          |
//! | [`state`]         | `MotionState`, `ControllerPhase`                          |
//! | [`collab`]        | `GroundQuery`, `TransformSync`, `MotionEnv`               |
//! | [`follower`]      | `Follower` trait, frame/install contexts, `FollowerKind`  |
//! | [`steering`]      | `SteeringFollower`                                        |
//! | [`interpolation`] | `InterpolationFollower`                                   |
//! | [`controller`]    | `MotionController`                                        |
//! | [`event`]         | `MotionEvent`                                             |
//! | [`error`]         | `MotionError`, `MotionResult`                             |
//!
//! # Ownership
//!
//! A controller holds an agent claim on the request whose path it follows
//! and releases it when the path is replaced or cleared.  The broker is
//! passed in by `&mut` on every call that touches requests; the controller
//! never stores it.

pub mod collab;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod follower;
pub mod interpolation;
pub mod repath;
pub mod state;
pub mod steering;

#[cfg(test)]
mod tests;

pub use collab::{GroundQuery, MotionEnv, NoGround, Transform, TransformSync};
pub use config::{
    CloseToDestinationMode, ControllerConfig, InterpolationConfig, MovementCadence, SteeringConfig,
};
pub use controller::MotionController;
pub use error::{MotionError, MotionResult};
pub use event::MotionEvent;
pub use follower::{FollowerKind, Follower, FrameContext, FrameOutput, InstallContext, PathSnapshot};
pub use interpolation::InterpolationFollower;
pub use repath::{RepathMode, RepathPolicy, RepathSchedule};
pub use state::{ControllerPhase, MotionState};
pub use steering::SteeringFollower;
