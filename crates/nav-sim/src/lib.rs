//! `nav-sim`: frame loop for a crowd of path-following agents.
//!
//! # Four-phase frame loop
//!
//! ```text
//! for frame in 0..config.total_frames:
//!   ① Deliveries : broker.poll(); each Delivery goes to its agent's
//!                  controller, deliveries for unknown agents are discarded.
//!   ② Repath     : per agent, in AgentId order: advance the clock, submit
//!                  a request if the repath policy is due.
//!   ③ Movement   : Logic cadence:   one movement frame of frame_dt
//!                  Physics cadence: physics_substeps ticks of frame_dt / n
//!                  (parallel with the `parallel` feature).
//!   ④ Events     : drain every controller's MotionEvents to the observer.
//! ```
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `parallel` | Runs the movement phase on Rayon's thread pool.        |
//! | `fx-hash`  | FxHash for the broker's per-agent tables.              |
//! | `serde`    | Serde derives on `CrowdConfig` and controller configs. |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use nav_graph::{DeferredEngine, FlatGround};
//! use nav_sim::{CrowdBuilder, CrowdConfig, NoopObserver};
//!
//! let mut crowd = CrowdBuilder::new(CrowdConfig::default(), DeferredEngine::new(graph), FlatGround::default(), followers)
//!     .positions(starts)
//!     .destinations(goals)
//!     .build()?;
//! crowd.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod config;
pub mod crowd;
pub mod error;
pub mod observer;


pub use builder::CrowdBuilder;
pub use config::CrowdConfig;
pub use crowd::Crowd;
pub use error::{CrowdError, CrowdResult};
pub use observer::{AgentSnapshot, CrowdObserver, NoopObserver};
