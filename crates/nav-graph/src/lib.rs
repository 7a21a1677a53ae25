//! `nav-graph`: a small waypoint graph and the collaborators built on it.
//!
//! Enough search and ground to drive the path-following stack end to end in
//! tests and demos.  Not a production navigation mesh.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`graph`]   | `WaypointGraph` (CSR + R-tree), `WaypointGraphBuilder`      |
//! | [`search`]  | `Pathfinder` trait, `GraphPath`, `AStar`                    |
//! | [`engine`]  | `DeferredEngine`, `ThreadedEngine` (`SearchEngine` impls)   |
//! | [`surface`] | `FlatGround`, `GraphSurface` (`GroundQuery` impls)          |
//! | [`error`]   | `GraphError`, `GraphResult<T>`                              |

pub mod engine;
pub mod error;
pub mod graph;
pub mod search;
pub mod surface;


pub use engine::{DeferredEngine, ThreadedEngine};
pub use error::{GraphError, GraphResult};
pub use graph::{WaypointGraph, WaypointGraphBuilder};
pub use search::{AStar, GraphPath, Pathfinder};
pub use surface::{FlatGround, GraphSurface};
