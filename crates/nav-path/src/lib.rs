//! `nav-path`: walking a polyline by travelled distance.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                    |
//! |-------------|-------------------------------------------------------------|
//! | [`cursor`]  | `PathCursor`: bound waypoints + travelled distance          |
//!
//! # Cost model
//!
//! Followers query the cursor every frame.  Binding is O(n) (prefix lengths
//! are computed once); `move_to` is amortised O(1) because it walks outward
//! from the cached segment, and per-frame deltas are small.  Only
//! `snap_to_closest_point` scans the whole path, and it runs once per path
//! install, not per frame.

pub mod cursor;


pub use cursor::PathCursor;
