//! `PathModifier`: hooks that rewrite a request before and after search.
//!
//! Every agent has its own [`ModifierPipeline`].  The broker runs the
//! pipeline's **pre-process** pass just before forwarding a request to the
//! engine, and its **post-process** pass when the waypoints come back.  Both
//! passes visit enabled modifiers in ascending order key; equal keys keep
//! registration order.
//!
//! # Built-in modifiers
//!
//! | Modifier                 | Order | Effect                                      |
//! |--------------------------|-------|---------------------------------------------|
//! | [`StartEndModifier`]     | 0     | Snap the path ends back to requested points |
//! | [`SimpleSmoothModifier`] | 50    | Subdivide long segments, Laplacian smooth   |

use std::fmt;

use nav_core::geom::closest_point_on_segment;

use crate::PathRequest;

// ── Trait ─────────────────────────────────────────────────────────────────────

/// A request/path rewriting step.
///
/// # Contract
///
/// - Must not block or perform I/O.
/// - `apply` must tolerate paths already processed by an earlier modifier
///   and should be idempotent.
pub trait PathModifier: Send {
    /// Position in the pipeline; lower runs first.
    fn order(&self) -> i32;

    /// Modifier-side switch, checked in addition to the pipeline entry flag.
    fn enabled(&self) -> bool {
        true
    }

    /// Called before the request is forwarded to the engine.
    fn pre_process(&mut self, _request: &mut PathRequest) {}

    /// Called on a successful result, before listeners see it.
    fn apply(&mut self, request: &mut PathRequest);
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Identifies a registered modifier within one agent's pipeline.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ModifierId(pub u32);

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModifierId({})", self.0)
    }
}

struct ModifierEntry {
    id:       ModifierId,
    order:    i32,
    enabled:  bool,
    modifier: Box<dyn PathModifier>,
}

/// Ordered list of modifiers for one agent.
#[derive(Default)]
pub struct ModifierPipeline {
    entries: Vec<ModifierEntry>,
    next_id: u32,
}

impl ModifierPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `modifier` (enabled).  The order key is read once, here.
    pub fn add(&mut self, modifier: Box<dyn PathModifier>) -> ModifierId {
        let id = ModifierId(self.next_id);
        self.next_id += 1;
        self.entries.push(ModifierEntry { id, order: modifier.order(), enabled: true, modifier });
        // Stable: equal keys stay in registration order.
        self.entries.sort_by_key(|e| e.order);
        id
    }

    pub fn remove(&mut self, id: ModifierId) -> Option<Box<dyn PathModifier>> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(pos).modifier)
    }

    /// Returns `false` if `id` is not registered.
    pub fn set_enabled(&mut self, id: ModifierId, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(e) => {
                e.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: ModifierId) -> Option<bool> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.enabled)
    }

    /// `(id, order)` in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (ModifierId, i32)> + '_ {
        self.entries.iter().map(|e| (e.id, e.order))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pre_process(&mut self, request: &mut PathRequest) {
        for e in self.entries.iter_mut().filter(|e| e.enabled && e.modifier.enabled()) {
            e.modifier.pre_process(request);
        }
    }

    pub fn post_process(&mut self, request: &mut PathRequest) {
        for e in self.entries.iter_mut().filter(|e| e.enabled && e.modifier.enabled()) {
            e.modifier.apply(request);
        }
    }
}

// ── StartEndModifier ──────────────────────────────────────────────────────────

/// How an end of the path is fixed up after search.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Exactness {
    /// Keep the point the engine returned (usually a graph node).
    SnapToNode,
    /// Replace it with the point originally requested.
    #[default]
    Original,
    /// Replace it with the point on the first/last segment closest to the
    /// originally requested point.
    ClosestOnSegment,
}

/// Rewrites the first and last waypoint of a returned path.
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StartEndModifier {
    pub start: Exactness,
    pub end:   Exactness,
}

impl PathModifier for StartEndModifier {
    fn order(&self) -> i32 {
        0
    }

    fn apply(&mut self, request: &mut PathRequest) {
        if request.vector_path.is_empty()
            || (self.start == Exactness::SnapToNode && self.end == Exactness::SnapToNode)
        {
            return;
        }
        if request.vector_path.len() == 1 {
            let p = request.vector_path[0];
            request.vector_path.push(p);
        }

        let path = &mut request.vector_path;
        let n = path.len();
        let (first, second) = (path[0], path[1]);
        let (before_last, last) = (path[n - 2], path[n - 1]);

        path[0] = match self.start {
            Exactness::SnapToNode       => first,
            Exactness::Original         => request.original_start,
            Exactness::ClosestOnSegment => {
                closest_point_on_segment(first, second, request.original_start)
            }
        };
        path[n - 1] = match self.end {
            Exactness::SnapToNode       => last,
            Exactness::Original         => request.original_end,
            Exactness::ClosestOnSegment => {
                closest_point_on_segment(before_last, last, request.original_end)
            }
        };
    }
}

// ── SimpleSmoothModifier ──────────────────────────────────────────────────────

/// Subdivides long segments, then relaxes interior points toward the
/// midpoint of their neighbours.  Endpoints never move.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimpleSmoothModifier {
    /// Segments longer than this are split evenly before smoothing.
    pub max_segment_length: f32,
    /// Relaxation rounds.
    pub iterations:         u32,
    /// Blend toward the neighbour midpoint per round, in `[0, 1]`.
    pub strength:           f32,

    #[cfg_attr(feature = "serde", serde(skip))]
    scratch: Vec<glam::Vec3>,
}

impl SimpleSmoothModifier {
    pub fn new(max_segment_length: f32, iterations: u32, strength: f32) -> Self {
        Self { max_segment_length, iterations, strength, scratch: Vec::new() }
    }

    fn subdivide(&mut self, path: &mut Vec<glam::Vec3>) {
        if self.max_segment_length <= 0.0 {
            return;
        }
        self.scratch.clear();
        for pair in path.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let pieces = (a.distance(b) / self.max_segment_length).ceil().max(1.0) as usize;
            for i in 0..pieces {
                self.scratch.push(a.lerp(b, i as f32 / pieces as f32));
            }
        }
        if let Some(&last) = path.last() {
            self.scratch.push(last);
        }
        std::mem::swap(path, &mut self.scratch);
    }
}

impl Default for SimpleSmoothModifier {
    fn default() -> Self {
        Self::new(2.0, 2, 0.5)
    }
}

impl PathModifier for SimpleSmoothModifier {
    fn order(&self) -> i32 {
        50
    }

    fn apply(&mut self, request: &mut PathRequest) {
        if request.vector_path.len() < 2 {
            return;
        }
        self.subdivide(&mut request.vector_path);

        let path = &mut request.vector_path;
        let strength = self.strength.clamp(0.0, 1.0);
        for _ in 0..self.iterations {
            self.scratch.clear();
            self.scratch.extend_from_slice(path);
            for i in 1..path.len() - 1 {
                let mid = (self.scratch[i - 1] + self.scratch[i + 1]) * 0.5;
                path[i] = self.scratch[i].lerp(mid, strength);
            }
        }
    }
}
