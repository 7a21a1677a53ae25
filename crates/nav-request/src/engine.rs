//! The `SearchEngine` seam and a host-driven engine for tests and scripting.
//!
//! The broker never blocks on an engine.  It forwards an [`EngineRequest`]
//! (a copy, so the engine never aliases the pooled request) and later drains
//! finished [`EngineResult`]s through [`SearchEngine::poll_completed`].

use glam::Vec3;

use nav_core::{AgentId, PathConstraints, RequestId};

// ── Wire types ────────────────────────────────────────────────────────────────

/// What the engine is asked to search.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineRequest {
    pub id:          RequestId,
    pub agent:       AgentId,
    pub start:       Vec3,
    pub end:         Vec3,
    pub constraints: PathConstraints,
}

/// A finished search.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineResult {
    pub id:      RequestId,
    /// Waypoints on success, a diagnostic on failure.
    pub outcome: Result<Vec<Vec3>, String>,
}

impl EngineResult {
    pub fn success(id: RequestId, points: Vec<Vec3>) -> Self {
        Self { id, outcome: Ok(points) }
    }

    pub fn failure(id: RequestId, diagnostic: impl Into<String>) -> Self {
        Self { id, outcome: Err(diagnostic.into()) }
    }
}

// ── Trait ─────────────────────────────────────────────────────────────────────

/// An asynchronous path-search engine.
///
/// # Contract
///
/// - `compute_path_async` must return immediately.
/// - Each request yields at most one result.  Results may arrive in any
///   order; the broker matches them by id.
/// - `cancel` is advisory: an engine may still report a result for a
///   cancelled id and the broker will discard it.
pub trait SearchEngine {
    fn compute_path_async(&mut self, request: EngineRequest);

    /// Append every finished result to `out`.
    fn poll_completed(&mut self, out: &mut Vec<EngineResult>);

    fn cancel(&mut self, _id: RequestId) {}
}

impl<E: SearchEngine + ?Sized> SearchEngine for Box<E> {
    fn compute_path_async(&mut self, request: EngineRequest) {
        (**self).compute_path_async(request)
    }

    fn poll_completed(&mut self, out: &mut Vec<EngineResult>) {
        (**self).poll_completed(out)
    }

    fn cancel(&mut self, id: RequestId) {
        (**self).cancel(id)
    }
}

// ── ManualEngine ──────────────────────────────────────────────────────────────

/// An engine that only finishes searches when the host says so.
///
/// Requests queue up in [`pending`](Self::pending) until completed with
/// [`complete`](Self::complete) or [`fail`](Self::fail).  Cancellation is
/// recorded but does not drop the request, so hosts can deliver a result for
/// a cancelled id and observe that the broker ignores it.
#[derive(Default, Debug)]
pub struct ManualEngine {
    pending:   Vec<EngineRequest>,
    completed: Vec<EngineResult>,
    cancelled: Vec<RequestId>,
}

impl ManualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received and not yet completed, oldest first.
    pub fn pending(&self) -> &[EngineRequest] {
        &self.pending
    }

    /// `true` if the broker asked to cancel `id`.
    pub fn was_cancelled(&self, id: RequestId) -> bool {
        self.cancelled.contains(&id)
    }

    /// Finish `id` with `points`.
    pub fn complete(&mut self, id: RequestId, points: Vec<Vec3>) {
        self.pending.retain(|r| r.id != id);
        self.completed.push(EngineResult::success(id, points));
    }

    /// Finish `id` with a failure diagnostic.
    pub fn fail(&mut self, id: RequestId, diagnostic: impl Into<String>) {
        self.pending.retain(|r| r.id != id);
        self.completed.push(EngineResult::failure(id, diagnostic));
    }

    /// Finish every pending request with the straight line `[start, end]`.
    pub fn complete_straight(&mut self) {
        for r in self.pending.drain(..) {
            self.completed.push(EngineResult::success(r.id, vec![r.start, r.end]));
        }
    }
}

impl SearchEngine for ManualEngine {
    fn compute_path_async(&mut self, request: EngineRequest) {
        self.pending.push(request);
    }

    fn poll_completed(&mut self, out: &mut Vec<EngineResult>) {
        out.append(&mut self.completed);
    }

    fn cancel(&mut self, id: RequestId) {
        self.cancelled.push(id);
    }
}
