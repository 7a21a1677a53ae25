//! `PathRequest` and the small value types that describe it.

use std::fmt;

use glam::Vec3;

use nav_core::{AgentId, PathConstraints, RequestId};

// ── RequestState ──────────────────────────────────────────────────────────────

/// Lifecycle of a path request.
///
/// `Created → Processing → Returned`, or `Error` from any state.  `Returned`
/// and `Error` are terminal.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RequestState {
    Created,
    Processing,
    Returned,
    Error,
}

impl RequestState {
    /// `Created` or `Processing`.
    #[inline]
    pub fn is_in_flight(self) -> bool {
        matches!(self, RequestState::Created | RequestState::Processing)
    }

    /// `Returned` or `Error`.
    #[inline]
    pub fn is_done(self) -> bool {
        !self.is_in_flight()
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Created    => "created",
            RequestState::Processing => "processing",
            RequestState::Returned   => "returned",
            RequestState::Error      => "error",
        };
        f.write_str(s)
    }
}

// ── ClaimOwner ────────────────────────────────────────────────────────────────

/// Who holds a reference on a request.
///
/// Each owner may hold at most one claim on a given request; the request is
/// recycled when its last claim is released.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ClaimOwner {
    /// The broker, from creation until the request is accepted or cancelled.
    Broker,
    /// The broker's per-agent last-known-good slot.
    LastGood,
    /// The controller following the path.
    Agent(AgentId),
    /// Any other host-side consumer.
    External(u32),
}

// ── RequestHandle ─────────────────────────────────────────────────────────────

/// Generational index of a request in the broker's pool.
///
/// Once the slot is recycled the handle goes stale and every lookup through
/// it fails, even if the slot has since been reused for another request.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct RequestHandle {
    index:      u32,
    generation: u32,
}

impl RequestHandle {
    #[inline]
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the pool.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

// ── PathRequest ───────────────────────────────────────────────────────────────

/// One path search, from submission to delivery.
///
/// Modifiers receive `&mut PathRequest` and may rewrite `start`, `end`,
/// `constraints` (pre-process) and `vector_path` (post-process).  Identity,
/// state and claims are owned by the broker.
#[derive(Clone, Debug)]
pub struct PathRequest {
    pub(crate) id:     RequestId,
    pub(crate) agent:  AgentId,

    /// Search start; pre-process modifiers may move it.
    pub start: Vec3,
    /// Search goal; pre-process modifiers may move it.
    pub end:   Vec3,

    pub(crate) original_start: Vec3,
    pub(crate) original_end:   Vec3,

    pub constraints: PathConstraints,

    pub(crate) state: RequestState,
    pub(crate) error: Option<String>,

    /// Waypoints, filled on completion and rewritten by post-process
    /// modifiers.  Capacity survives recycling.
    pub vector_path: Vec<Vec3>,

    pub(crate) claims: Vec<ClaimOwner>,
}

impl PathRequest {
    pub(crate) fn new(
        id:          RequestId,
        agent:       AgentId,
        start:       Vec3,
        end:         Vec3,
        constraints: PathConstraints,
    ) -> Self {
        Self {
            id,
            agent,
            start,
            end,
            original_start: start,
            original_end:   end,
            constraints,
            state:          RequestState::Created,
            error:          None,
            vector_path:    Vec::new(),
            claims:         Vec::with_capacity(3),
        }
    }

    /// Reinitialise a recycled request, keeping buffer capacity.
    pub(crate) fn reset(
        &mut self,
        id:          RequestId,
        agent:       AgentId,
        start:       Vec3,
        end:         Vec3,
        constraints: PathConstraints,
    ) {
        self.id = id;
        self.agent = agent;
        self.start = start;
        self.end = end;
        self.original_start = start;
        self.original_end = end;
        self.constraints = constraints;
        self.state = RequestState::Created;
        self.error = None;
        self.vector_path.clear();
        self.claims.clear();
    }

    pub(crate) fn fail(&mut self, diagnostic: impl Into<String>) {
        self.state = RequestState::Error;
        self.error = Some(diagnostic.into());
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The agent the request was submitted for.
    #[inline]
    pub fn agent(&self) -> AgentId {
        self.agent
    }

    /// Start point as submitted, before any pre-process rewrite.
    #[inline]
    pub fn original_start(&self) -> Vec3 {
        self.original_start
    }

    /// End point as submitted, before any pre-process rewrite.
    #[inline]
    pub fn original_end(&self) -> Vec3 {
        self.original_end
    }

    #[inline]
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// `true` once the request failed or was cancelled.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.state == RequestState::Error
    }

    /// Diagnostic for a failed request.
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of outstanding claims.
    #[inline]
    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    #[inline]
    pub fn is_claimed_by(&self, owner: ClaimOwner) -> bool {
        self.claims.contains(&owner)
    }
}
