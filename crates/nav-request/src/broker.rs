//! The `PathRequestBroker`: request lifecycle between agents and an engine.
//!
//! # Per-frame protocol
//!
//! ```text
//! controller: submit ──► broker: pre-process ──► engine.compute_path_async
//!                                                        │ (async)
//! host:       poll ◄──── broker: post-process ◄── engine.poll_completed
//!              │
//!              └─► Delivery { agent, handle } ──► controller.on_path_complete
//! ```
//!
//! # Ownership
//!
//! Requests are pooled and reference counted through [`ClaimOwner`]s.  A
//! fresh request is claimed by the broker; a returned one additionally by the
//! agent's last-good slot; `accept` hands the broker's claim over to the
//! agent.  All access goes through `&mut self`, and the engine only sees
//! copied [`EngineRequest`]s, so the counts need no synchronisation.

use glam::Vec3;

use nav_core::{AgentId, PathConstraints, RequestId};

use crate::{
    ClaimOwner, EngineRequest, EngineResult, ListenerId, ModifierId, ModifierPipeline,
    PathListener, PathModifier, PathRequest, RequestError, RequestHandle, RequestPool,
    RequestResult, RequestState, SearchEngine,
};

#[cfg(feature = "fx-hash")]
type Map<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
type Map<K, V> = std::collections::HashMap<K, V>;

/// Diagnostic of a request replaced by a newer one from the same agent.
pub const SUPERSEDED: &str = "superseded";
/// Diagnostic of a request cancelled by its owner.
pub const CANCELLED: &str = "cancelled";

/// A completed request, routed to the agent it was submitted for.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Delivery {
    pub agent:  AgentId,
    pub id:     RequestId,
    pub handle: RequestHandle,
}

/// Per-agent broker state.
#[derive(Default)]
struct AgentChannel {
    pipeline:  ModifierPipeline,
    in_flight: Option<RequestHandle>,
    last_good: Option<RequestHandle>,
}

/// Owns the search engine and every path request.
pub struct PathRequestBroker<E: SearchEngine> {
    engine:        E,
    pool:          RequestPool,
    channels:      Map<AgentId, AgentChannel>,
    /// `RequestId → handle` for requests forwarded and not yet completed.
    pending:       Map<RequestId, RequestHandle>,
    listeners:     Vec<(ListenerId, Box<dyn PathListener>)>,
    next_id:       RequestId,
    next_listener: u32,
    /// Reused buffer for `engine.poll_completed`.
    results:       Vec<EngineResult>,
}

impl<E: SearchEngine> PathRequestBroker<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            pool:          RequestPool::new(),
            channels:      Map::default(),
            pending:       Map::default(),
            listeners:     Vec::new(),
            next_id:       RequestId(0),
            next_listener: 0,
            results:       Vec::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    // ── Submission ────────────────────────────────────────────────────────

    /// Create a request and forward it to the engine right away.
    ///
    /// Any request of the same agent still in flight is failed with
    /// [`SUPERSEDED`] and cancelled; it will never be delivered.
    pub fn submit(
        &mut self,
        agent:       AgentId,
        start:       Vec3,
        end:         Vec3,
        constraints: PathConstraints,
    ) -> RequestHandle {
        let handle = self.create(agent, start, end, constraints);
        self.forward(handle);
        handle
    }

    /// Create a request in `Created` without forwarding it.
    pub fn create(
        &mut self,
        agent:       AgentId,
        start:       Vec3,
        end:         Vec3,
        constraints: PathConstraints,
    ) -> RequestHandle {
        let id = self.next_id;
        self.next_id = id.next();
        let handle = self.pool.acquire(id, agent, start, end, constraints, ClaimOwner::Broker);
        self.channels.entry(agent).or_default();
        log::trace!("created request {id} ({handle}) for {agent}");
        handle
    }

    /// Forward a `Created` request to the engine, as `submit` does.
    ///
    /// # Errors
    ///
    /// `StaleHandle`, or `InvalidState` if the request is not `Created`.
    pub fn start(&mut self, handle: RequestHandle) -> RequestResult<()> {
        let request = self.pool.get(handle).ok_or(RequestError::StaleHandle(handle))?;
        if request.state != RequestState::Created {
            return Err(RequestError::InvalidState {
                handle,
                actual:   request.state,
                expected: "created",
            });
        }
        self.forward(handle);
        Ok(())
    }

    /// A request already `Returned` with `points` as its path.
    ///
    /// The modifier pipeline is not run.  An empty `points` yields a request
    /// in `Error`.
    pub fn fabricate(&mut self, agent: AgentId, points: &[Vec3]) -> RequestHandle {
        let start = points.first().copied().unwrap_or(Vec3::ZERO);
        let end = points.last().copied().unwrap_or(start);
        let handle = self.create(agent, start, end, PathConstraints::default());
        if let Some(request) = self.pool.get_mut(handle) {
            if points.is_empty() {
                request.fail("fabricated path is empty");
            } else {
                request.vector_path.extend_from_slice(points);
                request.state = RequestState::Returned;
            }
        }
        handle
    }

    fn forward(&mut self, handle: RequestHandle) {
        let Some(request) = self.pool.get(handle) else {
            return;
        };
        let agent = request.agent;

        let previous = self.channels.get(&agent).and_then(|c| c.in_flight);
        if let Some(previous) = previous.filter(|&p| p != handle) {
            self.abort(previous, SUPERSEDED);
        }

        let channel = self.channels.entry(agent).or_default();
        let Some(request) = self.pool.get_mut(handle) else {
            return;
        };
        channel.pipeline.pre_process(request);
        request.state = RequestState::Processing;
        channel.in_flight = Some(handle);
        self.pending.insert(request.id, handle);

        log::debug!(
            "forwarding request {} for {agent}: {} -> {}",
            request.id, request.start, request.end
        );
        self.engine.compute_path_async(EngineRequest {
            id:          request.id,
            agent,
            start:       request.start,
            end:         request.end,
            constraints: request.constraints,
        });
    }

    // ── Cancellation ──────────────────────────────────────────────────────

    /// Cancel an in-flight request.  No-op for completed or stale handles.
    pub fn cancel(&mut self, handle: RequestHandle) {
        self.abort(handle, CANCELLED);
    }

    fn abort(&mut self, handle: RequestHandle, reason: &'static str) {
        let Some(request) = self.pool.get_mut(handle) else {
            return;
        };
        if !request.state.is_in_flight() {
            return;
        }
        let (id, agent, was_forwarded) =
            (request.id, request.agent, request.state == RequestState::Processing);
        request.fail(reason);
        log::debug!("request {id} for {agent} {reason}");

        self.pending.remove(&id);
        if was_forwarded {
            self.engine.cancel(id);
        }
        if let Some(channel) = self.channels.get_mut(&agent) {
            if channel.in_flight == Some(handle) {
                channel.in_flight = None;
            }
        }
        if self.pool.get(handle).is_some_and(|r| r.is_claimed_by(ClaimOwner::Broker)) {
            let _ = self.pool.release(handle, ClaimOwner::Broker);
        }
    }

    // ── Completion ────────────────────────────────────────────────────────

    /// Drain finished searches from the engine.
    ///
    /// For each live request: store the path and run post-process modifiers
    /// (or record the failure), update the agent's last-good slot, notify
    /// listeners, and emit one [`Delivery`].  Results for unknown or
    /// cancelled ids are dropped.
    pub fn poll(&mut self) -> Vec<Delivery> {
        let mut results = std::mem::take(&mut self.results);
        self.engine.poll_completed(&mut results);

        let mut deliveries = Vec::with_capacity(results.len());
        for result in results.drain(..) {
            let Some(handle) = self.pending.remove(&result.id) else {
                log::trace!("discarding result for unknown or cancelled request {}", result.id);
                continue;
            };
            let Some(request) = self.pool.get_mut(handle) else {
                log::trace!("discarding result for recycled request {}", result.id);
                continue;
            };
            if request.state != RequestState::Processing {
                log::trace!("discarding result for request {} in state {}", result.id, request.state);
                continue;
            }
            let agent = request.agent;
            let channel = self.channels.entry(agent).or_default();

            match result.outcome {
                Ok(points) if !points.is_empty() => {
                    request.vector_path.clear();
                    request.vector_path.extend(points);
                    channel.pipeline.post_process(request);
                    request.state = RequestState::Returned;
                    log::debug!(
                        "request {} for {agent} returned {} waypoints",
                        result.id,
                        request.vector_path.len()
                    );
                }
                Ok(_) => {
                    request.fail("engine returned an empty path");
                    log::debug!("request {} for {agent} returned no waypoints", result.id);
                }
                Err(diagnostic) => {
                    log::debug!("request {} for {agent} failed: {diagnostic}", result.id);
                    request.fail(diagnostic);
                }
            }
            if channel.in_flight == Some(handle) {
                channel.in_flight = None;
            }

            let succeeded = request.state == RequestState::Returned;
            if succeeded {
                let previous = channel.last_good.replace(handle);
                let _ = self.pool.claim(handle, ClaimOwner::LastGood);
                if let Some(previous) = previous.filter(|&p| p != handle) {
                    let _ = self.pool.release(previous, ClaimOwner::LastGood);
                }
            }

            if let Some(request) = self.pool.get(handle) {
                for (_, listener) in &mut self.listeners {
                    listener.on_path_complete(request);
                }
            }
            deliveries.push(Delivery { agent, id: result.id, handle });
        }

        self.results = results;
        deliveries
    }

    // ── Ownership ─────────────────────────────────────────────────────────

    /// Hand a completed request to `agent`: claim it for the agent and drop
    /// the broker's claim.
    ///
    /// # Errors
    ///
    /// `StaleHandle`, `InvalidState` while the request is still in flight,
    /// `AlreadyClaimed` if the agent already holds it.
    pub fn accept(&mut self, handle: RequestHandle, agent: AgentId) -> RequestResult<()> {
        let request = self.pool.get(handle).ok_or(RequestError::StaleHandle(handle))?;
        if request.state.is_in_flight() {
            return Err(RequestError::InvalidState {
                handle,
                actual:   request.state,
                expected: "returned or error",
            });
        }
        let held_by_broker = request.is_claimed_by(ClaimOwner::Broker);
        self.pool.claim(handle, ClaimOwner::Agent(agent))?;
        if held_by_broker {
            self.pool.release(handle, ClaimOwner::Broker)?;
        }
        Ok(())
    }

    /// Drop the broker's claim on a completed request nobody will accept.
    pub fn discard(&mut self, handle: RequestHandle) {
        if self.pool.get(handle).is_some_and(|r| r.state.is_done() && r.is_claimed_by(ClaimOwner::Broker)) {
            let _ = self.pool.release(handle, ClaimOwner::Broker);
        }
    }

    pub fn claim(&mut self, handle: RequestHandle, owner: ClaimOwner) -> RequestResult<()> {
        self.pool.claim(handle, owner)
    }

    /// Drop `owner`'s claim; the request is recycled with its last claim.
    pub fn release(&mut self, handle: RequestHandle, owner: ClaimOwner) -> RequestResult<()> {
        self.pool.release(handle, owner).map(|_| ())
    }

    // ── Modifiers ─────────────────────────────────────────────────────────

    pub fn add_modifier(&mut self, agent: AgentId, modifier: Box<dyn PathModifier>) -> ModifierId {
        self.channels.entry(agent).or_default().pipeline.add(modifier)
    }

    pub fn remove_modifier(&mut self, agent: AgentId, id: ModifierId) -> Option<Box<dyn PathModifier>> {
        self.channels.get_mut(&agent)?.pipeline.remove(id)
    }

    /// Returns `false` if the agent has no such modifier.
    pub fn set_modifier_enabled(&mut self, agent: AgentId, id: ModifierId, enabled: bool) -> bool {
        self.channels
            .get_mut(&agent)
            .is_some_and(|c| c.pipeline.set_enabled(id, enabled))
    }

    pub fn modifiers(&self, agent: AgentId) -> Option<&ModifierPipeline> {
        self.channels.get(&agent).map(|c| &c.pipeline)
    }

    // ── Listeners ─────────────────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: Box<dyn PathListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn request(&self, handle: RequestHandle) -> Option<&PathRequest> {
        self.pool.get(handle)
    }

    pub fn state(&self, handle: RequestHandle) -> Option<RequestState> {
        self.pool.get(handle).map(|r| r.state)
    }

    /// The agent's request currently forwarded to the engine.
    pub fn in_flight(&self, agent: AgentId) -> Option<RequestHandle> {
        self.channels.get(&agent).and_then(|c| c.in_flight)
    }

    /// The agent's most recent successful request.
    pub fn last_good(&self, agent: AgentId) -> Option<RequestHandle> {
        self.channels
            .get(&agent)
            .and_then(|c| c.last_good)
            .filter(|&h| self.pool.get(h).is_some())
    }

    /// Requests forwarded and not yet completed, across all agents.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn live_requests(&self) -> usize {
        self.pool.live_count()
    }

    pub fn pooled_requests(&self) -> usize {
        self.pool.pooled_count()
    }

    /// Forget `agent`: cancel its in-flight request and release its
    /// last-good slot.  Claims held by the agent itself are untouched.
    pub fn remove_agent(&mut self, agent: AgentId) {
        if let Some(handle) = self.in_flight(agent) {
            self.cancel(handle);
        }
        if let Some(channel) = self.channels.remove(&agent) {
            if let Some(handle) = channel.last_good {
                let _ = self.pool.release(handle, ClaimOwner::LastGood);
            }
        }
    }
}
