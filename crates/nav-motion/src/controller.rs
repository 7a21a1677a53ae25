//! The `MotionController`: one agent's path lifecycle and frame loop.
//!
//! # Frame structure
//!
//! ```text
//! tick_logic(dt)                 tick_physics(dt)
//!   ├─ advance clock               └─ movement frame   (cadence = Physics)
//!   ├─ repath if due
//!   └─ movement frame   (cadence = Logic)
//!
//! movement frame
//!   ├─ pull position / rotation from the transform (owned channels)
//!   ├─ follower.next_frame
//!   └─ finalize: external delta → surface clamp → gravity + ground ray
//!                → write owned channels back to the transform
//! ```
//!
//! Path results are not polled here: the host drains `broker.poll()` and
//! routes each `Delivery` to `on_path_complete` (or `handle_deliveries`).

use glam::{Quat, Vec3};

use nav_core::{AgentId, AgentRng, FrameClock};
use nav_path::PathCursor;
use nav_request::{
    ClaimOwner, Delivery, PathRequestBroker, RequestError, RequestHandle, RequestState,
    SearchEngine,
};

use crate::{
    ControllerConfig, ControllerPhase, Follower, FrameContext, InstallContext, MotionEnv,
    MotionError, MotionEvent, MotionResult, MotionState, MovementCadence, PathSnapshot,
    RepathSchedule,
};

pub struct MotionController<F: Follower> {
    agent:    AgentId,
    config:   ControllerConfig,
    follower: F,
    state:    MotionState,
    cursor:   PathCursor,
    clock:    FrameClock,
    rng:      AgentRng,
    schedule: RepathSchedule,

    destination:     Option<Vec3>,
    /// Request whose path the cursor holds; claimed by this agent.
    current_request: Option<RequestHandle>,
    /// Request with the engine, awaiting delivery.
    pending_request: Option<RequestHandle>,

    /// Repath at the next opportunity regardless of the policy.
    repath_forced:     bool,
    /// `TargetReached` already emitted for the current path.
    reached_signalled: bool,
    events:            Vec<MotionEvent>,
}

impl<F: Follower> MotionController<F> {
    /// A controller at `position` with no destination and no path.
    ///
    /// # Errors
    ///
    /// `MotionError::Config` if `config` does not validate.
    pub fn new(agent: AgentId, position: Vec3, config: ControllerConfig, follower: F) -> MotionResult<Self> {
        config.validate()?;
        let mut rng = AgentRng::new(config.seed, agent);
        let schedule = RepathSchedule::new(&config.repath, &mut rng);
        Ok(Self {
            agent,
            follower,
            state:             MotionState::at(position),
            cursor:            PathCursor::new(),
            clock:             FrameClock::new(),
            rng,
            schedule,
            destination:       None,
            current_request:   None,
            pending_request:   None,
            repath_forced:     false,
            reached_signalled: false,
            events:            Vec::new(),
            config,
        })
    }

    /// Same, facing `rotation`.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.state.rotation = rotation;
        self
    }

    // ── Per-frame ─────────────────────────────────────────────────────────

    /// Variable-rate tick: clock, repath, and movement if `cadence == Logic`.
    pub fn tick_logic<E: SearchEngine>(
        &mut self,
        dt:     f32,
        broker: &mut PathRequestBroker<E>,
        env:    &mut MotionEnv<'_>,
    ) {
        self.advance_clock(dt);
        self.update_repath(broker);
        if self.config.cadence == MovementCadence::Logic {
            self.movement_frame(env, dt);
        }
    }

    /// Fixed-rate tick: movement if `cadence == Physics`.
    pub fn tick_physics(&mut self, dt: f32, env: &mut MotionEnv<'_>) {
        if self.config.cadence == MovementCadence::Physics {
            self.movement_frame(env, dt);
        }
    }

    /// `tick_logic` then `tick_physics` with the same `dt`.
    pub fn tick<E: SearchEngine>(
        &mut self,
        dt:     f32,
        broker: &mut PathRequestBroker<E>,
        env:    &mut MotionEnv<'_>,
    ) {
        self.tick_logic(dt, broker, env);
        self.tick_physics(dt, env);
    }

    pub fn advance_clock(&mut self, dt: f32) {
        self.clock.advance(dt);
    }

    /// Submit a new request if the repath policy (or a teleport) says so.
    /// Returns the submitted handle.
    pub fn update_repath<E: SearchEngine>(&mut self, broker: &mut PathRequestBroker<E>) -> Option<RequestHandle> {
        if !self.config.can_search || self.state.awaiting_path_computation {
            return None;
        }
        let destination = self.destination?;
        let due = self.repath_forced
            || self.schedule.is_due(
                &self.config.repath,
                self.clock.elapsed_secs,
                self.state.last_repath_time,
                self.state.position,
                destination,
            );
        if !due {
            return None;
        }
        self.search_path(broker).ok()
    }

    /// One movement frame: follower step plus finalize.
    pub fn movement_frame(&mut self, env: &mut MotionEnv<'_>, dt: f32) {
        if let Some(transform) = env.transform.as_deref() {
            if self.config.update_position {
                self.state.position = transform.position();
            }
            if self.config.update_rotation {
                self.state.rotation = transform.rotation();
            }
        }

        if self.config.can_move {
            let out = self.follower.next_frame(FrameContext {
                dt,
                plane:                self.config.plane,
                position:             self.state.position,
                rotation:             self.state.rotation,
                velocity:             self.state.velocity,
                cursor:               &mut self.cursor,
                end_reached_distance: self.config.end_reached_distance,
                is_stopped:           self.state.is_stopped,
            });
            self.state.position = out.position;
            self.state.rotation = out.rotation;
            self.state.velocity = out.velocity;
            // A zero-length frame leaves the flag as it was.
            if self.cursor.is_valid() && dt > 0.0 {
                self.set_reached(out.reached_end);
            }
        } else {
            self.state.velocity = Vec3::ZERO;
        }

        self.finalize(env, dt);
    }

    fn finalize(&mut self, env: &mut MotionEnv<'_>, dt: f32) {
        let plane = self.config.plane;
        let up = plane.up();

        let mut position = self.state.position;
        let last_elevation = plane.elevation(position);
        position += std::mem::take(&mut self.state.accumulated_movement_delta);

        position = self.follower.clamp_to_surface(
            env.ground,
            &self.config.constraints,
            plane,
            position,
            &mut self.state.velocity,
        );

        if self.follower.uses_gravity() && dt > 0.0 {
            self.state.vertical_velocity += self.config.gravity * dt;
            position += up * (self.state.vertical_velocity * dt);

            // Cast from half a height above the feet down to the feet, plus
            // however far the agent dropped this frame.
            let ray = self.config.height * 0.5 + (last_elevation - plane.elevation(position)).max(0.0);
            if let Some(hit) = env.ground.raycast(position + up * ray, -up, ray) {
                position = hit;
                self.state.vertical_velocity *= (1.0 - self.config.vertical_decay_rate * dt).max(0.0);
            }
        }

        self.state.position = position;
        if let Some(transform) = env.transform.as_deref_mut() {
            if self.config.update_position {
                transform.set_position(position);
            }
            if self.config.update_rotation {
                transform.set_rotation(self.state.rotation);
            }
        }
    }

    fn set_reached(&mut self, reached: bool) {
        self.state.reached_end_of_path = reached;
        if reached && !self.reached_signalled {
            self.reached_signalled = true;
            log::debug!("{} reached the end of its path", self.agent);
            self.events.push(MotionEvent::TargetReached { agent: self.agent });
        }
    }

    // ── Path lifecycle ────────────────────────────────────────────────────

    /// Submit a request from the current position to the destination now.
    ///
    /// Supersedes any request still pending for this agent.
    pub fn search_path<E: SearchEngine>(&mut self, broker: &mut PathRequestBroker<E>) -> MotionResult<RequestHandle> {
        let destination = self.destination.ok_or(MotionError::NoDestination)?;
        let handle = broker.submit(self.agent, self.state.position, destination, self.config.constraints);

        self.pending_request = Some(handle);
        self.state.awaiting_path_computation = true;
        self.state.last_repath_time = self.clock.elapsed_secs;
        self.repath_forced = false;
        self.schedule.record(&self.config.repath, destination, &mut self.rng);

        log::debug!(
            "{} repath at {:.2}s toward {destination} ({handle})",
            self.agent, self.clock.elapsed_secs
        );
        Ok(handle)
    }

    /// Handle a delivery from `broker.poll()`.
    ///
    /// # Errors
    ///
    /// - `StaleDelivery` if `handle` is not this controller's pending
    ///   request.  Nothing changes.
    /// - `PathStillProcessing` if the request has not completed yet.
    ///
    /// A failed search is not an error: the old path is kept and
    /// `MotionEvent::PathFailed` is queued.
    pub fn on_path_complete<E: SearchEngine>(
        &mut self,
        broker: &mut PathRequestBroker<E>,
        handle: RequestHandle,
    ) -> MotionResult<()> {
        if self.pending_request != Some(handle) {
            return Err(MotionError::StaleDelivery(handle));
        }
        let Some(request) = broker.request(handle) else {
            self.pending_request = None;
            self.state.awaiting_path_computation = false;
            return Err(RequestError::StaleHandle(handle).into());
        };
        if request.state().is_in_flight() {
            return Err(MotionError::PathStillProcessing(handle));
        }

        broker.accept(handle, self.agent)?;
        self.pending_request = None;
        self.state.awaiting_path_computation = false;

        if let Some(request) = broker.request(handle).filter(|r| r.is_error()) {
            let diagnostic = request.error().unwrap_or("unknown error").to_string();
            let id = request.id();
            log::debug!("{} path request {id} failed: {diagnostic}", self.agent);
            self.events.push(MotionEvent::PathFailed { agent: self.agent, request: id, diagnostic });
            broker.release(handle, ClaimOwner::Agent(self.agent))?;
            return Ok(());
        }
        self.install(broker, handle)
    }

    /// Route every delivery addressed to this agent to `on_path_complete`.
    /// Deliveries it does not expect are discarded.  Returns how many were
    /// accepted.
    pub fn handle_deliveries<E: SearchEngine>(
        &mut self,
        broker:     &mut PathRequestBroker<E>,
        deliveries: &[Delivery],
    ) -> usize {
        let agent = self.agent;
        let mut accepted = 0;
        for delivery in deliveries.iter().filter(|d| d.agent == agent) {
            match self.on_path_complete(broker, delivery.handle) {
                Ok(()) => accepted += 1,
                Err(MotionError::StaleDelivery(handle)) => {
                    log::debug!("{} discarding unexpected delivery {handle}", self.agent);
                    broker.discard(handle);
                }
                Err(e) => log::warn!("{} failed to take delivery {}: {e}", self.agent, delivery.handle),
            }
        }
        accepted
    }

    /// Follow an explicitly supplied request.
    ///
    /// - `Created`: forwarded to the engine and followed when it completes.
    ///   Must have been created for this agent.
    /// - `Returned`: installed immediately; a pending request is cancelled.
    ///
    /// # Errors
    ///
    /// `PathStillProcessing` for a request already with the engine,
    /// `InvalidRequestState` for a failed or stale one, `WrongAgent` for a
    /// `Created` request of another agent.  No state changes on error.
    pub fn set_path<E: SearchEngine>(
        &mut self,
        broker: &mut PathRequestBroker<E>,
        handle: RequestHandle,
    ) -> MotionResult<()> {
        let Some(request) = broker.request(handle) else {
            return Err(MotionError::InvalidRequestState { handle, state: None });
        };
        let (state, owner) = (request.state(), request.agent());

        match state {
            RequestState::Processing => Err(MotionError::PathStillProcessing(handle)),
            RequestState::Error => Err(MotionError::InvalidRequestState { handle, state: Some(state) }),
            RequestState::Created => {
                if owner != self.agent {
                    return Err(MotionError::WrongAgent { handle, owner, agent: self.agent });
                }
                // The broker supersedes whatever this agent had in flight.
                broker.start(handle)?;
                self.pending_request = Some(handle);
                self.state.awaiting_path_computation = true;
                self.state.last_repath_time = self.clock.elapsed_secs;
                Ok(())
            }
            RequestState::Returned => {
                broker.accept(handle, self.agent)?;
                if let Some(pending) = self.pending_request.take() {
                    broker.cancel(pending);
                    self.state.awaiting_path_computation = false;
                }
                self.install(broker, handle)
            }
        }
    }

    fn install<E: SearchEngine>(
        &mut self,
        broker: &mut PathRequestBroker<E>,
        handle: RequestHandle,
    ) -> MotionResult<()> {
        let previous = self.cursor.is_valid().then(|| PathSnapshot {
            tangent:            self.cursor.tangent(),
            remaining_distance: self.cursor.remaining_distance(),
        });

        let request = broker.request(handle).ok_or(RequestError::StaleHandle(handle))?;
        let (id, waypoints) = (request.id(), request.vector_path.len());
        self.cursor.bind(&request.vector_path);
        self.cursor.snap_to_closest_point(self.state.position);

        let reached = self.follower.on_path_installed(InstallContext {
            plane:                self.config.plane,
            cursor:               &mut self.cursor,
            position:             self.state.position,
            previous,
            end_reached_distance: self.config.end_reached_distance,
        });

        if let Some(old) = self.current_request.replace(handle) {
            if old != handle {
                if let Err(e) = broker.release(old, ClaimOwner::Agent(self.agent)) {
                    log::warn!("{} could not release previous path {old}: {e}", self.agent);
                }
            }
        }

        log::debug!("{} installed path {id} ({waypoints} waypoints)", self.agent);
        self.events.push(MotionEvent::PathInstalled { agent: self.agent, request: id, waypoints });
        self.reached_signalled = false;
        self.set_reached(reached);
        Ok(())
    }

    /// Drop the current path and cancel any pending request.
    pub fn clear_path<E: SearchEngine>(&mut self, broker: &mut PathRequestBroker<E>) {
        if let Some(pending) = self.pending_request.take() {
            broker.cancel(pending);
        }
        self.state.awaiting_path_computation = false;
        if let Some(current) = self.current_request.take() {
            if let Err(e) = broker.release(current, ClaimOwner::Agent(self.agent)) {
                log::warn!("{} could not release path {current}: {e}", self.agent);
            }
        }
        self.cursor.unbind();
        self.follower.on_path_cleared();
        self.state.reached_end_of_path = false;
        self.reached_signalled = false;
    }

    /// Move the agent to `position` instantly and zero its velocity.
    ///
    /// With `clear_path` the path and any pending request are dropped and a
    /// repath is due on the next tick.  Calling this twice with the same
    /// arguments leaves the same state as calling it once.
    pub fn teleport<E: SearchEngine>(
        &mut self,
        broker:     &mut PathRequestBroker<E>,
        env:        &mut MotionEnv<'_>,
        position:   Vec3,
        clear_path: bool,
    ) {
        self.state.position = position;
        self.state.velocity = Vec3::ZERO;
        self.state.vertical_velocity = 0.0;
        self.state.accumulated_movement_delta = Vec3::ZERO;

        if clear_path {
            self.clear_path(broker);
            self.repath_forced = true;
        } else {
            self.follower.on_teleport(&mut self.cursor, position);
        }

        if self.config.update_position {
            if let Some(transform) = env.transform.as_deref_mut() {
                transform.set_position(position);
            }
        }
        log::trace!("{} teleported to {position}", self.agent);
    }

    /// Displace the agent by `delta` at the next finalize, on top of
    /// whatever the follower does.
    pub fn move_by(&mut self, delta: Vec3) {
        self.state.accumulated_movement_delta += delta;
    }

    pub fn set_destination(&mut self, destination: Vec3) {
        self.destination = Some(destination);
    }

    pub fn clear_destination(&mut self) {
        self.destination = None;
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.state.is_stopped = stopped;
    }

    // ── Queries ───────────────────────────────────────────────────────────

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn rotation(&self) -> Quat {
        self.state.rotation
    }

    pub fn velocity(&self) -> Vec3 {
        self.state.velocity
    }

    /// Controller time in seconds.
    pub fn time(&self) -> f64 {
        self.clock.elapsed_secs
    }

    pub fn phase(&self) -> ControllerPhase {
        if self.pending_request.is_some() {
            ControllerPhase::AwaitingPath
        } else if self.cursor.is_valid() {
            ControllerPhase::Following
        } else {
            ControllerPhase::Idle
        }
    }

    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    pub fn reached_end_of_path(&self) -> bool {
        self.state.reached_end_of_path
    }

    /// End of path reached and that end lies within `end_reached_distance`
    /// of the destination (in the movement plane).
    pub fn reached_destination(&self) -> bool {
        if !self.state.reached_end_of_path {
            return false;
        }
        self.destination.is_some_and(|d| {
            self.config.plane.planar_distance(self.cursor.end_point(), d) <= self.config.end_reached_distance
        })
    }

    /// Planar distance to the cursor point plus the path remaining after
    /// it; infinite without a path.
    pub fn remaining_distance(&self) -> f32 {
        if !self.cursor.is_valid() {
            return f32::INFINITY;
        }
        self.config.plane.planar_distance(self.state.position, self.cursor.current_point())
            + self.cursor.remaining_distance()
    }

    pub fn has_path(&self) -> bool {
        self.cursor.is_valid()
    }

    pub fn path_pending(&self) -> bool {
        self.state.awaiting_path_computation
    }

    /// Where the follower is heading: its steering target if it has one,
    /// otherwise the cursor point.
    pub fn steering_target(&self) -> Option<Vec3> {
        self.follower
            .steering_target()
            .or_else(|| self.cursor.is_valid().then(|| self.cursor.current_point()))
    }

    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped
    }

    pub fn current_request(&self) -> Option<RequestHandle> {
        self.current_request
    }

    pub fn pending_request(&self) -> Option<RequestHandle> {
        self.pending_request
    }

    pub fn cursor(&self) -> &PathCursor {
        &self.cursor
    }

    pub fn follower(&self) -> &F {
        &self.follower
    }

    pub fn follower_mut(&mut self) -> &mut F {
        &mut self.follower
    }

    /// Current point followed by the waypoints still ahead.
    pub fn remaining_path(&self, buffer: &mut Vec<Vec3>) {
        self.cursor.remaining_path(buffer);
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, MotionEvent> {
        self.events.drain(..)
    }
}
