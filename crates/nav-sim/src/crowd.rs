//! The `Crowd` struct and its frame loop.

use glam::Vec3;

use nav_core::{AgentId, Frame, FrameClock};
use nav_motion::{Follower, GroundQuery, MotionController, MotionEnv, MovementCadence, Transform};
use nav_request::{PathRequestBroker, SearchEngine};

use crate::{AgentSnapshot, CrowdConfig, CrowdError, CrowdObserver, CrowdResult};

// ── Crowd ─────────────────────────────────────────────────────────────────────

/// Many controllers sharing one broker and one ground.
///
/// `Crowd<E, F, G>` drives the four-phase frame loop:
///
/// 1. **Deliveries**: drain `broker.poll()` and hand each completed request
///    to the controller it was submitted for.
/// 2. **Repath** (sequential, ascending `AgentId`): advance each
///    controller's clock and submit a request if its policy says so.
/// 3. **Movement** (optionally parallel with the `parallel` feature): one
///    movement frame per `Logic` controller, `physics_substeps` physics
///    ticks per `Physics` controller.
/// 4. **Events**: drain every controller's events to the observer.
///
/// Create via [`CrowdBuilder`][crate::CrowdBuilder].
pub struct Crowd<E: SearchEngine, F: Follower, G: GroundQuery> {
    pub config: CrowdConfig,

    /// Crowd clock; the frame counter observers see.
    pub clock: FrameClock,

    /// Owns the search engine and every path request.
    pub broker: PathRequestBroker<E>,

    /// One controller per agent, indexed by `AgentId`.
    pub controllers: Vec<MotionController<F>>,

    /// The transform each controller syncs with, indexed by `AgentId`.
    pub transforms: Vec<Transform>,

    pub ground: G,
}

impl<E: SearchEngine, F: Follower, G: GroundQuery> Crowd<E, F, G> {
    // ── Public API ────────────────────────────────────────────────────────

    pub fn agent_count(&self) -> usize {
        self.controllers.len()
    }

    /// Run from the current frame to `config.total_frames`.
    ///
    /// # Errors
    ///
    /// `CrowdError::Config` if the config was edited into an invalid state
    /// after building.
    pub fn run<O: CrowdObserver>(&mut self, observer: &mut O) -> CrowdResult<()> {
        self.config.validate()?;
        while self.clock.frame.0 < self.config.total_frames {
            self.step(observer);
        }
        observer.on_crowd_end(self.clock.frame);
        Ok(())
    }

    /// Run exactly `n` frames from the current one (ignores `total_frames`).
    pub fn run_frames<O: CrowdObserver>(&mut self, n: u64, observer: &mut O) -> CrowdResult<()> {
        self.config.validate()?;
        for _ in 0..n {
            self.step(observer);
        }
        Ok(())
    }

    /// Run until every agent with a destination has reached it, or
    /// `max_frames` pass.  Returns `true` if everyone arrived.
    pub fn run_until_arrived<O: CrowdObserver>(&mut self, max_frames: u64, observer: &mut O) -> CrowdResult<bool> {
        self.config.validate()?;
        for _ in 0..max_frames {
            self.step(observer);
            if self.all_reached() {
                return Ok(true);
            }
        }
        Ok(self.all_reached())
    }

    /// One frame.  Returns the number of deliveries routed.
    pub fn step<O: CrowdObserver>(&mut self, observer: &mut O) -> usize {
        let now = self.clock.frame;
        observer.on_frame_start(now);
        let routed = self.process_frame(now, observer);
        observer.on_frame_end(now, routed);
        if self.config.snapshot_interval > 0 && now.0.is_multiple_of(self.config.snapshot_interval) {
            observer.on_snapshot(now, &self.snapshot());
        }
        self.clock.advance(self.config.frame_dt);
        routed
    }

    /// `true` if every agent with a destination has reached it.  Agents
    /// without a destination do not count.
    pub fn all_reached(&self) -> bool {
        self.controllers
            .iter()
            .filter(|c| c.destination().is_some())
            .all(|c| c.reached_destination())
    }

    pub fn set_destination(&mut self, agent: AgentId, destination: Vec3) -> CrowdResult<()> {
        self.controller_mut(agent)?.set_destination(destination);
        Ok(())
    }

    /// Move `agent` to `position`, optionally dropping its path.
    pub fn teleport(&mut self, agent: AgentId, position: Vec3, clear_path: bool) -> CrowdResult<()> {
        let i = self.index_of(agent)?;
        let mut env = MotionEnv::with_transform(&self.ground, &mut self.transforms[i]);
        self.controllers[i].teleport(&mut self.broker, &mut env, position, clear_path);
        Ok(())
    }

    pub fn controller(&self, agent: AgentId) -> CrowdResult<&MotionController<F>> {
        let i = self.index_of(agent)?;
        Ok(&self.controllers[i])
    }

    pub fn controller_mut(&mut self, agent: AgentId) -> CrowdResult<&mut MotionController<F>> {
        let i = self.index_of(agent)?;
        Ok(&mut self.controllers[i])
    }

    /// Current state of every agent, in agent order.
    pub fn snapshot(&self) -> Vec<AgentSnapshot> {
        self.controllers
            .iter()
            .map(|c| AgentSnapshot {
                agent:              c.agent(),
                position:           c.position(),
                velocity:           c.velocity(),
                phase:              c.phase(),
                remaining_distance: c.remaining_distance(),
                reached:            c.reached_destination(),
            })
            .collect()
    }

    // ── Core frame processing ─────────────────────────────────────────────

    fn index_of(&self, agent: AgentId) -> CrowdResult<usize> {
        let i = agent.index();
        match self.controllers.get(i) {
            Some(c) if c.agent() == agent => Ok(i),
            _ => Err(CrowdError::UnknownAgent(agent)),
        }
    }

    fn process_frame<O: CrowdObserver>(&mut self, now: Frame, observer: &mut O) -> usize {
        // ── Phase 1: route deliveries ─────────────────────────────────────
        let deliveries = self.broker.poll();
        let mut routed = 0;
        for delivery in &deliveries {
            match self.controllers.get_mut(delivery.agent.index()) {
                Some(c) if c.agent() == delivery.agent => {
                    c.handle_deliveries(&mut self.broker, std::slice::from_ref(delivery));
                    routed += 1;
                }
                _ => {
                    log::warn!("{now}: delivery {} for unknown {}", delivery.handle, delivery.agent);
                    self.broker.discard(delivery.handle);
                }
            }
        }

        // ── Phase 2: clocks and repaths (sequential) ──────────────────────
        //
        // Submission order decides request ids, so it stays in agent order
        // even when movement runs in parallel.
        let dt = self.config.frame_dt;
        let mut submitted = 0;
        for c in &mut self.controllers {
            c.advance_clock(dt);
            if c.update_repath(&mut self.broker).is_some() {
                submitted += 1;
            }
        }
        if submitted > 0 {
            log::trace!("{now}: {submitted} repath(s) submitted");
        }

        // ── Phase 3: movement ─────────────────────────────────────────────
        self.move_agents(dt);

        // ── Phase 4: events ───────────────────────────────────────────────
        for c in &mut self.controllers {
            for event in c.drain_events() {
                observer.on_event(now, &event);
            }
        }

        routed
    }

    /// Movement for every controller.  Each touches only its own state and
    /// transform, so with the `parallel` feature they run on Rayon's pool.
    fn move_agents(&mut self, dt: f32) {
        let ground: &dyn GroundQuery = &self.ground;
        let substeps = self.config.physics_substeps.max(1);

        #[cfg(not(feature = "parallel"))]
        {
            self.controllers
                .iter_mut()
                .zip(self.transforms.iter_mut())
                .for_each(|(c, t)| move_agent(c, t, ground, dt, substeps));
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            self.controllers
                .par_iter_mut()
                .zip(self.transforms.par_iter_mut())
                .for_each(|(c, t)| move_agent(c, t, ground, dt, substeps));
        }
    }
}

fn move_agent<F: Follower>(
    controller: &mut MotionController<F>,
    transform:  &mut Transform,
    ground:     &dyn GroundQuery,
    dt:         f32,
    substeps:   u32,
) {
    let mut env = MotionEnv::with_transform(ground, transform);
    match controller.config().cadence {
        MovementCadence::Logic => controller.movement_frame(&mut env, dt),
        MovementCadence::Physics => {
            let sub_dt = dt / substeps as f32;
            for _ in 0..substeps {
                controller.tick_physics(sub_dt, &mut env);
            }
        }
    }
}
