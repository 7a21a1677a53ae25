//! Fluent builder for constructing a [`Crowd`].

use glam::Vec3;

use nav_core::{AgentId, FrameClock};
use nav_motion::{ControllerConfig, Follower, GroundQuery, MotionController, Transform};
use nav_request::{PathRequestBroker, SearchEngine, StartEndModifier};

use crate::{Crowd, CrowdConfig, CrowdError, CrowdResult};

/// Fluent builder for [`Crowd<E, F, G>`].
///
/// # Required inputs
///
/// - [`CrowdConfig`]: frame time, frame count, seed, …
/// - `E: SearchEngine`: wrapped in the crowd's broker
/// - `G: GroundQuery`: shared by every controller
/// - one follower per agent; the agent count is `followers.len()`
///
/// # Optional inputs (have defaults)
///
/// | Method                  | Default                                   |
/// |-------------------------|-------------------------------------------|
/// | `.positions(v)`         | every agent at the origin                 |
/// | `.destinations(v)`      | no destinations                           |
/// | `.controller_config(c)` | `ControllerConfig::default()`             |
/// | `.exact_endpoints()`    | paths end at graph nodes                  |
///
/// # Example
///
/// ```rust,ignore
/// let mut crowd = CrowdBuilder::new(config, DeferredEngine::new(graph), FlatGround::default(), followers)
///     .positions(starts)
///     .destinations(goals)
///     .build()?;
/// crowd.run(&mut NoopObserver)?;
/// ```
pub struct CrowdBuilder<E: SearchEngine, F: Follower, G: GroundQuery> {
    config:            CrowdConfig,
    engine:            E,
    ground:            G,
    followers:         Vec<F>,
    positions:         Option<Vec<Vec3>>,
    destinations:      Option<Vec<Option<Vec3>>>,
    controller_config: ControllerConfig,
    exact_endpoints:   bool,
}

impl<E: SearchEngine, F: Follower, G: GroundQuery> CrowdBuilder<E, F, G> {
    pub fn new(config: CrowdConfig, engine: E, ground: G, followers: Vec<F>) -> Self {
        Self {
            config,
            engine,
            ground,
            followers,
            positions:         None,
            destinations:      None,
            controller_config: ControllerConfig::default(),
            exact_endpoints:   false,
        }
    }

    /// Starting position of each agent (must be length `agent_count`).
    pub fn positions(mut self, positions: Vec<Vec3>) -> Self {
        self.positions = Some(positions);
        self
    }

    /// Destination of each agent (must be length `agent_count`).  `None`
    /// leaves that agent idle.
    pub fn destinations(mut self, destinations: Vec<Option<Vec3>>) -> Self {
        self.destinations = Some(destinations);
        self
    }

    /// Settings for every controller.  Its `seed` is replaced by
    /// `CrowdConfig::seed`.
    pub fn controller_config(mut self, config: ControllerConfig) -> Self {
        self.controller_config = config;
        self
    }

    /// Register a `StartEndModifier` for every agent, so paths start and
    /// end exactly at the requested points.
    pub fn exact_endpoints(mut self) -> Self {
        self.exact_endpoints = true;
        self
    }

    /// Validate inputs, build the controllers and return a ready-to-run
    /// [`Crowd`].
    pub fn build(self) -> CrowdResult<Crowd<E, F, G>> {
        self.config.validate()?;
        let agent_count = self.followers.len();

        // ── Validate and resolve optional inputs ──────────────────────────
        let positions = match self.positions {
            Some(p) => {
                if p.len() != agent_count {
                    return Err(CrowdError::AgentCountMismatch {
                        expected: agent_count,
                        got:      p.len(),
                        what:     "positions",
                    });
                }
                p
            }
            None => vec![Vec3::ZERO; agent_count],
        };

        let destinations = match self.destinations {
            Some(d) => {
                if d.len() != agent_count {
                    return Err(CrowdError::AgentCountMismatch {
                        expected: agent_count,
                        got:      d.len(),
                        what:     "destinations",
                    });
                }
                d
            }
            None => vec![None; agent_count],
        };

        let controller_config = ControllerConfig { seed: self.config.seed, ..self.controller_config };

        // ── Build controllers and their transforms ────────────────────────
        let mut broker = PathRequestBroker::new(self.engine);
        let mut controllers = Vec::with_capacity(agent_count);
        let mut transforms = Vec::with_capacity(agent_count);
        for (i, ((follower, position), destination)) in
            self.followers.into_iter().zip(positions).zip(destinations).enumerate()
        {
            let agent = AgentId(i as u32);
            let mut controller = MotionController::new(agent, position, controller_config.clone(), follower)?;
            if let Some(d) = destination {
                controller.set_destination(d);
            }
            if self.exact_endpoints {
                broker.add_modifier(agent, Box::new(StartEndModifier::default()));
            }
            controllers.push(controller);
            transforms.push(Transform::at(position));
        }
        log::debug!("crowd built with {agent_count} agent(s)");

        Ok(Crowd {
            clock: FrameClock::new(),
            config: self.config,
            broker,
            controllers,
            transforms,
            ground: self.ground,
        })
    }
}
