//! corridor: a small crowd crossing a grid of corridors.
//!
//! Half the agents steer (velocity, acceleration, turning limits), half
//! interpolate exactly along their path.  Searches run on worker threads,
//! so paths arrive a few frames after they are requested.
//!
//! Run with `RUST_LOG=debug` to see every request and path install.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use glam::Vec3;

use nav_core::{Frame, MovementPlane};
use nav_graph::{AStar, GraphSurface, ThreadedEngine, WaypointGraph, WaypointGraphBuilder};
use nav_motion::{
    ControllerConfig, FollowerKind, InterpolationConfig, InterpolationFollower, MotionEvent,
    RepathPolicy, SteeringConfig, SteeringFollower,
};
use nav_request::{PathRequest, SimpleSmoothModifier};
use nav_sim::{AgentSnapshot, CrowdBuilder, CrowdConfig, CrowdObserver};

// ── Constants ─────────────────────────────────────────────────────────────────

const GRID:            usize = 4;
const SPACING:         f32   = 20.0;
const CORRIDOR_HALF:   f32   = 1.5;
const AGENT_COUNT:     usize = 8;
const SEARCH_WORKERS:  usize = 2;
const SEED:            u64   = 42;
const FRAME_DT:        f32   = 1.0 / 60.0;
const MAX_FRAMES:      u64   = 60 * 60;  // one minute of play
const SNAPSHOT_FRAMES: u64   = 60 * 5;   // every five seconds

// ── World ─────────────────────────────────────────────────────────────────────

/// `GRID × GRID` intersections joined by corridors, `SPACING` apart.
fn build_grid() -> WaypointGraph {
    let mut b = WaypointGraphBuilder::with_capacity(MovementPlane::XZ, GRID * GRID, 4 * GRID * GRID);
    let mut nodes = Vec::with_capacity(GRID * GRID);
    for z in 0..GRID {
        for x in 0..GRID {
            nodes.push(b.add_node(Vec3::new(x as f32 * SPACING, 0.0, z as f32 * SPACING)));
        }
    }
    for z in 0..GRID {
        for x in 0..GRID {
            let here = nodes[z * GRID + x];
            if x + 1 < GRID {
                b.add_link(here, nodes[z * GRID + x + 1], 0);
            }
            if z + 1 < GRID {
                b.add_link(here, nodes[(z + 1) * GRID + x], 0);
            }
        }
    }
    b.build()
}

/// Agents start around the border and head for the opposite side.
fn starts_and_goals() -> (Vec<Vec3>, Vec<Option<Vec3>>) {
    let far = (GRID - 1) as f32 * SPACING;
    let mut starts = Vec::with_capacity(AGENT_COUNT);
    let mut goals = Vec::with_capacity(AGENT_COUNT);
    for i in 0..AGENT_COUNT {
        let t = (i % GRID) as f32 * SPACING;
        let (start, goal) = match i % 4 {
            0 => (Vec3::new(t, 0.0, 0.0), Vec3::new(far - t, 0.0, far)),
            1 => (Vec3::new(0.0, 0.0, t), Vec3::new(far, 0.0, far - t)),
            2 => (Vec3::new(far, 0.0, t), Vec3::new(0.0, 0.0, t)),
            _ => (Vec3::new(t, 0.0, far), Vec3::new(t, 0.0, 0.0)),
        };
        starts.push(start);
        goals.push(Some(goal));
    }
    (starts, goals)
}

fn followers() -> Result<Vec<FollowerKind>> {
    let mut out = Vec::with_capacity(AGENT_COUNT);
    for i in 0..AGENT_COUNT {
        let follower: FollowerKind = if i % 2 == 0 {
            SteeringFollower::new(SteeringConfig {
                max_speed:            4.0 + i as f32 * 0.25,
                constrain_to_surface: true,
                ..SteeringConfig::default()
            })?
            .into()
        } else {
            InterpolationFollower::new(InterpolationConfig { speed: 3.5, ..InterpolationConfig::default() })?.into()
        };
        out.push(follower);
    }
    Ok(out)
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ProgressLog {
    installed:  usize,
    failed:     usize,
    arrivals:   usize,
    deliveries: usize,
}

impl CrowdObserver for ProgressLog {
    fn on_frame_end(&mut self, _frame: Frame, deliveries: usize) {
        self.deliveries += deliveries;
    }

    fn on_event(&mut self, frame: Frame, event: &MotionEvent) {
        match event {
            MotionEvent::PathInstalled { .. } => self.installed += 1,
            MotionEvent::PathFailed { agent, diagnostic, .. } => {
                self.failed += 1;
                log::warn!("{frame}: {agent} search failed: {diagnostic}");
            }
            MotionEvent::TargetReached { agent } => {
                log::info!("{frame}: {agent} arrived");
                self.arrivals += 1;
            }
        }
    }

    fn on_snapshot(&mut self, frame: Frame, agents: &[AgentSnapshot]) {
        let moving = agents.iter().filter(|a| !a.reached).count();
        let remaining: f32 = agents
            .iter()
            .map(|a| a.remaining_distance)
            .filter(|d| d.is_finite())
            .sum();
        log::info!("{frame}: {moving} agent(s) moving, {remaining:.1} units of path left");
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let graph = Arc::new(build_grid());
    log::info!("corridor grid: {} nodes, {} edges", graph.node_count(), graph.edge_count());

    let engine = ThreadedEngine::new(Arc::clone(&graph), AStar, SEARCH_WORKERS)?;
    let ground = GraphSurface::new(Arc::clone(&graph), CORRIDOR_HALF);
    let (starts, goals) = starts_and_goals();

    let config = CrowdConfig {
        frame_dt:          FRAME_DT,
        total_frames:      MAX_FRAMES,
        physics_substeps:  1,
        seed:              SEED,
        snapshot_interval: SNAPSHOT_FRAMES,
    };
    let controller = ControllerConfig { repath: RepathPolicy::every(3.0), ..ControllerConfig::default() };

    let mut crowd = CrowdBuilder::new(config, engine, ground, followers()?)
        .positions(starts)
        .destinations(goals)
        .controller_config(controller)
        .exact_endpoints()
        .build()?;

    // Smooth the corners for the steering agents.
    for c in crowd.controllers.iter().filter(|c| c.agent().index() % 2 == 0) {
        crowd.broker.add_modifier(c.agent(), Box::new(SimpleSmoothModifier::new(4.0, 2, 0.5)));
    }
    crowd.broker.subscribe(Box::new(|request: &PathRequest| {
        log::debug!("{} for {}: {}", request.id(), request.agent(), request.state());
    }));

    let mut progress = ProgressLog::default();
    let started = Instant::now();
    let everyone_arrived = crowd.run_until_arrived(MAX_FRAMES, &mut progress)?;
    let elapsed = started.elapsed();

    log::info!(
        "{} frames in {:.1?}: {} path(s) installed, {} failed, {} arrival event(s), {} delivery(ies)",
        crowd.clock.frame.0,
        elapsed,
        progress.installed,
        progress.failed,
        progress.arrivals,
        progress.deliveries,
    );
    if everyone_arrived {
        log::info!("all {} agents arrived by {}", crowd.agent_count(), crowd.clock);
    } else {
        let arrived = crowd.snapshot().iter().filter(|s| s.reached).count();
        log::warn!("{arrived} of {} agents arrived", crowd.agent_count());
    }
    for s in crowd.snapshot() {
        log::info!("{} at {:.2} ({:?})", s.agent, s.position, s.phase);
    }
    Ok(())
}
