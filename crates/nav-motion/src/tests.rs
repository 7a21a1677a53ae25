//! Unit tests for nav-motion.

#[cfg(test)]
mod helpers {
    use glam::Vec3;
    use nav_core::{AgentId, PathConstraints};
    use nav_request::{ManualEngine, PathRequestBroker};

    use crate::{
        ControllerConfig, GroundQuery, InterpolationConfig, InterpolationFollower, MotionController,
        RepathPolicy, SteeringConfig, SteeringFollower,
    };

    pub type Broker = PathRequestBroker<ManualEngine>;

    pub const A: AgentId = AgentId(0);
    pub const B: AgentId = AgentId(1);

    pub fn broker() -> Broker {
        PathRequestBroker::new(ManualEngine::new())
    }

    pub fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    pub fn approx_v(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-4
    }

    /// No automatic repaths.
    pub fn config() -> ControllerConfig {
        ControllerConfig { repath: RepathPolicy::never(), ..ControllerConfig::default() }
    }

    pub fn interpolation(speed: f32) -> InterpolationFollower {
        InterpolationFollower::new(InterpolationConfig { speed, ..InterpolationConfig::default() })
            .unwrap()
    }

    pub fn steering(config: SteeringConfig) -> SteeringFollower {
        SteeringFollower::new(config).unwrap()
    }

    pub fn interpolating(speed: f32) -> MotionController<InterpolationFollower> {
        MotionController::new(A, Vec3::ZERO, config(), interpolation(speed)).unwrap()
    }

    /// Infinite ground plane at `y = 0`.
    pub struct Floor;

    impl GroundQuery for Floor {
        fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Vec3> {
            if direction.y >= 0.0 || origin.y < 0.0 {
                return None;
            }
            let t = origin.y / -direction.y;
            (t <= max_distance).then(|| Vec3::new(origin.x, 0.0, origin.z))
        }

        fn nearest_on_surface(&self, point: Vec3, _constraints: &PathConstraints) -> Option<Vec3> {
            Some(Vec3::new(point.x, 0.0, point.z))
        }
    }

    /// Walkable strip `x <= 5`.
    pub struct Wall;

    impl GroundQuery for Wall {
        fn raycast(&self, _origin: Vec3, _direction: Vec3, _max_distance: f32) -> Option<Vec3> {
            None
        }

        fn nearest_on_surface(&self, point: Vec3, _constraints: &PathConstraints) -> Option<Vec3> {
            Some(Vec3::new(point.x.min(5.0), point.y, point.z))
        }
    }
}

#[cfg(test)]
mod config {
    use crate::{
        ControllerConfig, InterpolationConfig, InterpolationFollower, MotionController, MotionError,
        RepathPolicy, SteeringConfig, SteeringFollower,
    };
    use glam::Vec3;

    use super::helpers::{A, interpolation};

    #[test]
    fn defaults_validate() {
        assert!(ControllerConfig::default().validate().is_ok());
        assert!(SteeringConfig::default().validate().is_ok());
        assert!(InterpolationConfig::default().validate().is_ok());
        assert!(RepathPolicy::default().validate().is_ok());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = ControllerConfig { height: 0.0, ..ControllerConfig::default() };
        assert!(matches!(
            MotionController::new(A, Vec3::ZERO, bad, interpolation(1.0)),
            Err(MotionError::Config(_))
        ));

        let bad = SteeringConfig { max_speed: -1.0, ..SteeringConfig::default() };
        assert!(SteeringFollower::new(bad).is_err());

        let bad = InterpolationConfig { switch_path_interpolation_secs: -0.1, ..InterpolationConfig::default() };
        assert!(InterpolationFollower::new(bad).is_err());

        let bad = RepathPolicy { jitter: 1.0, ..RepathPolicy::default() };
        assert!(bad.validate().is_err());
    }
}

#[cfg(test)]
mod repath {
    use glam::Vec3;
    use nav_core::{AgentId, AgentRng};

    use crate::{RepathMode, RepathPolicy, RepathSchedule};

    fn dynamic() -> RepathPolicy {
        RepathPolicy { jitter: 0.0, ..RepathPolicy::default() }
    }

    #[test]
    fn never_is_never_due() {
        let policy = RepathPolicy::never();
        let schedule = RepathSchedule::new(&policy, &mut AgentRng::new(0, AgentId(0)));
        assert!(!schedule.is_due(&policy, 1e6, f64::NEG_INFINITY, Vec3::ZERO, Vec3::X));
    }

    #[test]
    fn every_n_seconds() {
        let policy = RepathPolicy::every(1.0);
        assert_eq!(policy.mode, RepathMode::EveryNSeconds);
        let schedule = RepathSchedule::new(&policy, &mut AgentRng::new(0, AgentId(0)));
        assert_eq!(schedule.current_period(&policy), 1.0);
        assert!(!schedule.is_due(&policy, 1.5, 0.75, Vec3::ZERO, Vec3::X));
        assert!(schedule.is_due(&policy, 1.75, 0.75, Vec3::ZERO, Vec3::X));
    }

    #[test]
    fn dynamic_reacts_to_destination_movement() {
        let policy = dynamic();
        let mut rng = AgentRng::new(0, AgentId(0));
        let mut schedule = RepathSchedule::new(&policy, &mut rng);
        let destination = Vec3::X * 10.0;

        // Never searched toward anything yet.
        assert!(schedule.is_due(&policy, 0.1, 0.0, Vec3::ZERO, destination));
        schedule.record(&policy, destination, &mut rng);

        // Static destination: only the maximum period triggers.
        assert!(!schedule.is_due(&policy, 0.5, 0.0, Vec3::ZERO, destination));
        assert!(schedule.is_due(&policy, 2.0, 0.0, Vec3::ZERO, destination));

        // Moved by 5 at distance 10 with sensitivity 10: 5 * 10 * t > 10 after t = 0.2.
        let moved = destination + Vec3::Z * 5.0;
        assert!(!schedule.is_due(&policy, 0.1, 0.0, Vec3::ZERO, moved));
        assert!(schedule.is_due(&policy, 0.3, 0.0, Vec3::ZERO, moved));
    }

    #[test]
    fn jitter_stays_in_range_and_is_seeded() {
        let policy = RepathPolicy { jitter: 0.5, ..RepathPolicy::default() };
        let a = RepathSchedule::new(&policy, &mut AgentRng::new(7, AgentId(3)));
        let b = RepathSchedule::new(&policy, &mut AgentRng::new(7, AgentId(3)));
        let period = a.current_period(&policy);
        assert_eq!(period, b.current_period(&policy));
        assert!((1.0..=3.0).contains(&period));
    }
}

#[cfg(test)]
mod steering {
    use glam::{Quat, Vec2, Vec3};
    use nav_core::{MovementPlane, PathConstraints};
    use nav_path::PathCursor;

    use super::helpers::{Wall, approx, approx_v, steering};
    use crate::{CloseToDestinationMode, Follower, FrameContext, SteeringConfig};

    fn frame<'a>(cursor: &'a mut PathCursor, position: Vec3, velocity: Vec3, dt: f32) -> FrameContext<'a> {
        FrameContext {
            dt,
            plane: MovementPlane::XZ,
            position,
            rotation: Quat::IDENTITY,
            velocity,
            cursor,
            end_reached_distance: 0.2,
            is_stopped: false,
        }
    }

    #[test]
    fn slowdown_near_the_end() {
        let mut follower = steering(SteeringConfig {
            max_speed:                   5.0,
            max_acceleration:            1e6,
            slowdown_distance:           2.0,
            slow_when_not_facing_target: false,
            ..SteeringConfig::default()
        });
        let mut cursor = PathCursor::bound(&[Vec3::ZERO, Vec3::X]);
        let out = follower.next_frame(frame(&mut cursor, Vec3::ZERO, Vec3::ZERO, 0.001));

        // One unit from the end with a slowdown radius of two.
        assert!(approx(follower.last_slowdown_factor(), 0.5f32.sqrt()));
        assert!(approx(out.velocity.length(), 5.0 * 0.5f32.sqrt()));
        assert!(out.velocity.x > 0.0);
        assert!(!out.reached_end);
        assert!(approx_v(follower.steering_target().unwrap(), Vec3::X));
    }

    #[test]
    fn acceleration_is_bounded() {
        let mut follower = steering(SteeringConfig {
            max_acceleration:            10.0,
            slow_when_not_facing_target: false,
            ..SteeringConfig::default()
        });
        let mut cursor = PathCursor::bound(&[Vec3::ZERO, Vec3::Z * 100.0]);
        let out = follower.next_frame(frame(&mut cursor, Vec3::ZERO, Vec3::ZERO, 0.1));
        assert!(approx(out.velocity.length(), 1.0));
        assert!(approx_v(out.position, Vec3::Z * 0.1));
    }

    #[test]
    fn never_overshoots_the_end() {
        let mut follower = steering(SteeringConfig {
            max_acceleration:            1e6,
            slowdown_distance:           0.0,
            slow_when_not_facing_target: false,
            close_to_destination:        CloseToDestinationMode::ContinueToExactEndOfPath,
            ..SteeringConfig::default()
        });
        let mut cursor = PathCursor::bound(&[Vec3::ZERO, Vec3::X]);
        let out = follower.next_frame(frame(&mut cursor, Vec3::ZERO, Vec3::ZERO, 1.0));
        assert!(approx_v(out.position, Vec3::X));
    }

    #[test]
    fn stopped_agent_decelerates() {
        let mut follower = steering(SteeringConfig { max_acceleration: 10.0, ..SteeringConfig::default() });
        let mut cursor = PathCursor::bound(&[Vec3::ZERO, Vec3::Z * 100.0]);
        let mut ctx = frame(&mut cursor, Vec3::ZERO, Vec3::Z * 4.0, 0.1);
        ctx.is_stopped = true;
        let out = follower.next_frame(ctx);
        assert!(approx(out.velocity.length(), 3.0));
    }

    #[test]
    fn no_path_brakes() {
        let mut follower = steering(SteeringConfig { max_acceleration: 10.0, ..SteeringConfig::default() });
        let mut cursor = PathCursor::new();
        let out = follower.next_frame(frame(&mut cursor, Vec3::ZERO, Vec3::Z * 0.5, 0.1));
        assert_eq!(out.velocity, Vec3::ZERO);
        assert_eq!(follower.steering_target(), None);
    }

    #[test]
    fn facing_bias_limits_speed_and_direction() {
        let follower = steering(SteeringConfig::default());
        // Facing +y in plane coordinates, asked to move along +x.
        let v = follower.clamp_velocity(Vec2::X * 5.0, 1.0, Vec2::Y);
        assert!(approx(v.length(), 5.0 * 0.707));
        assert!(v.x > 0.0);
        let angle = v.normalize().dot(Vec2::Y).acos().to_degrees();
        assert!((angle - 20.0).abs() < 1e-2);

        // Facing the velocity: untouched up to max_speed.
        let v = follower.clamp_velocity(Vec2::Y * 3.0, 1.0, Vec2::Y);
        assert!(approx(v.length(), 3.0));
    }

    #[test]
    fn surface_clamp_removes_velocity_into_the_wall() {
        let mut follower = steering(SteeringConfig { constrain_to_surface: true, ..SteeringConfig::default() });
        let mut velocity = Vec3::new(2.0, 0.0, 1.0);
        let position = follower.clamp_to_surface(
            &Wall,
            &PathConstraints::default(),
            MovementPlane::XZ,
            Vec3::new(6.0, 0.0, 0.0),
            &mut velocity,
        );
        assert!(approx_v(position, Vec3::new(5.0, 0.0, 0.0)));
        assert!(approx_v(velocity, Vec3::Z));
    }

    #[test]
    fn surface_clamp_is_off_by_default() {
        let mut follower = steering(SteeringConfig::default());
        let mut velocity = Vec3::X;
        let p = Vec3::new(6.0, 0.0, 0.0);
        let out = follower.clamp_to_surface(&Wall, &PathConstraints::default(), MovementPlane::XZ, p, &mut velocity);
        assert_eq!(out, p);
        assert_eq!(velocity, Vec3::X);
    }
}

#[cfg(test)]
mod interpolation {
    use glam::{Quat, Vec3};
    use nav_core::MovementPlane;
    use nav_path::PathCursor;

    use super::helpers::{approx, approx_v, interpolation};
    use crate::{Follower, FrameContext};

    #[test]
    fn moves_at_constant_speed_along_the_path() {
        let mut follower = interpolation(2.0);
        let mut cursor = PathCursor::bound(&[Vec3::ZERO, Vec3::X * 10.0]);
        let out = follower.next_frame(FrameContext {
            dt:                   1.0,
            plane:                MovementPlane::XZ,
            position:             Vec3::ZERO,
            rotation:             Quat::IDENTITY,
            velocity:             Vec3::ZERO,
            cursor:               &mut cursor,
            end_reached_distance: 0.2,
            is_stopped:           false,
        });
        assert!(approx_v(out.position, Vec3::X * 2.0));
        assert!(approx_v(out.velocity, Vec3::X * 2.0));
        assert!(approx(cursor.distance(), 2.0));
        assert!(!out.reached_end);
        assert!(!follower.uses_gravity());
    }

    #[test]
    fn stops_exactly_at_the_end() {
        let mut follower = interpolation(5.0);
        let mut cursor = PathCursor::bound(&[Vec3::ZERO, Vec3::X * 3.0]);
        let out = follower.next_frame(FrameContext {
            dt:                   1.0,
            plane:                MovementPlane::XZ,
            position:             Vec3::ZERO,
            rotation:             Quat::IDENTITY,
            velocity:             Vec3::ZERO,
            cursor:               &mut cursor,
            end_reached_distance: 0.2,
            is_stopped:           false,
        });
        assert!(approx_v(out.position, Vec3::X * 3.0));
        assert!(out.reached_end);
    }
}

#[cfg(test)]
mod controller {
    use glam::Vec3;
    use nav_core::PathConstraints;
    use nav_request::{ClaimOwner, RequestState};

    use super::helpers::{A, B, approx, approx_v, broker, config, interpolating, interpolation};
    use crate::{
        ControllerPhase, MotionController, MotionEnv, MotionError, MotionEvent, NoGround,
    };

    #[test]
    fn search_deliver_and_follow() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);

        assert_eq!(c.phase(), ControllerPhase::Idle);
        assert_eq!(c.remaining_distance(), f32::INFINITY);

        c.set_destination(Vec3::X * 10.0);
        let h = c.search_path(&mut broker).unwrap();
        assert_eq!(c.phase(), ControllerPhase::AwaitingPath);
        assert!(c.path_pending());

        broker.engine_mut().complete_straight();
        let deliveries = broker.poll();
        assert_eq!(c.handle_deliveries(&mut broker, &deliveries), 1);
        assert_eq!(c.phase(), ControllerPhase::Following);
        assert_eq!(c.current_request(), Some(h));
        assert!(broker.request(h).unwrap().is_claimed_by(ClaimOwner::Agent(A)));

        c.movement_frame(&mut env, 1.0);
        assert!(approx_v(c.position(), Vec3::X * 2.0));
        assert!((c.remaining_distance() - 8.0).abs() < 1e-4);

        let events: Vec<_> = c.drain_events().collect();
        assert!(matches!(events[..], [MotionEvent::PathInstalled { agent: A, waypoints: 2, .. }]));
    }

    #[test]
    fn deliveries_are_routed_by_agent() {
        let mut broker = broker();
        let mut a = interpolating(2.0);
        let mut b = MotionController::new(B, Vec3::Z, config(), interpolation(2.0)).unwrap();

        a.set_destination(Vec3::X * 10.0);
        b.set_destination(Vec3::new(10.0, 0.0, 1.0));
        let ha = a.search_path(&mut broker).unwrap();
        let hb = b.search_path(&mut broker).unwrap();

        broker.engine_mut().complete_straight();
        let deliveries = broker.poll();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(a.handle_deliveries(&mut broker, &deliveries), 1);
        assert_eq!(b.handle_deliveries(&mut broker, &deliveries), 1);
        assert_eq!(a.current_request(), Some(ha));
        assert_eq!(b.current_request(), Some(hb));
        assert!(approx_v(b.cursor().end_point(), Vec3::new(10.0, 0.0, 1.0)));
    }

    #[test]
    fn search_without_destination_fails() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        assert!(matches!(c.search_path(&mut broker), Err(MotionError::NoDestination)));
        assert_eq!(broker.live_requests(), 0);
    }

    #[test]
    fn set_path_rejects_processing_request() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let h = broker.submit(A, Vec3::ZERO, Vec3::X, PathConstraints::default());

        assert!(matches!(c.set_path(&mut broker, h), Err(MotionError::PathStillProcessing(_))));
        assert_eq!(c.phase(), ControllerPhase::Idle);
        assert_eq!(c.pending_request(), None);
        assert_eq!(broker.state(h), Some(RequestState::Processing));
    }

    #[test]
    fn set_path_with_created_request_starts_it() {
        let mut broker = broker();
        let mut c = interpolating(2.0);

        let other = broker.create(B, Vec3::ZERO, Vec3::X, PathConstraints::default());
        assert!(matches!(c.set_path(&mut broker, other), Err(MotionError::WrongAgent { .. })));

        let h = broker.create(A, Vec3::ZERO, Vec3::X * 4.0, PathConstraints::default());
        c.set_path(&mut broker, h).unwrap();
        assert_eq!(broker.state(h), Some(RequestState::Processing));
        assert_eq!(c.pending_request(), Some(h));

        broker.engine_mut().complete_straight();
        let deliveries = broker.poll();
        c.handle_deliveries(&mut broker, &deliveries);
        assert!(c.has_path());
        assert!(approx_v(c.cursor().end_point(), Vec3::X * 4.0));
    }

    #[test]
    fn set_path_with_returned_request_installs_and_cancels_pending() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        c.set_destination(Vec3::Z * 10.0);
        let pending = c.search_path(&mut broker).unwrap();
        let pending_id = broker.request(pending).unwrap().id();

        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 5.0]);
        c.set_path(&mut broker, h).unwrap();

        assert!(broker.engine().was_cancelled(pending_id));
        assert!(broker.request(pending).is_none());
        assert_eq!(c.current_request(), Some(h));
        assert!(!c.path_pending());
        assert_eq!(c.phase(), ControllerPhase::Following);

        let failed = broker.fabricate(A, &[]);
        assert!(matches!(
            c.set_path(&mut broker, failed),
            Err(MotionError::InvalidRequestState { state: Some(RequestState::Error), .. })
        ));
        assert_eq!(c.current_request(), Some(h));
    }

    #[test]
    fn replacing_a_path_releases_the_old_one() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let first = broker.fabricate(A, &[Vec3::ZERO, Vec3::X]);
        c.set_path(&mut broker, first).unwrap();
        let second = broker.fabricate(A, &[Vec3::ZERO, Vec3::Z]);
        c.set_path(&mut broker, second).unwrap();

        assert!(broker.request(first).is_none());
        assert_eq!(broker.live_requests(), 1);

        c.clear_path(&mut broker);
        assert_eq!(broker.live_requests(), 0);
        assert_eq!(c.phase(), ControllerPhase::Idle);
    }

    #[test]
    fn stale_delivery_is_rejected_and_discarded() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let stray = broker.fabricate(A, &[Vec3::ZERO, Vec3::X]);

        assert!(matches!(c.on_path_complete(&mut broker, stray), Err(MotionError::StaleDelivery(_))));
        assert!(!c.has_path());

        let id = broker.request(stray).unwrap().id();
        let deliveries = [nav_request::Delivery { agent: A, id, handle: stray }];
        assert_eq!(c.handle_deliveries(&mut broker, &deliveries), 0);
        assert!(broker.request(stray).is_none());
    }

    #[test]
    fn newer_search_supersedes_pending_one() {
        let mut broker = broker();
        let mut c = interpolating(2.0);

        c.set_destination(Vec3::X * 10.0);
        let first = c.search_path(&mut broker).unwrap();
        let first_id = broker.request(first).unwrap().id();
        c.set_destination(Vec3::Z * 10.0);
        let second = c.search_path(&mut broker).unwrap();
        let second_id = broker.request(second).unwrap().id();
        assert_eq!(c.pending_request(), Some(second));
        assert!(broker.engine().was_cancelled(first_id));

        // The engine answers both anyway; only the newer one is delivered.
        broker.engine_mut().complete(first_id, vec![Vec3::ZERO, Vec3::X * 10.0]);
        broker.engine_mut().complete(second_id, vec![Vec3::ZERO, Vec3::Z * 10.0]);
        let deliveries = broker.poll();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].id, second_id);

        assert_eq!(c.handle_deliveries(&mut broker, &deliveries), 1);
        assert_eq!(c.current_request(), Some(second));
        assert!(approx_v(c.cursor().end_point(), Vec3::Z * 10.0));
        let installs = c.drain_events().filter(|e| matches!(e, MotionEvent::PathInstalled { .. })).count();
        assert_eq!(installs, 1);
    }

    #[test]
    fn failed_search_keeps_the_old_path() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let good = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, good).unwrap();
        c.drain_events().for_each(drop);

        c.set_destination(Vec3::Z * 10.0);
        let h = c.search_path(&mut broker).unwrap();
        let id = broker.request(h).unwrap().id();
        broker.engine_mut().fail(id, "no route");
        let deliveries = broker.poll();
        assert_eq!(c.handle_deliveries(&mut broker, &deliveries), 1);

        assert_eq!(c.current_request(), Some(good));
        assert!(c.has_path());
        assert!(!c.path_pending());
        assert!(broker.request(h).is_none());
        let events: Vec<_> = c.drain_events().collect();
        assert_eq!(
            events,
            vec![MotionEvent::PathFailed { agent: A, request: id, diagnostic: "no route".into() }]
        );
    }

    #[test]
    fn target_reached_fires_once_per_path() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 3.0]);
        c.set_path(&mut broker, h).unwrap();

        for _ in 0..5 {
            c.movement_frame(&mut env, 1.0);
        }
        assert!(c.reached_end_of_path());
        let reached = c.drain_events().filter(|e| matches!(e, MotionEvent::TargetReached { .. })).count();
        assert_eq!(reached, 1);

        let again = broker.fabricate(A, &[Vec3::X * 3.0, Vec3::X * 5.0]);
        c.set_path(&mut broker, again).unwrap();
        assert!(!c.reached_end_of_path());
        for _ in 0..3 {
            c.movement_frame(&mut env, 1.0);
        }
        let reached = c.drain_events().filter(|e| matches!(e, MotionEvent::TargetReached { .. })).count();
        assert_eq!(reached, 1);
    }

    #[test]
    fn reached_destination_requires_matching_end() {
        let mut broker = broker();
        let mut c = interpolating(10.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        c.set_destination(Vec3::X * 8.0);
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 4.0]);
        c.set_path(&mut broker, h).unwrap();
        c.movement_frame(&mut env, 1.0);
        assert!(c.reached_end_of_path());
        assert!(!c.reached_destination());
    }

    #[test]
    fn path_switch_moves_at_most_speed_per_frame() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let dt = 0.1;
        let bound = 2.0 * dt * (1.0 + 1e-3);

        let first = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, first).unwrap();
        c.movement_frame(&mut env, dt);
        assert!(approx_v(c.position(), Vec3::X * 0.2));

        // One unit to the side of the agent.
        let second = broker.fabricate(A, &[Vec3::Z, Vec3::new(10.0, 0.0, 1.0)]);
        c.set_path(&mut broker, second).unwrap();
        assert!(c.follower().is_switching_path());

        let mut frames = 0;
        while c.follower().is_switching_path() {
            let before = c.position();
            c.movement_frame(&mut env, dt);
            let step = c.position().distance(before);
            assert!(step <= bound, "frame {frames} moved {step}");
            assert!(c.position().z > before.z);
            frames += 1;
            assert!(frames < 50, "blend never finished");
        }
        assert!(frames > 2);

        // Back on the new path and following it at full speed.
        let before = c.position();
        c.movement_frame(&mut env, dt);
        assert!(approx(c.position().z, 1.0));
        assert!(c.position().distance(before) <= bound);
        assert!(approx(c.position().x - before.x, 0.2));
    }

    #[test]
    fn small_path_switch_finishes_within_the_blend_time() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);

        let first = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, first).unwrap();
        c.movement_frame(&mut env, 0.1);

        let second = broker.fabricate(A, &[Vec3::new(0.0, 0.0, 0.01), Vec3::new(10.0, 0.0, 0.01)]);
        c.set_path(&mut broker, second).unwrap();
        c.movement_frame(&mut env, 0.1);
        assert!(c.follower().is_switching_path());
        c.movement_frame(&mut env, 0.1);
        assert!(!c.follower().is_switching_path());
        assert!(approx(c.position().z, 0.01));
    }

    #[test]
    fn first_path_does_not_blend() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X]);
        c.set_path(&mut broker, h).unwrap();
        assert!(!c.follower().is_switching_path());
    }

    #[test]
    fn stopped_interpolation_agent_holds_still() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, h).unwrap();
        c.set_stopped(true);
        c.movement_frame(&mut env, 1.0);
        assert_eq!(c.position(), Vec3::ZERO);
        assert_eq!(c.velocity(), Vec3::ZERO);
    }

    #[test]
    fn move_by_is_applied_once() {
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        c.move_by(Vec3::Z);
        c.move_by(Vec3::Z);
        c.movement_frame(&mut env, 0.1);
        assert!(approx_v(c.position(), Vec3::Z * 2.0));
        c.movement_frame(&mut env, 0.1);
        assert!(approx_v(c.position(), Vec3::Z * 2.0));
    }

    #[test]
    fn can_move_false_skips_the_follower() {
        let mut broker = broker();
        let cfg = crate::ControllerConfig { can_move: false, ..config() };
        let mut c = MotionController::new(A, Vec3::ZERO, cfg, interpolation(2.0)).unwrap();
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, h).unwrap();
        c.movement_frame(&mut env, 1.0);
        assert_eq!(c.position(), Vec3::ZERO);
    }
}

#[cfg(test)]
mod teleport {
    use glam::Vec3;

    use super::helpers::{A, approx_v, broker, interpolating};
    use crate::{ControllerPhase, MotionEnv, NoGround, Transform};

    #[test]
    fn teleport_with_clear_is_idempotent() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut transform = Transform::at(Vec3::ZERO);

        c.set_destination(Vec3::X * 10.0);
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, h).unwrap();
        c.search_path(&mut broker).unwrap();

        let target = Vec3::new(3.0, 0.0, 3.0);
        {
            let mut env = MotionEnv::with_transform(&ground, &mut transform);
            c.teleport(&mut broker, &mut env, target, true);
        }
        let once = c.state().clone();
        let live = broker.live_requests();
        {
            let mut env = MotionEnv::with_transform(&ground, &mut transform);
            c.teleport(&mut broker, &mut env, target, true);
        }

        assert_eq!(c.state(), &once);
        assert_eq!(broker.live_requests(), live);
        assert_eq!(live, 0);
        assert_eq!(c.phase(), ControllerPhase::Idle);
        assert_eq!(c.velocity(), Vec3::ZERO);
        assert!(approx_v(transform.position, target));
    }

    #[test]
    fn teleport_with_clear_forces_a_repath() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        c.set_destination(Vec3::X * 10.0);

        // Repath policy is Never, so only the teleport can trigger this.
        assert!(c.update_repath(&mut broker).is_none());
        c.teleport(&mut broker, &mut env, Vec3::Z, true);
        let h = c.update_repath(&mut broker).unwrap();
        assert_eq!(broker.request(h).unwrap().start, Vec3::Z);
        assert!(c.update_repath(&mut broker).is_none());
    }

    #[test]
    fn teleport_without_clear_keeps_the_path() {
        let mut broker = broker();
        let mut c = interpolating(2.0);
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, h).unwrap();

        c.teleport(&mut broker, &mut env, Vec3::new(6.0, 0.0, 1.0), false);
        assert!(c.has_path());
        assert_eq!(c.current_request(), Some(h));
        assert!(approx_v(c.cursor().current_point(), Vec3::X * 6.0));
    }
}

#[cfg(test)]
mod physics {
    use glam::Vec3;

    use super::helpers::{A, Floor, approx_v, broker, config, interpolation, steering};
    use crate::{
        ControllerConfig, MotionController, MotionEnv, MotionEvent, MovementCadence, NoGround,
        SteeringConfig, Transform,
    };

    #[test]
    fn steering_agent_falls_and_lands() {
        let ground = Floor;
        let mut env = MotionEnv::new(&ground);
        let mut c =
            MotionController::new(A, Vec3::Y * 5.0, config(), steering(SteeringConfig::default())).unwrap();

        c.movement_frame(&mut env, 0.02);
        assert!(c.position().y < 5.0);
        for _ in 0..300 {
            c.movement_frame(&mut env, 0.02);
        }
        assert!(c.position().y.abs() < 1e-5);
        assert!(c.state().vertical_velocity.abs() < 2.0);
    }

    #[test]
    fn ground_contact_keeps_agent_on_the_floor() {
        let ground = Floor;
        let mut env = MotionEnv::new(&ground);
        let mut c =
            MotionController::new(A, Vec3::ZERO, config(), steering(SteeringConfig::default())).unwrap();
        for _ in 0..100 {
            c.movement_frame(&mut env, 0.02);
            assert!(c.position().y.abs() < 1e-5);
        }
    }

    #[test]
    fn interpolation_ignores_gravity() {
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let mut c = MotionController::new(A, Vec3::Y * 5.0, config(), interpolation(1.0)).unwrap();
        c.movement_frame(&mut env, 0.5);
        assert_eq!(c.position(), Vec3::Y * 5.0);
    }

    #[test]
    fn steering_agent_follows_a_path_to_the_end() {
        let mut broker = broker();
        let ground = Floor;
        let mut env = MotionEnv::new(&ground);
        let mut c =
            MotionController::new(A, Vec3::ZERO, config(), steering(SteeringConfig::default())).unwrap();
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::Z * 5.0, Vec3::new(5.0, 0.0, 5.0)]);
        c.set_path(&mut broker, h).unwrap();

        for _ in 0..600 {
            c.tick(1.0 / 60.0, &mut broker, &mut env);
        }
        assert!(c.reached_end_of_path());
        assert!(c.position().distance(Vec3::new(5.0, 0.0, 5.0)) < 0.3);
        assert!(c.velocity().length() < 0.1);
    }

    #[test]
    fn zero_length_frame_keeps_the_reached_flag() {
        let mut broker = broker();
        let ground = Floor;
        let mut env = MotionEnv::new(&ground);
        let mut c =
            MotionController::new(A, Vec3::ZERO, config(), steering(SteeringConfig::default())).unwrap();
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::Z * 3.0]);
        c.set_path(&mut broker, h).unwrap();

        for _ in 0..600 {
            c.tick(1.0 / 60.0, &mut broker, &mut env);
        }
        assert!(c.reached_end_of_path());
        let position = c.position();

        c.tick(0.0, &mut broker, &mut env);
        assert!(c.reached_end_of_path());
        assert_eq!(c.position(), position);

        c.tick(1.0 / 60.0, &mut broker, &mut env);
        assert!(c.reached_end_of_path());
        let reached = c.drain_events().filter(|e| matches!(e, MotionEvent::TargetReached { .. })).count();
        assert_eq!(reached, 1);
    }

    #[test]
    fn zero_length_frame_keeps_reached_for_interpolation() {
        let mut broker = broker();
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let mut c = MotionController::new(A, Vec3::ZERO, config(), interpolation(4.0)).unwrap();
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 2.0]);
        c.set_path(&mut broker, h).unwrap();
        c.tick(1.0, &mut broker, &mut env);
        assert!(c.reached_end_of_path());
        c.tick(0.0, &mut broker, &mut env);
        assert!(c.reached_end_of_path());
    }

    #[test]
    fn transform_channels_follow_ownership_flags() {
        let mut broker = broker();
        let ground = NoGround;
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);

        let mut owned = Transform::at(Vec3::ZERO);
        let mut c = MotionController::new(A, Vec3::ZERO, config(), interpolation(2.0)).unwrap();
        c.set_path(&mut broker, h).unwrap();
        c.movement_frame(&mut MotionEnv::with_transform(&ground, &mut owned), 1.0);
        assert!(approx_v(owned.position, Vec3::X * 2.0));
        assert_ne!(owned.rotation, glam::Quat::IDENTITY);

        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        let mut foreign = Transform::at(Vec3::Y * 100.0);
        let cfg = ControllerConfig { update_position: false, update_rotation: false, ..config() };
        let mut c = MotionController::new(A, Vec3::ZERO, cfg, interpolation(2.0)).unwrap();
        c.set_path(&mut broker, h).unwrap();
        c.movement_frame(&mut MotionEnv::with_transform(&ground, &mut foreign), 1.0);
        assert_eq!(foreign, Transform::at(Vec3::Y * 100.0));
        assert!(approx_v(c.position(), Vec3::X * 2.0));
    }

    #[test]
    fn physics_cadence_moves_only_in_physics_tick() {
        let mut broker = broker();
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let cfg = ControllerConfig { cadence: MovementCadence::Physics, ..config() };
        let mut c = MotionController::new(A, Vec3::ZERO, cfg, interpolation(2.0)).unwrap();
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, h).unwrap();

        c.tick_logic(1.0, &mut broker, &mut env);
        assert_eq!(c.position(), Vec3::ZERO);
        c.tick_physics(1.0, &mut env);
        assert!(approx_v(c.position(), Vec3::X * 2.0));
    }
}

#[cfg(test)]
mod scheduling {
    use glam::Vec3;

    use super::helpers::{A, broker, config, interpolation};
    use crate::{ControllerConfig, MotionController, MotionEnv, NoGround, RepathPolicy};

    #[test]
    fn every_n_seconds_through_ticks() {
        let mut broker = broker();
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let cfg = ControllerConfig { repath: RepathPolicy::every(1.0), ..config() };
        let mut c = MotionController::new(A, Vec3::ZERO, cfg, interpolation(1.0)).unwrap();
        c.set_destination(Vec3::X * 20.0);

        c.tick_logic(0.25, &mut broker, &mut env);
        assert!(c.path_pending());
        broker.engine_mut().complete_straight();
        let deliveries = broker.poll();
        c.handle_deliveries(&mut broker, &deliveries);

        for _ in 0..3 {
            c.tick_logic(0.25, &mut broker, &mut env);
            assert!(!c.path_pending());
        }
        c.tick_logic(0.25, &mut broker, &mut env);
        assert!(c.path_pending());
    }

    #[test]
    fn no_repath_while_awaiting() {
        let mut broker = broker();
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let cfg = ControllerConfig { repath: RepathPolicy::every(0.1), ..config() };
        let mut c = MotionController::new(A, Vec3::ZERO, cfg, interpolation(1.0)).unwrap();
        c.set_destination(Vec3::X * 20.0);

        for _ in 0..10 {
            c.tick_logic(0.25, &mut broker, &mut env);
        }
        assert_eq!(broker.engine().pending().len(), 1);
    }

    #[test]
    fn can_search_false_disables_automatic_repaths() {
        let mut broker = broker();
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let cfg = ControllerConfig { can_search: false, repath: RepathPolicy::every(0.1), ..config() };
        let mut c = MotionController::new(A, Vec3::ZERO, cfg, interpolation(1.0)).unwrap();
        c.set_destination(Vec3::X * 20.0);
        c.tick_logic(1.0, &mut broker, &mut env);
        assert!(!c.path_pending());
        assert!(c.search_path(&mut broker).is_ok());
    }

    #[test]
    fn follower_kind_dispatches() {
        let mut broker = broker();
        let ground = NoGround;
        let mut env = MotionEnv::new(&ground);
        let follower = crate::FollowerKind::from(interpolation(2.0));
        let mut c = MotionController::new(A, Vec3::ZERO, config(), follower).unwrap();
        let h = broker.fabricate(A, &[Vec3::ZERO, Vec3::X * 10.0]);
        c.set_path(&mut broker, h).unwrap();
        c.movement_frame(&mut env, 1.0);
        assert!((c.position().x - 2.0).abs() < 1e-4);
    }
}
