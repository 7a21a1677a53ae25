//! When a controller searches for a new path on its own.
//!
//! # Modes
//!
//! | Mode            | Due when                                                      |
//! |-----------------|---------------------------------------------------------------|
//! | `Never`         | only on explicit `search_path`                                |
//! | `EveryNSeconds` | `now - last_repath >= period`                                 |
//! | `Dynamic`       | `elapsed >= maximum_period`, or the destination has moved     |
//! |                 | enough that `moved * sensitivity * elapsed > distance`        |
//!
//! `Dynamic` repaths quickly when a nearby destination moves and rarely when
//! the destination is far away or static.  Periods are jittered per agent so
//! a crowd spawned on the same frame does not repath in lock-step.

use glam::Vec3;

use nav_core::AgentRng;

use crate::{MotionError, MotionResult};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepathMode {
    Never,
    EveryNSeconds,
    #[default]
    Dynamic,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RepathPolicy {
    pub mode:           RepathMode,
    /// Seconds between repaths in `EveryNSeconds` mode.
    pub period:         f32,
    /// `Dynamic` only: how strongly destination movement triggers a repath.
    pub sensitivity:    f32,
    /// `Dynamic` only: longest time between repaths.
    pub maximum_period: f32,
    /// Fraction in `[0, 1)` by which each period is randomised.
    pub jitter:         f32,
}

impl Default for RepathPolicy {
    fn default() -> Self {
        Self {
            mode:           RepathMode::Dynamic,
            period:         0.5,
            sensitivity:    10.0,
            maximum_period: 2.0,
            jitter:         0.1,
        }
    }
}

impl RepathPolicy {
    pub fn never() -> Self {
        Self { mode: RepathMode::Never, ..Self::default() }
    }

    pub fn every(period: f32) -> Self {
        Self { mode: RepathMode::EveryNSeconds, period, jitter: 0.0, ..Self::default() }
    }

    pub fn validate(&self) -> MotionResult<()> {
        if !(self.period > 0.0 && self.maximum_period > 0.0) {
            return Err(MotionError::Config("repath periods must be > 0".into()));
        }
        if self.sensitivity < 0.0 {
            return Err(MotionError::Config("repath sensitivity must be >= 0".into()));
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(MotionError::Config("repath jitter must be in [0, 1)".into()));
        }
        Ok(())
    }
}

/// Per-agent repath bookkeeping for a [`RepathPolicy`].
#[derive(Clone, Debug)]
pub struct RepathSchedule {
    last_destination: Option<Vec3>,
    period:           f32,
    maximum_period:   f32,
}

impl RepathSchedule {
    pub fn new(policy: &RepathPolicy, rng: &mut AgentRng) -> Self {
        let mut schedule = Self {
            last_destination: None,
            period:           policy.period,
            maximum_period:   policy.maximum_period,
        };
        schedule.reroll(policy, rng);
        schedule
    }

    fn reroll(&mut self, policy: &RepathPolicy, rng: &mut AgentRng) {
        self.period = rng.jitter(policy.period, policy.jitter);
        self.maximum_period = rng.jitter(policy.maximum_period, policy.jitter);
    }

    /// Current (jittered) period of the active mode.
    pub fn current_period(&self, policy: &RepathPolicy) -> f32 {
        match policy.mode {
            RepathMode::Dynamic => self.maximum_period,
            _ => self.period,
        }
    }

    /// `true` if a repath is due at `now` given the last repath time.
    pub fn is_due(
        &self,
        policy:      &RepathPolicy,
        now:         f64,
        last_repath: f64,
        position:    Vec3,
        destination: Vec3,
    ) -> bool {
        let elapsed = now - last_repath;
        match policy.mode {
            RepathMode::Never => false,
            RepathMode::EveryNSeconds => elapsed >= self.period as f64,
            RepathMode::Dynamic => {
                if elapsed >= self.maximum_period as f64 {
                    return true;
                }
                let Some(previous) = self.last_destination else {
                    return true;
                };
                let moved = previous.distance(destination) as f64;
                let distance = position.distance(destination) as f64;
                moved * policy.sensitivity as f64 * elapsed > distance
            }
        }
    }

    /// Note a repath toward `destination` and draw the next periods.
    pub fn record(&mut self, policy: &RepathPolicy, destination: Vec3, rng: &mut AgentRng) {
        self.last_destination = Some(destination);
        self.reroll(policy, rng);
    }
}
