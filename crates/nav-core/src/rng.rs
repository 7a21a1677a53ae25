//! Per-agent random source for repath jitter.
//!
//! Every controller owns an `AgentRng` derived from the crowd seed and its
//! `AgentId`, so jitter depends only on `(seed, agent)` and never on the
//! order or thread in which controllers tick.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::AgentId;

/// Odd multiplier that spreads consecutive agent ids over the seed space.
const AGENT_SEED_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Clone, Debug)]
pub struct AgentRng(SmallRng);

impl AgentRng {
    pub fn new(seed: u64, agent: AgentId) -> Self {
        let mixed = seed ^ u64::from(agent.0).wrapping_mul(AGENT_SEED_STRIDE);
        AgentRng(SmallRng::seed_from_u64(mixed))
    }

    /// `base` scaled by a uniform factor in `[1 - fraction, 1 + fraction]`.
    ///
    /// `fraction` is clamped to `[0, 1)`; a fraction of 0 returns `base`
    /// without consuming randomness.
    pub fn jitter(&mut self, base: f32, fraction: f32) -> f32 {
        let fraction = fraction.clamp(0.0, 0.999);
        if fraction == 0.0 {
            return base;
        }
        base * self.0.gen_range(1.0 - fraction..=1.0 + fraction)
    }
}
