//! Seeded random streams
//!
//! The world keeps one `ChaCha8Rng` for its single-threaded phases. Per-agent
//! phases derive an independent stream from (seed, tick, agent, phase) so the
//! outcome does not depend on whether agents are processed in parallel.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{AgentId, Tick};

/// Phases that draw per-agent randomness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Phase {
    Forget = 1,
    GoalGeneration = 2,
}

/// SplitMix64 finaliser
#[inline]
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Dedicated stream for one agent in one phase of one tick
pub fn agent_stream(seed: u64, tick: Tick, agent: AgentId, phase: Phase) -> ChaCha8Rng {
    let key = mix(seed ^ mix(tick ^ mix(agent.0 ^ mix(phase as u64))));
    let mut rng = ChaCha8Rng::seed_from_u64(key);
    rng.set_stream(phase as u64);
    rng
}

/// Standard normal draw (Box-Muller)
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    const TWO_PI: f32 = std::f32::consts::TAU;
    let u1 = rng.gen::<f32>().clamp(f32::MIN_POSITIVE, 1.0);
    let u2 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (TWO_PI * u2).cos()
}

/// Normal draw with mean 0 and the given standard deviation
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f32) -> f32 {
    if sigma <= 0.0 {
        return 0.0;
    }
    standard_normal(rng) * sigma
}
