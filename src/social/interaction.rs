//! Interaction resolution between nearby agents

use rand::Rng;
use tracing::trace;

use crate::core::config::SimulationConfig;
use crate::core::rng::gaussian;
use crate::core::types::{AgentId, GridPos, Tick};
use crate::entity::memory::{Memory, MemoryCategory};
use crate::genetics::Personality;
use crate::memory::MemoryStore;
use crate::social::graph::SocialGraph;

/// Social need level separating lonely from sated agents
const SOCIAL_MIDPOINT: f32 = 50.0;
const ALIGNMENT_BONUS: f32 = 0.5;

/// What interaction resolution needs to know about one side
#[derive(Debug, Clone, Copy)]
pub struct Party<'a> {
    pub id: AgentId,
    pub name: &'a str,
    pub position: GridPos,
    pub personality: &'a Personality,
    pub social: f32,
    pub morale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeBand {
    VeryPositive,
    Pleasant,
    Awkward,
    Negative,
}

impl OutcomeBand {
    pub fn classify(outcome: f32) -> Self {
        if outcome > 0.5 {
            OutcomeBand::VeryPositive
        } else if outcome > 0.0 {
            OutcomeBand::Pleasant
        } else if outcome > -0.5 {
            OutcomeBand::Awkward
        } else {
            OutcomeBand::Negative
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            OutcomeBand::VeryPositive => "very positive",
            OutcomeBand::Pleasant => "pleasant",
            OutcomeBand::Awkward => "awkward",
            OutcomeBand::Negative => "negative",
        }
    }

    /// First-person memory line about meeting `other`
    pub fn recollection(&self, other: &str) -> String {
        match self {
            OutcomeBand::VeryPositive => format!("Had a very positive interaction with {}", other),
            OutcomeBand::Pleasant => format!("Had a pleasant conversation with {}", other),
            OutcomeBand::Awkward => format!("Had an awkward interaction with {}", other),
            OutcomeBand::Negative => format!("Had a negative encounter with {}", other),
        }
    }
}

/// `1 - mean |a - b|` over the five personality dimensions
pub fn compatibility(a: &Personality, b: &Personality) -> f32 {
    let (a, b) = (a.as_array(), b.as_array());
    let diff: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
    1.0 - diff / a.len() as f32
}

/// Bonus when exactly one of the two is lonely
pub fn need_alignment(social_a: f32, social_b: f32) -> f32 {
    let lonely_a = social_a < SOCIAL_MIDPOINT;
    let lonely_b = social_b < SOCIAL_MIDPOINT;
    let sated_a = social_a > SOCIAL_MIDPOINT;
    let sated_b = social_b > SOCIAL_MIDPOINT;
    if (lonely_a && sated_b) || (lonely_b && sated_a) {
        ALIGNMENT_BONUS
    } else {
        0.0
    }
}

pub fn interaction_chance(a: &Party, b: &Party) -> f32 {
    (compatibility(a.personality, b.personality) + need_alignment(a.social, b.social)) / 2.0
}

/// `(compatibility + mood + noise) / 3` where mood is the summed morale over 200
pub fn outcome<R: Rng + ?Sized>(compatibility: f32, morale_a: f32, morale_b: f32, noise: f32, rng: &mut R) -> f32 {
    let mood = (morale_a + morale_b) / 200.0;
    (compatibility + mood + gaussian(rng, noise)) / 3.0
}

/// Draw whether `a` and `b` interact this tick and resolve it if so
///
/// Returns the outcome when an interaction took place.
pub fn resolve_pair<R: Rng + ?Sized>(
    graph: &mut SocialGraph,
    memories: &mut MemoryStore,
    a: &Party,
    b: &Party,
    tick: Tick,
    config: &SimulationConfig,
    rng: &mut R,
) -> Option<f32> {
    if a.id == b.id {
        return None;
    }
    if rng.gen::<f32>() >= interaction_chance(a, b) {
        return None;
    }
    Some(interact(graph, memories, a, b, tick, config, rng))
}

/// Resolve one interaction unconditionally
///
/// Updates the edge and leaves one social memory on each side. Need changes
/// belong to the caller, which owns agent state.
pub fn interact<R: Rng + ?Sized>(
    graph: &mut SocialGraph,
    memories: &mut MemoryStore,
    a: &Party,
    b: &Party,
    tick: Tick,
    config: &SimulationConfig,
    rng: &mut R,
) -> f32 {
    let compat = compatibility(a.personality, b.personality);
    let result = outcome(compat, a.morale, b.morale, config.outcome_noise, rng);
    let band = OutcomeBand::classify(result);

    let strength = graph.record_interaction(
        a.id,
        b.id,
        tick,
        result,
        band.describe(),
        config.interaction_log_cap,
    );
    trace!(
        a = %a.id,
        b = %b.id,
        outcome = result,
        strength,
        "interaction"
    );

    for (me, other) in [(a, b), (b, a)] {
        let memory = Memory::new(
            tick,
            MemoryCategory::Social,
            band.recollection(other.name),
            me.position,
        )
        .involving(other.id)
        .with_impact(result)
        .with_importance(result.abs())
        .tagged("social")
        .tagged("interaction");
        memories.add(me.id, memory, config.max_memories);
    }

    result
}
