//! Per-agent episodic memory store
//!
//! Each agent owns an ordered list of memories (insertion order, which is
//! also timestamp order). Once per tick every list is pruned by the
//! forgetting law, merged by consolidation, and scored for emotional impact.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::rng::{agent_stream, Phase};
use crate::core::types::{AgentId, Tick};
use crate::entity::memory::Memory;

/// Minimum importance for a memory to appear in a summary
const SUMMARY_IMPORTANCE: f32 = 0.7;
const SUMMARY_LEN: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    memories: BTreeMap<AgentId, Vec<Memory>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_lists(lists: impl IntoIterator<Item = (AgentId, Vec<Memory>)>) -> Self {
        Self {
            memories: lists.into_iter().collect(),
        }
    }

    pub(crate) fn lists(&self) -> impl Iterator<Item = (AgentId, &Vec<Memory>)> + '_ {
        self.memories.iter().map(|(&id, list)| (id, list))
    }

    /// Memories of `agent`, oldest first; empty for unknown agents
    pub fn get(&self, agent: AgentId) -> &[Memory] {
        self.memories.get(&agent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, agent: AgentId) -> usize {
        self.get(agent).len()
    }

    pub fn total(&self) -> usize {
        self.memories.values().map(Vec::len).sum()
    }

    /// Record a memory, evicting the least important entry above the cap
    pub fn add(&mut self, agent: AgentId, memory: Memory, max_memories: usize) {
        let list = self.memories.entry(agent).or_default();
        list.push(memory);
        enforce_cap(list, max_memories);
    }

    pub fn remove_agent(&mut self, agent: AgentId) -> Option<Vec<Memory>> {
        self.memories.remove(&agent)
    }

    /// One forgetting pass over `agent`'s memories
    pub fn forget<R: Rng + ?Sized>(&mut self, agent: AgentId, now: Tick, horizon: Tick, rng: &mut R) {
        if let Some(list) = self.memories.get_mut(&agent) {
            forget(list, now, horizon, rng);
        }
    }

    pub fn consolidate(&mut self, agent: AgentId, tolerance: f32) {
        if let Some(list) = self.memories.get_mut(&agent) {
            consolidate(list, tolerance);
        }
    }

    pub fn impact_score(&self, agent: AgentId, window: usize) -> f32 {
        impact_score(self.get(agent), window)
    }

    /// Forget, consolidate and score every agent's memories for tick `now`
    ///
    /// Returns the impact score of every agent that has memories. Each agent
    /// draws from its own stream, so the parallel and sequential paths agree.
    pub fn process_all(&mut self, now: Tick, config: &SimulationConfig) -> Vec<(AgentId, f32)> {
        let process = |(&agent, list): (&AgentId, &mut Vec<Memory>)| {
            let mut rng = agent_stream(config.seed, now, agent, Phase::Forget);
            forget(list, now, config.memory_horizon, &mut rng);
            consolidate(list, config.consolidation_tolerance);
            (agent, impact_score(list, config.impact_window))
        };

        let scores: Vec<(AgentId, f32)> = if self.memories.len() >= config.parallel_threshold {
            self.memories.par_iter_mut().map(process).collect()
        } else {
            self.memories.iter_mut().map(process).collect()
        };

        self.memories.retain(|_, list| !list.is_empty());
        scores
    }

    /// Memories of `agent` that involve `other`
    pub fn memories_about(&self, agent: AgentId, other: AgentId) -> Vec<&Memory> {
        self.get(agent).iter().filter(|m| m.involves(other)).collect()
    }

    /// The most important memories, strongest first
    pub fn summary(&self, agent: AgentId) -> Vec<&Memory> {
        let mut important: Vec<&Memory> = self
            .get(agent)
            .iter()
            .filter(|m| m.importance > SUMMARY_IMPORTANCE)
            .collect();
        important.sort_by_key(|m| std::cmp::Reverse(OrderedFloat(m.importance)));
        important.truncate(SUMMARY_LEN);
        important
    }
}

/// Drop least-important (then oldest) memories until the list fits
fn enforce_cap(list: &mut Vec<Memory>, max_memories: usize) {
    while list.len() > max_memories {
        let victim = list
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| (OrderedFloat(m.importance), m.timestamp))
            .map(|(i, _)| i);
        match victim {
            Some(i) => {
                list.remove(i);
            }
            None => break,
        }
    }
}

/// Memories past the horizon survive only if a fresh draw is below their importance
pub fn forget<R: Rng + ?Sized>(list: &mut Vec<Memory>, now: Tick, horizon: Tick, rng: &mut R) {
    list.retain(|memory| memory.age(now) < horizon || rng.gen::<f32>() < memory.importance);
}

/// Merge near-duplicate memories
///
/// Each memory absorbs every later memory similar to it. Absorbing never
/// changes category, tags or impact, so a second pass finds nothing to merge.
pub fn consolidate(list: &mut Vec<Memory>, tolerance: f32) {
    let mut i = 0;
    while i < list.len() {
        let mut j = i + 1;
        while j < list.len() {
            if list[i].is_similar(&list[j], tolerance) {
                let absorbed = list.remove(j);
                list[i].absorb(&absorbed);
            } else {
                j += 1;
            }
        }
        i += 1;
    }
}

/// Mean of `impact * importance` over the `window` most recent memories
pub fn impact_score(list: &[Memory], window: usize) -> f32 {
    if list.is_empty() || window == 0 {
        return 0.0;
    }
    let mut recent: Vec<&Memory> = list.iter().collect();
    recent.sort_by_key(|m| std::cmp::Reverse(m.timestamp));
    recent.truncate(window);
    recent.iter().map(|m| m.weighted_impact()).sum::<f32>() / recent.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::GridPos;
    use crate::entity::memory::MemoryCategory;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn memory(tick: Tick, impact: f32, importance: f32, tag: &str) -> Memory {
        Memory::new(tick, MemoryCategory::Social, "Met someone", GridPos::default())
            .with_impact(impact)
            .with_importance(importance)
            .tagged(tag)
    }

    #[test]
    fn test_cap_evicts_least_important() {
        let mut store = MemoryStore::new();
        let agent = AgentId(1);
        store.add(agent, memory(0, 0.0, 0.9, "a"), 2);
        store.add(agent, memory(1, 0.0, 0.1, "b"), 2);
        store.add(agent, memory(2, 0.0, 0.5, "c"), 2);
        let kept: Vec<f32> = store.get(agent).iter().map(|m| m.importance).collect();
        assert_eq!(kept, vec![0.9, 0.5]);
    }

    #[test]
    fn test_cap_ties_evict_oldest() {
        let mut list = vec![memory(5, 0.0, 0.3, "a"), memory(2, 0.0, 0.3, "b")];
        enforce_cap(&mut list, 1);
        assert_eq!(list[0].timestamp, 5);
    }

    #[test]
    fn test_recent_memories_are_never_forgotten() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut list = vec![memory(900, 0.0, 0.0, "a")];
        forget(&mut list, 1000, 10_000, &mut rng);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_old_unimportant_memories_are_forgotten() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut list = vec![memory(0, 0.0, 0.0, "a"), memory(0, 0.0, 1.0, "b")];
        forget(&mut list, 20_000, 10_000, &mut rng);
        // Importance 0 never survives, importance 1 always does
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].importance, 1.0);
    }

    #[test]
    fn test_retention_tracks_importance() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let trials = 4000;
        let survived = (0..trials)
            .filter(|_| {
                let mut list = vec![memory(0, 0.0, 0.3, "a")];
                forget(&mut list, 20_000, 10_000, &mut rng);
                !list.is_empty()
            })
            .count();
        let rate = survived as f32 / trials as f32;
        assert!((rate - 0.3).abs() < 0.03, "rate {}", rate);
    }

    #[test]
    fn test_consolidation_merges_similar() {
        let mut list = vec![
            memory(0, 0.5, 0.4, "chat"),
            memory(1, 0.6, 0.4, "chat"),
            memory(2, -0.5, 0.4, "chat"),
        ];
        consolidate(&mut list, 0.3);
        assert_eq!(list.len(), 2);
        assert!((list[0].importance - 0.6).abs() < 1e-6);
        assert!(list[0].description.starts_with("Repeatedly"));
    }

    #[test]
    fn test_impact_score_uses_recent_window() {
        let list: Vec<Memory> = (0..12)
            .map(|t| {
                let impact = if t < 2 { -1.0 } else { 1.0 };
                memory(t, impact, 1.0, "x")
            })
            .collect();
        // The two oldest negative memories fall outside the window
        assert!((impact_score(&list, 10) - 1.0).abs() < 1e-6);
        assert_eq!(impact_score(&[], 10), 0.0);
    }

    #[test]
    fn test_queries() {
        let mut store = MemoryStore::new();
        let agent = AgentId(1);
        store.add(agent, memory(0, 0.5, 0.9, "a").involving(AgentId(2)), 100);
        store.add(agent, memory(1, 0.5, 0.8, "b").involving(AgentId(3)), 100);
        store.add(agent, memory(2, 0.5, 0.2, "c").involving(AgentId(2)), 100);

        assert_eq!(store.memories_about(agent, AgentId(2)).len(), 2);
        let summary = store.summary(agent);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].importance, 0.9);
        assert!(store.memories_about(AgentId(99), AgentId(2)).is_empty());
    }

    #[test]
    fn test_process_all_is_reproducible() {
        let config = SimulationConfig::default();
        let mut a = MemoryStore::new();
        for agent in 0..20 {
            for t in 0..5 {
                a.add(AgentId(agent), memory(t, 0.1 * t as f32, 0.5, "x"), 1000);
            }
        }
        let mut b = a.clone();
        let sa = a.process_all(30_000, &config);
        let sb = b.process_all(30_000, &config);
        assert_eq!(sa, sb);
        assert_eq!(a.total(), b.total());
    }

    fn arb_memory() -> impl Strategy<Value = Memory> {
        (0u64..100, -1.0f32..1.0, 0.0f32..1.0, 0usize..3, 0usize..2).prop_map(
            |(tick, impact, importance, tag, category)| {
                let mut m = memory(tick, impact, importance, ["a", "b", "c"][tag]);
                if category == 1 {
                    m.category = MemoryCategory::Work;
                }
                m
            },
        )
    }

    proptest! {
        #[test]
        fn memory_count_never_exceeds_cap(
            memories in prop::collection::vec(arb_memory(), 0..60),
            cap in 1usize..20,
        ) {
            let mut store = MemoryStore::new();
            for m in memories {
                store.add(AgentId(1), m, cap);
                prop_assert!(store.count(AgentId(1)) <= cap);
            }
        }

        #[test]
        fn consolidation_is_idempotent(memories in prop::collection::vec(arb_memory(), 0..30)) {
            let mut once = memories;
            consolidate(&mut once, 0.3);
            let mut twice = once.clone();
            consolidate(&mut twice, 0.3);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn forgetting_keeps_young_or_lucky_memories(
            memories in prop::collection::vec(arb_memory(), 0..40),
            now in 0u64..200,
            horizon in 0u64..100,
            seed in any::<u64>(),
        ) {
            let mut kept = memories.clone();
            forget(&mut kept, now, horizon, &mut ChaCha8Rng::seed_from_u64(seed));

            // Replay the stream: one draw per memory past the horizon, in order
            let mut replay = ChaCha8Rng::seed_from_u64(seed);
            let expected: Vec<Memory> = memories
                .into_iter()
                .filter(|m| {
                    if m.age(now) < horizon {
                        return true;
                    }
                    let draw: f32 = replay.gen();
                    draw < m.importance
                })
                .collect();

            for m in &kept {
                prop_assert!(m.age(now) < horizon || m.importance > 0.0);
            }
            prop_assert_eq!(kept, expected);
        }
    }
}
