//! Agent registry with SoA layout
//!
//! Every per-agent column is a parallel `Vec`; `index` maps an id to its
//! slot. Removal swaps the last agent into the freed slot, so slots are not
//! stable across ticks but ids are.

use ahash::AHashMap;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::SimulationConfig;
use crate::core::types::{AgentId, GridPos, Tick};
use crate::entity::attributes::{derive_stats, initial_skills, practice, Profile, SkillKind, Skills, Stats};
use crate::entity::needs::{NeedKind, NeedSet, NeedTable};
use crate::genetics::Genome;
use crate::spatial::SpatialIndex;

/// Morale assumed for agents without a morale need
const DEFAULT_MORALE: f32 = 50.0;

const NAME_PREFIXES: [&str; 12] = [
    "Ash", "Bram", "Cor", "Del", "Eir", "Fen", "Gil", "Hal", "Isk", "Jun", "Kel", "Lor",
];
const NAME_SUFFIXES: [&str; 10] = ["a", "en", "ric", "wyn", "is", "oth", "ley", "mar", "ette", "ius"];

pub fn generate_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix = NAME_PREFIXES[rng.gen_range(0..NAME_PREFIXES.len())];
    let suffix = NAME_SUFFIXES[rng.gen_range(0..NAME_SUFFIXES.len())];
    format!("{}{}", prefix, suffix)
}

/// One agent's full state, used when moving agents in and out of storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentId,
    pub name: String,
    pub birth_tick: Tick,
    pub position: GridPos,
    pub genome: Genome,
    pub needs: NeedSet,
    pub stats: Stats,
    pub skills: Skills,
    pub alive: bool,
    pub wealth: f32,
    pub job: Option<String>,
    pub emotional_state: f32,
}

/// Structure of Arrays for agents
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    pub ids: Vec<AgentId>,
    pub names: Vec<String>,
    pub birth_ticks: Vec<Tick>,
    pub positions: Vec<GridPos>,
    pub genomes: Vec<Genome>,
    pub needs: Vec<NeedSet>,
    pub stats: Vec<Stats>,
    pub skills: Vec<Skills>,
    pub alive: Vec<bool>,
    pub wealth: Vec<f32>,
    pub jobs: Vec<Option<String>>,
    pub emotional_state: Vec<f32>,
    index: AHashMap<AgentId, usize>,
    next_id: u64,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn living_count(&self) -> usize {
        self.alive.iter().filter(|&&a| a).count()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Slot of a living agent
    pub fn living_index(&self, id: AgentId) -> Option<usize> {
        self.index_of(id).filter(|&i| self.alive[i])
    }

    pub fn is_alive(&self, id: AgentId) -> bool {
        self.living_index(id).is_some()
    }

    pub fn iter_living(&self) -> impl Iterator<Item = usize> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &alive)| alive)
            .map(|(i, _)| i)
    }

    /// Living agent ids in ascending order
    pub fn living_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.iter_living().map(|i| self.ids[i]).collect();
        ids.sort_unstable();
        ids
    }

    pub fn position(&self, id: AgentId) -> Option<GridPos> {
        self.living_index(id).map(|i| self.positions[i])
    }

    pub fn name(&self, id: AgentId) -> Option<&str> {
        self.index_of(id).map(|i| self.names[i].as_str())
    }

    pub fn genome(&self, id: AgentId) -> Option<&Genome> {
        self.index_of(id).map(|i| &self.genomes[i])
    }

    pub fn need(&self, id: AgentId, kind: NeedKind) -> Option<f32> {
        self.index_of(id).and_then(|i| self.needs[i].get(kind))
    }

    pub fn profile(&self, idx: usize) -> Profile<'_> {
        Profile {
            stats: &self.stats[idx],
            skills: &self.skills[idx],
        }
    }

    pub fn morale(&self, idx: usize) -> f32 {
        self.needs[idx].get(NeedKind::Morale).unwrap_or(DEFAULT_MORALE)
    }

    /// Create an agent; stats and skills derive from the genome, needs start full
    pub fn spawn(
        &mut self,
        name: String,
        position: GridPos,
        genome: Genome,
        birth_tick: Tick,
        needs: &NeedTable,
    ) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        self.push(AgentRecord {
            id,
            name,
            birth_tick,
            position,
            genome,
            needs: NeedSet::at_max(needs),
            stats: derive_stats(&genome),
            skills: initial_skills(&genome),
            alive: true,
            wealth: 0.0,
            job: None,
            emotional_state: 0.0,
        });
        id
    }

    /// Insert a record as-is (snapshot restore)
    pub fn push(&mut self, record: AgentRecord) {
        self.index.insert(record.id, self.ids.len());
        self.next_id = self.next_id.max(record.id.0 + 1);
        self.ids.push(record.id);
        self.names.push(record.name);
        self.birth_ticks.push(record.birth_tick);
        self.positions.push(record.position);
        self.genomes.push(record.genome);
        self.needs.push(record.needs);
        self.stats.push(record.stats);
        self.skills.push(record.skills);
        self.alive.push(record.alive);
        self.wealth.push(record.wealth);
        self.jobs.push(record.job);
        self.emotional_state.push(record.emotional_state);
    }

    pub(crate) fn set_next_id(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }

    pub fn record(&self, idx: usize) -> AgentRecord {
        AgentRecord {
            id: self.ids[idx],
            name: self.names[idx].clone(),
            birth_tick: self.birth_ticks[idx],
            position: self.positions[idx],
            genome: self.genomes[idx],
            needs: self.needs[idx].clone(),
            stats: self.stats[idx].clone(),
            skills: self.skills[idx].clone(),
            alive: self.alive[idx],
            wealth: self.wealth[idx],
            job: self.jobs[idx].clone(),
            emotional_state: self.emotional_state[idx],
        }
    }

    /// Remove an agent from storage entirely
    pub fn despawn(&mut self, id: AgentId) -> Option<AgentRecord> {
        let idx = self.index.remove(&id)?;
        let record = self.record(idx);

        self.ids.swap_remove(idx);
        self.names.swap_remove(idx);
        self.birth_ticks.swap_remove(idx);
        self.positions.swap_remove(idx);
        self.genomes.swap_remove(idx);
        self.needs.swap_remove(idx);
        self.stats.swap_remove(idx);
        self.skills.swap_remove(idx);
        self.alive.swap_remove(idx);
        self.wealth.swap_remove(idx);
        self.jobs.swap_remove(idx);
        self.emotional_state.swap_remove(idx);

        if let Some(&moved) = self.ids.get(idx) {
            self.index.insert(moved, idx);
        }
        Some(record)
    }

    /// One tick of decay on every living agent's needs
    pub fn decay_needs(&mut self, config: &SimulationConfig) {
        let table = &config.needs;
        if self.living_count() >= config.parallel_threshold {
            self.needs
                .par_iter_mut()
                .zip(self.alive.par_iter())
                .filter(|(_, &alive)| alive)
                .for_each(|(needs, _)| needs.decay(table));
        } else {
            for (needs, _) in self.needs.iter_mut().zip(self.alive.iter()).filter(|(_, &a)| a) {
                needs.decay(table);
            }
        }
    }

    /// Mark agents whose health or a critical need ran out as dead
    ///
    /// Returns the newly dead, in ascending id order.
    pub fn survival_check(&mut self, config: &SimulationConfig) -> Vec<AgentId> {
        let mut dead = Vec::new();
        for i in 0..self.ids.len() {
            if !self.alive[i] {
                continue;
            }
            if let Some(need) = self.needs[i].depleted_critical(&config.needs) {
                self.alive[i] = false;
                debug!(agent = %self.ids[i], need = need.name(), "agent died");
                dead.push(self.ids[i]);
            }
        }
        dead.sort_unstable();
        dead
    }

    /// Set a need on a living agent; false for unknown or dead agents
    pub fn set_need(&mut self, id: AgentId, kind: NeedKind, value: f32, table: &NeedTable) -> bool {
        match self.living_index(id) {
            Some(i) => self.needs[i].set(kind, value, table),
            None => false,
        }
    }

    pub fn adjust_need(&mut self, id: AgentId, kind: NeedKind, delta: f32, table: &NeedTable) -> bool {
        match self.living_index(id) {
            Some(i) => self.needs[i].adjust(kind, delta, table),
            None => false,
        }
    }

    pub fn damage(&mut self, id: AgentId, amount: f32, table: &NeedTable) -> bool {
        self.adjust_need(id, NeedKind::Health, -amount, table)
    }

    /// Move a living agent, keeping the spatial index in step
    pub fn move_agent(&mut self, id: AgentId, to: GridPos, spatial: &mut SpatialIndex) -> bool {
        let Some(i) = self.living_index(id) else {
            return false;
        };
        let from = self.positions[i];
        if from != to {
            spatial.move_agent(id, from, to);
            self.positions[i] = to;
        }
        true
    }

    pub fn assign_job(&mut self, id: AgentId, job: Option<String>) -> bool {
        match self.living_index(id) {
            Some(i) => {
                self.jobs[i] = job;
                true
            }
            None => false,
        }
    }

    /// One tick of practice on a living agent; returns the new level
    pub fn practice(&mut self, id: AgentId, skill: SkillKind, config: &SimulationConfig) -> Option<f32> {
        let i = self.living_index(id)?;
        let aptitudes = self.genomes[i].aptitudes;
        Some(practice(&mut self.skills[i], skill, &aptitudes, &config.skills))
    }

    /// Recompute the emotional state of the agent in slot `idx`
    ///
    /// Priority-weighted need fill (weight `1 / priority`), plus personality
    /// bias, plus the memory impact score.
    ///
    /// Deliberately not a `priority`-weighted sum of raw need values: fills
    /// keep every need on the same 0-1 scale and the inverse rank lets the
    /// most urgent needs (rank 1 is health) dominate the mood.
    pub fn update_emotional_state(&mut self, idx: usize, memory_impact: f32, table: &NeedTable) {
        let needs = &self.needs[idx];
        let (weighted, total) = needs
            .iter()
            .filter_map(|(kind, _)| {
                let cfg = table.get(&kind)?;
                let fill = needs.fill(kind, table)?;
                let weight = 1.0 / cfg.priority.max(1) as f32;
                Some((fill * weight, weight))
            })
            .fold((0.0, 0.0), |(w, t), (fw, weight)| (w + fw, t + weight));
        let need_mood = if total > 0.0 { weighted / total } else { 0.0 };

        let p = &self.genomes[idx].personality;
        let temperament = 0.3 * p.extraversion - 0.3 * p.neuroticism + 0.2 * p.agreeableness;

        self.emotional_state[idx] = need_mood + temperament + memory_impact;
    }
}
