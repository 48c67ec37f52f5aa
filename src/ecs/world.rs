//! ECS World - owns every component of the agent simulation

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{AgentId, GridPos, Tick};
use crate::ecs::registry::{generate_name, AgentRegistry};
use crate::genetics::Genome;
use crate::memory::MemoryStore;
use crate::planning::Planner;
use crate::social::SocialGraph;
use crate::spatial::SpatialIndex;

/// The simulated world
pub struct World {
    pub config: SimulationConfig,
    /// Next tick to be processed
    pub current_tick: Tick,
    pub registry: AgentRegistry,
    pub spatial: SpatialIndex,
    pub memories: MemoryStore,
    pub planner: Planner,
    pub graph: SocialGraph,
    /// Stream for the single-threaded phases (names, genomes, interactions, births)
    pub rng: ChaCha8Rng,
}

impl World {
    /// Fails if the configuration is inconsistent
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            spatial: SpatialIndex::new(config.cell_size),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            current_tick: 0,
            registry: AgentRegistry::new(),
            memories: MemoryStore::new(),
            planner: Planner::new(),
            graph: SocialGraph::new(),
        })
    }

    pub fn living_count(&self) -> usize {
        self.registry.living_count()
    }

    /// Register a new agent with every component
    pub fn spawn_agent(&mut self, position: GridPos, genome: Genome) -> AgentId {
        let name = generate_name(&mut self.rng);
        let id = self
            .registry
            .spawn(name, position, genome, self.current_tick, &self.config.needs);
        self.spatial.insert(id, position);
        self.planner.add_agent(id);
        id
    }

    /// Founder with a random genome
    pub fn spawn_random(&mut self, position: GridPos) -> AgentId {
        let genome = Genome::random(&mut self.rng);
        self.spawn_agent(position, genome)
    }

    /// `count` founders scattered over `[-extent, extent]^2`
    pub fn spawn_population(&mut self, count: usize, extent: i32) -> Vec<AgentId> {
        (0..count)
            .map(|_| {
                let pos = GridPos::new(
                    self.rng.gen_range(-extent..=extent),
                    self.rng.gen_range(-extent..=extent),
                );
                self.spawn_random(pos)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ArcError;
    use crate::entity::needs::NeedKind;

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = SimulationConfig::default();
        config.needs.remove(&NeedKind::Thirst);
        assert!(matches!(World::new(config), Err(ArcError::UnknownNeed(NeedKind::Thirst))));
    }

    #[test]
    fn test_spawn_registers_everywhere() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let id = world.spawn_random(GridPos::new(4, 4));
        assert!(world.registry.is_alive(id));
        assert!(world.spatial.contains(id, GridPos::new(4, 4)));
        assert!(world.planner.mind(id).is_some());
    }

    #[test]
    fn test_population_is_seeded() {
        let mut a = World::new(SimulationConfig::default()).unwrap();
        let mut b = World::new(SimulationConfig::default()).unwrap();
        a.spawn_population(10, 20);
        b.spawn_population(10, 20);
        assert_eq!(a.registry.positions, b.registry.positions);
        assert_eq!(a.registry.names, b.registry.names);
        assert_eq!(a.living_count(), 10);
    }
}
