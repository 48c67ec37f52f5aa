//! Whole-world snapshots
//!
//! Maps are flattened to vectors so agent and edge keys survive JSON. The
//! spatial index is not stored; it is rebuilt from living agent positions.

use std::fs;
use std::path::Path;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::config::SimulationConfig;
use crate::core::error::{ArcError, Result};
use crate::core::types::{AgentId, FamilyId, Tick};
use crate::ecs::{AgentRecord, AgentRegistry, World};
use crate::entity::memory::Memory;
use crate::memory::MemoryStore;
use crate::planning::{AgentMind, Planner};
use crate::social::{EdgeKey, Relationship, SocialGraph};
use crate::spatial::SpatialIndex;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Next tick to be processed
    pub tick: Tick,
    pub config: SimulationConfig,
    pub next_agent_id: u64,
    pub agents: Vec<AgentRecord>,
    pub memories: Vec<(AgentId, Vec<Memory>)>,
    pub minds: Vec<(AgentId, AgentMind)>,
    pub edges: Vec<(EdgeKey, Relationship)>,
    pub families: Vec<(FamilyId, Vec<AgentId>)>,
    pub next_family: u64,
    pub rng: ChaCha8Rng,
}

impl Snapshot {
    pub fn capture(world: &World) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            tick: world.current_tick,
            config: world.config.clone(),
            next_agent_id: world.registry.next_id(),
            agents: (0..world.registry.count()).map(|idx| world.registry.record(idx)).collect(),
            memories: world
                .memories
                .lists()
                .map(|(id, list)| (id, list.clone()))
                .collect(),
            minds: world.planner.minds().map(|(id, mind)| (id, mind.clone())).collect(),
            edges: world.graph.edges().map(|(key, rel)| (key, rel.clone())).collect(),
            families: world
                .graph
                .families()
                .map(|(family, members)| (family, members.iter().copied().collect()))
                .collect(),
            next_family: world.graph.next_family(),
            rng: world.rng.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(content)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ArcError::Config(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(snapshot)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        info!(path = %path.display(), tick = self.tick, agents = self.agents.len(), "snapshot saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

impl World {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Restore a world; the configuration is validated again
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        snapshot.config.validate()?;

        let mut registry = AgentRegistry::new();
        for record in snapshot.agents {
            registry.push(record);
        }
        registry.set_next_id(snapshot.next_agent_id);

        let mut spatial = SpatialIndex::new(snapshot.config.cell_size);
        spatial.rebuild(
            registry
                .iter_living()
                .map(|idx| (registry.ids[idx], registry.positions[idx])),
        );

        Ok(Self {
            current_tick: snapshot.tick,
            registry,
            spatial,
            memories: MemoryStore::from_lists(snapshot.memories),
            planner: Planner::from_minds(snapshot.minds),
            graph: SocialGraph::from_parts(snapshot.edges, snapshot.families, snapshot.next_family),
            rng: snapshot.rng,
            config: snapshot.config,
        })
    }
}
