//! Births and deaths
//!
//! Both run in the single-threaded commit phase at the end of a tick. Deaths
//! are processed first so the dead never reproduce.

use rand::Rng;
use tracing::debug;

use crate::core::types::{AgentId, FamilyId};
use crate::ecs::World;
use crate::entity::memory::{Memory, MemoryCategory};
use crate::genetics::Genome;
use crate::simulation::tick::SimulationEvent;

/// Remove dead agents from every component
///
/// Each graph neighbour remembers the death before the edges go.
pub fn process_deaths(world: &mut World, dead: &[AgentId]) -> Vec<SimulationEvent> {
    let now = world.current_tick;
    let mut events = Vec::with_capacity(dead.len());

    for &agent in dead {
        let Some(idx) = world.registry.index_of(agent) else {
            continue;
        };
        let name = world.registry.names[idx].clone();
        let position = world.registry.positions[idx];

        let neighbors: Vec<AgentId> = world.graph.neighbors(agent).collect();
        for neighbor in neighbors {
            let Some(at) = world.registry.position(neighbor) else {
                continue;
            };
            let memory = Memory::new(now, MemoryCategory::Death, format!("{} has died", name), at)
                .involving(agent)
                .with_impact(-0.8)
                .with_importance(1.0)
                .tagged("death");
            world.memories.add(neighbor, memory, world.config.max_memories);
        }

        world.graph.remove_agent(agent);
        world.spatial.remove(agent, position);
        world.memories.remove_agent(agent);
        world.planner.remove_agent(agent);
        world.registry.despawn(agent);

        debug!(agent = %agent, name = %name, tick = now, "agent removed");
        events.push(SimulationEvent::Death { agent, name, tick: now });
    }

    events
}

/// Roll for a child on every strong, non-kin relationship
pub fn process_births(world: &mut World) -> Vec<SimulationEvent> {
    let couples = world.graph.couples_above(world.config.reproduction_strength);
    let mut events = Vec::new();

    for (a, b) in couples {
        if !world.registry.is_alive(a) || !world.registry.is_alive(b) {
            continue;
        }
        if world.rng.gen::<f32>() >= world.config.reproduction_chance {
            continue;
        }
        if let Some((child, family)) = spawn_child(world, a, b) {
            events.push(SimulationEvent::Birth {
                child,
                parents: (a, b),
                family,
                tick: world.current_tick,
            });
        }
    }

    events
}

/// Create a child next to `parent_a` and file it into the parents' family
///
/// Returns `None` if either parent is missing or dead.
pub fn spawn_child(world: &mut World, parent_a: AgentId, parent_b: AgentId) -> Option<(AgentId, FamilyId)> {
    let genome_a = *world.registry.genome(parent_a)?;
    let genome_b = *world.registry.genome(parent_b)?;
    let origin = world.registry.position(parent_a)?;
    world.registry.position(parent_b)?;

    let genome = Genome::combine(&genome_a, &genome_b, world.config.mutation_rate, &mut world.rng);
    let position = origin.offset(world.rng.gen_range(-1..=1), world.rng.gen_range(-1..=1));
    let child = world.spawn_agent(position, genome);

    let family = world.graph.register_child(child, parent_a, parent_b);
    world.graph.add_kin(parent_a, child);
    world.graph.add_kin(parent_b, child);

    let now = world.current_tick;
    let child_name = world.registry.name(child).unwrap_or_default().to_string();
    for parent in [parent_a, parent_b] {
        let Some(at) = world.registry.position(parent) else {
            continue;
        };
        let memory = Memory::new(now, MemoryCategory::Birth, format!("{} was born", child_name), at)
            .involving(child)
            .with_impact(0.8)
            .with_importance(0.9)
            .tagged("birth")
            .tagged("family");
        world.memories.add(parent, memory, world.config.max_memories);
    }

    debug!(child = %child, a = %parent_a, b = %parent_b, family = family.0, "agent born");
    Some((child, family))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::GridPos;

    fn world() -> World {
        World::new(SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_spawn_child_joins_parents() {
        let mut world = world();
        let a = world.spawn_random(GridPos::new(0, 0));
        let b = world.spawn_random(GridPos::new(1, 0));

        let (child, family) = spawn_child(&mut world, a, b).unwrap();
        let members = world.graph.family_members(family).unwrap();
        assert!(members.contains(&a) && members.contains(&b) && members.contains(&child));

        let pos = world.registry.position(child).unwrap();
        assert!((pos.x).abs() <= 1 && (pos.y).abs() <= 1);
        assert_eq!(world.graph.strength(a, child), 1.0);
        assert_eq!(world.memories.count(a), 1);
    }

    #[test]
    fn test_spawn_child_of_dead_parent_is_noop() {
        let mut world = world();
        let a = world.spawn_random(GridPos::new(0, 0));
        assert!(spawn_child(&mut world, a, AgentId(77)).is_none());
        assert_eq!(world.registry.count(), 1);
    }

    #[test]
    fn test_births_need_strong_bond() {
        let mut world = world();
        world.config.reproduction_chance = 1.0;
        let a = world.spawn_random(GridPos::new(0, 0));
        let b = world.spawn_random(GridPos::new(0, 0));
        world.graph.record_interaction(a, b, 0, 0.5, "chat", 8);
        assert!(process_births(&mut world).is_empty());

        world.graph.record_interaction(a, b, 0, 0.4, "chat", 8);
        let events = process_births(&mut world);
        assert_eq!(events.len(), 1);
        assert_eq!(world.living_count(), 3);
    }

    #[test]
    fn test_death_notifies_neighbors_and_cleans_up() {
        let mut world = world();
        let a = world.spawn_random(GridPos::new(0, 0));
        let b = world.spawn_random(GridPos::new(2, 0));
        let c = world.spawn_random(GridPos::new(40, 40));
        world.graph.record_interaction(a, b, 0, 0.3, "chat", 8);
        let family = world.graph.create_family();
        world.graph.join_family(a, family);

        let events = process_deaths(&mut world, &[a]);
        assert_eq!(events.len(), 1);
        assert_eq!(world.memories.count(b), 1);
        assert_eq!(world.memories.get(b)[0].category, MemoryCategory::Death);
        assert_eq!(world.memories.count(c), 0);
        assert!(!world.spatial.contains(a, GridPos::new(0, 0)));
        assert_eq!(world.graph.edge_count(), 0);
        assert_eq!(world.graph.family_count(), 0);
        assert!(world.planner.mind(a).is_none());
        assert!(world.registry.index_of(a).is_none());
    }
}
