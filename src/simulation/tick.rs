//! Tick system - orchestrates simulation updates
//!
//! need decay -> memory processing -> planning -> interaction -> lifecycle
//!
//! The per-agent phases read shared state and may run under rayon; everything
//! that changes the spatial index, the graph or the population happens in
//! single-threaded commits in ascending id order.

use ahash::AHashMap;
use tracing::{debug, warn};

use crate::core::error::{ArcError, Result};
use crate::core::types::{AgentId, FamilyId, Tick};
use crate::ecs::World;
use crate::entity::goals::GoalKind;
use crate::entity::needs::NeedKind;
use crate::entity::tasks::TaskKind;
use crate::planning::planner::{AbandonReason, MindUpdate};
use crate::planning::{Effect, PlanContext, TaskEvent};
use crate::simulation::environment::Environment;
use crate::simulation::lifecycle::{process_births, process_deaths};
use crate::social::interaction::{resolve_pair, Party};

/// Events generated during a simulation tick
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    TaskStarted {
        agent: AgentId,
        task: TaskKind,
        goal: GoalKind,
        tick: Tick,
    },
    TaskCompleted {
        agent: AgentId,
        task: TaskKind,
        tick: Tick,
    },
    TaskAbandoned {
        agent: AgentId,
        task: TaskKind,
        reason: AbandonReason,
        tick: Tick,
    },
    /// Two agents interacted; `outcome` is the strength change applied
    Interaction {
        a: AgentId,
        b: AgentId,
        outcome: f32,
        tick: Tick,
    },
    Birth {
        child: AgentId,
        parents: (AgentId, AgentId),
        family: FamilyId,
        tick: Tick,
    },
    Death {
        agent: AgentId,
        name: String,
        tick: Tick,
    },
}

impl SimulationEvent {
    pub fn tick(&self) -> Tick {
        match self {
            SimulationEvent::TaskStarted { tick, .. }
            | SimulationEvent::TaskCompleted { tick, .. }
            | SimulationEvent::TaskAbandoned { tick, .. }
            | SimulationEvent::Interaction { tick, .. }
            | SimulationEvent::Birth { tick, .. }
            | SimulationEvent::Death { tick, .. } => *tick,
        }
    }
}

/// Run a single simulation tick
///
/// Processes `world.current_tick` and then advances it by one.
pub fn run_simulation_tick(world: &mut World, env: Environment<'_>) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    world.registry.decay_needs(&world.config);
    process_memories(world);
    plan_and_commit(world, env, &mut events);
    resolve_interactions(world, &mut events);
    world.graph.decay_all(world.config.relationship_decay);

    let dead = world.registry.survival_check(&world.config);
    events.extend(process_deaths(world, &dead));
    events.extend(process_births(world));

    reconcile_spatial(world);

    debug!(
        tick = world.current_tick,
        living = world.living_count(),
        edges = world.graph.edge_count(),
        families = world.graph.family_count(),
        events = events.len(),
        "tick complete"
    );

    world.current_tick += 1;
    events
}

/// Run the tick numbered `now`
///
/// Ticks may be skipped forward but never replayed.
pub fn run_tick_at(world: &mut World, now: Tick, env: Environment<'_>) -> Result<Vec<SimulationEvent>> {
    if now < world.current_tick {
        warn!(current = world.current_tick, requested = now, "rejected tick regression");
        return Err(ArcError::TickRegression {
            current: world.current_tick,
            requested: now,
        });
    }
    world.current_tick = now;
    Ok(run_simulation_tick(world, env))
}

// ============================================================================
// MEMORY
// ============================================================================

fn process_memories(world: &mut World) {
    let scores: AHashMap<AgentId, f32> = world
        .memories
        .process_all(world.current_tick, &world.config)
        .into_iter()
        .collect();

    let living: Vec<usize> = world.registry.iter_living().collect();
    for idx in living {
        let impact = scores.get(&world.registry.ids[idx]).copied().unwrap_or(0.0);
        world
            .registry
            .update_emotional_state(idx, impact, &world.config.needs);
    }
}

// ============================================================================
// PLANNING
// ============================================================================

fn plan_and_commit(world: &mut World, env: Environment<'_>, events: &mut Vec<SimulationEvent>) {
    let updates = {
        let ctx = PlanContext {
            config: &world.config,
            now: world.current_tick,
            registry: &world.registry,
            spatial: &world.spatial,
            graph: &world.graph,
            env,
        };
        world.planner.update_all(&ctx)
    };

    for update in updates {
        commit_update(world, env, update, events);
    }
}

fn commit_update(world: &mut World, env: Environment<'_>, update: MindUpdate, events: &mut Vec<SimulationEvent>) {
    let agent = update.agent;
    let now = world.current_tick;

    for effect in update.effects {
        match effect {
            Effect::Move(to) => {
                world.registry.move_agent(agent, to, &mut world.spatial);
            }
            Effect::RestoreNeed(need, amount) => {
                world.registry.adjust_need(agent, need, amount, &world.config.needs);
            }
            Effect::Practice(skill) => {
                world.registry.practice(agent, skill, &world.config);
            }
            Effect::Earn { job } => {
                if let Some(idx) = world.registry.living_index(agent) {
                    let wage = env.jobs.apply(world.registry.profile(idx), &job);
                    world.registry.wealth[idx] += wage;
                }
            }
            Effect::Remember(memory) => {
                world.memories.add(agent, memory, world.config.max_memories);
            }
        }
    }

    for event in update.events {
        match event {
            TaskEvent::Started { task, goal } => {
                events.push(SimulationEvent::TaskStarted { agent, task, goal, tick: now });
            }
            TaskEvent::Completed { task } => {
                debug!(agent = %agent, task = task.label(), tick = now, "task completed");
                events.push(SimulationEvent::TaskCompleted { agent, task, tick: now });
            }
            TaskEvent::Abandoned { task, reason } => {
                events.push(SimulationEvent::TaskAbandoned {
                    agent,
                    task,
                    reason,
                    tick: now,
                });
            }
        }
    }
}

// ============================================================================
// INTERACTION
// ============================================================================

/// Give every ordered pair of nearby agents a chance to interact
///
/// Neighbours come from cell membership, so pairs just outside the radius
/// near a cell boundary may be considered.
fn resolve_interactions(world: &mut World, events: &mut Vec<SimulationEvent>) {
    let now = world.current_tick;
    let radius = world.config.interaction_radius;

    for a in world.registry.living_ids() {
        let Some(pos_a) = world.registry.position(a) else {
            continue;
        };
        let nearby = world.spatial.query_radius(pos_a, radius);

        for b in nearby {
            if b == a {
                continue;
            }
            let (Some(ia), Some(ib)) = (world.registry.living_index(a), world.registry.living_index(b)) else {
                continue;
            };

            let outcome = {
                let registry = &world.registry;
                let party = |idx: usize| Party {
                    id: registry.ids[idx],
                    name: &registry.names[idx],
                    position: registry.positions[idx],
                    personality: &registry.genomes[idx].personality,
                    social: registry.needs[idx].get(NeedKind::Social).unwrap_or(0.0),
                    morale: registry.morale(idx),
                };
                resolve_pair(
                    &mut world.graph,
                    &mut world.memories,
                    &party(ia),
                    &party(ib),
                    now,
                    &world.config,
                    &mut world.rng,
                )
            };

            if let Some(outcome) = outcome {
                let gain = world.config.social_need_gain;
                world.registry.adjust_need(a, NeedKind::Social, gain, &world.config.needs);
                world.registry.adjust_need(b, NeedKind::Social, gain, &world.config.needs);
                events.push(SimulationEvent::Interaction { a, b, outcome, tick: now });
            }
        }
    }
}

// ============================================================================
// SPATIAL
// ============================================================================

/// Ensure the index holds exactly the living agents at their positions
fn reconcile_spatial(world: &mut World) {
    let consistent = world.spatial.len() == world.living_count()
        && world
            .registry
            .iter_living()
            .all(|idx| world.spatial.contains(world.registry.ids[idx], world.registry.positions[idx]));
    if consistent {
        return;
    }

    warn!(tick = world.current_tick, "spatial index out of step, rebuilding");
    let registry = &world.registry;
    world.spatial.rebuild(
        registry
            .iter_living()
            .map(|idx| (registry.ids[idx], registry.positions[idx])),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use crate::core::types::GridPos;
    use crate::simulation::environment::{JobTable, ResourceKind, StaticResourceMap};

    fn world() -> World {
        World::new(SimulationConfig::default()).unwrap()
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut world = world();
        let map = StaticResourceMap::new();
        let jobs = JobTable::new();
        world.spawn_random(GridPos::new(0, 0));
        run_simulation_tick(&mut world, Environment::new(&map, &jobs));
        run_simulation_tick(&mut world, Environment::new(&map, &jobs));
        assert_eq!(world.current_tick, 2);
    }

    #[test]
    fn test_tick_regression_is_rejected() {
        let mut world = world();
        let map = StaticResourceMap::new();
        let jobs = JobTable::new();
        let env = Environment::new(&map, &jobs);
        run_tick_at(&mut world, 10, env).unwrap();
        assert_eq!(world.current_tick, 11);
        assert!(matches!(
            run_tick_at(&mut world, 5, env),
            Err(ArcError::TickRegression { current: 11, requested: 5 })
        ));
    }

    #[test]
    fn test_needs_decay_before_planning() {
        let mut world = world();
        world.config.skill_goal_chance = 0.0;
        let map = StaticResourceMap::new().with(ResourceKind::Water, GridPos::new(30, 30));
        let jobs = JobTable::new();
        let id = world.spawn_random(GridPos::new(0, 0));
        world.registry.set_need(id, NeedKind::Thirst, 30.05, &world.config.needs);

        // 30.05 decays below the 30% threshold in this tick, so a goal appears
        let events = run_simulation_tick(&mut world, Environment::new(&map, &jobs));
        assert!(events.iter().any(|e| matches!(
            e,
            SimulationEvent::TaskStarted { goal: GoalKind::SatisfyNeed(NeedKind::Thirst), .. }
        )));
        assert_eq!(world.registry.position(id), Some(GridPos::new(0, 0)));

        run_simulation_tick(&mut world, Environment::new(&map, &jobs));
        assert_eq!(world.registry.position(id), Some(GridPos::new(1, 1)));
        assert!(world.spatial.contains(id, GridPos::new(1, 1)));
    }

    #[test]
    fn test_reconcile_repairs_stale_index() {
        let mut world = world();
        let id = world.spawn_random(GridPos::new(0, 0));
        world.spatial.remove(id, GridPos::new(0, 0));
        world.spatial.insert(AgentId(99), GridPos::new(3, 3));
        reconcile_spatial(&mut world);
        assert!(world.spatial.contains(id, GridPos::new(0, 0)));
        assert_eq!(world.spatial.len(), 1);
    }

    #[test]
    fn test_events_carry_tick() {
        let event = SimulationEvent::Death {
            agent: AgentId(1),
            name: "Ana".into(),
            tick: 7,
        };
        assert_eq!(event.tick(), 7);
    }
}
