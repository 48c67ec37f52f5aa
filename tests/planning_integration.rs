//! Integration tests for goals and tasks through full ticks

use kinfolk::entity::attributes::{Attribute, Requirement, SkillKind, StatKind};
use kinfolk::entity::goals::GoalKind;
use kinfolk::entity::memory::MemoryCategory;
use kinfolk::entity::needs::NeedKind;
use kinfolk::entity::tasks::TaskKind;
use kinfolk::simulation::{JobSpec, JobTable, ResourceKind, StaticResourceMap};
use kinfolk::{run_simulation_tick, Environment, GridPos, SimulationConfig, SimulationEvent, World};

fn quiet_world() -> World {
    let mut config = SimulationConfig::default();
    config.skill_goal_chance = 0.0;
    World::new(config).unwrap()
}

#[test]
fn test_hungry_agent_generates_need_goal() {
    let mut world = quiet_world();
    let map = StaticResourceMap::new();
    let jobs = JobTable::new();
    let id = world.spawn_random(GridPos::new(0, 0));
    world.registry.set_need(id, NeedKind::Hunger, 10.0, &world.config.needs);

    run_simulation_tick(&mut world, Environment::new(&map, &jobs));

    let goal = world
        .planner
        .goals(id)
        .iter()
        .find(|g| g.kind == GoalKind::SatisfyNeed(NeedKind::Hunger))
        .expect("hunger goal");
    assert!(goal.base_priority > 0.69);
    // No food anywhere, so the agent stays idle
    assert!(world.planner.task(id).is_none());
}

#[test]
fn test_agent_walks_to_food_and_eats() {
    let mut world = quiet_world();
    let map = StaticResourceMap::new().with(ResourceKind::Food, GridPos::new(3, 0));
    let jobs = JobTable::new();
    let id = world.spawn_random(GridPos::new(0, 0));
    world.registry.set_need(id, NeedKind::Hunger, 10.0, &world.config.needs);

    let mut completed = false;
    for _ in 0..40 {
        let events = run_simulation_tick(&mut world, Environment::new(&map, &jobs));
        completed |= events.iter().any(|e| {
            matches!(
                e,
                SimulationEvent::TaskCompleted {
                    task: TaskKind::Consume { need: NeedKind::Hunger, .. },
                    ..
                }
            )
        });
        if completed {
            break;
        }
    }

    assert!(completed);
    assert_eq!(world.registry.position(id), Some(GridPos::new(3, 0)));
    assert!(world.registry.need(id, NeedKind::Hunger).unwrap() > 50.0);
    assert!(world
        .memories
        .get(id)
        .iter()
        .any(|m| m.category == MemoryCategory::Consumption));
    assert!(world.spatial.contains(id, GridPos::new(3, 0)));
}

#[test]
fn test_qualified_worker_earns_wage() {
    let mut world = quiet_world();
    let map = StaticResourceMap::new();
    let jobs = JobTable::new().with(
        "forager",
        JobSpec {
            requirements: vec![Requirement::new(Attribute::Stat(StatKind::Strength), 0.0)],
            wage: 5.0,
            skill: Some(SkillKind::Foraging),
        },
    );
    let id = world.spawn_random(GridPos::new(0, 0));
    world.registry.assign_job(id, Some("forager".into()));

    let mut shifts = 0;
    for _ in 0..130 {
        let events = run_simulation_tick(&mut world, Environment::new(&map, &jobs));
        shifts += events
            .iter()
            .filter(|e| matches!(e, SimulationEvent::TaskCompleted { task: TaskKind::Work { .. }, .. }))
            .count();
    }

    assert!(shifts >= 1);
    let idx = world.registry.living_index(id).unwrap();
    assert_eq!(world.registry.wealth[idx], 5.0 * shifts as f32);
}

#[test]
fn test_parallel_and_sequential_runs_agree() {
    let run = |threshold: usize| {
        let mut config = SimulationConfig::default();
        config.parallel_threshold = threshold;
        config.seed = 99;
        let mut world = World::new(config).unwrap();
        // Spread out so strong bonds, and with them births, stay rare
        world.spawn_population(40, 40);
        let map = StaticResourceMap::new()
            .with(ResourceKind::Food, GridPos::new(4, 4))
            .with(ResourceKind::Water, GridPos::new(-4, 2));
        let jobs = JobTable::new();
        let mut events = Vec::new();
        for _ in 0..20 {
            events.extend(run_simulation_tick(&mut world, Environment::new(&map, &jobs)));
        }
        (events, world.registry.positions.clone(), world.memories.total())
    };

    let (events, positions, memories) = run(1);
    assert!(!events.is_empty());
    assert_eq!((events, positions, memories), run(usize::MAX));
}
