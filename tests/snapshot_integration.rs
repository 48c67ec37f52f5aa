//! Snapshot round trips through disk and resumed runs

use kinfolk::simulation::{JobTable, ResourceKind, StaticResourceMap};
use kinfolk::{run_simulation_tick, Environment, GridPos, SimulationConfig, SimulationEvent, Snapshot, World};

fn map() -> StaticResourceMap {
    StaticResourceMap::new()
        .with(ResourceKind::Food, GridPos::new(5, 5))
        .with(ResourceKind::Water, GridPos::new(-5, 0))
        .with(ResourceKind::Herbs, GridPos::new(0, -6))
}

fn run(world: &mut World, ticks: usize, map: &StaticResourceMap, jobs: &JobTable) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(run_simulation_tick(world, Environment::new(map, jobs)));
    }
    events
}

#[test]
fn test_resumed_world_matches_uninterrupted_run() {
    let map = map();
    let jobs = JobTable::new();
    let mut config = SimulationConfig::default();
    config.seed = 2024;
    config.reproduction_chance = 0.03;

    let mut original = World::new(config).unwrap();
    original.spawn_population(30, 40);
    run(&mut original, 15, &map, &jobs);

    let dir = std::env::temp_dir().join(format!("kinfolk-snapshot-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("world.json");
    original.snapshot().save(&path).unwrap();
    let mut resumed = World::from_snapshot(Snapshot::load(&path).unwrap()).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    assert_eq!(resumed.current_tick, original.current_tick);

    let expected = run(&mut original, 15, &map, &jobs);
    let actual = run(&mut resumed, 15, &map, &jobs);

    assert_eq!(actual, expected);
    assert_eq!(resumed.registry.ids, original.registry.ids);
    assert_eq!(resumed.registry.needs, original.registry.needs);
    assert_eq!(resumed.registry.emotional_state, original.registry.emotional_state);
    assert_eq!(resumed.memories.total(), original.memories.total());
    assert_eq!(resumed.graph.edge_count(), original.graph.edge_count());
    for id in original.registry.living_ids() {
        assert_eq!(resumed.planner.mind(id), original.planner.mind(id));
        assert_eq!(resumed.memories.get(id), original.memories.get(id));
    }
}

#[test]
fn test_missing_snapshot_is_an_io_error() {
    let path = std::env::temp_dir().join("kinfolk-no-such-snapshot.json");
    assert!(matches!(
        Snapshot::load(&path),
        Err(kinfolk::ArcError::IoError(_))
    ));
}
