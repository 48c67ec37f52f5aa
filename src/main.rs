//! Kinfolk - headless simulation runner
//!
//! Runs a seeded population for a number of ticks, or resumes one from a
//! snapshot, logging population and social statistics along the way.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use kinfolk::core::error::Result;
use kinfolk::simulation::{JobBoard, JobTable, StaticResourceMap};
use kinfolk::{run_simulation_tick, Environment, SimulationConfig, SimulationEvent, Snapshot, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kinfolk")]
#[command(about = "Simulate a society of autonomous agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a fresh population
    Run {
        /// Number of founding agents
        #[arg(long, default_value_t = 200)]
        agents: usize,

        /// Random seed for deterministic runs
        #[arg(long)]
        seed: Option<u64>,

        /// TOML file overriding configuration defaults
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Continue from a saved snapshot
    Resume {
        #[arg(long)]
        snapshot: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Ticks to simulate
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Half-width of the square the population and resources occupy
    #[arg(long, default_value_t = 50)]
    extent: i32,

    /// Resource sites per kind
    #[arg(long, default_value_t = 12)]
    sites: usize,

    /// TOML job catalog; founders take the first job they qualify for
    #[arg(long)]
    jobs: Option<PathBuf>,

    /// Log statistics every N ticks
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Write a snapshot here when done
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct RunStats {
    births: usize,
    deaths: usize,
    interactions: usize,
    completed: usize,
    abandoned: usize,
}

impl RunStats {
    fn record(&mut self, events: &[SimulationEvent]) {
        for event in events {
            match event {
                SimulationEvent::Birth { .. } => self.births += 1,
                SimulationEvent::Death { .. } => self.deaths += 1,
                SimulationEvent::Interaction { .. } => self.interactions += 1,
                SimulationEvent::TaskCompleted { .. } => self.completed += 1,
                SimulationEvent::TaskAbandoned { .. } => self.abandoned += 1,
                SimulationEvent::TaskStarted { .. } => {}
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kinfolk=info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            agents,
            seed,
            config,
            common,
        } => {
            let mut config = match config {
                Some(path) => SimulationConfig::load(&path)?,
                None => SimulationConfig::default(),
            };
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let jobs = load_jobs(common.jobs.as_deref())?;

            let mut world = World::new(config)?;
            world.spawn_population(agents, common.extent);
            assign_jobs(&mut world, &jobs);
            info!(agents, seed = world.config.seed, "population founded");

            simulate(world, &jobs, &common)
        }
        Command::Resume { snapshot, common } => {
            let world = World::from_snapshot(Snapshot::load(&snapshot)?)?;
            let jobs = load_jobs(common.jobs.as_deref())?;
            info!(
                path = %snapshot.display(),
                tick = world.current_tick,
                living = world.living_count(),
                "snapshot restored"
            );
            simulate(world, &jobs, &common)
        }
    }
}

fn load_jobs(path: Option<&Path>) -> Result<JobTable> {
    match path {
        Some(path) => JobTable::load(path),
        None => Ok(JobTable::new()),
    }
}

fn assign_jobs(world: &mut World, jobs: &JobTable) {
    for id in world.registry.living_ids() {
        let Some(idx) = world.registry.living_index(id) else {
            continue;
        };
        let profile = world.registry.profile(idx);
        let job = jobs.names().find(|job| jobs.qualifies(profile, job)).map(str::to_string);
        if job.is_some() {
            world.registry.assign_job(id, job);
        }
    }
}

fn simulate(mut world: World, jobs: &JobTable, args: &CommonArgs) -> Result<()> {
    // Same seed, same map, so a resumed run sees the resources it left
    let mut map_rng = ChaCha8Rng::seed_from_u64(world.config.seed);
    let resources = StaticResourceMap::scatter(&mut map_rng, args.sites, args.extent);
    let env = Environment::new(&resources, jobs);

    let start = Instant::now();
    let mut stats = RunStats::default();
    let report_every = args.report_every.max(1);

    for step in 1..=args.ticks {
        let events = run_simulation_tick(&mut world, env);
        stats.record(&events);

        if step % report_every == 0 || step == args.ticks {
            info!(
                tick = world.current_tick,
                living = world.living_count(),
                edges = world.graph.edge_count(),
                families = world.graph.family_count(),
                memories = world.memories.total(),
                active_tasks = world.planner.active_tasks(),
                "progress"
            );
        }
        if world.living_count() == 0 {
            info!(tick = world.current_tick, "population extinct");
            break;
        }
    }

    let elapsed = start.elapsed();
    info!(
        births = stats.births,
        deaths = stats.deaths,
        interactions = stats.interactions,
        tasks_completed = stats.completed,
        tasks_abandoned = stats.abandoned,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "run complete"
    );

    if let Some(path) = &args.save {
        world.snapshot().save(path)?;
    }
    Ok(())
}
