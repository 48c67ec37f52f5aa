pub mod environment;
pub mod lifecycle;
pub mod snapshot;
pub mod tick;

pub use environment::{Environment, JobBoard, JobSpec, JobTable, ResourceKind, ResourceLocator, StaticResourceMap};
pub use snapshot::Snapshot;
pub use tick::{run_simulation_tick, run_tick_at, SimulationEvent};
