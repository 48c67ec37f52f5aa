pub mod registry;
pub mod world;

pub use registry::{AgentRecord, AgentRegistry};
pub use world::World;
