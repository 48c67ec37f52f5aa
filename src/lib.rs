//! Kinfolk - autonomous agent society simulation
//!
//! Agents with needs, genomes, goals, memories and relationships share a 2D
//! grid and decide what to do every tick.

pub mod core;
pub mod ecs;
pub mod entity;
pub mod genetics;
pub mod memory;
pub mod planning;
pub mod simulation;
pub mod social;
pub mod spatial;

pub use crate::core::config::SimulationConfig;
pub use crate::core::error::{ArcError, Result};
pub use crate::core::types::{AgentId, FamilyId, GridPos, Tick};
pub use crate::ecs::World;
pub use crate::simulation::{run_simulation_tick, Environment, SimulationEvent, Snapshot};
