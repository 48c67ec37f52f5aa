pub mod planner;

pub use planner::{AgentMind, Effect, PlanContext, Planner, TaskEvent};
