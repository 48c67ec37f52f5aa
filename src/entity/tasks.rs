//! Tasks - the single unit of work an agent is executing

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, GridPos, Tick};
use crate::entity::attributes::{Requirement, SkillKind};
use crate::entity::goals::GoalKind;
use crate::entity::needs::NeedKind;

/// Something that can be found on the map and consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Water,
    Herbs,
}

impl ResourceKind {
    /// Resource that restores `need`, if any
    pub fn for_need(need: NeedKind) -> Option<ResourceKind> {
        match need {
            NeedKind::Hunger => Some(ResourceKind::Food),
            NeedKind::Thirst => Some(ResourceKind::Water),
            NeedKind::Health => Some(ResourceKind::Herbs),
            NeedKind::Energy | NeedKind::Social | NeedKind::Morale => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Walk to a resource and consume it
    Consume { need: NeedKind, resource: ResourceKind },
    /// Recover energy in place
    Rest,
    Practice(SkillKind),
    /// Seek out company; the interaction step supplies the effect
    Socialize,
    Work { job: String },
}

impl TaskKind {
    /// Default duration in ticks once the agent is in place
    pub fn default_duration(&self) -> f32 {
        match self {
            TaskKind::Consume { resource: ResourceKind::Water, .. } => 10.0,
            TaskKind::Consume { .. } => 20.0,
            TaskKind::Rest => 30.0,
            TaskKind::Practice(_) => 30.0,
            TaskKind::Socialize => 10.0,
            TaskKind::Work { .. } => 60.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Consume { .. } => "consume",
            TaskKind::Rest => "rest",
            TaskKind::Practice(_) => "practice",
            TaskKind::Socialize => "socialize",
            TaskKind::Work { .. } => "work",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    pub duration: f32,
    pub progress: f32,
    pub requirements: Vec<Requirement>,
    /// Where the work happens; the agent walks there first
    pub location: Option<GridPos>,
    pub target: Option<AgentId>,
    pub started: Tick,
    /// Goal this task was planned for
    pub goal: GoalKind,
}

impl Task {
    pub fn new(kind: TaskKind, goal: GoalKind, started: Tick) -> Self {
        let duration = kind.default_duration();
        Self {
            kind,
            duration,
            progress: 0.0,
            requirements: Vec::new(),
            location: None,
            target: None,
            started,
            goal,
        }
    }

    pub fn with_location(mut self, location: GridPos) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_target(mut self, target: AgentId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_requirements(mut self, requirements: Vec<Requirement>) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.duration
    }

    /// Fraction done, for reporting
    pub fn completion(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.progress / self.duration).min(1.0)
    }

    /// Whether finishing this task refills `need`
    pub fn addresses_need(&self, need: NeedKind) -> bool {
        match &self.kind {
            TaskKind::Consume { need: n, .. } => *n == need,
            TaskKind::Rest => need == NeedKind::Energy,
            TaskKind::Socialize => matches!(need, NeedKind::Social | NeedKind::Morale),
            TaskKind::Practice(_) | TaskKind::Work { .. } => false,
        }
    }
}
