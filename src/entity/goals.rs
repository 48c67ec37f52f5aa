//! Goals - prioritised desired outcomes, re-evaluated every tick

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, Tick};
use crate::entity::attributes::{Requirement, SkillKind};
use crate::entity::needs::NeedKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GoalKind {
    SatisfyNeed(NeedKind),
    ImproveSkill(SkillKind),
    Socialize,
    Work,
}

impl GoalKind {
    pub fn label(&self) -> &'static str {
        match self {
            GoalKind::SatisfyNeed(_) => "satisfy_need",
            GoalKind::ImproveSkill(_) => "improve_skill",
            GoalKind::Socialize => "socialize",
            GoalKind::Work => "work",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub kind: GoalKind,
    pub base_priority: f32,
    /// Effective priority from the last prioritisation pass
    pub priority: f32,
    /// Agent this goal is about, if any
    pub target: Option<AgentId>,
    pub requirements: Vec<Requirement>,
    pub deadline: Option<Tick>,
    /// 0.0 to 1.0
    pub progress: f32,
}

impl Goal {
    pub fn new(kind: GoalKind, base_priority: f32) -> Self {
        Self {
            kind,
            base_priority,
            priority: base_priority,
            target: None,
            requirements: Vec::new(),
            deadline: None,
            progress: 0.0,
        }
    }

    pub fn with_target(mut self, target: AgentId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_deadline(mut self, deadline: Tick) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Fold a freshly generated copy of this goal into the existing one
    ///
    /// Requirements are fixed when the goal is first adopted, so a skill goal
    /// keeps its original target level.
    pub fn refresh(&mut self, fresh: Goal) {
        self.base_priority = fresh.base_priority;
        self.deadline = fresh.deadline;
        self.target = fresh.target;
        if self.requirements.is_empty() {
            self.requirements = fresh.requirements;
        }
    }

    /// `1 + 1/time_left` while the deadline is ahead, otherwise 1
    pub fn deadline_factor(&self, now: Tick) -> f32 {
        match self.deadline {
            Some(deadline) if deadline > now => 1.0 + 1.0 / (deadline - now) as f32,
            _ => 1.0,
        }
    }
}
