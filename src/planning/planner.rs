//! Goal & task planner
//!
//! Every living agent owns an `AgentMind`: a short prioritised goal list and
//! at most one active task. Each tick the planner:
//!
//! 1. Prunes goals that are complete or impossible
//! 2. Generates candidate goals from needs, skills, personality and job
//! 3. Scores them (`base * need * deadline * personality`) and keeps the top N
//! 4. Continues the active task, or abandons it and plans a new one
//!
//! Planning only reads world state. Everything it wants to change (moves,
//! need restoration, practice, wages, memories) comes back as `Effect`s that
//! the tick applies in a single-threaded commit phase.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::config::SimulationConfig;
use crate::core::rng::{agent_stream, Phase};
use crate::core::types::{AgentId, GridPos, Tick};
use crate::ecs::registry::AgentRegistry;
use crate::entity::attributes::{Attribute, Requirement, SkillKind};
use crate::entity::goals::{Goal, GoalKind};
use crate::entity::memory::{Memory, MemoryCategory};
use crate::entity::needs::NeedKind;
use crate::entity::tasks::{ResourceKind, Task, TaskKind};
use crate::simulation::environment::Environment;
use crate::social::graph::SocialGraph;
use crate::spatial::SpatialIndex;

/// Goals and the active task of one agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMind {
    /// Sorted by non-increasing effective priority
    pub goals: Vec<Goal>,
    pub task: Option<Task>,
}

/// Read-only view of the world used while planning
#[derive(Clone, Copy)]
pub struct PlanContext<'a> {
    pub config: &'a SimulationConfig,
    pub now: Tick,
    pub registry: &'a AgentRegistry,
    pub spatial: &'a SpatialIndex,
    pub graph: &'a SocialGraph,
    pub env: Environment<'a>,
}

/// A state change requested by planning, applied during commit
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Move(GridPos),
    RestoreNeed(NeedKind, f32),
    Practice(SkillKind),
    /// Collect one shift's wage from the job board
    Earn { job: String },
    Remember(Memory),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    UrgentNeed(NeedKind),
    RequirementLost,
    TargetGone,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Started { task: TaskKind, goal: GoalKind },
    Completed { task: TaskKind },
    Abandoned { task: TaskKind, reason: AbandonReason },
}

/// Everything one agent's planning step produced
#[derive(Debug, Clone, PartialEq)]
pub struct MindUpdate {
    pub agent: AgentId,
    pub effects: Vec<Effect>,
    pub events: Vec<TaskEvent>,
}

impl MindUpdate {
    fn new(agent: AgentId) -> Self {
        Self {
            agent,
            effects: Vec::new(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Planner {
    minds: BTreeMap<AgentId, AgentMind>,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_minds(minds: impl IntoIterator<Item = (AgentId, AgentMind)>) -> Self {
        Self {
            minds: minds.into_iter().collect(),
        }
    }

    pub fn minds(&self) -> impl Iterator<Item = (AgentId, &AgentMind)> + '_ {
        self.minds.iter().map(|(&id, mind)| (id, mind))
    }

    pub fn add_agent(&mut self, agent: AgentId) {
        self.minds.entry(agent).or_default();
    }

    pub fn remove_agent(&mut self, agent: AgentId) -> Option<AgentMind> {
        self.minds.remove(&agent)
    }

    pub fn mind(&self, agent: AgentId) -> Option<&AgentMind> {
        self.minds.get(&agent)
    }

    pub fn goals(&self, agent: AgentId) -> &[Goal] {
        self.minds.get(&agent).map(|m| m.goals.as_slice()).unwrap_or(&[])
    }

    pub fn task(&self, agent: AgentId) -> Option<&Task> {
        self.minds.get(&agent).and_then(|m| m.task.as_ref())
    }

    pub fn active_tasks(&self) -> usize {
        self.minds.values().filter(|m| m.task.is_some()).count()
    }

    /// Run one planning step for every living agent
    ///
    /// Updates come back in ascending id order regardless of whether the
    /// parallel path was taken.
    pub fn update_all(&mut self, ctx: &PlanContext<'_>) -> Vec<MindUpdate> {
        let step_one = |(&agent, mind): (&AgentId, &mut AgentMind)| {
            let idx = ctx.registry.living_index(agent)?;
            Some(step(agent, idx, mind, ctx))
        };

        if ctx.registry.living_count() >= ctx.config.parallel_threshold {
            self.minds.par_iter_mut().filter_map(step_one).collect()
        } else {
            self.minds.iter_mut().filter_map(step_one).collect()
        }
    }

    /// Planning step for a single agent; `None` for unknown or dead agents
    pub fn update_agent(&mut self, agent: AgentId, ctx: &PlanContext<'_>) -> Option<MindUpdate> {
        let idx = ctx.registry.living_index(agent)?;
        let mind = self.minds.entry(agent).or_default();
        Some(step(agent, idx, mind, ctx))
    }
}

fn step(agent: AgentId, idx: usize, mind: &mut AgentMind, ctx: &PlanContext<'_>) -> MindUpdate {
    let mut update = MindUpdate::new(agent);
    update_goals(agent, idx, mind, ctx);
    decide(agent, idx, mind, ctx, &mut update);
    update
}

// ============================================================================
// GOALS
// ============================================================================

fn update_goals(agent: AgentId, idx: usize, mind: &mut AgentMind, ctx: &PlanContext<'_>) {
    mind.goals
        .retain(|goal| !is_complete(goal, idx, ctx) && !is_impossible(goal, idx, ctx));

    let mut rng = agent_stream(ctx.config.seed, ctx.now, agent, Phase::GoalGeneration);
    for fresh in generate_goals(idx, ctx, &mut rng) {
        if is_complete(&fresh, idx, ctx) || is_impossible(&fresh, idx, ctx) {
            continue;
        }
        match mind
            .goals
            .iter_mut()
            .find(|g| g.kind == fresh.kind && g.target == fresh.target)
        {
            Some(existing) => existing.refresh(fresh),
            None => mind.goals.push(fresh),
        }
    }

    for goal in mind.goals.iter_mut() {
        goal.priority = effective_priority(goal, idx, ctx);
    }
    mind.goals.sort_by_key(|g| Reverse(OrderedFloat(g.priority)));
    mind.goals.truncate(ctx.config.max_goals);
}

/// Candidate goals for the agent in slot `idx`
pub fn generate_goals<R: Rng + ?Sized>(idx: usize, ctx: &PlanContext<'_>, rng: &mut R) -> Vec<Goal> {
    let config = ctx.config;
    let registry = ctx.registry;
    let needs = &registry.needs[idx];
    let profile = registry.profile(idx);
    let personality = &registry.genomes[idx].personality;
    let mut goals = Vec::new();

    for (kind, value) in needs.iter() {
        let (Some(cfg), Some(fraction), Some(fill)) = (
            config.needs.get(&kind),
            needs.fraction_of_max(kind, &config.needs),
            needs.fill(kind, &config.needs),
        ) else {
            continue;
        };
        if fraction >= config.urgency_fraction {
            continue;
        }
        let mut goal = Goal::new(GoalKind::SatisfyNeed(kind), 1.0 - fill);
        if cfg.decay > 0.0 {
            let ticks_left = ((value - cfg.min) / cfg.decay).ceil().max(0.0) as Tick;
            goal = goal.with_deadline(ctx.now + ticks_left);
        }
        goals.push(goal);
    }

    // Always draw so the stream advances the same way every tick
    let roll: f32 = rng.gen();
    if roll < config.skill_goal_chance {
        if let Some((skill, level)) = profile.strongest_skill() {
            goals.push(
                Goal::new(GoalKind::ImproveSkill(skill), config.skill_goal_priority).with_requirement(
                    Requirement::new(Attribute::Skill(skill), level + config.skill_goal_step),
                ),
            );
        }
    }

    let social = needs.fraction_of_max(NeedKind::Social, &config.needs);
    if personality.extraversion > config.socialize_extraversion
        && social.is_some_and(|s| s < config.socialize_social_fraction)
    {
        goals.push(Goal::new(GoalKind::Socialize, config.socialize_priority));
    }

    if let Some(job) = registry.jobs[idx].as_deref() {
        if ctx.env.jobs.qualifies(profile, job) {
            let mut goal = Goal::new(GoalKind::Work, config.work_priority);
            goal.requirements = ctx.env.jobs.requirements(job);
            goals.push(goal);
        }
    }

    goals
}

pub fn is_complete(goal: &Goal, idx: usize, ctx: &PlanContext<'_>) -> bool {
    if goal.progress >= 1.0 {
        return true;
    }
    let config = ctx.config;
    let needs = &ctx.registry.needs[idx];
    match goal.kind {
        GoalKind::SatisfyNeed(kind) => needs
            .fraction_of_max(kind, &config.needs)
            .map_or(true, |f| f >= config.urgency_fraction),
        GoalKind::Socialize => needs
            .fraction_of_max(NeedKind::Social, &config.needs)
            .map_or(true, |f| f >= config.socialize_social_fraction),
        GoalKind::ImproveSkill(_) => {
            !goal.requirements.is_empty() && ctx.registry.profile(idx).meets_all(&goal.requirements)
        }
        GoalKind::Work => false,
    }
}

pub fn is_impossible(goal: &Goal, idx: usize, ctx: &PlanContext<'_>) -> bool {
    if let Some(target) = goal.target {
        if !ctx.registry.is_alive(target) {
            return true;
        }
    }
    match goal.kind {
        GoalKind::ImproveSkill(_) => goal
            .requirements
            .iter()
            .any(|r| r.minimum > ctx.config.skills.max_level),
        GoalKind::Work => match ctx.registry.jobs[idx].as_deref() {
            Some(job) => !ctx.env.jobs.qualifies(ctx.registry.profile(idx), job),
            None => true,
        },
        GoalKind::SatisfyNeed(_) | GoalKind::Socialize => false,
    }
}

/// `base * need_factor * deadline_factor * personality_factor`
pub fn effective_priority(goal: &Goal, idx: usize, ctx: &PlanContext<'_>) -> f32 {
    let registry = ctx.registry;
    let personality = &registry.genomes[idx].personality;

    let need_factor = match goal.kind {
        GoalKind::SatisfyNeed(kind) => registry.needs[idx]
            .fill(kind, &ctx.config.needs)
            .map_or(1.0, |fill| 1.0 - fill),
        _ => 1.0,
    };
    let personality_factor = match goal.kind {
        GoalKind::Socialize => personality.extraversion,
        GoalKind::ImproveSkill(_) => personality.conscientiousness,
        GoalKind::SatisfyNeed(_) | GoalKind::Work => 1.0,
    };

    goal.base_priority * need_factor * goal.deadline_factor(ctx.now) * personality_factor
}

/// Needs low enough, and ranked urgent enough, to interrupt other work
///
/// Most urgent first.
pub fn urgent_needs(idx: usize, ctx: &PlanContext<'_>) -> Vec<NeedKind> {
    let config = ctx.config;
    let needs = &ctx.registry.needs[idx];
    let mut urgent: Vec<(u32, NeedKind)> = needs
        .iter()
        .filter_map(|(kind, _)| {
            let cfg = config.needs.get(&kind)?;
            let fraction = needs.fraction_of_max(kind, &config.needs)?;
            (fraction < config.abandon_fraction && cfg.priority < config.abandon_priority_rank)
                .then_some((cfg.priority, kind))
        })
        .collect();
    urgent.sort_unstable();
    urgent.into_iter().map(|(_, kind)| kind).collect()
}

// ============================================================================
// TASKS
// ============================================================================

fn decide(agent: AgentId, idx: usize, mind: &mut AgentMind, ctx: &PlanContext<'_>, update: &mut MindUpdate) {
    if let Some(task) = mind.task.as_ref() {
        match abandon_reason(task, idx, ctx) {
            None => {
                continue_task(idx, mind, ctx, update);
                return;
            }
            Some(reason) => {
                debug!(agent = %agent, task = task.kind.label(), ?reason, "task abandoned");
                update.events.push(TaskEvent::Abandoned {
                    task: task.kind.clone(),
                    reason,
                });
                mind.task = None;
            }
        }
    }

    let Some(goal) = choose_goal(mind, idx, ctx) else {
        return;
    };
    if let Some(task) = plan_task(goal, agent, idx, ctx) {
        update.events.push(TaskEvent::Started {
            task: task.kind.clone(),
            goal: goal.kind,
        });
        mind.task = Some(task);
    }
}

/// Top goal, except that a goal serving an urgent need jumps the queue
fn choose_goal<'m>(mind: &'m AgentMind, idx: usize, ctx: &PlanContext<'_>) -> Option<&'m Goal> {
    let urgent = urgent_needs(idx, ctx);
    mind.goals
        .iter()
        .find(|g| matches!(g.kind, GoalKind::SatisfyNeed(k) if urgent.contains(&k)))
        .or_else(|| mind.goals.first())
}

pub fn abandon_reason(task: &Task, idx: usize, ctx: &PlanContext<'_>) -> Option<AbandonReason> {
    let urgent = urgent_needs(idx, ctx);
    if let Some(&need) = urgent.first() {
        if !urgent.iter().any(|&n| task.addresses_need(n)) {
            return Some(AbandonReason::UrgentNeed(need));
        }
    }
    if !ctx.registry.profile(idx).meets_all(&task.requirements) {
        return Some(AbandonReason::RequirementLost);
    }
    if let Some(target) = task.target {
        if !ctx.registry.is_alive(target) {
            return Some(AbandonReason::TargetGone);
        }
    }
    None
}

/// Concrete task for `goal`, or `None` when nothing can be done this tick
pub fn plan_task(goal: &Goal, agent: AgentId, idx: usize, ctx: &PlanContext<'_>) -> Option<Task> {
    let now = ctx.now;
    let position = ctx.registry.positions[idx];

    match goal.kind {
        GoalKind::SatisfyNeed(need) => match ResourceKind::for_need(need) {
            Some(resource) => {
                let site = ctx.env.resources.find_nearest(resource, position)?;
                Some(Task::new(TaskKind::Consume { need, resource }, goal.kind, now).with_location(site))
            }
            None => match need {
                NeedKind::Energy => Some(Task::new(TaskKind::Rest, goal.kind, now)),
                NeedKind::Social | NeedKind::Morale => plan_socialize(goal, agent, position, ctx),
                NeedKind::Health | NeedKind::Thirst | NeedKind::Hunger => None,
            },
        },
        GoalKind::ImproveSkill(skill) => Some(Task::new(TaskKind::Practice(skill), goal.kind, now)),
        GoalKind::Socialize => plan_socialize(goal, agent, position, ctx),
        GoalKind::Work => {
            let job = ctx.registry.jobs[idx].clone()?;
            let requirements = ctx.env.jobs.requirements(&job);
            Some(Task::new(TaskKind::Work { job }, goal.kind, now).with_requirements(requirements))
        }
    }
}

/// Walk toward the best-liked living agent within the search radius
///
/// Ties on relationship strength go to the nearest, then the lowest id.
fn plan_socialize(goal: &Goal, agent: AgentId, position: GridPos, ctx: &PlanContext<'_>) -> Option<Task> {
    let registry = ctx.registry;
    let partner = match goal.target.filter(|&t| t != agent && registry.is_alive(t)) {
        Some(target) => target,
        None => ctx
            .spatial
            .query_within(position, ctx.config.socialize_search_radius, |id| registry.position(id))
            .into_iter()
            .filter(|&other| other != agent)
            .max_by_key(|&other| {
                let distance = registry
                    .position(other)
                    .map_or(i64::MAX, |p| p.distance_sq(&position));
                (
                    OrderedFloat(ctx.graph.strength(agent, other)),
                    Reverse(distance),
                    Reverse(other),
                )
            })?,
    };
    let location = registry.position(partner)?;
    Some(
        Task::new(TaskKind::Socialize, goal.kind, ctx.now)
            .with_location(location)
            .with_target(partner),
    )
}

fn continue_task(idx: usize, mind: &mut AgentMind, ctx: &PlanContext<'_>, update: &mut MindUpdate) {
    let Some(task) = mind.task.as_mut() else {
        return;
    };
    let config = ctx.config;
    let position = ctx.registry.positions[idx];

    if let Some(location) = task.location {
        if position != location {
            update.effects.push(Effect::Move(position.step_toward(&location)));
            return;
        }
    }

    task.progress += 1.0;
    match &task.kind {
        TaskKind::Rest => update
            .effects
            .push(Effect::RestoreNeed(NeedKind::Energy, config.rest_restore)),
        TaskKind::Practice(skill) => update.effects.push(Effect::Practice(*skill)),
        TaskKind::Consume { .. } | TaskKind::Socialize | TaskKind::Work { .. } => {}
    }

    let completion = task.completion();
    let goal_kind = task.goal;
    if let Some(goal) = mind.goals.iter_mut().find(|g| g.kind == goal_kind) {
        goal.progress = goal.progress.max(completion);
    }

    if task.is_complete() {
        let finished = mind.task.take();
        if let Some(task) = finished {
            finish_task(&task, position, ctx, update);
            update.events.push(TaskEvent::Completed { task: task.kind });
        }
    }
}

fn finish_task(task: &Task, position: GridPos, ctx: &PlanContext<'_>, update: &mut MindUpdate) {
    let config = ctx.config;
    let now = ctx.now;
    match &task.kind {
        TaskKind::Consume { need, resource } => {
            update
                .effects
                .push(Effect::RestoreNeed(*need, config.consume_restore));
            let description = match resource {
                ResourceKind::Food => "Ate a meal",
                ResourceKind::Water => "Drank fresh water",
                ResourceKind::Herbs => "Treated wounds with herbs",
            };
            update.effects.push(Effect::Remember(
                Memory::new(now, MemoryCategory::Consumption, description, position)
                    .with_impact(0.1)
                    .with_importance(0.2)
                    .tagged("consumption")
                    .tagged(need.name()),
            ));
        }
        TaskKind::Practice(skill) => {
            update.effects.push(Effect::Remember(
                Memory::new(now, MemoryCategory::Practice, format!("Practised {:?}", skill), position)
                    .with_impact(0.1)
                    .with_importance(0.2)
                    .tagged("practice"),
            ));
        }
        TaskKind::Work { job } => {
            update.effects.push(Effect::Earn { job: job.clone() });
            if let Some(skill) = ctx.env.jobs.skill(job) {
                update.effects.push(Effect::Practice(skill));
            }
            update.effects.push(Effect::Remember(
                Memory::new(now, MemoryCategory::Work, format!("Worked a shift as {}", job), position)
                    .with_impact(0.2)
                    .with_importance(0.3)
                    .tagged("work")
                    .tagged(job.as_str()),
            ));
        }
        TaskKind::Rest | TaskKind::Socialize => {}
    }
}
