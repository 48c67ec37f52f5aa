//! Collaborators outside the agent core: the resource map and the job catalog
//!
//! The core only consumes these through the `ResourceLocator` and `JobBoard`
//! traits. The in-crate implementations are plain lookup tables.

use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::GridPos;
use crate::entity::attributes::{Profile, Requirement, SkillKind};

pub use crate::entity::tasks::ResourceKind;

pub trait ResourceLocator: Send + Sync {
    /// Nearest known instance of `kind`, or `None` if the map has none
    fn find_nearest(&self, kind: ResourceKind, from: GridPos) -> Option<GridPos>;
}

pub trait JobBoard: Send + Sync {
    fn qualifies(&self, profile: Profile<'_>, job: &str) -> bool;

    /// Wage earned for one completed shift; 0 for unknown jobs
    fn apply(&self, profile: Profile<'_>, job: &str) -> f32;

    /// Minimum stats and skills for `job`
    fn requirements(&self, job: &str) -> Vec<Requirement>;

    /// Skill practised while working `job`
    fn skill(&self, job: &str) -> Option<SkillKind>;
}

/// Fixed resource positions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticResourceMap {
    sites: BTreeMap<ResourceKind, Vec<GridPos>>,
}

impl StaticResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ResourceKind, pos: GridPos) {
        self.sites.entry(kind).or_default().push(pos);
    }

    pub fn with(mut self, kind: ResourceKind, pos: GridPos) -> Self {
        self.add(kind, pos);
        self
    }

    pub fn sites(&self, kind: ResourceKind) -> &[GridPos] {
        self.sites.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `per_kind` sites of every resource scattered over `[-extent, extent]^2`
    pub fn scatter<R: Rng + ?Sized>(rng: &mut R, per_kind: usize, extent: i32) -> Self {
        let mut map = Self::new();
        for kind in [ResourceKind::Food, ResourceKind::Water, ResourceKind::Herbs] {
            for _ in 0..per_kind {
                let pos = GridPos::new(rng.gen_range(-extent..=extent), rng.gen_range(-extent..=extent));
                map.add(kind, pos);
            }
        }
        map
    }
}

impl ResourceLocator for StaticResourceMap {
    fn find_nearest(&self, kind: ResourceKind, from: GridPos) -> Option<GridPos> {
        self.sites(kind)
            .iter()
            .copied()
            .min_by_key(|pos| (pos.distance_sq(&from), *pos))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    pub wage: f32,
    #[serde(default)]
    pub skill: Option<SkillKind>,
}

/// Job catalog keyed by job name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobTable {
    jobs: BTreeMap<String, JobSpec>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: JobSpec) {
        self.jobs.insert(name.into(), spec);
    }

    pub fn with(mut self, name: impl Into<String>, spec: JobSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&JobSpec> {
        self.jobs.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

impl JobBoard for JobTable {
    fn qualifies(&self, profile: Profile<'_>, job: &str) -> bool {
        self.get(job)
            .map(|spec| profile.meets_all(&spec.requirements))
            .unwrap_or(false)
    }

    fn apply(&self, _profile: Profile<'_>, job: &str) -> f32 {
        self.get(job).map(|spec| spec.wage).unwrap_or(0.0)
    }

    fn requirements(&self, job: &str) -> Vec<Requirement> {
        self.get(job).map(|spec| spec.requirements.clone()).unwrap_or_default()
    }

    fn skill(&self, job: &str) -> Option<SkillKind> {
        self.get(job).and_then(|spec| spec.skill)
    }
}

/// Everything the tick borrows from outside the core
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    pub resources: &'a dyn ResourceLocator,
    pub jobs: &'a dyn JobBoard,
}

impl<'a> Environment<'a> {
    pub fn new(resources: &'a dyn ResourceLocator, jobs: &'a dyn JobBoard) -> Self {
        Self { resources, jobs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::attributes::{Attribute, Skills, StatKind, Stats};

    #[test]
    fn test_find_nearest() {
        let map = StaticResourceMap::new()
            .with(ResourceKind::Food, GridPos::new(10, 10))
            .with(ResourceKind::Food, GridPos::new(-2, 1))
            .with(ResourceKind::Water, GridPos::new(0, 1));
        assert_eq!(map.find_nearest(ResourceKind::Food, GridPos::new(0, 0)), Some(GridPos::new(-2, 1)));
        assert_eq!(map.find_nearest(ResourceKind::Herbs, GridPos::new(0, 0)), None);
    }

    #[test]
    fn test_job_table() {
        let table = JobTable::new().with(
            "smith",
            JobSpec {
                requirements: vec![Requirement::new(Attribute::Stat(StatKind::Strength), 60.0)],
                wage: 12.0,
                skill: Some(SkillKind::Crafting),
            },
        );
        let mut stats = Stats::new();
        let skills = Skills::new();
        stats.insert(StatKind::Strength, 55.0);
        assert!(!table.qualifies(Profile { stats: &stats, skills: &skills }, "smith"));
        stats.insert(StatKind::Strength, 70.0);
        let profile = Profile { stats: &stats, skills: &skills };
        assert!(table.qualifies(profile, "smith"));
        assert_eq!(table.apply(profile, "smith"), 12.0);
        assert!(!table.qualifies(profile, "baker"));
        assert_eq!(table.apply(profile, "baker"), 0.0);
    }

    #[test]
    fn test_job_table_from_toml() {
        let table = JobTable::from_toml_str(
            r#"
            [jobs.farmer]
            wage = 4.0
            skill = "Foraging"
            "#,
        )
        .unwrap();
        assert_eq!(table.skill("farmer"), Some(SkillKind::Foraging));
        assert!(table.requirements("farmer").is_empty());
    }
}
