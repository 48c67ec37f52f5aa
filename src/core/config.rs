//! Simulation configuration with documented constants
//!
//! All tunables are collected here. A `SimulationConfig` is built once,
//! validated, and then handed by reference to every component.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ArcError, Result};
use crate::core::types::Tick;
use crate::entity::needs::{NeedKind, NeedTable};

/// Range, decay and urgency rank of a single need
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeedConfig {
    pub min: f32,
    pub max: f32,
    /// Amount subtracted every tick
    pub decay: f32,
    /// Urgency rank, lower is more urgent (health = 1)
    pub priority: u32,
}

impl NeedConfig {
    pub fn new(min: f32, max: f32, decay: f32, priority: u32) -> Self {
        Self { min, max, decay, priority }
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Normalised position of `value` in `[min, max]`
    #[inline]
    pub fn fill(&self, value: f32) -> f32 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// Skill progression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    /// XP gained per tick of practice at aptitude 0.5 and level 0
    pub base_xp_gain: f32,
    /// How strongly the current level slows further gains
    pub level_multiplier: f32,
    pub max_level: f32,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            base_xp_gain: 1.0,
            level_multiplier: 1.5,
            max_level: 100.0,
        }
    }
}

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === SPATIAL SYSTEM ===
    /// Edge length of a spatial index cell (world units)
    pub cell_size: i32,

    /// Radius used to discover interaction partners
    ///
    /// Discovery uses cell membership, so agents up to one cell beyond
    /// this radius may be offered as candidates.
    pub interaction_radius: i32,

    /// Exact radius searched when a socialize task picks a partner
    pub socialize_search_radius: i32,

    // === NEED SYSTEM ===
    #[serde(with = "need_table")]
    pub needs: NeedTable,

    /// Need restored when a consume task completes
    pub consume_restore: f32,

    /// Energy restored per tick of resting
    pub rest_restore: f32,

    pub skills: SkillConfig,

    // === MEMORY SYSTEM ===
    /// Memories older than this are only kept by an importance-weighted draw
    pub memory_horizon: Tick,

    /// Hard cap on memories per agent
    pub max_memories: usize,

    /// Two memories merge only if their emotional impact differs by less
    pub consolidation_tolerance: f32,

    /// Number of most recent memories averaged by the impact score
    pub impact_window: usize,

    // === GOAL SYSTEM ===
    /// Needs below this fraction of their max generate satisfy goals
    pub urgency_fraction: f32,

    /// Needs below this fraction can interrupt an active task
    pub abandon_fraction: f32,

    /// Only needs ranked strictly more urgent than this may interrupt
    pub abandon_priority_rank: u32,

    /// Per-tick chance of an improve-skill goal
    pub skill_goal_chance: f32,

    /// Levels above the current skill an improve-skill goal asks for
    pub skill_goal_step: f32,

    pub skill_goal_priority: f32,

    /// Extraversion above which agents want company
    pub socialize_extraversion: f32,

    /// Social need fraction below which extraverts seek company
    pub socialize_social_fraction: f32,

    pub socialize_priority: f32,

    pub work_priority: f32,

    /// Goals retained per agent after prioritisation
    pub max_goals: usize,

    // === SOCIAL SYSTEM ===
    /// Per-tick multiplier applied to relationships without fresh interactions
    pub relationship_decay: f32,

    /// Relationship strength above which a couple may have children
    pub reproduction_strength: f32,

    /// Per-tick birth chance for an eligible couple
    pub reproduction_chance: f32,

    /// Standard deviation of the interaction outcome noise
    pub outcome_noise: f32,

    /// Interaction records kept per relationship
    pub interaction_log_cap: usize,

    /// Social need gained by both sides of an interaction
    pub social_need_gain: f32,

    // === GENETICS ===
    /// Standard deviation of per-trait mutation on crossover
    pub mutation_rate: f32,

    // === PARALLELIZATION ===
    /// Minimum living agents before per-agent phases run on rayon
    pub parallel_threshold: usize,

    /// Seed for every random stream in the world
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let mut needs = NeedTable::new();
        needs.insert(NeedKind::Health, NeedConfig::new(0.0, 100.0, 0.0, 1));
        needs.insert(NeedKind::Thirst, NeedConfig::new(0.0, 100.0, 0.1, 2));
        needs.insert(NeedKind::Hunger, NeedConfig::new(0.0, 100.0, 0.05, 3));
        needs.insert(NeedKind::Energy, NeedConfig::new(0.0, 100.0, 0.04, 6));
        needs.insert(NeedKind::Morale, NeedConfig::new(0.0, 100.0, 0.01, 10));
        needs.insert(NeedKind::Social, NeedConfig::new(-100.0, 100.0, 0.02, 15));

        Self {
            cell_size: 10,
            interaction_radius: 5,
            socialize_search_radius: 20,

            needs,
            consume_restore: 50.0,
            rest_restore: 2.0,
            skills: SkillConfig::default(),

            memory_horizon: 10_000,
            max_memories: 1000,
            consolidation_tolerance: 0.3,
            impact_window: 10,

            urgency_fraction: 0.3,
            abandon_fraction: 0.2,
            abandon_priority_rank: 3,
            skill_goal_chance: 0.1,
            skill_goal_step: 10.0,
            skill_goal_priority: 0.5,
            socialize_extraversion: 0.6,
            socialize_social_fraction: 0.7,
            socialize_priority: 0.6,
            work_priority: 0.4,
            max_goals: 5,

            relationship_decay: 0.99,
            reproduction_strength: 0.8,
            reproduction_chance: 0.01,
            outcome_noise: 0.1,
            interaction_log_cap: 32,
            social_need_gain: 10.0,

            mutation_rate: 0.1,

            parallel_threshold: 1000,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn need(&self, kind: NeedKind) -> Result<&NeedConfig> {
        self.needs.get(&kind).ok_or(ArcError::UnknownNeed(kind))
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        for kind in NeedKind::REQUIRED {
            self.need(kind)?;
        }

        for (kind, cfg) in &self.needs {
            if cfg.min >= cfg.max {
                return Err(ArcError::Config(format!(
                    "need {} has min ({}) >= max ({})",
                    kind.name(),
                    cfg.min,
                    cfg.max
                )));
            }
            if cfg.decay < 0.0 {
                return Err(ArcError::Config(format!(
                    "need {} has negative decay ({})",
                    kind.name(),
                    cfg.decay
                )));
            }
        }

        if self.cell_size <= 0 {
            return Err(ArcError::Config("cell_size must be positive".into()));
        }
        if self.interaction_radius <= 0 || self.socialize_search_radius <= 0 {
            return Err(ArcError::Config("search radii must be positive".into()));
        }
        if self.max_memories == 0 || self.max_goals == 0 || self.impact_window == 0 {
            return Err(ArcError::Config(
                "max_memories, max_goals and impact_window must be positive".into(),
            ));
        }
        if self.skills.max_level <= 0.0 {
            return Err(ArcError::Config("skills.max_level must be positive".into()));
        }

        let probabilities = [
            ("skill_goal_chance", self.skill_goal_chance),
            ("reproduction_chance", self.reproduction_chance),
            ("relationship_decay", self.relationship_decay),
            ("urgency_fraction", self.urgency_fraction),
            ("abandon_fraction", self.abandon_fraction),
            ("socialize_extraversion", self.socialize_extraversion),
            ("socialize_social_fraction", self.socialize_social_fraction),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ArcError::Config(format!("{} ({}) must lie in [0, 1]", name, value)));
            }
        }

        if self.mutation_rate < 0.0 || self.outcome_noise < 0.0 {
            return Err(ArcError::Config("standard deviations must be >= 0".into()));
        }
        if self.consolidation_tolerance < 0.0 {
            return Err(ArcError::Config(format!(
                "consolidation_tolerance ({}) must be >= 0",
                self.consolidation_tolerance
            )));
        }

        Ok(())
    }
}

/// Needs are written as a list of `{ kind, min, max, decay, priority }` entries
mod need_table {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::NeedConfig;
    use crate::entity::needs::{NeedKind, NeedTable};

    #[derive(Serialize, Deserialize)]
    struct NeedEntry {
        kind: NeedKind,
        min: f32,
        max: f32,
        decay: f32,
        priority: u32,
    }

    pub fn serialize<S: Serializer>(table: &NeedTable, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<NeedEntry> = table
            .iter()
            .map(|(&kind, cfg)| NeedEntry {
                kind,
                min: cfg.min,
                max: cfg.max,
                decay: cfg.decay,
                priority: cfg.priority,
            })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NeedTable, D::Error> {
        let entries = Vec::<NeedEntry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|e| (e.kind, NeedConfig::new(e.min, e.max, e.decay, e.priority)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_missing_required_need_fails_fast() {
        let mut config = SimulationConfig::default();
        config.needs.remove(&NeedKind::Morale);
        assert!(matches!(
            config.validate(),
            Err(ArcError::UnknownNeed(NeedKind::Morale))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = SimulationConfig::default();
        config.needs.insert(NeedKind::Hunger, NeedConfig::new(100.0, 0.0, 0.05, 3));
        assert!(matches!(config.validate(), Err(ArcError::Config(_))));
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        let mut config = SimulationConfig::default();
        config.reproduction_chance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_social_thresholds_and_tolerance_checked() {
        let mut config = SimulationConfig::default();
        config.socialize_extraversion = 1.2;
        assert!(matches!(config.validate(), Err(ArcError::Config(_))));

        let mut config = SimulationConfig::default();
        config.socialize_social_fraction = -0.1;
        assert!(matches!(config.validate(), Err(ArcError::Config(_))));

        let mut config = SimulationConfig::default();
        config.consolidation_tolerance = -0.3;
        assert!(matches!(config.validate(), Err(ArcError::Config(_))));
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            seed = 7
            cell_size = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.cell_size, 16);
        // Untouched fields keep their defaults
        assert_eq!(config.max_memories, 1000);
        assert_eq!(config.needs.len(), 6);
    }

    #[test]
    fn test_toml_need_table() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [[needs]]
            kind = "health"
            min = 0.0
            max = 50.0
            decay = 0.0
            priority = 1

            [[needs]]
            kind = "thirst"
            min = 0.0
            max = 100.0
            decay = 0.2
            priority = 2

            [[needs]]
            kind = "hunger"
            min = 0.0
            max = 100.0
            decay = 0.1
            priority = 3

            [[needs]]
            kind = "social"
            min = -100.0
            max = 100.0
            decay = 0.02
            priority = 15

            [[needs]]
            kind = "morale"
            min = 0.0
            max = 100.0
            decay = 0.01
            priority = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.needs.len(), 5);
        assert_eq!(config.needs[&NeedKind::Health].max, 50.0);
        assert!(!config.needs.contains_key(&NeedKind::Energy));
    }

    #[test]
    fn test_toml_missing_required_need_rejected() {
        let result = SimulationConfig::from_toml_str(
            r#"
            [[needs]]
            kind = "hunger"
            min = 0.0
            max = 100.0
            decay = 0.1
            priority = 3
            "#,
        );
        assert!(matches!(result, Err(ArcError::UnknownNeed(_))));
    }
}
