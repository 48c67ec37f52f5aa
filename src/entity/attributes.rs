//! Stats and skills
//!
//! Stats are derived once from the genome and stay largely fixed. Skills
//! start from aptitude and grow through practice, with diminishing returns
//! as the level approaches the configured ceiling.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::config::SkillConfig;
use crate::genetics::{Aptitudes, Genome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl StatKind {
    pub const ALL: [StatKind; 6] = [
        StatKind::Strength,
        StatKind::Dexterity,
        StatKind::Constitution,
        StatKind::Intelligence,
        StatKind::Wisdom,
        StatKind::Charisma,
    ];

    fn aptitude(&self, aptitudes: &Aptitudes) -> f32 {
        match self {
            StatKind::Strength | StatKind::Dexterity | StatKind::Constitution => aptitudes.physical,
            StatKind::Intelligence | StatKind::Wisdom => aptitudes.mental,
            StatKind::Charisma => aptitudes.social,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillKind {
    Foraging,
    Crafting,
    Building,
    Healing,
    Trading,
    Socializing,
}

impl SkillKind {
    pub const ALL: [SkillKind; 6] = [
        SkillKind::Foraging,
        SkillKind::Crafting,
        SkillKind::Building,
        SkillKind::Healing,
        SkillKind::Trading,
        SkillKind::Socializing,
    ];

    /// Governing aptitude
    pub fn aptitude(&self, aptitudes: &Aptitudes) -> f32 {
        match self {
            SkillKind::Foraging | SkillKind::Building => aptitudes.physical,
            SkillKind::Crafting => aptitudes.crafting,
            SkillKind::Healing => aptitudes.mental,
            SkillKind::Trading | SkillKind::Socializing => aptitudes.social,
        }
    }
}

/// Something a goal, task or job can demand of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Stat(StatKind),
    Skill(SkillKind),
}

/// Minimum level of one attribute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub attribute: Attribute,
    pub minimum: f32,
}

impl Requirement {
    pub fn new(attribute: Attribute, minimum: f32) -> Self {
        Self { attribute, minimum }
    }
}

pub type Stats = BTreeMap<StatKind, f32>;
pub type Skills = BTreeMap<SkillKind, f32>;

/// `50 + aptitude * 50` for every stat
pub fn derive_stats(genome: &Genome) -> Stats {
    StatKind::ALL
        .into_iter()
        .map(|stat| (stat, 50.0 + stat.aptitude(&genome.aptitudes) * 50.0))
        .collect()
}

/// Starting skills: `aptitude * 10`
pub fn initial_skills(genome: &Genome) -> Skills {
    SkillKind::ALL
        .into_iter()
        .map(|skill| (skill, skill.aptitude(&genome.aptitudes) * 10.0))
        .collect()
}

/// Read-only view over an agent's stats and skills
#[derive(Debug, Clone, Copy)]
pub struct Profile<'a> {
    pub stats: &'a Stats,
    pub skills: &'a Skills,
}

impl<'a> Profile<'a> {
    pub fn level(&self, attribute: Attribute) -> f32 {
        match attribute {
            Attribute::Stat(stat) => self.stats.get(&stat).copied().unwrap_or(0.0),
            Attribute::Skill(skill) => self.skills.get(&skill).copied().unwrap_or(0.0),
        }
    }

    pub fn meets(&self, requirement: &Requirement) -> bool {
        self.level(requirement.attribute) >= requirement.minimum
    }

    pub fn meets_all(&self, requirements: &[Requirement]) -> bool {
        requirements.iter().all(|r| self.meets(r))
    }

    /// Highest skill; ties resolve to the earliest skill kind
    pub fn strongest_skill(&self) -> Option<(SkillKind, f32)> {
        self.skills
            .iter()
            .map(|(&k, &v)| (k, v))
            .fold(None, |best, (kind, level)| match best {
                Some((_, best_level)) if best_level >= level => best,
                _ => Some((kind, level)),
            })
    }
}

/// XP gained by one tick of practice
///
/// `base_xp_gain * (0.5 + aptitude) / (1 + level_multiplier * level / max_level)`
pub fn practice_gain(level: f32, aptitude: f32, config: &SkillConfig) -> f32 {
    let slowdown = 1.0 + config.level_multiplier * (level / config.max_level);
    config.base_xp_gain * (0.5 + aptitude) / slowdown
}

/// Apply one tick of practice; returns the new level
pub fn practice(skills: &mut Skills, skill: SkillKind, aptitudes: &Aptitudes, config: &SkillConfig) -> f32 {
    let level = skills.entry(skill).or_insert(0.0);
    let gain = practice_gain(*level, skill.aptitude(aptitudes), config);
    *level = (*level + gain).min(config.max_level);
    *level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome_with(physical: f32, social: f32) -> Genome {
        let mut g = Genome::default();
        g.aptitudes.physical = physical;
        g.aptitudes.social = social;
        g
    }

    #[test]
    fn test_stats_derive_from_aptitude() {
        let stats = derive_stats(&genome_with(1.0, 0.0));
        assert_eq!(stats[&StatKind::Strength], 100.0);
        assert_eq!(stats[&StatKind::Charisma], 50.0);
        assert_eq!(stats[&StatKind::Intelligence], 75.0);
    }

    #[test]
    fn test_initial_skills() {
        let skills = initial_skills(&genome_with(0.8, 0.3));
        assert!((skills[&SkillKind::Foraging] - 8.0).abs() < 1e-5);
        assert!((skills[&SkillKind::Trading] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_practice_has_diminishing_returns() {
        let config = SkillConfig::default();
        let early = practice_gain(0.0, 0.5, &config);
        let late = practice_gain(90.0, 0.5, &config);
        assert!((early - 1.0).abs() < 1e-6);
        assert!(late < early);
    }

    #[test]
    fn test_practice_is_capped() {
        let config = SkillConfig::default();
        let genome = genome_with(1.0, 1.0);
        let mut skills = initial_skills(&genome);
        skills.insert(SkillKind::Building, 99.9);
        let level = practice(&mut skills, SkillKind::Building, &genome.aptitudes, &config);
        assert_eq!(level, 100.0);
    }

    #[test]
    fn test_profile_requirements() {
        let genome = genome_with(0.5, 0.5);
        let stats = derive_stats(&genome);
        let skills = initial_skills(&genome);
        let profile = Profile { stats: &stats, skills: &skills };

        assert!(profile.meets(&Requirement::new(Attribute::Stat(StatKind::Strength), 75.0)));
        assert!(!profile.meets(&Requirement::new(Attribute::Stat(StatKind::Strength), 75.1)));
        assert!(!profile.meets(&Requirement::new(Attribute::Skill(SkillKind::Healing), 6.0)));
    }

    #[test]
    fn test_strongest_skill() {
        let mut genome = genome_with(0.2, 0.9);
        genome.aptitudes.crafting = 0.1;
        genome.aptitudes.mental = 0.1;
        let stats = derive_stats(&genome);
        let skills = initial_skills(&genome);
        let profile = Profile { stats: &stats, skills: &skills };
        // Trading and Socializing tie on social aptitude; Trading comes first
        assert_eq!(profile.strongest_skill().map(|(k, _)| k), Some(SkillKind::Trading));
    }
}
