//! Episodic memory records

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::types::{AgentId, GridPos, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemoryCategory {
    Social,
    Death,
    Birth,
    Work,
    Practice,
    Consumption,
}

/// A single event remembered from one agent's perspective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub timestamp: Tick,
    pub category: MemoryCategory,
    pub description: String,
    pub involved: Vec<AgentId>,
    pub location: GridPos,
    /// -1.0 (traumatic) to 1.0 (joyful)
    pub emotional_impact: f32,
    /// 0.0 to 1.0
    pub importance: f32,
    pub tags: BTreeSet<String>,
    /// How many similar memories were folded into this one
    pub repetitions: u32,
}

impl Memory {
    pub fn new(
        timestamp: Tick,
        category: MemoryCategory,
        description: impl Into<String>,
        location: GridPos,
    ) -> Self {
        Self {
            timestamp,
            category,
            description: description.into(),
            involved: Vec::new(),
            location,
            emotional_impact: 0.0,
            importance: 0.5,
            tags: BTreeSet::new(),
            repetitions: 0,
        }
    }

    pub fn with_impact(mut self, emotional_impact: f32) -> Self {
        self.emotional_impact = emotional_impact.clamp(-1.0, 1.0);
        self
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = importance.clamp(0.0, 1.0);
        self
    }

    pub fn involving(mut self, agent: AgentId) -> Self {
        if !self.involved.contains(&agent) {
            self.involved.push(agent);
        }
        self
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn involves(&self, agent: AgentId) -> bool {
        self.involved.contains(&agent)
    }

    pub fn age(&self, now: Tick) -> Tick {
        now.saturating_sub(self.timestamp)
    }

    pub fn weighted_impact(&self) -> f32 {
        self.emotional_impact * self.importance
    }

    /// Same category, a shared tag, and close emotional impact
    pub fn is_similar(&self, other: &Memory, tolerance: f32) -> bool {
        self.category == other.category
            && !self.tags.is_disjoint(&other.tags)
            && (self.emotional_impact - other.emotional_impact).abs() < tolerance
    }

    /// Fold `other` into `self`
    pub fn absorb(&mut self, other: &Memory) {
        self.importance = (self.importance + other.importance * 0.5).min(1.0);
        self.repetitions += other.repetitions + 1;
        if !self.description.starts_with("Repeatedly ") {
            self.description = format!("Repeatedly {}", lowercase_first(&self.description));
        }
        for agent in &other.involved {
            if !self.involved.contains(agent) {
                self.involved.push(*agent);
            }
        }
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
