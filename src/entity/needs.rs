//! Decaying physiological and social needs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::config::NeedConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedKind {
    Health,
    Thirst,
    Hunger,
    Energy,
    Social,
    Morale,
}

impl NeedKind {
    /// Needs whose depletion kills the agent
    pub const CRITICAL: [NeedKind; 3] = [NeedKind::Health, NeedKind::Thirst, NeedKind::Hunger];

    /// Needs the core reads directly; each must have a configuration entry
    pub const REQUIRED: [NeedKind; 5] = [
        NeedKind::Health,
        NeedKind::Thirst,
        NeedKind::Hunger,
        NeedKind::Social,
        NeedKind::Morale,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NeedKind::Health => "health",
            NeedKind::Thirst => "thirst",
            NeedKind::Hunger => "hunger",
            NeedKind::Energy => "energy",
            NeedKind::Social => "social",
            NeedKind::Morale => "morale",
        }
    }
}

pub type NeedTable = BTreeMap<NeedKind, NeedConfig>;

/// Current need values, one entry per configured need
///
/// Values are always kept inside the configured `[min, max]` range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeedSet {
    values: BTreeMap<NeedKind, f32>,
}

impl NeedSet {
    /// Every configured need starts full
    pub fn at_max(table: &NeedTable) -> Self {
        Self {
            values: table.iter().map(|(&kind, cfg)| (kind, cfg.max)).collect(),
        }
    }

    pub fn get(&self, kind: NeedKind) -> Option<f32> {
        self.values.get(&kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeedKind, f32)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }

    /// Set a need, clamped to its range. Unconfigured needs are ignored.
    pub fn set(&mut self, kind: NeedKind, value: f32, table: &NeedTable) -> bool {
        match (table.get(&kind), self.values.get_mut(&kind)) {
            (Some(cfg), Some(slot)) => {
                *slot = cfg.clamp(value);
                true
            }
            _ => false,
        }
    }

    pub fn adjust(&mut self, kind: NeedKind, delta: f32, table: &NeedTable) -> bool {
        match self.get(kind) {
            Some(current) => self.set(kind, current + delta, table),
            None => false,
        }
    }

    /// Apply one tick of decay to every configured need
    pub fn decay(&mut self, table: &NeedTable) {
        for (kind, value) in self.values.iter_mut() {
            if let Some(cfg) = table.get(kind) {
                *value = cfg.clamp(*value - cfg.decay);
            }
        }
    }

    /// Value as a fraction of the need's configured max (the urgency scale)
    pub fn fraction_of_max(&self, kind: NeedKind, table: &NeedTable) -> Option<f32> {
        let cfg = table.get(&kind)?;
        let value = self.get(kind)?;
        if cfg.max == 0.0 {
            return None;
        }
        Some(value / cfg.max)
    }

    /// Normalised position inside `[min, max]`: 0 = empty, 1 = full
    pub fn fill(&self, kind: NeedKind, table: &NeedTable) -> Option<f32> {
        let cfg = table.get(&kind)?;
        let value = self.get(kind)?;
        Some(cfg.fill(value))
    }

    /// Returns the first critical need sitting at or below its minimum
    pub fn depleted_critical(&self, table: &NeedTable) -> Option<NeedKind> {
        NeedKind::CRITICAL.into_iter().find(|kind| {
            match (table.get(kind), self.get(*kind)) {
                (Some(cfg), Some(value)) => value <= cfg.min,
                _ => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SimulationConfig;
    use proptest::prelude::*;

    #[test]
    fn test_needs_start_at_max() {
        let config = SimulationConfig::default();
        let needs = NeedSet::at_max(&config.needs);
        assert_eq!(needs.get(NeedKind::Hunger), Some(100.0));
        assert_eq!(needs.get(NeedKind::Social), Some(100.0));
    }

    #[test]
    fn test_decay_applies_configured_rate() {
        let config = SimulationConfig::default();
        let mut needs = NeedSet::at_max(&config.needs);
        needs.decay(&config.needs);
        assert!((needs.get(NeedKind::Thirst).unwrap() - 99.9).abs() < 1e-4);
        assert!((needs.get(NeedKind::Hunger).unwrap() - 99.95).abs() < 1e-4);
        // Health never decays on its own
        assert_eq!(needs.get(NeedKind::Health), Some(100.0));
    }

    #[test]
    fn test_set_clamps_to_range() {
        let config = SimulationConfig::default();
        let mut needs = NeedSet::at_max(&config.needs);
        needs.set(NeedKind::Social, -500.0, &config.needs);
        assert_eq!(needs.get(NeedKind::Social), Some(-100.0));
        needs.set(NeedKind::Hunger, 250.0, &config.needs);
        assert_eq!(needs.get(NeedKind::Hunger), Some(100.0));
    }

    #[test]
    fn test_unconfigured_need_is_ignored() {
        let mut config = SimulationConfig::default();
        config.needs.remove(&NeedKind::Energy);
        let mut needs = NeedSet::at_max(&config.needs);
        assert!(!needs.set(NeedKind::Energy, 10.0, &config.needs));
        assert_eq!(needs.get(NeedKind::Energy), None);
    }

    #[test]
    fn test_depleted_critical() {
        let config = SimulationConfig::default();
        let mut needs = NeedSet::at_max(&config.needs);
        assert_eq!(needs.depleted_critical(&config.needs), None);

        // Energy at zero is not fatal
        needs.set(NeedKind::Energy, 0.0, &config.needs);
        assert_eq!(needs.depleted_critical(&config.needs), None);

        needs.set(NeedKind::Thirst, 0.0, &config.needs);
        assert_eq!(needs.depleted_critical(&config.needs), Some(NeedKind::Thirst));
    }

    #[test]
    fn test_fill_uses_full_range() {
        let config = SimulationConfig::default();
        let mut needs = NeedSet::at_max(&config.needs);
        needs.set(NeedKind::Social, 0.0, &config.needs);
        // Social spans [-100, 100], so 0 is half full
        assert!((needs.fill(NeedKind::Social, &config.needs).unwrap() - 0.5).abs() < 1e-6);
        assert!((needs.fraction_of_max(NeedKind::Social, &config.needs).unwrap()).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn needs_stay_in_range_after_any_decay(ticks in 0usize..3000, start in -200.0f32..200.0) {
            let config = SimulationConfig::default();
            let mut needs = NeedSet::at_max(&config.needs);
            for kind in [NeedKind::Thirst, NeedKind::Social, NeedKind::Energy] {
                needs.set(kind, start, &config.needs);
            }
            for _ in 0..ticks {
                needs.decay(&config.needs);
            }
            for (kind, value) in needs.iter() {
                let cfg = &config.needs[&kind];
                prop_assert!(value >= cfg.min && value <= cfg.max);
            }
        }
    }
}
