//! Genome - inherited traits every other agent attribute derives from
//!
//! A genome is fixed once assigned. Children get a new genome by crossover:
//! each trait is the parents' mean plus bounded gaussian mutation, and colours
//! are averaged per channel.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::rng::gaussian;

/// Big-five personality dimensions (0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub extraversion: f32,
    pub conscientiousness: f32,
    pub agreeableness: f32,
    pub neuroticism: f32,
    pub openness: f32,
}

impl Personality {
    pub fn as_array(&self) -> [f32; 5] {
        [
            self.extraversion,
            self.conscientiousness,
            self.agreeableness,
            self.neuroticism,
            self.openness,
        ]
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            extraversion: 0.5,
            conscientiousness: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
            openness: 0.5,
        }
    }
}

/// Learning aptitudes (0.0-1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aptitudes {
    /// Affects: Strength, Dexterity, Constitution, Foraging, Building
    pub physical: f32,
    /// Affects: Intelligence, Wisdom, Healing
    pub mental: f32,
    /// Affects: Charisma, Trading, Socializing
    pub social: f32,
    /// Affects: Crafting
    pub crafting: f32,
    pub magical: f32,
}

impl Default for Aptitudes {
    fn default() -> Self {
        Self {
            physical: 0.5,
            mental: 0.5,
            social: 0.5,
            crafting: 0.5,
            magical: 0.5,
        }
    }
}

pub type Rgb = [u8; 3];

/// Appearance traits; height and build are normalised so 0.5 is average
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    pub height: f32,
    pub build: f32,
    pub skin_tone: Rgb,
    pub hair_color: Rgb,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            height: 0.5,
            build: 0.5,
            skin_tone: [255, 220, 177],
            hair_color: [101, 67, 33],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Genome {
    pub personality: Personality,
    pub aptitudes: Aptitudes,
    pub appearance: Appearance,
}

const SKIN_TONES: [Rgb; 5] = [
    [255, 220, 177],
    [241, 194, 125],
    [224, 172, 105],
    [198, 134, 66],
    [141, 85, 36],
];

const HAIR_COLORS: [Rgb; 5] = [
    [101, 67, 33],
    [44, 34, 43],
    [183, 166, 158],
    [222, 188, 153],
    [165, 42, 42],
];

impl Genome {
    /// Founder genome: traits scattered around the population mean
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let personality = Personality {
            extraversion: trait_value(rng),
            conscientiousness: trait_value(rng),
            agreeableness: trait_value(rng),
            neuroticism: trait_value(rng),
            openness: trait_value(rng),
        };
        let aptitudes = Aptitudes {
            physical: trait_value(rng),
            mental: trait_value(rng),
            social: trait_value(rng),
            crafting: trait_value(rng),
            magical: trait_value(rng),
        };
        let appearance = Appearance {
            height: trait_value(rng),
            build: trait_value(rng),
            skin_tone: SKIN_TONES[rng.gen_range(0..SKIN_TONES.len())],
            hair_color: HAIR_COLORS[rng.gen_range(0..HAIR_COLORS.len())],
        };

        Self { personality, aptitudes, appearance }
    }

    /// Crossover with per-trait gaussian mutation
    ///
    /// Every scalar trait is `clamp01(mean(a, b) + N(0, mutation_rate))`;
    /// colours are averaged channel by channel.
    pub fn combine<R: Rng + ?Sized>(a: &Genome, b: &Genome, mutation_rate: f32, rng: &mut R) -> Genome {
        let mut mix = |x: f32, y: f32| clamp01((x + y) / 2.0 + gaussian(rng, mutation_rate));

        let (pa, pb) = (&a.personality, &b.personality);
        let personality = Personality {
            extraversion: mix(pa.extraversion, pb.extraversion),
            conscientiousness: mix(pa.conscientiousness, pb.conscientiousness),
            agreeableness: mix(pa.agreeableness, pb.agreeableness),
            neuroticism: mix(pa.neuroticism, pb.neuroticism),
            openness: mix(pa.openness, pb.openness),
        };

        let (aa, ab) = (&a.aptitudes, &b.aptitudes);
        let aptitudes = Aptitudes {
            physical: mix(aa.physical, ab.physical),
            mental: mix(aa.mental, ab.mental),
            social: mix(aa.social, ab.social),
            crafting: mix(aa.crafting, ab.crafting),
            magical: mix(aa.magical, ab.magical),
        };

        let appearance = Appearance {
            height: mix(a.appearance.height, b.appearance.height),
            build: mix(a.appearance.build, b.appearance.build),
            skin_tone: mix_color(a.appearance.skin_tone, b.appearance.skin_tone),
            hair_color: mix_color(a.appearance.hair_color, b.appearance.hair_color),
        };

        Genome { personality, aptitudes, appearance }
    }
}

fn trait_value<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    clamp01(0.5 + gaussian(rng, 0.2))
}

#[inline]
fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

fn mix_color(a: Rgb, b: Rgb) -> Rgb {
    [
        ((a[0] as u16 + b[0] as u16) / 2) as u8,
        ((a[1] as u16 + b[1] as u16) / 2) as u8,
        ((a[2] as u16 + b[2] as u16) / 2) as u8,
    ]
}
