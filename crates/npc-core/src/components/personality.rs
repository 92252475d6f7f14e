//! Personality Model
//!
//! Fixed trait vector owned by each agent. Every value lies in [0, 1];
//! construction clamps, and nothing mutates a personality afterwards.

use bevy_ecs::prelude::*;
use npc_events::TraitsSnapshot;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SimError;

/// Agent personality traits - fixed at creation
/// All values are 0.0 to 1.0
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Drive toward status and leadership
    pub ambition: f32,
    /// Willingness to follow and stay bound to others
    pub loyalty: f32,
    /// Frequency of voluntary interaction
    pub sociability: f32,
    /// Readiness to use violence
    pub aggression: f32,
    /// Willingness to face stronger opponents
    pub courage: f32,
    /// Appetite for gold
    pub greed: f32,
    /// How strongly harm is remembered and answered
    pub vengefulness: f32,
    /// Tendency to act on a new goal at once
    pub impulsiveness: f32,
}

impl Default for Personality {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

impl Personality {
    /// Build from explicit values, clamped into [0, 1].
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ambition: f32,
        loyalty: f32,
        sociability: f32,
        aggression: f32,
        courage: f32,
        greed: f32,
        vengefulness: f32,
        impulsiveness: f32,
    ) -> Self {
        Self {
            ambition: clamp_trait(ambition),
            loyalty: clamp_trait(loyalty),
            sociability: clamp_trait(sociability),
            aggression: clamp_trait(aggression),
            courage: clamp_trait(courage),
            greed: clamp_trait(greed),
            vengefulness: clamp_trait(vengefulness),
            impulsiveness: clamp_trait(impulsiveness),
        }
    }

    /// Every trait set to the same value.
    pub fn uniform(value: f32) -> Self {
        let v = clamp_trait(value);
        Self::new(v, v, v, v, v, v, v, v)
    }

    pub fn with_ambition(mut self, value: f32) -> Self {
        self.ambition = clamp_trait(value);
        self
    }

    pub fn with_loyalty(mut self, value: f32) -> Self {
        self.loyalty = clamp_trait(value);
        self
    }

    pub fn with_sociability(mut self, value: f32) -> Self {
        self.sociability = clamp_trait(value);
        self
    }

    pub fn with_aggression(mut self, value: f32) -> Self {
        self.aggression = clamp_trait(value);
        self
    }

    pub fn with_courage(mut self, value: f32) -> Self {
        self.courage = clamp_trait(value);
        self
    }

    pub fn with_greed(mut self, value: f32) -> Self {
        self.greed = clamp_trait(value);
        self
    }

    pub fn with_vengefulness(mut self, value: f32) -> Self {
        self.vengefulness = clamp_trait(value);
        self
    }

    pub fn with_impulsiveness(mut self, value: f32) -> Self {
        self.impulsiveness = clamp_trait(value);
        self
    }

    /// Sample a personality from an archetype's trait ranges.
    ///
    /// Each trait is the mean of two uniform draws inside the range, which
    /// keeps most agents near the archetype's center.
    pub fn generate_random(archetype: Archetype, rng: &mut impl Rng) -> Self {
        let ranges = archetype.trait_ranges();
        let mut sample = |(lo, hi): (f32, f32)| {
            let a: f32 = rng.gen_range(lo..=hi);
            let b: f32 = rng.gen_range(lo..=hi);
            (a + b) / 2.0
        };
        Self::new(
            sample(ranges.ambition),
            sample(ranges.loyalty),
            sample(ranges.sociability),
            sample(ranges.aggression),
            sample(ranges.courage),
            sample(ranges.greed),
            sample(ranges.vengefulness),
            sample(ranges.impulsiveness),
        )
    }

    /// Combined appetite for gold and advancement.
    pub fn wealth_drive(&self) -> f32 {
        self.greed * (0.5 + self.ambition)
    }

    pub fn to_snapshot(&self) -> TraitsSnapshot {
        TraitsSnapshot {
            ambition: self.ambition,
            loyalty: self.loyalty,
            sociability: self.sociability,
            aggression: self.aggression,
            courage: self.courage,
            greed: self.greed,
            vengefulness: self.vengefulness,
            impulsiveness: self.impulsiveness,
        }
    }
}

fn clamp_trait(value: f32) -> f32 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Named personality template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Thug,
    Merchant,
    Guard,
    Commoner,
    Noble,
    Drifter,
}

/// (min, max) sampling range per trait
#[derive(Debug, Clone, Copy)]
pub struct TraitRanges {
    pub ambition: (f32, f32),
    pub loyalty: (f32, f32),
    pub sociability: (f32, f32),
    pub aggression: (f32, f32),
    pub courage: (f32, f32),
    pub greed: (f32, f32),
    pub vengefulness: (f32, f32),
    pub impulsiveness: (f32, f32),
}

impl Archetype {
    pub fn all() -> &'static [Archetype] {
        &[
            Archetype::Thug,
            Archetype::Merchant,
            Archetype::Guard,
            Archetype::Commoner,
            Archetype::Noble,
            Archetype::Drifter,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Thug => "thug",
            Archetype::Merchant => "merchant",
            Archetype::Guard => "guard",
            Archetype::Commoner => "commoner",
            Archetype::Noble => "noble",
            Archetype::Drifter => "drifter",
        }
    }

    pub fn trait_ranges(&self) -> TraitRanges {
        match self {
            Archetype::Thug => TraitRanges {
                ambition: (0.4, 0.8),
                loyalty: (0.3, 0.7),
                sociability: (0.3, 0.6),
                aggression: (0.65, 0.95),
                courage: (0.5, 0.9),
                greed: (0.5, 0.85),
                vengefulness: (0.6, 0.95),
                impulsiveness: (0.5, 0.9),
            },
            Archetype::Merchant => TraitRanges {
                ambition: (0.5, 0.85),
                loyalty: (0.3, 0.6),
                sociability: (0.5, 0.85),
                aggression: (0.05, 0.3),
                courage: (0.2, 0.5),
                greed: (0.7, 0.95),
                vengefulness: (0.2, 0.5),
                impulsiveness: (0.1, 0.4),
            },
            Archetype::Guard => TraitRanges {
                ambition: (0.3, 0.6),
                loyalty: (0.7, 0.95),
                sociability: (0.4, 0.7),
                aggression: (0.3, 0.6),
                courage: (0.65, 0.95),
                greed: (0.1, 0.4),
                vengefulness: (0.3, 0.6),
                impulsiveness: (0.1, 0.35),
            },
            Archetype::Commoner => TraitRanges {
                ambition: (0.2, 0.6),
                loyalty: (0.4, 0.8),
                sociability: (0.4, 0.8),
                aggression: (0.05, 0.35),
                courage: (0.2, 0.6),
                greed: (0.2, 0.6),
                vengefulness: (0.2, 0.6),
                impulsiveness: (0.2, 0.6),
            },
            Archetype::Noble => TraitRanges {
                ambition: (0.7, 0.95),
                loyalty: (0.2, 0.5),
                sociability: (0.5, 0.8),
                aggression: (0.1, 0.4),
                courage: (0.3, 0.6),
                greed: (0.6, 0.9),
                vengefulness: (0.5, 0.8),
                impulsiveness: (0.1, 0.3),
            },
            Archetype::Drifter => TraitRanges {
                ambition: (0.1, 0.4),
                loyalty: (0.1, 0.4),
                sociability: (0.1, 0.4),
                aggression: (0.3, 0.7),
                courage: (0.3, 0.7),
                greed: (0.3, 0.7),
                vengefulness: (0.3, 0.7),
                impulsiveness: (0.6, 0.95),
            },
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Archetype {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Archetype::all()
            .iter()
            .copied()
            .find(|a| a.as_str() == name)
            .ok_or_else(|| SimError::UnknownArchetype(s.to_string()))
    }
}
