//! Combat Resolution
//!
//! The core decides who fights whom; how a fight plays out is delegated to a
//! [`CombatResolver`]. [`SkirmishResolver`] is a simple stand-in used when
//! the embedding game does not provide one.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::Rng;

use crate::components::{AgentId, Personality, Vitals};

/// What the resolver sees of each fighter
#[derive(Debug, Clone, PartialEq)]
pub struct Combatant {
    pub id: AgentId,
    pub level: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub aggression: f32,
    pub courage: f32,
}

impl Combatant {
    pub fn new(id: AgentId, vitals: &Vitals, personality: &Personality) -> Self {
        Self {
            id,
            level: vitals.level,
            hp: vitals.hp,
            max_hp: vitals.max_hp,
            aggression: personality.aggression,
            courage: personality.courage,
        }
    }
}

/// Result of one fight. `damage` is dealt to the loser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatOutcome {
    pub winner: AgentId,
    pub loser: AgentId,
    pub damage: i32,
}

/// External combat mechanics
pub trait CombatResolver: Send + Sync {
    fn resolve_combat(
        &self,
        attacker: &Combatant,
        defender: &Combatant,
        rng: &mut SmallRng,
    ) -> CombatOutcome;
}

/// Resource holding the active resolver
#[derive(Resource)]
pub struct CombatResolverRes(pub Box<dyn CombatResolver>);

impl Default for CombatResolverRes {
    fn default() -> Self {
        Self(Box::new(SkirmishResolver::default()))
    }
}

/// Level- and health-weighted coin flip
#[derive(Debug, Clone)]
pub struct SkirmishResolver {
    pub base_damage: i32,
    pub damage_per_level: i32,
    pub damage_spread: i32,
}

impl Default for SkirmishResolver {
    fn default() -> Self {
        Self {
            base_damage: 6,
            damage_per_level: 3,
            damage_spread: 8,
        }
    }
}

impl SkirmishResolver {
    fn power(fighter: &Combatant) -> f32 {
        let health = fighter.hp.max(0) as f32 / fighter.max_hp.max(1) as f32;
        (fighter.level as f32 * 10.0) * (0.5 + health) + fighter.aggression * 5.0 + fighter.courage * 3.0
    }
}

impl CombatResolver for SkirmishResolver {
    fn resolve_combat(
        &self,
        attacker: &Combatant,
        defender: &Combatant,
        rng: &mut SmallRng,
    ) -> CombatOutcome {
        let a = Self::power(attacker).max(0.1);
        let d = Self::power(defender).max(0.1);
        let attacker_wins = rng.gen::<f32>() < a / (a + d);

        let (winner, loser) = if attacker_wins {
            (attacker, defender)
        } else {
            (defender, attacker)
        };
        let spread = rng.gen_range(0..=self.damage_spread.max(0));
        let damage = self.base_damage + self.damage_per_level * winner.level as i32 + spread;

        CombatOutcome {
            winner: winner.id.clone(),
            loser: loser.id.clone(),
            damage,
        }
    }
}
