//! Economy Actions
//!
//! Gold flows for work, trade, shopping, gifts and robbery. Pure functions;
//! the resolve system applies the results.

use crate::components::{Personality, Vitals};
use crate::config::EconomyConfig;

/// Gold earned by one hour of work
pub fn wage(vitals: &Vitals, personality: &Personality, cfg: &EconomyConfig) -> u32 {
    let base = (cfg.base_wage + vitals.level) as f32;
    ((base * (0.5 + personality.ambition)).round() as u32).max(1)
}

/// Split the surplus of a trade by relative greed. Returns (actor, partner).
pub fn trade_split(actor_greed: f32, partner_greed: f32, surplus: u32) -> (u32, u32) {
    let total = actor_greed + partner_greed;
    let share = if total > 0.0 { actor_greed / total } else { 0.5 };
    let actor = ((surplus as f32) * share).round() as u32;
    let actor = actor.min(surplus);
    (actor, surplus - actor)
}

/// Gold taken from a beaten victim
pub fn robbery_take(victim_gold: u32, share: f32) -> u32 {
    ((victim_gold as f32) * share.clamp(0.0, 1.0)).floor() as u32
}

/// Size of a gift; never more than a quarter of the giver's purse
pub fn help_gift(giver_gold: u32, cfg: &EconomyConfig) -> u32 {
    cfg.help_gift.min(giver_gold / 4)
}

/// Health restored by an hour of rest
pub fn rest_heal(vitals: &Vitals, rest_quality: f32, cfg: &EconomyConfig) -> i32 {
    ((vitals.max_hp as f32 * cfg.rest_heal_fraction * rest_quality).round() as i32).max(1)
}
