//! Actions
//!
//! What an agent can ask the world to do in one tick, plus the weighted
//! choice helpers used for idle behavior.

pub mod combat;
pub mod economy;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{AgentId, GoalKind};

pub use combat::{CombatOutcome, CombatResolver, CombatResolverRes, Combatant, SkirmishResolver};

/// Concrete request produced by the brain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Attack { target: AgentId },
    Recruit { target: AgentId },
    RequestMembership { leader: AgentId },
    Trade { partner: AgentId },
    Socialize { partner: AgentId },
    Help { target: AgentId },
    Work,
    Shop,
    Rest,
    Travel { destination: String },
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Attack { .. } => "attack",
            ActionKind::Recruit { .. } => "recruit",
            ActionKind::RequestMembership { .. } => "request_membership",
            ActionKind::Trade { .. } => "trade",
            ActionKind::Socialize { .. } => "socialize",
            ActionKind::Help { .. } => "help",
            ActionKind::Work => "work",
            ActionKind::Shop => "shop",
            ActionKind::Rest => "rest",
            ActionKind::Travel { .. } => "travel",
        }
    }

    /// The other agent this action is aimed at
    pub fn target(&self) -> Option<&AgentId> {
        match self {
            ActionKind::Attack { target }
            | ActionKind::Recruit { target }
            | ActionKind::Help { target } => Some(target),
            ActionKind::RequestMembership { leader } => Some(leader),
            ActionKind::Trade { partner } | ActionKind::Socialize { partner } => Some(partner),
            ActionKind::Work | ActionKind::Shop | ActionKind::Rest | ActionKind::Travel { .. } => {
                None
            }
        }
    }
}

/// An action together with the goal that motivated it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    /// None for idle behavior
    pub motivation: Option<GoalKind>,
}

impl Action {
    pub fn idle(kind: ActionKind) -> Self {
        Self {
            kind,
            motivation: None,
        }
    }

    pub fn for_goal(kind: ActionKind, goal: GoalKind) -> Self {
        Self {
            kind,
            motivation: Some(goal),
        }
    }

    pub fn rest() -> Self {
        Self::idle(ActionKind::Rest)
    }

    /// Tag for the `motivation` event detail
    pub fn motivation_tag(&self) -> Option<&'static str> {
        self.motivation.map(|g| g.motivation_tag())
    }
}

/// An action candidate with its weight
#[derive(Debug, Clone)]
pub struct WeightedAction {
    pub action: ActionKind,
    pub weight: f32,
    /// Human-readable reason, for debugging
    pub reason: &'static str,
}

impl WeightedAction {
    pub fn new(action: ActionKind, weight: f32, reason: &'static str) -> Self {
        Self {
            action,
            weight,
            reason,
        }
    }
}

/// Multiplicative noise of +/- `factor` on every weight, floored at 0.01
pub fn add_noise_to_weights(candidates: &mut [WeightedAction], factor: f32, rng: &mut impl Rng) {
    for candidate in candidates.iter_mut() {
        let noise: f32 = 1.0 + (rng.gen::<f32>() - 0.5) * 2.0 * factor;
        candidate.weight = (candidate.weight * noise).max(0.01);
    }
}

/// Pick one candidate with probability proportional to weight
pub fn weighted_random_choice<'a>(
    rng: &mut impl Rng,
    candidates: &'a [WeightedAction],
) -> Option<&'a WeightedAction> {
    let total_weight: f32 = candidates.iter().map(|c| c.weight.max(0.0)).sum();
    if total_weight <= 0.0 {
        return candidates.first();
    }

    let mut roll: f32 = rng.gen::<f32>() * total_weight;
    for candidate in candidates {
        if candidate.weight <= 0.0 {
            continue;
        }
        roll -= candidate.weight;
        if roll <= 0.0 {
            return Some(candidate);
        }
    }
    candidates.last()
}

/// Weighted pick over arbitrary items; weights at or below zero never win
/// unless every weight is.
pub fn weighted_pick<'a, T>(rng: &mut impl Rng, items: &'a [(T, f32)]) -> Option<&'a T> {
    let total: f32 = items.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return items.first().map(|(item, _)| item);
    }
    let mut roll = rng.gen::<f32>() * total;
    for (item, weight) in items {
        if *weight <= 0.0 {
            continue;
        }
        roll -= weight;
        if roll <= 0.0 {
            return Some(item);
        }
    }
    items.last().map(|(item, _)| item)
}
