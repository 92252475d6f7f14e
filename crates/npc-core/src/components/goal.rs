//! Goal Components
//!
//! Goals an agent is currently pursuing, and the manager that keeps the set
//! deduplicated and ordered. What creates, retires and plans each kind of
//! goal lives in [`crate::systems::goals`].

use bevy_ecs::prelude::*;
use npc_events::GoalSnapshot;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::agent::AgentId;
use crate::config::Tuning;
use crate::systems::goals::{GoalReview, GoalRules};
use crate::systems::perception::{AgentContext, WorldView};

/// Types of goals an agent can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    GetRevenge,
    JoinGang,
    LeadGang,
    AccumulateWealth,
    Socialize,
    AvoidConflict,
    Flee,
}

/// The underlying need a goal serves. Two goals of different kinds serving
/// the same need compete; only the stronger survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Need {
    Retaliation,
    Safety,
    Belonging,
    Wealth,
    Companionship,
}

impl GoalKind {
    pub fn need(&self) -> Need {
        match self {
            GoalKind::GetRevenge | GoalKind::AvoidConflict => Need::Retaliation,
            GoalKind::Flee => Need::Safety,
            GoalKind::JoinGang | GoalKind::LeadGang => Need::Belonging,
            GoalKind::AccumulateWealth => Need::Wealth,
            GoalKind::Socialize => Need::Companionship,
        }
    }

    /// Tag written into the `motivation` detail of events this goal causes.
    pub fn motivation_tag(&self) -> &'static str {
        match self {
            GoalKind::GetRevenge => "revenge",
            GoalKind::JoinGang => "join_gang",
            GoalKind::LeadGang => "recruitment",
            GoalKind::AccumulateWealth => "wealth",
            GoalKind::Socialize => "socialize",
            GoalKind::AvoidConflict => "avoid_conflict",
            GoalKind::Flee => "flee",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalKind::GetRevenge => "get_revenge",
            GoalKind::JoinGang => "join_gang",
            GoalKind::LeadGang => "lead_gang",
            GoalKind::AccumulateWealth => "accumulate_wealth",
            GoalKind::Socialize => "socialize",
            GoalKind::AvoidConflict => "avoid_conflict",
            GoalKind::Flee => "flee",
        }
    }
}

/// When a goal stops being worth pursuing on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalExpiry {
    /// Expires once the clock reaches this tick
    AtTick(u64),
    /// Fulfilled once the agent holds this much gold
    GoldAtLeast(u32),
}

/// A single goal with priority and optional target/expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub kind: GoalKind,
    /// Optional target agent for this goal
    pub target: Option<AgentId>,
    /// Base priority before recency and urgency adjustments
    pub priority: f32,
    pub created_tick: u64,
    pub expiry: Option<GoalExpiry>,
    /// Impulsive goals jump the queue for the tick they appear
    pub urgent: bool,
}

impl Goal {
    pub fn new(kind: GoalKind, priority: f32, created_tick: u64) -> Self {
        Self {
            kind,
            target: None,
            priority: priority.max(0.0),
            created_tick,
            expiry: None,
            urgent: false,
        }
    }

    pub fn with_target(mut self, target: AgentId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_expiry(mut self, expiry: GoalExpiry) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Same kind and same target
    pub fn same_slot(&self, other: &Goal) -> bool {
        self.kind == other.kind && self.target == other.target
    }

    /// Different kinds serving one need for the same target
    pub fn competes_with(&self, other: &Goal) -> bool {
        if self.kind == other.kind || self.kind.need() != other.kind.need() {
            return false;
        }
        match self.kind.need() {
            Need::Retaliation | Need::Safety => self.target == other.target,
            Need::Belonging | Need::Wealth | Need::Companionship => true,
        }
    }

    pub fn expiry_reached(&self, tick: u64, gold: u32) -> bool {
        match self.expiry {
            Some(GoalExpiry::AtTick(at)) => tick >= at,
            Some(GoalExpiry::GoldAtLeast(target)) => gold >= target,
            None => false,
        }
    }

    /// Priority after ageing and urgency.
    pub fn effective_priority(&self, now: u64, recency_ticks: f32, urgency_bonus: f32) -> f32 {
        let age = now.saturating_sub(self.created_tick) as f32;
        let recency = if recency_ticks > 0.0 {
            0.5 + 0.5 * recency_ticks / (recency_ticks + age)
        } else {
            1.0
        };
        let urgency = if self.urgent { urgency_bonus } else { 0.0 };
        self.priority * recency + urgency
    }

    pub fn to_snapshot(&self) -> GoalSnapshot {
        GoalSnapshot {
            kind: self.kind.as_str().to_string(),
            target: self.target.as_ref().map(|t| t.0.clone()),
            priority: self.priority,
        }
    }
}

/// Component: an agent's active goals
#[derive(Component, Debug, Clone)]
pub struct GoalManager {
    goals: Vec<Goal>,
    last_evaluated: Option<u64>,
    now: u64,
    recency_ticks: f32,
    urgency_bonus: f32,
}

impl Default for GoalManager {
    fn default() -> Self {
        let defaults = Tuning::default();
        Self {
            goals: Vec::new(),
            last_evaluated: None,
            now: 0,
            recency_ticks: defaults.goals.recency_ticks,
            urgency_bonus: defaults.goals.urgency_bonus,
        }
    }
}

impl GoalManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick of the previous evaluation, if any
    pub fn last_evaluated(&self) -> Option<u64> {
        self.last_evaluated
    }

    /// Refresh goals from the agent's memory, vitals and surroundings.
    ///
    /// Runs once per tick before action selection: retires satisfied,
    /// failed and expired goals, collects proposals from every rule and
    /// merges them in.
    pub fn evaluate(
        &mut self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        rules: &GoalRules,
        tuning: &Tuning,
        rng: &mut impl Rng,
    ) {
        self.now = world.tick;
        self.recency_ticks = tuning.goals.recency_ticks;
        self.urgency_bonus = tuning.goals.urgency_bonus;

        for goal in &mut self.goals {
            goal.urgent = false;
        }

        let gold = agent.vitals.gold;
        let tick = world.tick;
        self.goals.retain(|goal| {
            if goal.expiry_reached(tick, gold) {
                tracing::debug!(agent = %agent.id, goal = goal.kind.as_str(), "goal expired");
                return false;
            }
            match rules.review(goal, agent, world, tuning) {
                GoalReview::Keep => true,
                review => {
                    tracing::debug!(
                        agent = %agent.id,
                        goal = goal.kind.as_str(),
                        ?review,
                        "goal retired"
                    );
                    false
                }
            }
        });

        let since = self.last_evaluated;
        let mut proposals = Vec::new();
        rules.propose(agent, world, since, tuning, &mut proposals);
        for goal in proposals {
            self.offer(goal, agent.personality.impulsiveness, rng);
        }

        self.last_evaluated = Some(tick);
    }

    /// Merge one proposed goal into the active set.
    ///
    /// Returns true when the goal was newly added.
    pub fn offer(&mut self, mut goal: Goal, impulsiveness: f32, rng: &mut impl Rng) -> bool {
        if let Some(existing) = self.goals.iter_mut().find(|g| g.same_slot(&goal)) {
            existing.priority = existing.priority.max(goal.priority);
            existing.expiry = existing.expiry.or(goal.expiry);
            return false;
        }

        if let Some(pos) = self.goals.iter().position(|g| g.competes_with(&goal)) {
            if self.goals[pos].priority >= goal.priority {
                return false;
            }
            self.goals.remove(pos);
        }

        goal.urgent = rng.gen::<f32>() < impulsiveness;
        self.goals.push(goal);
        true
    }

    /// Active goals, highest effective priority first
    pub fn get_active_goals(&self) -> Vec<&Goal> {
        let mut goals: Vec<&Goal> = self.goals.iter().collect();
        goals.sort_by(|a, b| self.compare(a, b));
        goals
    }

    fn compare(&self, a: &Goal, b: &Goal) -> Ordering {
        let pa = a.effective_priority(self.now, self.recency_ticks, self.urgency_bonus);
        let pb = b.effective_priority(self.now, self.recency_ticks, self.urgency_bonus);
        pb.total_cmp(&pa)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.target.cmp(&b.target))
    }

    pub fn has_goal(&self, kind: GoalKind, target: Option<&AgentId>) -> bool {
        self.goals
            .iter()
            .any(|g| g.kind == kind && g.target.as_ref() == target)
    }

    pub fn find(&self, kind: GoalKind) -> Option<&Goal> {
        self.goals.iter().find(|g| g.kind == kind)
    }

    /// Remove a goal by slot. Returns true if one was removed.
    pub fn retire(&mut self, kind: GoalKind, target: Option<&AgentId>) -> bool {
        let before = self.goals.len();
        self.goals
            .retain(|g| !(g.kind == kind && g.target.as_ref() == target));
        before != self.goals.len()
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(1)
    }

    #[test]
    fn test_offer_deduplicates_by_kind_and_target() {
        let mut manager = GoalManager::new();
        let target = AgentId::from("npc_0002");
        let mut rng = rng();
        assert!(manager.offer(
            Goal::new(GoalKind::GetRevenge, 0.4, 1).with_target(target.clone()),
            0.0,
            &mut rng
        ));
        assert!(!manager.offer(
            Goal::new(GoalKind::GetRevenge, 0.7, 2).with_target(target.clone()),
            0.0,
            &mut rng
        ));
        assert_eq!(manager.len(), 1);
        let goal = manager.find(GoalKind::GetRevenge).unwrap();
        assert_eq!(goal.priority, 0.7, "duplicate proposals raise priority");
        assert_eq!(goal.created_tick, 1, "but keep the original age");
    }

    #[test]
    fn test_different_targets_are_separate_goals() {
        let mut manager = GoalManager::new();
        let mut rng = rng();
        for target in ["npc_0002", "npc_0003"] {
            manager.offer(
                Goal::new(GoalKind::GetRevenge, 0.5, 1).with_target(AgentId::from(target)),
                0.0,
                &mut rng,
            );
        }
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_competing_goals_keep_the_stronger() {
        let mut manager = GoalManager::new();
        let mut rng = rng();
        let target = AgentId::from("npc_0002");
        manager.offer(
            Goal::new(GoalKind::GetRevenge, 0.3, 1).with_target(target.clone()),
            0.0,
            &mut rng,
        );
        manager.offer(
            Goal::new(GoalKind::AvoidConflict, 0.6, 1).with_target(target.clone()),
            0.0,
            &mut rng,
        );
        assert!(!manager.has_goal(GoalKind::GetRevenge, Some(&target)));
        assert!(manager.has_goal(GoalKind::AvoidConflict, Some(&target)));

        // A weaker competitor is ignored
        manager.offer(
            Goal::new(GoalKind::GetRevenge, 0.2, 2).with_target(target.clone()),
            0.0,
            &mut rng,
        );
        assert_eq!(manager.len(), 1);
        assert!(manager.has_goal(GoalKind::AvoidConflict, Some(&target)));
    }

    #[test]
    fn test_flee_does_not_cancel_revenge() {
        let mut manager = GoalManager::new();
        let mut rng = rng();
        let target = AgentId::from("npc_0002");
        manager.offer(
            Goal::new(GoalKind::GetRevenge, 0.5, 1).with_target(target.clone()),
            0.0,
            &mut rng,
        );
        manager.offer(
            Goal::new(GoalKind::Flee, 0.9, 1).with_target(target.clone()),
            0.0,
            &mut rng,
        );
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_active_goals_ordered_by_priority() {
        let mut manager = GoalManager::new();
        let mut rng = rng();
        manager.offer(Goal::new(GoalKind::Socialize, 0.3, 0), 0.0, &mut rng);
        manager.offer(Goal::new(GoalKind::AccumulateWealth, 0.8, 0), 0.0, &mut rng);
        manager.offer(
            Goal::new(GoalKind::GetRevenge, 0.5, 0).with_target(AgentId::from("npc_0002")),
            0.0,
            &mut rng,
        );
        let kinds: Vec<GoalKind> = manager.get_active_goals().iter().map(|g| g.kind).collect();
        assert_eq!(
            kinds,
            vec![GoalKind::AccumulateWealth, GoalKind::GetRevenge, GoalKind::Socialize]
        );
    }

    #[test]
    fn test_impulsive_agents_mark_goals_urgent() {
        let mut manager = GoalManager::new();
        let mut rng = rng();
        manager.offer(Goal::new(GoalKind::Socialize, 0.1, 0), 1.0, &mut rng);
        manager.offer(Goal::new(GoalKind::AccumulateWealth, 0.9, 0), 0.0, &mut rng);
        let first = manager.get_active_goals()[0];
        assert_eq!(first.kind, GoalKind::Socialize);
        assert!(first.urgent);
    }

    #[test]
    fn test_effective_priority_decays_with_age() {
        let goal = Goal::new(GoalKind::GetRevenge, 0.8, 0);
        let fresh = goal.effective_priority(0, 168.0, 1.0);
        let week_old = goal.effective_priority(168, 168.0, 1.0);
        assert!((fresh - 0.8).abs() < 1e-6);
        assert!((week_old - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_expiry_conditions() {
        let by_tick = Goal::new(GoalKind::Socialize, 0.5, 0).with_expiry(GoalExpiry::AtTick(24));
        assert!(!by_tick.expiry_reached(23, 0));
        assert!(by_tick.expiry_reached(24, 0));

        let by_gold =
            Goal::new(GoalKind::AccumulateWealth, 0.5, 0).with_expiry(GoalExpiry::GoldAtLeast(50));
        assert!(!by_gold.expiry_reached(1000, 49));
        assert!(by_gold.expiry_reached(0, 50));
    }

    #[test]
    fn test_retire() {
        let mut manager = GoalManager::new();
        let mut rng = rng();
        let leader = AgentId::from("npc_0001");
        manager.offer(
            Goal::new(GoalKind::JoinGang, 0.5, 0).with_target(leader.clone()),
            0.0,
            &mut rng,
        );
        assert!(!manager.retire(GoalKind::JoinGang, None));
        assert!(manager.retire(GoalKind::JoinGang, Some(&leader)));
        assert!(manager.is_empty());
    }
}
