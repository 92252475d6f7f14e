//! Goal Rules
//!
//! Every goal kind is owned by one [`GoalRule`]: when to propose it, when it
//! is finished, and which concrete action advances it this tick. The brain
//! only ever talks to [`GoalRules`], so adding a goal kind means adding a
//! rule, not touching the decision loop.

use bevy_ecs::prelude::*;
use rand::RngCore;
use std::collections::BTreeSet;

use crate::actions::{weighted_pick, ActionKind};
use crate::components::memory_details::ROLE_ATTACKER;
use crate::components::relationship_weights::HOSTILITY_MAX;
use crate::components::{AgentId, Goal, GoalExpiry, GoalKind, MemoryKind};
use crate::config::Tuning;
use crate::systems::perception::{AgentContext, AgentSummary, WorldView};

/// Hostility at or above which an agent will not recruit or socialize with someone
pub(crate) const SHUNNED_HOSTILITY: f32 = 20.0;

/// Outcome of reviewing an active goal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalReview {
    Keep,
    Satisfied,
    Failed,
}

/// What a rule wants done about one goal this tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Act(ActionKind),
    /// Nothing to do right now; try the next goal
    Blocked,
    /// The goal can no longer be pursued (dangling target, unreachable)
    Discard,
}

/// Creation, retirement and planning for one goal kind
pub trait GoalRule: Send + Sync {
    fn kind(&self) -> GoalKind;

    /// Push new goals of this kind. `since` is the tick of the agent's
    /// previous evaluation; memories at or after it are new.
    fn propose(
        &self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        since: Option<u64>,
        tuning: &Tuning,
        out: &mut Vec<Goal>,
    );

    fn review(
        &self,
        _goal: &Goal,
        _agent: &AgentContext<'_>,
        _world: &WorldView<'_>,
        _tuning: &Tuning,
    ) -> GoalReview {
        GoalReview::Keep
    }

    fn plan(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
        rng: &mut dyn RngCore,
    ) -> Plan;
}

/// Resource: the active goal rules
#[derive(Resource)]
pub struct GoalRules {
    rules: Vec<Box<dyn GoalRule>>,
}

impl Default for GoalRules {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for GoalRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.kind()))
            .finish()
    }
}

impl GoalRules {
    /// No rules at all; agents only idle
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The full rule set
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(FleeRule)
            .with_rule(RevengeRule)
            .with_rule(AvoidConflictRule)
            .with_rule(LeadGangRule)
            .with_rule(JoinGangRule)
            .with_rule(WealthRule)
            .with_rule(SocializeRule)
    }

    /// Add or replace the rule for its kind
    pub fn with_rule(mut self, rule: impl GoalRule + 'static) -> Self {
        self.rules.retain(|r| r.kind() != rule.kind());
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_for(&self, kind: GoalKind) -> Option<&dyn GoalRule> {
        self.rules
            .iter()
            .find(|r| r.kind() == kind)
            .map(|r| r.as_ref())
    }

    pub fn propose(
        &self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        since: Option<u64>,
        tuning: &Tuning,
        out: &mut Vec<Goal>,
    ) {
        for rule in &self.rules {
            rule.propose(agent, world, since, tuning, out);
        }
    }

    pub fn review(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
    ) -> GoalReview {
        match self.rule_for(goal.kind) {
            Some(rule) => rule.review(goal, agent, world, tuning),
            None => GoalReview::Failed,
        }
    }

    pub fn plan(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
        rng: &mut dyn RngCore,
    ) -> Plan {
        match self.rule_for(goal.kind) {
            Some(rule) => rule.plan(goal, agent, world, tuning, rng),
            None => Plan::Discard,
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Agents behind grievances recorded at or after `since`
fn new_offenders<'a>(agent: &AgentContext<'a>, since: Option<u64>) -> BTreeSet<&'a AgentId> {
    agent
        .memory
        .get_all_memories()
        .iter()
        .filter(|e| e.kind.is_grievance())
        .filter(|e| since.map_or(true, |s| e.tick >= s))
        .filter_map(|e| e.other.as_ref())
        .filter(|other| *other != agent.id)
        .collect()
}

/// Walk one step toward another agent, or discard when they cannot be reached
fn approach(agent: &AgentContext<'_>, world: &WorldView<'_>, target: &AgentSummary) -> Plan {
    match world.map.next_step_toward(agent.location, &target.location) {
        Some(destination) => Plan::Act(ActionKind::Travel { destination }),
        None => Plan::Discard,
    }
}

/// Step toward the nearest location matching `predicate`
fn head_for(
    agent: &AgentContext<'_>,
    world: &WorldView<'_>,
    predicate: impl Fn(&crate::components::Location) -> bool,
) -> Option<ActionKind> {
    let destination = world.map.nearest(agent.location, predicate)?;
    let step = world.map.next_step_toward(agent.location, destination)?;
    Some(ActionKind::Travel { destination: step })
}

/// Adjacent location holding the fewest agents this one is hostile toward.
/// Ties break on location id.
fn safest_adjacent(agent: &AgentContext<'_>, world: &WorldView<'_>, tuning: &Tuning) -> Option<String> {
    let threshold = tuning.goals.flee_min_hostility;
    world
        .map
        .adjacent_to(agent.location)
        .iter()
        .map(|loc| {
            let threats = world
                .roster
                .at_location(loc)
                .iter()
                .filter(|other| agent.memory.get_relationship(other).is_hostile(threshold))
                .count();
            (threats, loc)
        })
        .min()
        .map(|(_, loc)| loc.clone())
}

// ============================================================================
// Revenge
// ============================================================================

/// Answers harm with violence, or with avoidance when outmatched
#[derive(Debug, Clone, Copy, Default)]
pub struct RevengeRule;

impl RevengeRule {
    /// Hostility needed before this personality seeks revenge
    pub fn hostility_threshold(agent: &AgentContext<'_>, tuning: &Tuning) -> f32 {
        let p = agent.personality;
        tuning.goals.revenge_hostility_threshold
            * (1.5 - p.vengefulness)
            * (1.2 - 0.4 * p.aggression)
    }
}

impl GoalRule for RevengeRule {
    fn kind(&self) -> GoalKind {
        GoalKind::GetRevenge
    }

    fn propose(
        &self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        since: Option<u64>,
        tuning: &Tuning,
        out: &mut Vec<Goal>,
    ) {
        let cfg = &tuning.goals;
        let p = agent.personality;
        let threshold = Self::hostility_threshold(agent, tuning);

        for offender in new_offenders(agent, since) {
            let Some(target) = world.roster.get(offender) else {
                continue;
            };
            let rel = agent.memory.get_relationship(offender);
            if rel.hostility < threshold {
                continue;
            }

            let ratio = target.strength / agent.vitals.strength().max(1.0);
            if p.courage < cfg.low_courage && ratio > cfg.avoid_strength_ratio {
                out.push(
                    Goal::new(GoalKind::AvoidConflict, 0.4 + 0.4 * (1.0 - p.courage), world.tick)
                        .with_target(offender.clone())
                        .with_expiry(GoalExpiry::AtTick(world.tick + cfg.avoid_conflict_ticks)),
                );
                continue;
            }

            let priority = 0.4 + 0.4 * p.vengefulness * (rel.hostility / HOSTILITY_MAX).min(1.0);
            let lifetime = (cfg.revenge_base_ticks as f32 * (1.0 + 2.0 * p.vengefulness)) as u64;
            out.push(
                Goal::new(GoalKind::GetRevenge, priority, world.tick)
                    .with_target(offender.clone())
                    .with_expiry(GoalExpiry::AtTick(world.tick + lifetime)),
            );
        }
    }

    fn review(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _tuning: &Tuning,
    ) -> GoalReview {
        let Some(target) = &goal.target else {
            return GoalReview::Failed;
        };
        let avenged = agent.memory.get_memories_about(target).iter().any(|e| {
            e.kind == MemoryKind::WonAgainst
                && e.tick >= goal.created_tick
                && e.has_role(ROLE_ATTACKER)
        });
        if avenged {
            GoalReview::Satisfied
        } else if !world.roster.is_alive(target) {
            GoalReview::Failed
        } else {
            GoalReview::Keep
        }
    }

    fn plan(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _tuning: &Tuning,
        _rng: &mut dyn RngCore,
    ) -> Plan {
        let Some(target) = goal.target.as_ref().and_then(|t| world.roster.get(t)) else {
            return Plan::Discard;
        };
        if target.location == agent.location {
            Plan::Act(ActionKind::Attack {
                target: target.id.clone(),
            })
        } else {
            approach(agent, world, target)
        }
    }
}

// ============================================================================
// Avoid conflict
// ============================================================================

/// Keeps away from someone too strong to fight. Only created by [`RevengeRule`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AvoidConflictRule;

impl GoalRule for AvoidConflictRule {
    fn kind(&self) -> GoalKind {
        GoalKind::AvoidConflict
    }

    fn propose(
        &self,
        _agent: &AgentContext<'_>,
        _world: &WorldView<'_>,
        _since: Option<u64>,
        _tuning: &Tuning,
        _out: &mut Vec<Goal>,
    ) {
    }

    fn review(
        &self,
        goal: &Goal,
        _agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _tuning: &Tuning,
    ) -> GoalReview {
        match &goal.target {
            Some(target) if world.roster.is_alive(target) => GoalReview::Keep,
            _ => GoalReview::Satisfied,
        }
    }

    fn plan(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
        _rng: &mut dyn RngCore,
    ) -> Plan {
        let Some(target) = &goal.target else {
            return Plan::Discard;
        };
        if !world.is_co_located(agent, target) {
            return Plan::Blocked;
        }
        match safest_adjacent(agent, world, tuning) {
            Some(destination) => Plan::Act(ActionKind::Travel { destination }),
            None => Plan::Blocked,
        }
    }
}

// ============================================================================
// Flee
// ============================================================================

/// Badly hurt and sharing a location with an enemy
#[derive(Debug, Clone, Copy, Default)]
pub struct FleeRule;

impl GoalRule for FleeRule {
    fn kind(&self) -> GoalKind {
        GoalKind::Flee
    }

    fn propose(
        &self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _since: Option<u64>,
        tuning: &Tuning,
        out: &mut Vec<Goal>,
    ) {
        let cfg = &tuning.goals;
        if agent.vitals.hp_fraction() >= cfg.flee_hp_fraction {
            return;
        }

        let mut threat: Option<(&AgentId, f32)> = None;
        for other in world.neighbors(agent) {
            let hostility = agent.memory.get_relationship(&other.id).hostility;
            if hostility < cfg.flee_min_hostility {
                continue;
            }
            if threat.map_or(true, |(_, best)| hostility > best) {
                threat = Some((&other.id, hostility));
            }
        }

        if let Some((threat, _)) = threat {
            let priority = 0.95 * (1.2 - agent.personality.courage);
            out.push(Goal::new(GoalKind::Flee, priority, world.tick).with_target(threat.clone()));
        }
    }

    fn review(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
    ) -> GoalReview {
        if agent.vitals.hp_fraction() >= tuning.goals.flee_recovered_fraction {
            return GoalReview::Satisfied;
        }
        match &goal.target {
            Some(threat) if world.is_co_located(agent, threat) => GoalReview::Keep,
            _ => GoalReview::Satisfied,
        }
    }

    fn plan(
        &self,
        _goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
        _rng: &mut dyn RngCore,
    ) -> Plan {
        match safest_adjacent(agent, world, tuning) {
            Some(destination) => Plan::Act(ActionKind::Travel { destination }),
            None => Plan::Discard,
        }
    }
}

// ============================================================================
// Wealth
// ============================================================================

/// Greed or poverty: work, trade, or rob
#[derive(Debug, Clone, Copy, Default)]
pub struct WealthRule;

impl GoalRule for WealthRule {
    fn kind(&self) -> GoalKind {
        GoalKind::AccumulateWealth
    }

    fn propose(
        &self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _since: Option<u64>,
        tuning: &Tuning,
        out: &mut Vec<Goal>,
    ) {
        let cfg = &tuning.goals;
        let p = agent.personality;
        let gold = agent.vitals.gold;
        let poor = gold < cfg.poverty_line;
        if p.greed < cfg.wealth_min_greed && !poor {
            return;
        }

        let mut priority = 0.2 + 0.6 * p.wealth_drive();
        if poor {
            priority += 0.2;
        }
        let floor = gold.max(tuning.economy.starting_gold) as f32;
        let target = (floor * (1.5 + p.greed)).ceil() as u32;
        out.push(
            Goal::new(GoalKind::AccumulateWealth, priority, world.tick)
                .with_expiry(GoalExpiry::GoldAtLeast(target)),
        );
    }

    fn plan(
        &self,
        _goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
        _rng: &mut dyn RngCore,
    ) -> Plan {
        let cfg = &tuning.goals;
        let p = agent.personality;
        let neighbors = world.neighbors(agent);

        if p.aggression >= cfg.rob_min_aggression {
            let own_strength = agent.vitals.strength();
            let victim = neighbors
                .iter()
                .filter(|other| other.gold >= cfg.rob_min_gold)
                .filter(|other| other.strength < own_strength)
                .filter(|other| other.gang.is_none() || other.gang != agent.membership.gang)
                .fold(None::<&&AgentSummary>, |best, other| match best {
                    Some(b) if b.gold >= other.gold => Some(b),
                    _ => Some(other),
                });
            if let Some(victim) = victim {
                return Plan::Act(ActionKind::Attack {
                    target: victim.id.clone(),
                });
            }
        }

        if world.map.is_workplace(agent.location) {
            return Plan::Act(ActionKind::Work);
        }

        if p.greed >= 0.5 {
            let partner = neighbors
                .iter()
                .filter(|other| {
                    agent.memory.get_relationship(&other.id).hostility < SHUNNED_HOSTILITY
                })
                .fold(None::<(&AgentId, f32)>, |best, other| {
                    let trust = agent.memory.get_relationship(&other.id).trust;
                    match best {
                        Some((_, t)) if t >= trust => best,
                        _ => Some((&other.id, trust)),
                    }
                });
            if let Some((partner, _)) = partner {
                return Plan::Act(ActionKind::Trade {
                    partner: partner.clone(),
                });
            }
        }

        match head_for(agent, world, |l| l.kind.is_workplace()) {
            Some(action) => Plan::Act(action),
            None => Plan::Blocked,
        }
    }
}

// ============================================================================
// Socialize
// ============================================================================

/// Company, up to a daily quota; helps struggling friends along the way
#[derive(Debug, Clone, Copy, Default)]
pub struct SocializeRule;

impl SocializeRule {
    fn interactions_today(agent: &AgentContext<'_>, world: &WorldView<'_>) -> usize {
        let since = world.tick.saturating_sub(npc_events::TICKS_PER_DAY);
        agent
            .memory
            .count_since(MemoryKind::SharedSocialActivity, since)
    }
}

impl GoalRule for SocializeRule {
    fn kind(&self) -> GoalKind {
        GoalKind::Socialize
    }

    fn propose(
        &self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _since: Option<u64>,
        tuning: &Tuning,
        out: &mut Vec<Goal>,
    ) {
        let cfg = &tuning.goals;
        let sociability = agent.personality.sociability;
        if sociability < cfg.socialize_min_sociability
            || Self::interactions_today(agent, world) >= cfg.socialize_daily_quota
        {
            return;
        }
        out.push(
            Goal::new(GoalKind::Socialize, 0.15 + 0.45 * sociability, world.tick)
                .with_expiry(GoalExpiry::AtTick(world.tick + npc_events::TICKS_PER_DAY)),
        );
    }

    fn review(
        &self,
        _goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
    ) -> GoalReview {
        if Self::interactions_today(agent, world) >= tuning.goals.socialize_daily_quota {
            GoalReview::Satisfied
        } else {
            GoalReview::Keep
        }
    }

    fn plan(
        &self,
        _goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
        rng: &mut dyn RngCore,
    ) -> Plan {
        let candidates: Vec<(&AgentSummary, f32)> = world
            .neighbors(agent)
            .into_iter()
            .filter_map(|other| {
                let rel = agent.memory.get_relationship(&other.id);
                if rel.hostility >= SHUNNED_HOSTILITY {
                    return None;
                }
                Some((other, 1.0 + rel.friendship.max(0.0) / 20.0))
            })
            .collect();

        let Some(partner) = weighted_pick(&mut &mut *rng, &candidates) else {
            if world.map.is_social_venue(agent.location) {
                return Plan::Blocked;
            }
            return match head_for(agent, world, |l| l.kind.is_social_venue()) {
                Some(action) => Plan::Act(action),
                None => Plan::Blocked,
            };
        };

        let economy = &tuning.economy;
        let struggling = partner.hp_fraction() < 0.4 || partner.gold < tuning.goals.poverty_line;
        let generous = agent.personality.loyalty >= tuning.gangs.join_min_loyalty
            && agent.vitals.gold >= economy.help_gift * 2
            && agent.memory.get_relationship(&partner.id).friendship > 0.0;
        if struggling && generous {
            return Plan::Act(ActionKind::Help {
                target: partner.id.clone(),
            });
        }
        Plan::Act(ActionKind::Socialize {
            partner: partner.id.clone(),
        })
    }
}

// ============================================================================
// Gangs
// ============================================================================

/// A leader whose gang has room looks for followers
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadGangRule;

impl GoalRule for LeadGangRule {
    fn kind(&self) -> GoalKind {
        GoalKind::LeadGang
    }

    fn propose(
        &self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _since: Option<u64>,
        _tuning: &Tuning,
        out: &mut Vec<Goal>,
    ) {
        let recruiting = world.roster.get(agent.id).is_some_and(|s| s.recruiting);
        if agent.membership.is_gang_leader && recruiting {
            out.push(Goal::new(
                GoalKind::LeadGang,
                0.3 + 0.5 * agent.personality.ambition,
                world.tick,
            ));
        }
    }

    fn review(
        &self,
        _goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _tuning: &Tuning,
    ) -> GoalReview {
        if !agent.membership.is_gang_leader {
            GoalReview::Failed
        } else if !world.roster.get(agent.id).is_some_and(|s| s.recruiting) {
            GoalReview::Satisfied
        } else {
            GoalReview::Keep
        }
    }

    fn plan(
        &self,
        _goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
        _rng: &mut dyn RngCore,
    ) -> Plan {
        let recent = world.tick.saturating_sub(npc_events::TICKS_PER_DAY);
        let mut best: Option<(&AgentId, f32)> = None;
        for other in world.neighbors(agent) {
            if other.gang.is_some() {
                continue;
            }
            let rel = agent.memory.get_relationship(&other.id);
            if rel.hostility >= SHUNNED_HOSTILITY || rel.friendship < 0.0 {
                continue;
            }
            let refusals = agent
                .memory
                .count_about_since(&other.id, MemoryKind::RejectedBy, recent);
            if refusals >= tuning.goals.max_join_rejections {
                continue;
            }
            if best.map_or(true, |(_, f)| rel.friendship > f) {
                best = Some((&other.id, rel.friendship));
            }
        }

        if let Some((target, _)) = best {
            return Plan::Act(ActionKind::Recruit {
                target: target.clone(),
            });
        }
        if world.map.is_social_venue(agent.location) {
            return Plan::Blocked;
        }
        match head_for(agent, world, |l| l.kind.is_social_venue()) {
            Some(action) => Plan::Act(action),
            None => Plan::Blocked,
        }
    }
}

/// A loyal, ungrouped agent seeks membership under a leader it likes
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinGangRule;

impl JoinGangRule {
    fn rejections_since(agent: &AgentContext<'_>, leader: &AgentId, since: u64) -> usize {
        agent
            .memory
            .count_about_since(leader, MemoryKind::RejectedBy, since)
    }
}

impl GoalRule for JoinGangRule {
    fn kind(&self) -> GoalKind {
        GoalKind::JoinGang
    }

    fn propose(
        &self,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _since: Option<u64>,
        tuning: &Tuning,
        out: &mut Vec<Goal>,
    ) {
        let cfg = &tuning.goals;
        let loyalty = agent.personality.loyalty;
        if !agent.membership.is_ungrouped() || loyalty < tuning.gangs.join_min_loyalty {
            return;
        }

        let mut best: Option<(&AgentId, f32)> = None;
        for leader in world.roster.iter().filter(|s| s.recruiting && &s.id != agent.id) {
            let rel = agent.memory.get_relationship(&leader.id);
            if rel.friendship < cfg.join_min_friendship
                || rel.trust < 0.0
                || rel.hostility >= SHUNNED_HOSTILITY
            {
                continue;
            }
            if Self::rejections_since(agent, &leader.id, 0) >= cfg.max_join_rejections {
                continue;
            }
            if best.map_or(true, |(_, f)| rel.friendship > f) {
                best = Some((&leader.id, rel.friendship));
            }
        }

        if let Some((leader, friendship)) = best {
            let priority = 0.3 + 0.4 * loyalty * (friendship / 50.0).min(1.0);
            out.push(Goal::new(GoalKind::JoinGang, priority, world.tick).with_target(leader.clone()));
        }
    }

    fn review(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        tuning: &Tuning,
    ) -> GoalReview {
        if !agent.membership.is_ungrouped() {
            return GoalReview::Satisfied;
        }
        let Some(leader) = &goal.target else {
            return GoalReview::Failed;
        };
        let open = world.roster.get(leader).is_some_and(|s| s.recruiting);
        if !open
            || Self::rejections_since(agent, leader, goal.created_tick)
                >= tuning.goals.max_join_rejections
        {
            return GoalReview::Failed;
        }
        GoalReview::Keep
    }

    fn plan(
        &self,
        goal: &Goal,
        agent: &AgentContext<'_>,
        world: &WorldView<'_>,
        _tuning: &Tuning,
        _rng: &mut dyn RngCore,
    ) -> Plan {
        let Some(leader) = goal.target.as_ref().and_then(|t| world.roster.get(t)) else {
            return Plan::Discard;
        };
        if leader.location == agent.location {
            Plan::Act(ActionKind::RequestMembership {
                leader: leader.id.clone(),
            })
        } else {
            approach(agent, world, leader)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        GangMembership, Location, LocationKind, MemoryEvent, MemoryStore, Personality, TownMap,
        Vitals,
    };
    use crate::systems::perception::tests::summary;
    use crate::systems::perception::Roster;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn map() -> TownMap {
        let mut map = TownMap::new();
        map.register(Location::new("tavern", "Tavern", LocationKind::Tavern));
        map.register(Location::new("market", "Market", LocationKind::Market));
        map.register(Location::new("slums", "Slums", LocationKind::Slums));
        map.connect("tavern", "market");
        map.connect("tavern", "slums");
        map
    }

    struct Fixture {
        id: AgentId,
        personality: Personality,
        memory: MemoryStore,
        vitals: Vitals,
        membership: GangMembership,
        location: String,
    }

    impl Fixture {
        fn new(personality: Personality) -> Self {
            Self {
                id: AgentId::from("npc_0001"),
                personality,
                memory: MemoryStore::new(&personality),
                vitals: Vitals::new(1, 60, 20),
                membership: GangMembership::default(),
                location: "tavern".to_string(),
            }
        }

        fn ctx(&self) -> AgentContext<'_> {
            AgentContext {
                id: &self.id,
                personality: &self.personality,
                memory: &self.memory,
                vitals: &self.vitals,
                location: &self.location,
                membership: &self.membership,
            }
        }
    }

    fn roster_with(entries: &[(&str, &str)]) -> Roster {
        let mut roster = Roster::new();
        for (id, location) in entries {
            roster.insert(summary(id, location));
        }
        roster
    }

    fn propose_all(fixture: &Fixture, roster: &Roster, map: &TownMap, tick: u64) -> Vec<Goal> {
        let world = WorldView::new(tick, roster, map);
        let mut out = Vec::new();
        GoalRules::standard().propose(&fixture.ctx(), &world, None, &Tuning::default(), &mut out);
        out
    }

    #[test]
    fn test_attack_and_loss_trigger_revenge() {
        let mut fixture = Fixture::new(Personality::default());
        let aggressor = AgentId::from("npc_0002");
        fixture
            .memory
            .record_event(MemoryEvent::new(MemoryKind::WasAttacked, 5).about(aggressor.clone()));
        fixture
            .memory
            .record_event(MemoryEvent::new(MemoryKind::LostTo, 5).about(aggressor.clone()));

        let roster = roster_with(&[("npc_0001", "tavern"), ("npc_0002", "market")]);
        let goals = propose_all(&fixture, &roster, &map(), 6);
        let revenge = goals
            .iter()
            .find(|g| g.kind == GoalKind::GetRevenge)
            .expect("revenge proposed");
        assert_eq!(revenge.target.as_ref(), Some(&aggressor));
    }

    #[test]
    fn test_old_grievances_do_not_retrigger() {
        let mut fixture = Fixture::new(Personality::default());
        let aggressor = AgentId::from("npc_0002");
        fixture
            .memory
            .record_event(MemoryEvent::new(MemoryKind::WasAttacked, 5).about(aggressor.clone()));
        fixture
            .memory
            .record_event(MemoryEvent::new(MemoryKind::LostTo, 5).about(aggressor));
        let roster = roster_with(&[("npc_0001", "tavern"), ("npc_0002", "market")]);
        let map = map();
        let world = WorldView::new(8, &roster, &map);
        let mut out = Vec::new();
        RevengeRule.propose(&fixture.ctx(), &world, Some(7), &Tuning::default(), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_coward_avoids_stronger_offender() {
        let mut fixture = Fixture::new(Personality::default().with_courage(0.1));
        let brute = AgentId::from("npc_0002");
        fixture
            .memory
            .record_event(MemoryEvent::new(MemoryKind::WasAttacked, 5).about(brute.clone()));
        fixture
            .memory
            .record_event(MemoryEvent::new(MemoryKind::LostTo, 5).about(brute.clone()));

        let mut roster = roster_with(&[("npc_0001", "tavern")]);
        let mut strong = summary("npc_0002", "tavern");
        strong.strength = 200.0;
        roster.insert(strong);

        let goals = propose_all(&fixture, &roster, &map(), 6);
        assert!(goals.iter().all(|g| g.kind != GoalKind::GetRevenge));
        assert!(goals
            .iter()
            .any(|g| g.kind == GoalKind::AvoidConflict && g.target.as_ref() == Some(&brute)));
    }

    #[test]
    fn test_revenge_plan_discards_dead_target() {
        let fixture = Fixture::new(Personality::default());
        let roster = roster_with(&[("npc_0001", "tavern")]);
        let map = map();
        let world = WorldView::new(10, &roster, &map);
        let goal = Goal::new(GoalKind::GetRevenge, 0.5, 1).with_target(AgentId::from("npc_0009"));
        let mut rng = SmallRng::seed_from_u64(1);
        let plan = RevengeRule.plan(&goal, &fixture.ctx(), &world, &Tuning::default(), &mut rng);
        assert_eq!(plan, Plan::Discard);
    }

    #[test]
    fn test_revenge_plan_travels_then_attacks() {
        let fixture = Fixture::new(Personality::default());
        let target = AgentId::from("npc_0002");
        let goal = Goal::new(GoalKind::GetRevenge, 0.5, 1).with_target(target.clone());
        let map = map();
        let tuning = Tuning::default();
        let mut rng = SmallRng::seed_from_u64(1);

        let away = roster_with(&[("npc_0001", "tavern"), ("npc_0002", "market")]);
        let world = WorldView::new(10, &away, &map);
        assert_eq!(
            RevengeRule.plan(&goal, &fixture.ctx(), &world, &tuning, &mut rng),
            Plan::Act(ActionKind::Travel {
                destination: "market".to_string()
            })
        );

        let here = roster_with(&[("npc_0001", "tavern"), ("npc_0002", "tavern")]);
        let world = WorldView::new(10, &here, &map);
        assert_eq!(
            RevengeRule.plan(&goal, &fixture.ctx(), &world, &tuning, &mut rng),
            Plan::Act(ActionKind::Attack { target })
        );
    }

    #[test]
    fn test_revenge_satisfied_by_winning_as_attacker() {
        let mut fixture = Fixture::new(Personality::default());
        let target = AgentId::from("npc_0002");
        let goal = Goal::new(GoalKind::GetRevenge, 0.5, 3).with_target(target.clone());
        let roster = roster_with(&[("npc_0001", "tavern"), ("npc_0002", "tavern")]);
        let map = map();
        let world = WorldView::new(10, &roster, &map);
        let tuning = Tuning::default();
        assert_eq!(RevengeRule.review(&goal, &fixture.ctx(), &world, &tuning), GoalReview::Keep);

        fixture.memory.record_event(
            MemoryEvent::new(MemoryKind::WonAgainst, 9)
                .about(target)
                .with_detail(crate::components::memory_details::ROLE, ROLE_ATTACKER),
        );
        assert_eq!(
            RevengeRule.review(&goal, &fixture.ctx(), &world, &tuning),
            GoalReview::Satisfied
        );
    }

    #[test]
    fn test_wealth_goal_for_the_greedy_only() {
        let map = map();
        let roster = roster_with(&[("npc_0001", "market")]);
        let mut greedy = Fixture::new(Personality::default().with_greed(0.9));
        greedy.location = "market".to_string();
        let goals = propose_all(&greedy, &roster, &map, 1);
        let wealth = goals
            .iter()
            .find(|g| g.kind == GoalKind::AccumulateWealth)
            .expect("greedy agent wants gold");
        assert!(matches!(wealth.expiry, Some(GoalExpiry::GoldAtLeast(n)) if n > 20));

        let content = Fixture::new(Personality::default().with_greed(0.1));
        let goals = propose_all(&content, &roster, &map, 1);
        assert!(goals.iter().all(|g| g.kind != GoalKind::AccumulateWealth));
    }

    #[test]
    fn test_wealth_plan_works_at_workplace_and_travels_otherwise() {
        let map = map();
        let tuning = Tuning::default();
        let goal = Goal::new(GoalKind::AccumulateWealth, 0.5, 0);
        let mut rng = SmallRng::seed_from_u64(2);
        let mut fixture = Fixture::new(Personality::default().with_greed(0.4));

        let roster = roster_with(&[("npc_0001", "tavern")]);
        let world = WorldView::new(1, &roster, &map);
        assert_eq!(
            WealthRule.plan(&goal, &fixture.ctx(), &world, &tuning, &mut rng),
            Plan::Act(ActionKind::Travel {
                destination: "market".to_string()
            })
        );

        fixture.location = "market".to_string();
        let roster = roster_with(&[("npc_0001", "market")]);
        let world = WorldView::new(1, &roster, &map);
        assert_eq!(
            WealthRule.plan(&goal, &fixture.ctx(), &world, &tuning, &mut rng),
            Plan::Act(ActionKind::Work)
        );
    }

    #[test]
    fn test_aggressive_agents_rob_the_weak() {
        let map = map();
        let tuning = Tuning::default();
        let goal = Goal::new(GoalKind::AccumulateWealth, 0.5, 0);
        let mut rng = SmallRng::seed_from_u64(2);
        let fixture = Fixture::new(Personality::default().with_aggression(0.9).with_greed(0.9));

        let mut roster = roster_with(&[("npc_0001", "tavern")]);
        let mut mark = summary("npc_0002", "tavern");
        mark.gold = 80;
        mark.strength = 5.0;
        roster.insert(mark);

        let world = WorldView::new(1, &roster, &map);
        assert_eq!(
            WealthRule.plan(&goal, &fixture.ctx(), &world, &tuning, &mut rng),
            Plan::Act(ActionKind::Attack {
                target: AgentId::from("npc_0002")
            })
        );
    }

    #[test]
    fn test_socialize_quota() {
        let map = map();
        let roster = roster_with(&[("npc_0001", "tavern"), ("npc_0002", "tavern")]);
        let mut fixture = Fixture::new(Personality::default().with_sociability(0.9));
        assert!(propose_all(&fixture, &roster, &map, 30)
            .iter()
            .any(|g| g.kind == GoalKind::Socialize));

        for tick in 20..26 {
            fixture.memory.record_event(
                MemoryEvent::new(MemoryKind::SharedSocialActivity, tick)
                    .about(AgentId::from("npc_0002")),
            );
        }
        assert!(propose_all(&fixture, &roster, &map, 30)
            .iter()
            .all(|g| g.kind != GoalKind::Socialize));
    }

    #[test]
    fn test_lonely_agent_heads_for_company() {
        let map = map();
        let tuning = Tuning::default();
        let goal = Goal::new(GoalKind::Socialize, 0.5, 0);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut fixture = Fixture::new(Personality::default());
        fixture.location = "slums".to_string();
        let roster = roster_with(&[("npc_0001", "slums")]);
        let world = WorldView::new(1, &roster, &map);
        assert_eq!(
            SocializeRule.plan(&goal, &fixture.ctx(), &world, &tuning, &mut rng),
            Plan::Act(ActionKind::Travel {
                destination: "tavern".to_string()
            })
        );
    }

    #[test]
    fn test_join_gang_targets_liked_recruiting_leader() {
        let map = map();
        let leader = AgentId::from("npc_0002");
        let mut fixture = Fixture::new(Personality::default().with_loyalty(0.9));
        for tick in 1..5 {
            fixture.memory.record_event(
                MemoryEvent::new(MemoryKind::SharedSocialActivity, tick).about(leader.clone()),
            );
        }

        let mut roster = roster_with(&[("npc_0001", "tavern")]);
        let mut boss = summary("npc_0002", "market");
        boss.gang = Some("gang_0001".to_string());
        boss.is_gang_leader = true;
        boss.recruiting = true;
        roster.insert(boss);

        let goals = propose_all(&fixture, &roster, &map, 6);
        let join = goals
            .iter()
            .find(|g| g.kind == GoalKind::JoinGang)
            .expect("join proposed");
        assert_eq!(join.target.as_ref(), Some(&leader));

        // Repeated rejection retires the goal
        for tick in 6..9 {
            fixture.memory.record_event(
                MemoryEvent::new(MemoryKind::RejectedBy, tick).about(leader.clone()),
            );
        }
        let world = WorldView::new(9, &roster, &map);
        assert_eq!(
            JoinGangRule.review(join, &fixture.ctx(), &world, &Tuning::default()),
            GoalReview::Failed
        );
    }

    #[test]
    fn test_flee_when_hurt_near_enemy() {
        let map = map();
        let enemy = AgentId::from("npc_0002");
        let mut fixture = Fixture::new(Personality::default().with_courage(0.2));
        fixture.vitals.hp = 10;
        for tick in 1..4 {
            fixture
                .memory
                .record_event(MemoryEvent::new(MemoryKind::WasAttacked, tick).about(enemy.clone()));
        }
        let roster = roster_with(&[("npc_0001", "tavern"), ("npc_0002", "tavern")]);
        let goals = propose_all(&fixture, &roster, &map, 5);
        let flee = goals.iter().find(|g| g.kind == GoalKind::Flee).expect("flee proposed");
        assert_eq!(flee.target.as_ref(), Some(&enemy));

        let world = WorldView::new(5, &roster, &map);
        let mut rng = SmallRng::seed_from_u64(4);
        assert!(matches!(
            FleeRule.plan(flee, &fixture.ctx(), &world, &Tuning::default(), &mut rng),
            Plan::Act(ActionKind::Travel { .. })
        ));
    }

    #[test]
    fn test_replacing_a_rule_keeps_one_per_kind() {
        let rules = GoalRules::standard().with_rule(WealthRule);
        assert_eq!(
            format!("{:?}", rules).matches("AccumulateWealth").count(),
            1
        );
        assert!(GoalRules::empty().rule_for(GoalKind::Flee).is_none());
    }
}
