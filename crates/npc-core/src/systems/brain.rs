//! Agent Brain
//!
//! Turns an agent's goals and surroundings into one proposed action per
//! tick. The brain never changes the world; resolution happens later in
//! [`crate::systems::resolve`].

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::actions::{add_noise_to_weights, weighted_random_choice, Action, ActionKind, WeightedAction};
use crate::components::{
    AgentId, AgentIndex, Alive, GangMembership, GoalManager, MemoryStore, Personality, Position,
    SimClock, SimRng, TownMap, Vitals,
};
use crate::config::Tuning;
use crate::systems::goals::{GoalRules, Plan};
use crate::systems::perception::{AgentContext, Roster, WorldView};

/// Resource: actions proposed this tick, in agent id order
#[derive(Resource, Debug, Default)]
pub struct ProposedActions {
    actions: Vec<(AgentId, Action)>,
}

impl ProposedActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    pub fn push(&mut self, agent: AgentId, action: Action) {
        self.actions.push((agent, action));
    }

    pub fn get(&self, agent: &AgentId) -> Option<&Action> {
        self.actions
            .iter()
            .find(|(id, _)| id == agent)
            .map(|(_, action)| action)
    }

    pub fn as_slice(&self) -> &[(AgentId, Action)] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Decision function shared by every agent
pub struct Brain<'r> {
    rules: &'r GoalRules,
    tuning: &'r Tuning,
}

impl<'r> Brain<'r> {
    pub fn new(rules: &'r GoalRules, tuning: &'r Tuning) -> Self {
        Self { rules, tuning }
    }

    /// Evaluate goals, pursue the best actionable one, or idle.
    ///
    /// Goals whose plan is discarded (dead or unreachable target) are
    /// retired and the next goal is tried within the same call, so this
    /// always returns an action.
    pub fn decide_next_action(
        &self,
        agent: &AgentContext<'_>,
        goals: &mut GoalManager,
        world: &WorldView<'_>,
        rng: &mut impl Rng,
    ) -> Action {
        goals.evaluate(agent, world, self.rules, self.tuning, rng);

        if let Some(action) = self.pursue_goals(agent, goals, world, rng) {
            return action;
        }
        self.idle(agent, world, rng)
    }

    fn pursue_goals(
        &self,
        agent: &AgentContext<'_>,
        goals: &mut GoalManager,
        world: &WorldView<'_>,
        rng: &mut impl Rng,
    ) -> Option<Action> {
        let ordered: Vec<_> = goals.get_active_goals().into_iter().cloned().collect();
        for goal in ordered {
            match self.rules.plan(&goal, agent, world, self.tuning, &mut *rng) {
                Plan::Act(kind) => return Some(Action::for_goal(kind, goal.kind)),
                Plan::Blocked => continue,
                Plan::Discard => {
                    tracing::debug!(
                        agent = %agent.id,
                        goal = goal.kind.as_str(),
                        "goal discarded"
                    );
                    goals.retire(goal.kind, goal.target.as_ref());
                }
            }
        }
        None
    }

    /// Personality-weighted idle behavior
    fn idle(&self, agent: &AgentContext<'_>, world: &WorldView<'_>, rng: &mut impl Rng) -> Action {
        let cfg = &self.tuning.brain;
        let economy = &self.tuning.economy;
        let p = agent.personality;
        let hurt = 1.0 - agent.vitals.hp_fraction();
        let mut candidates = Vec::new();

        if let Some(next) = world.map.adjacent_to(agent.location).choose(rng) {
            candidates.push(WeightedAction::new(
                ActionKind::Travel {
                    destination: next.clone(),
                },
                cfg.wander_base + cfg.impulsive_wander_bonus * p.impulsiveness,
                "wander",
            ));
        }

        if !world.map.is_social_venue(agent.location) {
            if let Some(step) = step_toward(world, agent.location, |l| l.kind.is_social_venue()) {
                candidates.push(WeightedAction::new(
                    ActionKind::Travel { destination: step },
                    cfg.social_wander_bonus * p.sociability,
                    "seek company",
                ));
            }
        }

        candidates.push(WeightedAction::new(
            ActionKind::Rest,
            cfg.rest_base + cfg.injured_rest_bonus * hurt,
            "rest",
        ));

        if agent.vitals.gold >= economy.shop_price {
            let weight = cfg.shop_base * (1.0 - p.greed) + cfg.injured_shop_bonus * hurt;
            if world.map.has_shop(agent.location) {
                candidates.push(WeightedAction::new(ActionKind::Shop, weight, "shop"));
            } else if let Some(step) = step_toward(world, agent.location, |l| l.kind.has_shop()) {
                candidates.push(WeightedAction::new(
                    ActionKind::Travel { destination: step },
                    weight,
                    "go shopping",
                ));
            }
        }

        if world.map.is_workplace(agent.location) {
            candidates.push(WeightedAction::new(
                ActionKind::Work,
                cfg.work_base + cfg.ambition_work_bonus * p.ambition,
                "work",
            ));
        }

        add_noise_to_weights(&mut candidates, cfg.noise, rng);
        weighted_random_choice(rng, &candidates)
            .map(|choice| Action::idle(choice.action.clone()))
            .unwrap_or_else(Action::rest)
    }
}

fn step_toward(
    world: &WorldView<'_>,
    from: &str,
    predicate: impl Fn(&crate::components::Location) -> bool,
) -> Option<String> {
    let destination = world.map.nearest(from, predicate)?;
    world.map.next_step_toward(from, destination)
}

/// Ask every living agent's brain for an action, in id order
#[allow(clippy::too_many_arguments)]
pub fn decide_actions(
    index: Res<AgentIndex>,
    roster: Res<Roster>,
    map: Res<TownMap>,
    clock: Res<SimClock>,
    rules: Res<GoalRules>,
    tuning: Res<Tuning>,
    mut rng: ResMut<SimRng>,
    mut proposed: ResMut<ProposedActions>,
    mut agents: Query<(
        &AgentId,
        &Personality,
        &MemoryStore,
        &Vitals,
        &Position,
        &GangMembership,
        &Alive,
        &mut GoalManager,
    )>,
) {
    proposed.clear();
    let world = WorldView::new(clock.tick(), &roster, &map);
    let brain = Brain::new(&rules, &tuning);

    for (_, entity) in index.iter() {
        let Ok((id, personality, memory, vitals, position, membership, alive, mut goals)) =
            agents.get_mut(entity)
        else {
            continue;
        };
        if !alive.is_alive() {
            continue;
        }
        let agent = AgentContext {
            id,
            personality,
            memory,
            vitals,
            location: &position.location_id,
            membership,
        };
        let action = brain.decide_next_action(&agent, &mut goals, &world, &mut rng.0);
        tracing::trace!(agent = %id, action = action.kind.as_str(), "decided");
        proposed.push(id.clone(), action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{GoalKind, Location, LocationKind, MemoryEvent, MemoryKind};
    use crate::systems::perception::tests::summary;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    struct Fixture {
        id: AgentId,
        personality: Personality,
        memory: MemoryStore,
        vitals: Vitals,
        membership: GangMembership,
        location: String,
    }

    impl Fixture {
        fn new(personality: Personality, location: &str) -> Self {
            Self {
                id: AgentId::from("npc_0001"),
                personality,
                memory: MemoryStore::new(&personality),
                vitals: Vitals::new(1, 60, 20),
                membership: GangMembership::default(),
                location: location.to_string(),
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

    fn map() -> TownMap {
        let mut map = TownMap::new();
        map.register(Location::new("tavern", "Tavern", LocationKind::Tavern));
        map.register(Location::new("market", "Market", LocationKind::Market));
        map.connect("tavern", "market");
        map
    }

    /// Traits low enough that no goal fires
    fn placid() -> Personality {
        Personality::uniform(0.1).with_loyalty(0.1)
    }

    #[test]
    fn test_idle_always_returns_an_action() {
        let map = map();
        let tuning = Tuning::default();
        let rules = GoalRules::standard();
        let brain = Brain::new(&rules, &tuning);
        let fixture = Fixture::new(placid(), "tavern");
        let mut roster = Roster::new();
        roster.insert(summary("npc_0001", "tavern"));
        let world = WorldView::new(1, &roster, &map);
        let mut rng = SmallRng::seed_from_u64(7);

        for _ in 0..50 {
            let mut goals = GoalManager::new();
            let action = brain.decide_next_action(&fixture.ctx(), &mut goals, &world, &mut rng);
            assert!(action.motivation.is_none());
            assert!(matches!(
                action.kind,
                ActionKind::Rest | ActionKind::Shop | ActionKind::Travel { .. } | ActionKind::Work
            ));
        }
    }

    #[test]
    fn test_dead_target_falls_through_to_next_goal() {
        let map = map();
        let tuning = Tuning::default();
        let rules = GoalRules::standard();
        let brain = Brain::new(&rules, &tuning);

        let mut fixture = Fixture::new(placid().with_greed(0.9), "market");
        let ghost = AgentId::from("npc_0009");
        fixture
            .memory
            .record_event(MemoryEvent::new(MemoryKind::WasAttacked, 1).about(ghost.clone()));

        let mut roster = Roster::new();
        roster.insert(summary("npc_0001", "market"));
        let world = WorldView::new(2, &roster, &map);

        let mut goals = GoalManager::new();
        let mut rng = SmallRng::seed_from_u64(1);
        goals.offer(
            crate::components::Goal::new(GoalKind::GetRevenge, 5.0, 2).with_target(ghost.clone()),
            0.0,
            &mut rng,
        );

        let action = brain.decide_next_action(&fixture.ctx(), &mut goals, &world, &mut rng);
        assert_eq!(action.kind, ActionKind::Work);
        assert_eq!(action.motivation, Some(GoalKind::AccumulateWealth));
        assert!(!goals.has_goal(GoalKind::GetRevenge, Some(&ghost)));
    }

    #[test]
    fn test_goal_beats_idle() {
        let map = map();
        let tuning = Tuning::default();
        let rules = GoalRules::standard();
        let brain = Brain::new(&rules, &tuning);
        let fixture = Fixture::new(placid().with_sociability(0.9), "tavern");

        let mut roster = Roster::new();
        roster.insert(summary("npc_0001", "tavern"));
        roster.insert(summary("npc_0002", "tavern"));
        let world = WorldView::new(1, &roster, &map);
        let mut goals = GoalManager::new();
        let mut rng = SmallRng::seed_from_u64(3);

        let action = brain.decide_next_action(&fixture.ctx(), &mut goals, &world, &mut rng);
        assert_eq!(
            action.kind,
            ActionKind::Socialize {
                partner: AgentId::from("npc_0002")
            }
        );
        assert_eq!(action.motivation_tag(), Some("socialize"));
    }
}
