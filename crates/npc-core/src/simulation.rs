//! Simulation Context
//!
//! `Simulation` owns the ECS world, the tick schedule and the population
//! hook. Everything a display layer or test needs goes through it; there
//! is no global state.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use std::collections::BTreeSet;

use npc_events::{detail_keys, EventType, GangSnapshot, GoalSnapshot, NpcSnapshot, WorldEvent};

use crate::actions::{Action, CombatResolver, CombatResolverRes};
use crate::components::{
    AgentId, AgentIndex, Alive, GangId, GangRegistry, GoalManager, Graveyard, MemoryEvent,
    MemoryStore, Personality, Relationship, SimClock, SimRng, TownMap, TurfOutcome,
};
use crate::config::Tuning;
use crate::error::{GangError, Result, SimError};
use crate::events::{EventLog, EventLogger};
use crate::output::{PopulationStats, WealthStats};
use crate::setup::{
    create_town_map, generate_population, spawn_agent, ArchetypeRespawner, Census, NpcSeed,
    PopulationSource,
};
use crate::systems::{
    build_roster, bury_dead, daily_upkeep, decide_actions, deliver_memories, is_day_boundary,
    npc_snapshot, resolve_actions, update_gangs, GoalRules, PendingMemories, ProposedActions,
    Roster, TickEvents,
};

/// A running town
pub struct Simulation {
    world: World,
    schedule: Schedule,
    tuning: Tuning,
    seed: u64,
    population: Box<dyn PopulationSource>,
    /// Tops up whatever the population source leaves below the floor
    fallback: ArchetypeRespawner,
    initial_population: usize,
    initialized: bool,
}

impl Simulation {
    /// Build an empty simulation. Fails on invalid tuning, including
    /// unknown respawn archetypes.
    pub fn new(tuning: Tuning, seed: u64) -> Result<Self> {
        tuning.validate()?;
        let fallback = ArchetypeRespawner::from_tuning(&tuning)?;
        let mut world = build_world(&tuning, seed);
        world.insert_resource(GoalRules::standard());
        world.insert_resource(CombatResolverRes::default());

        Ok(Self {
            world,
            schedule: build_schedule(),
            tuning,
            seed,
            population: Box::new(fallback.clone()),
            fallback,
            initial_population: 0,
            initialized: false,
        })
    }

    pub fn with_combat_resolver(mut self, resolver: impl CombatResolver + 'static) -> Self {
        self.world.insert_resource(CombatResolverRes(Box::new(resolver)));
        self
    }

    pub fn with_population_source(mut self, source: impl PopulationSource + 'static) -> Self {
        self.population = Box::new(source);
        self
    }

    pub fn with_goal_rules(mut self, rules: GoalRules) -> Self {
        self.world.insert_resource(rules);
        self
    }

    /// Mirror every committed event to a JSONL file
    pub fn with_event_logger(mut self, logger: EventLogger) -> Self {
        self.world.insert_resource(logger);
        self
    }

    /// Seed the town. All seeds are validated before any is spawned, so a
    /// failed call leaves the simulation untouched.
    pub fn initialize(&mut self, seeds: Vec<NpcSeed>) -> Result<()> {
        if self.initialized {
            return Err(SimError::AlreadyInitialized);
        }
        self.validate_seeds(&seeds)?;

        let count = seeds.len();
        for seed in seeds {
            spawn_agent(&mut self.world, seed)?;
        }
        self.initial_population = count;
        self.initialized = true;
        tracing::info!(agents = count, seed = self.seed, "simulation initialized");
        Ok(())
    }

    /// Seed the town with a generated population drawn from the
    /// simulation's own random source.
    pub fn initialize_generated(&mut self, count: usize) -> Result<()> {
        let seeds = {
            let mut rng = self.world.resource_mut::<SimRng>();
            generate_population(count, self.tuning.economy.starting_gold, &mut rng.0)
        };
        self.initialize(seeds)
    }

    fn validate_seeds(&self, seeds: &[NpcSeed]) -> Result<()> {
        let index = self.world.resource::<AgentIndex>();
        let graveyard = self.world.resource::<Graveyard>();
        let map = self.world.resource::<TownMap>();
        let mut seen = BTreeSet::new();
        for seed in seeds {
            if index.contains(&seed.id) || graveyard.contains(&seed.id) || !seen.insert(&seed.id) {
                return Err(SimError::DuplicateAgent(seed.id.0.clone()));
            }
            if !map.contains(&seed.location) {
                return Err(SimError::UnknownLocation(seed.location.clone()));
            }
        }
        Ok(())
    }

    /// Advance one simulated hour
    pub fn simulate_hour(&mut self) {
        self.world.resource_mut::<SimClock>().advance();
        self.schedule.run(&mut self.world);
        if self.world.resource::<SimClock>().is_day_boundary() {
            self.handle_respawns();
        }
    }

    pub fn simulate_hours(&mut self, hours: u64) {
        for _ in 0..hours {
            self.simulate_hour();
        }
    }

    /// Discard every agent, gang and event. The seed, tuning, combat
    /// resolver, goal rules and event logger carry over.
    pub fn reset(&mut self) {
        let mut fresh = build_world(&self.tuning, self.seed);
        if let Some(resolver) = self.world.remove_resource::<CombatResolverRes>() {
            fresh.insert_resource(resolver);
        }
        if let Some(rules) = self.world.remove_resource::<GoalRules>() {
            fresh.insert_resource(rules);
        }
        if let Some(logger) = self.world.remove_resource::<EventLogger>() {
            fresh.insert_resource(logger);
        }

        self.world = fresh;
        self.schedule = build_schedule();
        self.initial_population = 0;
        self.initialized = false;
        tracing::info!("simulation reset");
    }

    fn handle_respawns(&mut self) {
        let clock = *self.world.resource::<SimClock>();
        let alive = self.alive_count();
        let census = Census::new(
            clock.day(),
            self.initial_population,
            alive,
            self.next_index(),
            &self.tuning,
        );

        let Some(mut rng) = self.world.remove_resource::<SimRng>() else {
            return;
        };

        let mut seeds = self.population.handle_daily_respawns(&census, &mut rng.0);
        if seeds.len() > census.room() {
            tracing::debug!(
                offered = seeds.len(),
                room = census.room(),
                "respawns capped at upper bound"
            );
            seeds.truncate(census.room());
        }
        let mut admitted = 0;
        for seed in seeds {
            if self.admit(seed, &clock) {
                admitted += 1;
            }
        }

        let missing = census.shortfall().saturating_sub(admitted);
        if missing > 0 {
            let top_up = Census {
                alive: alive + admitted,
                next_index: self.next_index(),
                ..census
            };
            let mut extra = self.fallback.handle_daily_respawns(&top_up, &mut rng.0);
            extra.truncate(missing);
            for seed in extra {
                self.admit(seed, &clock);
            }
        }

        self.world.insert_resource(rng);
    }

    /// Spawn one newcomer and announce it
    fn admit(&mut self, seed: NpcSeed, clock: &SimClock) -> bool {
        let id = seed.id.clone();
        let location = seed.location.clone();
        let archetype = seed.archetype.map(|a| a.as_str()).unwrap_or("custom");

        if let Err(err) = spawn_agent(&mut self.world, seed) {
            tracing::warn!(agent = %id, %err, "respawn rejected");
            return false;
        }
        let event = self
            .world
            .resource_mut::<TickEvents>()
            .create(clock.timestamp(), EventType::Respawn)
            .with_participant(id.as_str())
            .with_location(location)
            .with_detail(detail_keys::ARCHETYPE, archetype);
        self.commit(event);
        tracing::info!(agent = %id, archetype, day = clock.day(), "agent arrived");
        true
    }

    /// Write an event produced outside the schedule straight to the log
    fn commit(&mut self, event: WorldEvent) {
        if let Some(mut logger) = self.world.get_resource_mut::<EventLogger>() {
            if let Err(err) = logger.log(&event) {
                tracing::warn!(%err, "failed to write event");
            }
        }
        self.world.resource_mut::<EventLog>().push(event);
    }

    /// Hand a location to the winner of a gang war fought outside the core.
    /// Returns the gang that lost the location, if any.
    pub fn apply_turf_outcome(
        &mut self,
        outcome: TurfOutcome,
    ) -> Result<Option<GangId>, GangError> {
        let previous = self
            .world
            .resource_mut::<GangRegistry>()
            .apply_turf_outcome(&outcome)?;

        let clock = *self.world.resource::<SimClock>();
        let mut event = self
            .world
            .resource_mut::<TickEvents>()
            .create(clock.timestamp(), EventType::TurfChanged)
            .with_location(outcome.location.as_str())
            .with_detail(detail_keys::GANG_ID, &outcome.winner);
        if let Some(previous) = &previous {
            event = event.with_detail(detail_keys::PREVIOUS_OWNER, previous);
        }
        self.commit(event);
        tracing::info!(
            location = %outcome.location,
            winner = %outcome.winner,
            previous = ?previous,
            "turf changed hands"
        );
        Ok(previous)
    }

    /// Record a memory from outside the tick, such as a scripted incident.
    /// Returns false for unknown agents.
    pub fn record_memory(&mut self, agent: &AgentId, event: MemoryEvent) -> bool {
        let Some(entity) = self.entity_of(agent) else {
            return false;
        };
        match self.world.get_mut::<MemoryStore>(entity) {
            Some(mut store) => {
                store.record_event(event);
                true
            }
            None => false,
        }
    }

    fn next_index(&self) -> u64 {
        self.world.resource::<AgentIndex>().next_index()
    }

    fn alive_count(&self) -> usize {
        let index = self.world.resource::<AgentIndex>();
        index
            .iter()
            .filter(|(_, entity)| {
                self.world
                    .get::<Alive>(*entity)
                    .is_some_and(|alive| alive.is_alive())
            })
            .count()
    }

    fn entity_of(&self, agent: &AgentId) -> Option<Entity> {
        self.world.resource::<AgentIndex>().get(agent)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn current_tick(&self) -> u64 {
        self.world.resource::<SimClock>().tick()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn initial_population(&self) -> usize {
        self.initial_population
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Read access to the underlying world
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Events from the last `days` simulated days, oldest first
    pub fn get_recent_events(&self, days: u64) -> Vec<WorldEvent> {
        let now = self.current_tick();
        self.world
            .resource::<EventLog>()
            .recent(days, now)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Living agents in id order
    pub fn get_alive_npcs(&self) -> Vec<NpcSnapshot> {
        self.world
            .resource::<AgentIndex>()
            .iter()
            .filter_map(|(_, entity)| self.snapshot(entity))
            .filter(|npc| npc.alive)
            .collect()
    }

    /// Snapshot of one agent. The dead are found while their gravestone
    /// lasts.
    pub fn npc(&self, agent: &AgentId) -> Option<NpcSnapshot> {
        match self.entity_of(agent) {
            Some(entity) => self.snapshot(entity),
            None => self
                .world
                .resource::<Graveyard>()
                .get(agent)
                .map(|grave| grave.snapshot.clone()),
        }
    }

    fn snapshot(&self, entity: Entity) -> Option<NpcSnapshot> {
        npc_snapshot(&self.world, entity)
    }

    /// How `observer` currently regards `subject`
    pub fn get_relationship(&self, observer: &AgentId, subject: &AgentId) -> Option<Relationship> {
        self.memories_of(observer)
            .map(|memory| memory.get_relationship(subject))
    }

    pub fn memories_of(&self, agent: &AgentId) -> Option<&MemoryStore> {
        self.world.get::<MemoryStore>(self.entity_of(agent)?)
    }

    pub fn personality_of(&self, agent: &AgentId) -> Option<&Personality> {
        self.world.get::<Personality>(self.entity_of(agent)?)
    }

    pub fn active_goals(&self, agent: &AgentId) -> Vec<GoalSnapshot> {
        self.entity_of(agent)
            .and_then(|entity| self.world.get::<GoalManager>(entity))
            .map(|goals| {
                goals
                    .get_active_goals()
                    .into_iter()
                    .map(|goal| goal.to_snapshot())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn gangs(&self) -> Vec<GangSnapshot> {
        self.world
            .resource::<GangRegistry>()
            .iter()
            .map(|gang| gang.to_snapshot())
            .collect()
    }

    pub fn gang_registry(&self) -> &GangRegistry {
        self.world.resource::<GangRegistry>()
    }

    /// Actions proposed during the most recent tick, in agent id order
    pub fn last_decisions(&self) -> &[(AgentId, Action)] {
        self.world.resource::<ProposedActions>().as_slice()
    }

    pub fn population_stats(&self) -> PopulationStats {
        let living = self.get_alive_npcs();
        let registry = self.world.resource::<GangRegistry>();
        // Killed this tick but not yet buried
        let unburied = self.world.resource::<AgentIndex>().len() - living.len();
        PopulationStats {
            alive: living.len(),
            dead: self.world.resource::<Graveyard>().total() + unburied,
            gangs: registry.len(),
            in_gangs: living.iter().filter(|npc| npc.gang_id.is_some()).count(),
        }
    }

    /// Gold distribution over living agents
    pub fn wealth_stats(&self) -> WealthStats {
        let golds: Vec<u32> = self.get_alive_npcs().iter().map(|npc| npc.gold).collect();
        WealthStats::from_golds(&golds)
    }
}

/// Fresh world with every per-run resource in place
fn build_world(tuning: &Tuning, seed: u64) -> World {
    let mut world = World::new();
    world.insert_resource(tuning.clone());
    world.insert_resource(create_town_map());
    world.insert_resource(AgentIndex::new());
    world.insert_resource(Graveyard::new());
    world.insert_resource(GangRegistry::new());
    world.insert_resource(SimClock::new());
    world.insert_resource(SimRng::from_seed(seed));
    world.insert_resource(Roster::new());
    world.insert_resource(ProposedActions::new());
    world.insert_resource(TickEvents::new());
    world.insert_resource(PendingMemories::new());
    world.insert_resource(EventLog::new());
    world
}

fn build_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            build_roster,
            decide_actions,
            resolve_actions,
            update_gangs,
            deliver_memories,
            bury_dead,
            daily_upkeep.run_if(is_day_boundary),
        )
            .chain(),
    );
    schedule
}
