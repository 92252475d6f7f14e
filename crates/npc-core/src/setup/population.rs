//! Population Seeding
//!
//! Agent seeds, the initial population generator, spawning into the ECS
//! world, and the daily respawn hook.

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::{
    AgentId, AgentIndex, AgentName, Alive, Archetype, GangMembership, GoalManager, Graveyard,
    MemoryStore, Personality, Position, TownMap, Vitals,
};
use crate::config::Tuning;
use crate::error::{Result, SimError};
use crate::setup::town::{DOCKS, MARKET, SLUMS, TAVERN, TEMPLE, TOWN_SQUARE};

const FIRST_NAMES: &[&str] = &[
    "Aldo", "Bess", "Cato", "Dara", "Edric", "Fen", "Gilda", "Hob", "Isolde", "Jory",
    "Kestrel", "Lusk", "Marta", "Nell", "Osric", "Pim", "Quill", "Rosalind", "Sten", "Tamsin",
    "Ulric", "Vesna", "Wat", "Yara", "Brannoc", "Corra", "Dunstan", "Elsbeth", "Gorm", "Hesper",
];

const FAMILY_NAMES: &[&str] = &[
    "Ashby", "Blackwater", "Cobble", "Dunmore", "Flint", "Gale", "Hollis", "Knot", "Marsh",
    "Pike", "Rook", "Salter", "Thatch", "Vane", "Wick",
];

/// Where newly generated agents may start
const START_LOCATIONS: &[&str] = &[TOWN_SQUARE, TAVERN, MARKET, DOCKS, SLUMS, TEMPLE];

/// Relative frequency of each archetype in a generated population
const ARCHETYPE_MIX: &[(Archetype, u32)] = &[
    (Archetype::Commoner, 5),
    (Archetype::Merchant, 2),
    (Archetype::Thug, 2),
    (Archetype::Guard, 1),
    (Archetype::Noble, 1),
    (Archetype::Drifter, 2),
];

/// Everything needed to bring one agent into the world
#[derive(Debug, Clone, PartialEq)]
pub struct NpcSeed {
    pub id: AgentId,
    pub name: String,
    pub personality: Personality,
    /// Template the personality was sampled from, if any
    pub archetype: Option<Archetype>,
    pub location: String,
    pub level: u32,
    pub hp: i32,
    pub gold: u32,
}

impl NpcSeed {
    pub fn new(id: impl Into<String>, name: impl Into<String>, personality: Personality) -> Self {
        Self {
            id: AgentId::new(id),
            name: name.into(),
            personality,
            archetype: None,
            location: TOWN_SQUARE.to_string(),
            level: 1,
            hp: 60,
            gold: 20,
        }
    }

    /// Seed whose personality is sampled from an archetype
    pub fn from_archetype(
        id: impl Into<String>,
        name: impl Into<String>,
        archetype: Archetype,
        rng: &mut impl Rng,
    ) -> Self {
        let personality = Personality::generate_random(archetype, rng);
        Self {
            archetype: Some(archetype),
            ..Self::new(id, name, personality)
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_gold(mut self, gold: u32) -> Self {
        self.gold = gold;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.max(1);
        self
    }

    pub fn with_hp(mut self, hp: i32) -> Self {
        self.hp = hp.max(1);
        self
    }
}

/// Sequential agent id, e.g. `npc_0042`
pub fn npc_id(index: u64) -> String {
    format!("npc_{:04}", index)
}

fn random_name(rng: &mut impl Rng) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Nobody");
    let family = FAMILY_NAMES.choose(rng).copied().unwrap_or("Nameless");
    format!("{} {}", first, family)
}

/// Generate `count` seeds with ids `npc_0001..`, mixed archetypes and
/// starting locations spread over the default town.
pub fn generate_population(count: usize, starting_gold: u32, rng: &mut impl Rng) -> Vec<NpcSeed> {
    (1..=count as u64)
        .map(|index| {
            let archetype = ARCHETYPE_MIX
                .choose_weighted(rng, |(_, weight)| *weight)
                .map(|(archetype, _)| *archetype)
                .unwrap_or(Archetype::Commoner);
            let name = random_name(rng);
            let location = START_LOCATIONS.choose(rng).copied().unwrap_or(TOWN_SQUARE);
            let gold = starting_gold / 2 + rng.gen_range(0..=starting_gold);
            NpcSeed::from_archetype(npc_id(index), name, archetype, rng)
                .with_location(location)
                .with_gold(gold)
        })
        .collect()
}

/// Spawn one agent. Rejects duplicate ids and unknown locations.
pub fn spawn_agent(world: &mut World, seed: NpcSeed) -> Result<Entity> {
    let buried = world
        .get_resource::<Graveyard>()
        .is_some_and(|graveyard| graveyard.contains(&seed.id));
    if buried || world.resource::<AgentIndex>().contains(&seed.id) {
        return Err(SimError::DuplicateAgent(seed.id.0));
    }
    if !world.resource::<TownMap>().contains(&seed.location) {
        return Err(SimError::UnknownLocation(seed.location));
    }

    let entity = world
        .spawn((
            seed.id.clone(),
            AgentName(seed.name),
            seed.personality,
            MemoryStore::new(&seed.personality),
            GoalManager::new(),
            Vitals::new(seed.level, seed.hp, seed.gold),
            Position::new(seed.location),
            Alive(true),
            GangMembership::default(),
        ))
        .id();
    world.resource_mut::<AgentIndex>().insert(seed.id, entity);
    Ok(entity)
}

/// Absorbs float error in `initial * bound`
const BOUND_EPSILON: f32 = 1e-3;

/// Population counts handed to the respawn hook once per day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Census {
    pub day: u64,
    pub initial: usize,
    pub alive: usize,
    /// Living agents the core keeps as a floor
    pub min_allowed: usize,
    /// Living agents the core never exceeds
    pub max_allowed: usize,
    /// Next free sequential id index
    pub next_index: u64,
}

impl Census {
    pub fn new(day: u64, initial: usize, alive: usize, next_index: u64, tuning: &Tuning) -> Self {
        let bounds = &tuning.population;
        Self {
            day,
            initial,
            alive,
            min_allowed: (initial as f32 * bounds.lower_bound - BOUND_EPSILON).ceil() as usize,
            max_allowed: (initial as f32 * bounds.upper_bound + BOUND_EPSILON).floor() as usize,
            next_index,
        }
    }

    pub fn shortfall(&self) -> usize {
        self.min_allowed.saturating_sub(self.alive)
    }

    pub fn room(&self) -> usize {
        self.max_allowed.saturating_sub(self.alive)
    }
}

/// External hook deciding who arrives in town each day.
///
/// The core clamps what a source returns to the census bounds and tops up
/// a source that leaves the population below the floor.
pub trait PopulationSource: Send + Sync {
    fn handle_daily_respawns(&mut self, census: &Census, rng: &mut SmallRng) -> Vec<NpcSeed>;
}

/// Replaces the dead with newcomers drawn from a list of archetypes
#[derive(Debug, Clone)]
pub struct ArchetypeRespawner {
    archetypes: Vec<Archetype>,
    max_daily: usize,
    spawn_location: String,
    starting_gold: u32,
}

impl ArchetypeRespawner {
    pub fn new(archetypes: Vec<Archetype>, max_daily: usize, spawn_location: impl Into<String>, starting_gold: u32) -> Self {
        Self {
            archetypes,
            max_daily,
            spawn_location: spawn_location.into(),
            starting_gold,
        }
    }

    /// Build from tuning; unknown archetype names are an error
    pub fn from_tuning(tuning: &Tuning) -> Result<Self> {
        let archetypes = tuning
            .population
            .respawn_archetypes
            .iter()
            .map(|name| name.parse::<Archetype>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(
            archetypes,
            tuning.population.max_daily_respawns,
            tuning.simulation.spawn_location.clone(),
            tuning.economy.starting_gold,
        ))
    }

    /// Arrivals wanted today: whatever the floor demands, otherwise the
    /// dead are replaced up to the daily cap.
    pub fn wanted(&self, census: &Census) -> usize {
        let replacements = census.initial.saturating_sub(census.alive).min(self.max_daily);
        census.shortfall().max(replacements)
    }
}

impl PopulationSource for ArchetypeRespawner {
    fn handle_daily_respawns(&mut self, census: &Census, rng: &mut SmallRng) -> Vec<NpcSeed> {
        let wanted = self.wanted(census);
        (0..wanted as u64)
            .map(|offset| {
                let archetype = self
                    .archetypes
                    .choose(rng)
                    .copied()
                    .unwrap_or(Archetype::Commoner);
                let name = random_name(rng);
                NpcSeed::from_archetype(npc_id(census.next_index + offset), name, archetype, rng)
                    .with_location(self.spawn_location.as_str())
                    .with_gold(self.starting_gold)
            })
            .collect()
    }
}
