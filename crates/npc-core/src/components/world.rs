//! World Components
//!
//! Components and resources for positions, the town map and the clock.

use bevy_ecs::prelude::*;
use npc_events::SimTimestamp;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Component: An agent's current position in the world
#[derive(Component, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub location_id: String,
}

impl Position {
    pub fn new(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
        }
    }
}

/// Type of location in the town
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Square,
    Tavern,
    Market,
    Docks,
    Slums,
    Temple,
}

impl LocationKind {
    /// Places where agents gather and gangs recruit
    pub fn is_social_venue(&self) -> bool {
        matches!(self, LocationKind::Square | LocationKind::Tavern)
    }

    pub fn is_workplace(&self) -> bool {
        matches!(self, LocationKind::Market | LocationKind::Docks)
    }

    pub fn has_shop(&self) -> bool {
        matches!(self, LocationKind::Market)
    }

    /// Multiplier on healing from rest
    pub fn rest_quality(&self) -> f32 {
        match self {
            LocationKind::Temple => 2.0,
            LocationKind::Tavern => 1.5,
            LocationKind::Slums => 0.5,
            _ => 1.0,
        }
    }
}

/// A place in the town
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub kind: LocationKind,
    /// Adjacent location ids, kept sorted
    pub adjacent: Vec<String>,
}

impl Location {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: LocationKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            adjacent: Vec::new(),
        }
    }
}

/// Resource: the town graph
#[derive(Resource, Debug, Clone, Default)]
pub struct TownMap {
    locations: BTreeMap<String, Location>,
}

impl TownMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a location
    pub fn register(&mut self, location: Location) {
        self.locations.insert(location.id.clone(), location);
    }

    /// Connect two registered locations both ways
    pub fn connect(&mut self, a: &str, b: &str) {
        if a == b || !self.contains(a) || !self.contains(b) {
            return;
        }
        for (from, to) in [(a, b), (b, a)] {
            if let Some(loc) = self.locations.get_mut(from) {
                if !loc.adjacent.iter().any(|id| id == to) {
                    loc.adjacent.push(to.to_string());
                    loc.adjacent.sort();
                }
            }
        }
    }

    /// Get a location by ID
    pub fn get(&self, location_id: &str) -> Option<&Location> {
        self.locations.get(location_id)
    }

    pub fn contains(&self, location_id: &str) -> bool {
        self.locations.contains_key(location_id)
    }

    /// Location ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }

    pub fn kind_of(&self, location_id: &str) -> Option<LocationKind> {
        self.get(location_id).map(|l| l.kind)
    }

    pub fn is_social_venue(&self, location_id: &str) -> bool {
        self.kind_of(location_id).is_some_and(|k| k.is_social_venue())
    }

    pub fn is_workplace(&self, location_id: &str) -> bool {
        self.kind_of(location_id).is_some_and(|k| k.is_workplace())
    }

    pub fn has_shop(&self, location_id: &str) -> bool {
        self.kind_of(location_id).is_some_and(|k| k.has_shop())
    }

    /// Get adjacent location ids
    pub fn adjacent_to(&self, location_id: &str) -> &[String] {
        self.get(location_id)
            .map(|loc| loc.adjacent.as_slice())
            .unwrap_or(&[])
    }

    /// Check if two locations are adjacent
    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        self.adjacent_to(a).iter().any(|id| id == b)
    }

    /// Shortest path from `from` to `to`, excluding `from`. Empty when
    /// already there, `None` when unreachable.
    pub fn path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        if from == to {
            return Some(Vec::new());
        }

        let mut came_from: BTreeMap<&str, &str> = BTreeMap::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        seen.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for next in self.adjacent_to(current) {
                let next = next.as_str();
                if !seen.insert(next) {
                    continue;
                }
                came_from.insert(next, current);
                if next == to {
                    let mut path = vec![to.to_string()];
                    let mut step = to;
                    while let Some(prev) = came_from.get(step) {
                        if *prev == from {
                            break;
                        }
                        path.push(prev.to_string());
                        step = *prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// First hop on the shortest path toward `to`
    pub fn next_step_toward(&self, from: &str, to: &str) -> Option<String> {
        self.path(from, to).and_then(|p| p.into_iter().next())
    }

    /// Nearest location (possibly `from` itself) satisfying `predicate`.
    /// Ties break on location id.
    pub fn nearest(&self, from: &str, predicate: impl Fn(&Location) -> bool) -> Option<&str> {
        let start = self.get(from)?;
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut frontier: Vec<&str> = vec![start.id.as_str()];
        seen.insert(start.id.as_str());

        while !frontier.is_empty() {
            frontier.sort();
            if let Some(hit) = frontier
                .iter()
                .copied()
                .find(|id| self.get(id).is_some_and(&predicate))
            {
                return Some(hit);
            }
            let mut next_frontier = Vec::new();
            for id in &frontier {
                for next in self.adjacent_to(id) {
                    if seen.insert(next.as_str()) {
                        next_frontier.push(next.as_str());
                    }
                }
            }
            frontier = next_frontier;
        }
        None
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Resource: the single seeded random source
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub SmallRng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

/// Resource: simulation clock
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimClock {
    now: SimTimestamp,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self) -> u64 {
        self.now.tick
    }

    pub fn timestamp(&self) -> SimTimestamp {
        self.now
    }

    /// Advance by one hour
    pub fn advance(&mut self) {
        self.now.advance_tick();
    }

    pub fn is_day_boundary(&self) -> bool {
        self.now.is_day_boundary()
    }

    pub fn day(&self) -> u64 {
        self.now.day
    }
}
