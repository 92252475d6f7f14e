//! Town Setup
//!
//! Creates the default town map with locations and connectivity.

use crate::components::{Location, LocationKind, TownMap};

/// Location ids of the default town
pub const TOWN_SQUARE: &str = "town_square";
pub const TAVERN: &str = "tavern";
pub const MARKET: &str = "market";
pub const DOCKS: &str = "docks";
pub const SLUMS: &str = "slums";
pub const TEMPLE: &str = "temple";

/// Create the town map with all locations
pub fn create_town_map() -> TownMap {
    let mut map = TownMap::new();

    map.register(Location::new(TOWN_SQUARE, "Town Square", LocationKind::Square));
    map.register(Location::new(TAVERN, "The Drowned Lantern", LocationKind::Tavern));
    map.register(Location::new(MARKET, "Market", LocationKind::Market));
    map.register(Location::new(DOCKS, "Docks", LocationKind::Docks));
    map.register(Location::new(SLUMS, "Slums", LocationKind::Slums));
    map.register(Location::new(TEMPLE, "Temple", LocationKind::Temple));

    // The square is the hub; the docks and slums form the back way round
    map.connect(TOWN_SQUARE, TAVERN);
    map.connect(TOWN_SQUARE, MARKET);
    map.connect(TOWN_SQUARE, TEMPLE);
    map.connect(TOWN_SQUARE, SLUMS);
    map.connect(MARKET, DOCKS);
    map.connect(SLUMS, DOCKS);
    map.connect(TAVERN, SLUMS);

    map
}
