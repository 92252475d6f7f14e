//! Shared event types and serialization for the NPC simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for the simulation core and for any display layer.

pub mod event;
pub mod snapshot;
pub mod timestamp;

// Re-export timestamp types
pub use timestamp::{ParseTimestampError, SimTimestamp, TICKS_PER_DAY};

// Re-export event types
pub use event::{detail_keys, generate_event_id, EventDetails, EventType, WorldEvent};

// Re-export snapshot types
pub use snapshot::{GangSnapshot, GoalSnapshot, NpcSnapshot, TraitsSnapshot};
