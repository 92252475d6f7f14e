//! NPC Behavioral Simulation Core
//!
//! Agents with personalities remember what happens to them, form goals
//! from those memories, act on them hour by hour, and drift into gangs.
//! `Simulation` is the entry point.

pub mod actions;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod output;
pub mod setup;
pub mod simulation;
pub mod systems;

pub use components::*;
pub use config::Tuning;
pub use error::{GangError, Result, SimError};
pub use setup::{ArchetypeRespawner, Census, NpcSeed, PopulationSource};
pub use simulation::Simulation;
