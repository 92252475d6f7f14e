//! ECS Components
//!
//! Entity components and shared resources for agents, gangs and the town.

pub mod agent;
pub mod gang;
pub mod goal;
pub mod memory;
pub mod personality;
pub mod world;

pub use agent::*;
pub use gang::*;
pub use goal::*;
pub use memory::*;
pub use personality::*;
pub use world::*;
