//! World Setup
//!
//! Town map creation, population seeding, and the respawn hook.

pub mod population;
pub mod town;

pub use population::*;
pub use town::*;
