//! Output
//!
//! Statistics for reports and tests.

pub mod stats;

pub use stats::*;
