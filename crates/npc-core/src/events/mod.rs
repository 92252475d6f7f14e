//! Event Recording
//!
//! In-memory rolling log of world events and optional JSONL output.

pub mod log;
pub mod logger;

pub use log::EventLog;
pub use logger::EventLogger;
