//! Error types for the simulation core.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building or seeding a simulation.
///
/// Runtime decision failures never surface here: a goal that cannot be
/// satisfied degrades to the next goal or to idle behavior.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown archetype '{0}'")]
    UnknownArchetype(String),

    #[error("unknown location '{0}'")]
    UnknownLocation(String),

    #[error("duplicate agent id '{0}'")]
    DuplicateAgent(String),

    #[error("simulation already initialized; call reset() first")]
    AlreadyInitialized,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Gang registry invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GangError {
    #[error("agent '{agent}' already belongs to gang '{gang}'")]
    AlreadyInGang { agent: String, gang: String },

    #[error("gang '{0}' is full")]
    GangFull(String),

    #[error("unknown gang '{0}'")]
    UnknownGang(String),

    #[error("agent '{agent}' is not a member of gang '{gang}'")]
    NotAMember { agent: String, gang: String },
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
