//! Configuration System
//!
//! Loads tuning parameters from tuning.toml for easy adjustment without
//! recompiling. Every section and field has a default, so a partial file
//! only overrides what it names.

use bevy_ecs::prelude::*;
use npc_events::TICKS_PER_DAY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Top-level configuration structure
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub simulation: SimulationConfig,
    pub memory: MemoryConfig,
    pub goals: GoalConfig,
    pub brain: BrainConfig,
    pub combat: CombatConfig,
    pub gangs: GangConfig,
    pub economy: EconomyConfig,
    pub population: PopulationConfig,
    pub stats: StatsConfig,
}

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub default_hours: u64,
    /// Days of world events kept in the rolling log
    pub event_log_days: u64,
    /// Where respawned agents appear
    pub spawn_location: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_hours: 14 * TICKS_PER_DAY,
            event_log_days: 30,
            spawn_location: "town_square".to_string(),
        }
    }
}

/// Memory retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Events older than this are pruned at day boundaries
    pub retention_days: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { retention_days: 30 }
    }
}

/// Goal creation thresholds and priorities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    /// Hostility needed for revenge at neutral vengefulness and aggression
    pub revenge_hostility_threshold: f32,
    /// Revenge lifetime at zero vengefulness; scaled up to 3x
    pub revenge_base_ticks: u64,
    /// Courage below this turns revenge into avoidance of stronger targets
    pub low_courage: f32,
    pub avoid_strength_ratio: f32,
    pub avoid_conflict_ticks: u64,
    pub flee_hp_fraction: f32,
    pub flee_recovered_fraction: f32,
    pub flee_min_hostility: f32,
    pub wealth_min_greed: f32,
    pub poverty_line: u32,
    pub socialize_min_sociability: f32,
    /// Social interactions per day after which the urge is satisfied
    pub socialize_daily_quota: usize,
    pub join_min_friendship: f32,
    pub max_join_rejections: usize,
    /// Added to the effective priority of goals flagged urgent
    pub urgency_bonus: f32,
    /// Age at which a goal's priority has lost a quarter of its weight
    pub recency_ticks: f32,
    pub rob_min_aggression: f32,
    pub rob_min_gold: u32,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            revenge_hostility_threshold: 20.0,
            revenge_base_ticks: 7 * TICKS_PER_DAY,
            low_courage: 0.35,
            avoid_strength_ratio: 1.3,
            avoid_conflict_ticks: 72,
            flee_hp_fraction: 0.3,
            flee_recovered_fraction: 0.5,
            flee_min_hostility: 20.0,
            wealth_min_greed: 0.3,
            poverty_line: 10,
            socialize_min_sociability: 0.3,
            socialize_daily_quota: 6,
            join_min_friendship: 15.0,
            max_join_rejections: 3,
            urgency_bonus: 1.0,
            recency_ticks: 168.0,
            rob_min_aggression: 0.65,
            rob_min_gold: 20,
        }
    }
}

/// Idle behavior weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub wander_base: f32,
    pub impulsive_wander_bonus: f32,
    pub social_wander_bonus: f32,
    pub rest_base: f32,
    pub injured_rest_bonus: f32,
    pub shop_base: f32,
    /// Added to shop weight in proportion to missing health
    pub injured_shop_bonus: f32,
    pub work_base: f32,
    pub ambition_work_bonus: f32,
    /// Multiplicative noise applied to idle weights
    pub noise: f32,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            wander_base: 0.2,
            impulsive_wander_bonus: 0.3,
            social_wander_bonus: 0.2,
            rest_base: 0.2,
            injured_rest_bonus: 0.6,
            shop_base: 0.1,
            injured_shop_bonus: 0.4,
            work_base: 0.1,
            ambition_work_bonus: 0.3,
            noise: 0.2,
        }
    }
}

/// Combat consequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Victim trust toward the attacker at or above which an attack is a betrayal
    pub betrayal_trust_threshold: f32,
    pub xp_per_win: u32,
    pub xp_per_level: u32,
    pub hp_per_level: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            betrayal_trust_threshold: 40.0,
            xp_per_win: 25,
            xp_per_level: 100,
            hp_per_level: 10,
        }
    }
}

/// Gang lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GangConfig {
    /// Members including the leader
    pub max_members: usize,
    /// Followers needed to become established
    pub min_members: usize,
    pub leader_min_ambition: f32,
    pub follower_min_friendship: f32,
    pub follower_min_trust: f32,
    pub join_min_loyalty: f32,
    /// Per-tick chance, scaled by ambition, that a candidate founds a gang
    pub formation_chance: f32,
    pub forming_timeout_ticks: u64,
    pub dissolve_grace_ticks: u64,
    pub succession_min_ambition: f32,
    pub recruit_chance: f32,
    pub passive_recruit_chance: f32,
    pub request_accept_chance: f32,
}

impl Default for GangConfig {
    fn default() -> Self {
        Self {
            max_members: 8,
            min_members: 2,
            leader_min_ambition: 0.6,
            follower_min_friendship: 20.0,
            follower_min_trust: 10.0,
            join_min_loyalty: 0.5,
            formation_chance: 0.15,
            forming_timeout_ticks: 72,
            dissolve_grace_ticks: 48,
            succession_min_ambition: 0.4,
            recruit_chance: 0.4,
            passive_recruit_chance: 0.05,
            request_accept_chance: 0.6,
        }
    }
}

/// Gold flows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub base_wage: u32,
    pub shop_price: u32,
    pub shop_heal: i32,
    /// Gold created by a trade, split between the parties by greed
    pub trade_surplus: u32,
    pub help_gift: u32,
    /// Share of the loser's gold taken by a successful robbery
    pub robbery_share: f32,
    pub daily_upkeep: u32,
    pub rest_heal_fraction: f32,
    pub starting_gold: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            base_wage: 3,
            shop_price: 8,
            shop_heal: 15,
            trade_surplus: 4,
            help_gift: 10,
            robbery_share: 0.25,
            daily_upkeep: 3,
            rest_heal_fraction: 0.1,
            starting_gold: 20,
        }
    }
}

/// Respawn bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub max_daily_respawns: usize,
    /// Fraction of the initial population the core keeps as a floor
    pub lower_bound: f32,
    /// Fraction of the initial population the core never exceeds
    pub upper_bound: f32,
    pub respawn_archetypes: Vec<String>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            max_daily_respawns: 10,
            lower_bound: 0.7,
            upper_bound: 1.3,
            respawn_archetypes: vec![
                "commoner".to_string(),
                "merchant".to_string(),
                "thug".to_string(),
                "drifter".to_string(),
            ],
        }
    }
}

/// Reporting thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Gold standard deviation that counts as stratified
    pub inequality_threshold: f32,
    /// Richest-greedy to mean ratio that counts as a clear margin
    pub wealth_margin: f32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            inequality_threshold: 25.0,
            wealth_margin: 1.5,
        }
    }
}

impl Tuning {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tuning = Self::from_toml(&content)?;
        Ok(tuning)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let tuning: Self = toml::from_str(content)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_TUNING_PATH).unwrap_or_else(|e| {
            tracing::warn!("could not load {}: {}; using defaults", DEFAULT_TUNING_PATH, e);
            Self::default()
        })
    }

    /// Reject values that would break population or gang invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let population = &self.population;
        if !(population.lower_bound > 0.0
            && population.lower_bound <= 1.0
            && population.upper_bound >= 1.0)
        {
            return Err(ConfigError::Invalid(format!(
                "population bounds must satisfy 0 < lower <= 1 <= upper (got {} / {})",
                population.lower_bound, population.upper_bound
            )));
        }
        if self.gangs.max_members < 2 || self.gangs.min_members >= self.gangs.max_members {
            return Err(ConfigError::Invalid(format!(
                "gang sizes must satisfy min followers < max members, max >= 2 (got {} / {})",
                self.gangs.min_members, self.gangs.max_members
            )));
        }
        if self.memory.retention_days == 0 {
            return Err(ConfigError::Invalid("memory.retention_days must be positive".into()));
        }
        Ok(())
    }
}

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid tuning: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let tuning = Tuning::default();
        assert_eq!(tuning.simulation.default_hours, 336);
        assert_eq!(tuning.gangs.max_members, 8);
        assert!(tuning.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tuning = Tuning::from_toml(
            r#"
            [gangs]
            max_members = 4

            [economy]
            base_wage = 7
            "#,
        )
        .unwrap();
        assert_eq!(tuning.gangs.max_members, 4);
        assert_eq!(tuning.gangs.min_members, 2);
        assert_eq!(tuning.economy.base_wage, 7);
        assert_eq!(tuning.economy.shop_price, EconomyConfig::default().shop_price);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[memory]\nretention_days = 9").unwrap();
        let tuning = Tuning::load(file.path()).unwrap();
        assert_eq!(tuning.memory.retention_days, 9);
    }

    #[test]
    fn test_shipped_tuning_matches_defaults() {
        let tuning = Tuning::from_toml(include_str!("../../../tuning.toml")).unwrap();
        assert_eq!(tuning, Tuning::default());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Tuning::load("/definitely/not/here/tuning.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let err = Tuning::from_toml("[population]\nlower_bound = 1.2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = Tuning::from_toml("[gangs]\nmin_members = 9\nmax_members = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        // Three followers never fit beside a leader under a cap of three
        let err = Tuning::from_toml("[gangs]\nmin_members = 3\nmax_members = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = Tuning::from_toml("[gangs\nmax_members = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
