//! Event Types
//!
//! World events emitted by the simulator. Display layers poll these through
//! the recent-event query; the CLI can also append them to a JSONL file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::SimTimestamp;

/// Primary event type categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Combat,
    Trade,
    SocialInteraction,
    Work,
    Shop,
    Travel,
    Betrayal,
    Death,
    GangFormed,
    GangJoined,
    GangRecruitmentRejected,
    GangSuccession,
    GangDissolved,
    TurfChanged,
    Respawn,
}

impl EventType {
    /// Snake-case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Combat => "combat",
            EventType::Trade => "trade",
            EventType::SocialInteraction => "social_interaction",
            EventType::Work => "work",
            EventType::Shop => "shop",
            EventType::Travel => "travel",
            EventType::Betrayal => "betrayal",
            EventType::Death => "death",
            EventType::GangFormed => "gang_formed",
            EventType::GangJoined => "gang_joined",
            EventType::GangRecruitmentRejected => "gang_recruitment_rejected",
            EventType::GangSuccession => "gang_succession",
            EventType::GangDissolved => "gang_dissolved",
            EventType::TurfChanged => "turf_changed",
            EventType::Respawn => "respawn",
        }
    }

    /// True for the gang lifecycle events.
    pub fn is_gang_event(&self) -> bool {
        matches!(
            self,
            EventType::GangFormed
                | EventType::GangJoined
                | EventType::GangRecruitmentRejected
                | EventType::GangSuccession
                | EventType::GangDissolved
                | EventType::TurfChanged
        )
    }

    /// Returns all event type variants.
    pub fn all() -> &'static [EventType] {
        &[
            EventType::Combat,
            EventType::Trade,
            EventType::SocialInteraction,
            EventType::Work,
            EventType::Shop,
            EventType::Travel,
            EventType::Betrayal,
            EventType::Death,
            EventType::GangFormed,
            EventType::GangJoined,
            EventType::GangRecruitmentRejected,
            EventType::GangSuccession,
            EventType::GangDissolved,
            EventType::TurfChanged,
            EventType::Respawn,
        ]
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known keys of the event detail map.
pub mod detail_keys {
    /// Goal that drove the action (`revenge`, `wealth`, ...). Absent for idle actions.
    pub const MOTIVATION: &str = "motivation";
    pub const ATTACKER: &str = "attacker";
    pub const DEFENDER: &str = "defender";
    pub const WINNER: &str = "winner";
    pub const LOSER: &str = "loser";
    pub const DAMAGE: &str = "damage";
    pub const KILLED: &str = "killed";
    pub const GOLD: &str = "gold";
    pub const GOLD_STOLEN: &str = "gold_stolen";
    pub const INTERACTION: &str = "interaction";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
    pub const GANG_ID: &str = "gang_id";
    pub const GANG_NAME: &str = "gang_name";
    pub const LEADER: &str = "leader";
    pub const PREVIOUS_LEADER: &str = "previous_leader";
    /// Gang that held a location before a turf change
    pub const PREVIOUS_OWNER: &str = "previous_owner";
    pub const REASON: &str = "reason";
    pub const ARCHETYPE: &str = "archetype";
}

/// Free-form detail map. Ordered so serialized events are stable.
pub type EventDetails = BTreeMap<String, String>;

/// Generate a sequential event ID
pub fn generate_event_id(sequence: u64) -> String {
    format!("evt_{:08}", sequence)
}

/// A single world event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldEvent {
    /// Unique identifier (e.g., "evt_00042371")
    pub event_id: String,
    /// When the event occurred
    pub timestamp: SimTimestamp,
    /// Event category
    pub event_type: EventType,
    /// Agent ids involved, primary actor first
    pub participants: Vec<String>,
    /// Where it happened, when it happened somewhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: EventDetails,
}

impl WorldEvent {
    /// Create a new event with required fields.
    pub fn new(event_id: impl Into<String>, timestamp: SimTimestamp, event_type: EventType) -> Self {
        Self {
            event_id: event_id.into(),
            timestamp,
            event_type,
            participants: Vec::new(),
            location: None,
            details: EventDetails::new(),
        }
    }

    pub fn with_participant(mut self, agent_id: impl Into<String>) -> Self {
        self.participants.push(agent_id.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// Attach a motivation tag when one is present.
    pub fn with_motivation(self, motivation: Option<&str>) -> Self {
        match motivation {
            Some(tag) => self.with_detail(detail_keys::MOTIVATION, tag),
            None => self,
        }
    }

    pub fn tick(&self) -> u64 {
        self.timestamp.tick
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    pub fn motivation(&self) -> Option<&str> {
        self.detail(detail_keys::MOTIVATION)
    }

    /// Check if an agent participated in this event.
    pub fn involves(&self, agent_id: &str) -> bool {
        self.participants.iter().any(|p| p == agent_id)
    }

    /// Serialize as a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_jsonl(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
