//! Simulation Timestamp Types
//!
//! One tick is one simulated hour. Timestamps carry the raw tick plus the
//! derived day and hour so that display layers never redo the arithmetic.
//!
//! # Example
//!
//! ```
//! use npc_events::SimTimestamp;
//!
//! let ts = SimTimestamp::from_tick(50);
//! assert_eq!(ts.day, 3);
//! assert_eq!(ts.hour, 2);
//! assert_eq!(ts.to_string(), "day_3.hour_02");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of ticks per simulated day.
pub const TICKS_PER_DAY: u64 = 24;

/// Error type for parsing timestamps from strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTimestampError {
    InvalidFormat(String),
    InvalidDay(String),
    InvalidHour(String),
}

impl fmt::Display for ParseTimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseTimestampError::InvalidFormat(s) => {
                write!(f, "invalid timestamp format: '{}', expected 'day_N.hour_HH'", s)
            }
            ParseTimestampError::InvalidDay(s) => write!(f, "invalid day: '{}'", s),
            ParseTimestampError::InvalidHour(s) => write!(f, "invalid hour: '{}'", s),
        }
    }
}

impl std::error::Error for ParseTimestampError {}

/// A point in simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTimestamp {
    /// Monotonically increasing simulation tick.
    pub tick: u64,
    /// Day number, starting at 1.
    pub day: u64,
    /// Hour of the day, 0-23.
    pub hour: u8,
}

impl SimTimestamp {
    /// Creates a timestamp for the given tick.
    pub fn from_tick(tick: u64) -> Self {
        Self {
            tick,
            day: tick / TICKS_PER_DAY + 1,
            hour: (tick % TICKS_PER_DAY) as u8,
        }
    }

    /// Creates a timestamp for the start of the simulation.
    pub fn start() -> Self {
        Self::from_tick(0)
    }

    /// Increments the tick counter by one.
    pub fn advance_tick(&mut self) {
        *self = Self::from_tick(self.tick + 1);
    }

    /// True when this tick closes a day.
    pub fn is_day_boundary(&self) -> bool {
        self.tick > 0 && self.tick % TICKS_PER_DAY == 0
    }
}

impl Default for SimTimestamp {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for SimTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day_{}.hour_{:02}", self.day, self.hour)
    }
}

impl FromStr for SimTimestamp {
    type Err = ParseTimestampError;

    /// Parses a timestamp from a string like "day_3.hour_07".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (day_part, hour_part) = s
            .split_once('.')
            .ok_or_else(|| ParseTimestampError::InvalidFormat(s.to_string()))?;

        let day = day_part
            .strip_prefix("day_")
            .ok_or_else(|| ParseTimestampError::InvalidFormat(s.to_string()))?
            .parse::<u64>()
            .map_err(|_| ParseTimestampError::InvalidDay(day_part.to_string()))?;
        if day == 0 {
            return Err(ParseTimestampError::InvalidDay(day_part.to_string()));
        }

        let hour = hour_part
            .strip_prefix("hour_")
            .ok_or_else(|| ParseTimestampError::InvalidFormat(s.to_string()))?
            .parse::<u8>()
            .map_err(|_| ParseTimestampError::InvalidHour(hour_part.to_string()))?;
        if u64::from(hour) >= TICKS_PER_DAY {
            return Err(ParseTimestampError::InvalidHour(hour_part.to_string()));
        }

        Ok(Self::from_tick((day - 1) * TICKS_PER_DAY + u64::from(hour)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tick() {
        let ts = SimTimestamp::from_tick(0);
        assert_eq!(ts.day, 1);
        assert_eq!(ts.hour, 0);

        let ts = SimTimestamp::from_tick(47);
        assert_eq!(ts.day, 2);
        assert_eq!(ts.hour, 23);
    }

    #[test]
    fn test_advance_tick_rolls_day() {
        let mut ts = SimTimestamp::from_tick(23);
        ts.advance_tick();
        assert_eq!(ts.tick, 24);
        assert_eq!(ts.day, 2);
        assert_eq!(ts.hour, 0);
    }

    #[test]
    fn test_day_boundary() {
        assert!(!SimTimestamp::from_tick(0).is_day_boundary());
        assert!(!SimTimestamp::from_tick(23).is_day_boundary());
        assert!(SimTimestamp::from_tick(24).is_day_boundary());
        assert!(SimTimestamp::from_tick(168).is_day_boundary());
    }

    #[test]
    fn test_parse_display() {
        let ts: SimTimestamp = "day_3.hour_07".parse().unwrap();
        assert_eq!(ts.tick, 55);
        assert_eq!(ts.to_string(), "day_3.hour_07");
    }

    #[test]
    fn test_parse_rejects_bad_hour() {
        assert!(matches!(
            "day_1.hour_24".parse::<SimTimestamp>(),
            Err(ParseTimestampError::InvalidHour(_))
        ));
        assert!(matches!(
            "day_0.hour_01".parse::<SimTimestamp>(),
            Err(ParseTimestampError::InvalidDay(_))
        ));
        assert!("garbage".parse::<SimTimestamp>().is_err());
    }
}
