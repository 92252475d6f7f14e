//! Statistics Output
//!
//! Wealth distribution, population and event counts, collected on demand
//! from a running simulation.

use npc_events::{EventType, WorldEvent};
use serde::Serialize;
use std::collections::BTreeMap;

/// Distribution of gold across living agents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WealthStats {
    pub count: usize,
    pub total: u64,
    pub mean: f64,
    pub std_dev: f64,
    /// 0 is perfect equality, approaching 1 is one agent holding everything
    pub gini: f64,
    pub min: u32,
    pub max: u32,
}

impl WealthStats {
    pub fn from_golds(golds: &[u32]) -> Self {
        if golds.is_empty() {
            return Self::default();
        }
        let count = golds.len();
        let n = count as f64;
        let total: u64 = golds.iter().map(|&g| g as u64).sum();
        let mean = total as f64 / n;
        let variance = golds
            .iter()
            .map(|&g| {
                let d = g as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        let mut sorted = golds.to_vec();
        sorted.sort_unstable();
        let gini = if total == 0 {
            0.0
        } else {
            let weighted: f64 = sorted
                .iter()
                .enumerate()
                .map(|(i, &g)| (i as f64 + 1.0) * g as f64)
                .sum();
            (2.0 * weighted) / (n * total as f64) - (n + 1.0) / n
        };

        Self {
            count,
            total,
            mean,
            std_dev: variance.sqrt(),
            gini,
            min: sorted[0],
            max: sorted[count - 1],
        }
    }
}

/// Head counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulationStats {
    pub alive: usize,
    pub dead: usize,
    pub gangs: usize,
    /// Living agents in a gang, leaders included
    pub in_gangs: usize,
}

/// Number of events of each type
pub fn count_events_by_type<'a>(
    events: impl IntoIterator<Item = &'a WorldEvent>,
) -> BTreeMap<EventType, usize> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.event_type).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use npc_events::SimTimestamp;

    #[test]
    fn test_equal_wealth() {
        let stats = WealthStats::from_golds(&[10, 10, 10, 10]);
        assert_eq!(stats.mean, 10.0);
        assert_eq!(stats.std_dev, 0.0);
        assert!(stats.gini.abs() < 1e-9);
    }

    #[test]
    fn test_concentrated_wealth() {
        let stats = WealthStats::from_golds(&[0, 0, 0, 100]);
        assert_eq!(stats.total, 100);
        assert_eq!(stats.max, 100);
        assert_eq!(stats.min, 0);
        assert!((stats.gini - 0.75).abs() < 1e-9);
        assert!(stats.std_dev > 40.0);
    }

    #[test]
    fn test_empty_population() {
        assert_eq!(WealthStats::from_golds(&[]), WealthStats::default());
    }

    #[test]
    fn test_event_counts() {
        let ts = SimTimestamp::from_tick(1);
        let events = vec![
            WorldEvent::new("evt_00000001", ts, EventType::Work),
            WorldEvent::new("evt_00000002", ts, EventType::Work),
            WorldEvent::new("evt_00000003", ts, EventType::Death),
        ];
        let counts = count_events_by_type(&events);
        assert_eq!(counts[&EventType::Work], 2);
        assert_eq!(counts[&EventType::Death], 1);
        assert!(!counts.contains_key(&EventType::Trade));
    }
}
