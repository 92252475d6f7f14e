//! Property-Based Tests for Relationship Derivation
//!
//! Relationships must be a pure fold of remembered events and personality,
//! stay inside their scales, and keep the betrayal floor through anything
//! short of reconciliation, pruning included.

use proptest::prelude::*;

use npc_core::components::memory_details;
use npc_core::{AgentId, MemoryEvent, MemoryKind, MemoryStore, Personality};

const KINDS: &[MemoryKind] = &[
    MemoryKind::WasHelped,
    MemoryKind::Helped,
    MemoryKind::WasAttacked,
    MemoryKind::LostTo,
    MemoryKind::WonAgainst,
    MemoryKind::SharedSocialActivity,
    MemoryKind::WasBetrayed,
    MemoryKind::Betrayed,
    MemoryKind::Traded,
    MemoryKind::WitnessedAttack,
    MemoryKind::JoinedGang,
    MemoryKind::RejectedBy,
];

const POSITIVE: &[MemoryKind] = &[
    MemoryKind::WasHelped,
    MemoryKind::SharedSocialActivity,
    MemoryKind::Traded,
    MemoryKind::JoinedGang,
    MemoryKind::WonAgainst,
];

const SUBJECTS: &[&str] = &["npc_0002", "npc_0003", "npc_0004"];

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_personality() -> impl Strategy<Value = Personality> {
    (
        0.0..=1.0f32, // ambition
        0.0..=1.0f32, // loyalty
        0.0..=1.0f32, // sociability
        0.0..=1.0f32, // aggression
        0.0..=1.0f32, // vengefulness
    )
        .prop_map(|(am, lo, so, ag, ve)| {
            Personality::uniform(0.5)
                .with_ambition(am)
                .with_loyalty(lo)
                .with_sociability(so)
                .with_aggression(ag)
                .with_vengefulness(ve)
        })
}

fn make_event(kind: MemoryKind, subject: usize, tick: u64, ally: bool) -> MemoryEvent {
    let event = MemoryEvent::new(kind, tick).about(AgentId::from(SUBJECTS[subject]));
    if kind == MemoryKind::WonAgainst && ally {
        event.with_detail(memory_details::ROLE, memory_details::ROLE_ALLY)
    } else {
        event
    }
}

fn arb_events(kinds: &'static [MemoryKind], max: usize) -> impl Strategy<Value = Vec<MemoryEvent>> {
    prop::collection::vec(
        (0..kinds.len(), 0..SUBJECTS.len(), 0u64..2000, any::<bool>()),
        0..max,
    )
    .prop_map(move |raw| {
        let mut raw = raw;
        raw.sort_by_key(|(_, _, tick, _)| *tick);
        raw.into_iter()
            .map(|(k, s, tick, ally)| make_event(kinds[k], s, tick, ally))
            .collect()
    })
}

fn fold(personality: &Personality, events: &[MemoryEvent]) -> MemoryStore {
    let mut store = MemoryStore::new(personality);
    for event in events {
        store.record_event(event.clone());
    }
    store
}

// ---------------------------------------------------------------------------
// Property: replaying the same events yields the same relationships
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn replay_is_deterministic(
        personality in arb_personality(),
        events in arb_events(KINDS, 60),
    ) {
        let a = fold(&personality, &events);
        let b = fold(&personality, &events);
        for subject in SUBJECTS {
            let id = AgentId::from(*subject);
            prop_assert_eq!(a.get_relationship(&id), b.get_relationship(&id));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: scores stay on their scales
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn scores_stay_in_range(
        personality in arb_personality(),
        events in arb_events(KINDS, 120),
    ) {
        let store = fold(&personality, &events);
        for subject in SUBJECTS {
            let rel = store.get_relationship(&AgentId::from(*subject));
            prop_assert!((-100.0..=100.0).contains(&rel.friendship));
            prop_assert!((-100.0..=100.0).contains(&rel.trust));
            prop_assert!((0.0..=100.0).contains(&rel.hostility));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: trust stays at the floor after a betrayal
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn betrayal_floor_holds(
        personality in arb_personality(),
        before in arb_events(KINDS, 30),
        after in prop::collection::vec((0..POSITIVE.len(), any::<bool>()), 0..40),
    ) {
        let traitor = AgentId::from(SUBJECTS[0]);
        let mut store = fold(&personality, &before);
        store.record_event(MemoryEvent::new(MemoryKind::WasBetrayed, 2500).about(traitor.clone()));
        for (i, (k, ally)) in after.into_iter().enumerate() {
            store.record_event(make_event(POSITIVE[k], 0, 2501 + i as u64, ally));
        }

        let rel = store.get_relationship(&traitor);
        prop_assert!(rel.betrayed);
        prop_assert_eq!(rel.trust, -100.0);
    }
}

// ---------------------------------------------------------------------------
// Property: pruning keeps the floor and matches a fresh fold
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn pruning_matches_fresh_fold(
        personality in arb_personality(),
        events in arb_events(KINDS, 60),
        horizon in 0u64..2500,
    ) {
        let traitor = AgentId::from(SUBJECTS[1]);
        let mut store = fold(&personality, &events);
        store.record_event(MemoryEvent::new(MemoryKind::WasBetrayed, 0).about(traitor.clone()));
        store.prune_older_than(horizon);

        let fresh = fold(&personality, store.get_all_memories());
        for subject in SUBJECTS {
            let id = AgentId::from(*subject);
            prop_assert_eq!(store.get_relationship(&id), fresh.get_relationship(&id));
        }
        prop_assert_eq!(store.get_relationship(&traitor).trust, -100.0);
    }
}
