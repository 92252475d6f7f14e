//! ECS Systems
//!
//! One tick runs perception, decision, resolution, the gang scan, memory
//! delivery and burial of the dead in that order, plus daily upkeep on day
//! boundaries.

pub mod brain;
pub mod burial;
pub mod gangs;
pub mod goals;
pub mod memory;
pub mod perception;
pub mod resolve;
pub mod upkeep;

pub use brain::{decide_actions, Brain, ProposedActions};
pub use burial::{bury_dead, npc_snapshot};
pub use gangs::{leader_standing, recruitment_chance, update_gangs};
pub use goals::{
    AvoidConflictRule, FleeRule, GoalReview, GoalRule, GoalRules, JoinGangRule, LeadGangRule,
    Plan, RevengeRule, SocializeRule, WealthRule,
};
pub use memory::{deliver_memories, PendingMemories};
pub use perception::{build_roster, AgentContext, AgentSummary, Roster, WorldView};
pub use resolve::{resolve_actions, TickEvents};
pub use upkeep::{daily_upkeep, is_day_boundary};
