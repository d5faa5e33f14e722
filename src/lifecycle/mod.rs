//! Tournament structure and lifecycle state machine.
//!
//! Models the four structural levels (tournament, phase, round, match) and
//! applies their legal status transitions. Phase, round, and match records
//! are created exclusively by the pairing generator; this module is the only
//! place their statuses change.

pub mod machine;
pub mod models;

pub use machine::LifecycleManager;
pub use models::{
    Match, MatchId, MatchStatus, Phase, PhaseId, PhaseStatus, PhaseType, PlayerId, Round, RoundId,
    RoundStatus, Tournament, TournamentId, TournamentStatus,
};
