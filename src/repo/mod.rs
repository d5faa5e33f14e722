//! Repository interfaces the engine depends on.
//!
//! The engine never talks to a concrete store; callers inject implementations
//! of these traits (SQL, KV, the bundled [`MemoryStore`]). Uniqueness and
//! compare-and-swap guarantees that the engine's concurrency story relies on
//! are part of the trait contracts and must hold under concurrent calls:
//!
//! - [`RegistrationRepo::insert`] fails with [`StorageError::Duplicate`] when
//!   a registration for the same `(tournament, player)` pair exists.
//! - [`RoundRepo::insert_round`] fails with [`StorageError::Duplicate`] when
//!   the `(phase, round_number)` key is taken.
//! - [`MatchRepo::complete`] fails with [`StorageError::Conflict`] when the
//!   stored match is already completed, so exactly one of two concurrent
//!   result submissions wins.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::lifecycle::models::{
    Match, MatchId, Phase, PhaseId, PlayerId, Round, RoundId, RoundStatus, Tournament,
    TournamentId, TournamentStatus,
};
use crate::registration::models::{Registration, RegistrationStatus};
use crate::standings::models::{OpponentHistoryEntry, PlayerStat};

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Unique-key violation
    #[error("duplicate {0}")]
    Duplicate(&'static str),

    /// Compare-and-swap precondition failed
    #[error("conflicting update to {0}")]
    Conflict(&'static str),

    /// Targeted update hit no row
    #[error("missing {0}")]
    Missing(&'static str),

    /// Anything the backend itself reports
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Tournament rows. Created externally; the engine writes status and round
/// counters only.
#[async_trait]
pub trait TournamentRepo: Send + Sync {
    async fn insert(&self, tournament: Tournament) -> StorageResult<()>;
    async fn get(&self, id: TournamentId) -> StorageResult<Option<Tournament>>;
    async fn set_status(&self, id: TournamentId, status: TournamentStatus) -> StorageResult<()>;
    async fn set_round_state(
        &self,
        id: TournamentId,
        current_round: u32,
        current_phase: PhaseId,
    ) -> StorageResult<()>;
}

/// Registration rows, unique per `(tournament, player)`.
#[async_trait]
pub trait RegistrationRepo: Send + Sync {
    /// Fails with [`StorageError::Duplicate`] if the pair already exists.
    async fn insert(&self, registration: Registration) -> StorageResult<()>;
    async fn find(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StorageResult<Option<Registration>>;
    /// Returns whether a row was removed.
    async fn delete(&self, tournament_id: TournamentId, player_id: PlayerId)
    -> StorageResult<bool>;
    async fn count(&self, tournament_id: TournamentId) -> StorageResult<u64>;
    async fn list(&self, tournament_id: TournamentId) -> StorageResult<Vec<Registration>>;
    async fn set_status(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        status: RegistrationStatus,
        checked_in_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;
}

/// Phase and round rows.
#[async_trait]
pub trait RoundRepo: Send + Sync {
    async fn insert_phase(&self, phase: Phase) -> StorageResult<()>;
    async fn get_phase(&self, id: PhaseId) -> StorageResult<Option<Phase>>;
    async fn active_phase(&self, tournament_id: TournamentId) -> StorageResult<Option<Phase>>;
    async fn update_phase(&self, phase: Phase) -> StorageResult<()>;
    /// Fails with [`StorageError::Duplicate`] if `(phase, round_number)` is
    /// taken. This is the lock that makes pairing generation exclusive per
    /// round number.
    async fn insert_round(&self, round: Round) -> StorageResult<()>;
    /// Remove a round row. Compensation path for a generation attempt whose
    /// tournament transition failed after the round was created; removing an
    /// already-absent row is not an error.
    async fn delete_round(&self, id: RoundId) -> StorageResult<()>;
    async fn get_round(&self, id: RoundId) -> StorageResult<Option<Round>>;
    async fn count_rounds(&self, phase_id: PhaseId) -> StorageResult<u32>;
    async fn set_round_status(&self, id: RoundId, status: RoundStatus) -> StorageResult<()>;
}

/// Match rows. Never deleted.
#[async_trait]
pub trait MatchRepo: Send + Sync {
    async fn insert(&self, game_match: Match) -> StorageResult<()>;
    async fn get(&self, id: MatchId) -> StorageResult<Option<Match>>;
    /// Matches of a round ordered by table number.
    async fn list_by_round(&self, round_id: RoundId) -> StorageResult<Vec<Match>>;
    /// All completed matches of a tournament, ordered by round then table.
    async fn list_completed(&self, tournament_id: TournamentId) -> StorageResult<Vec<Match>>;
    /// Flip every pending non-bye match of the round to active; returns the
    /// number flipped.
    async fn activate_pending(&self, round_id: RoundId) -> StorageResult<u32>;
    /// Replace the stored row with `game_match` (which must be completed).
    /// Fails with [`StorageError::Conflict`] if the stored row is already
    /// completed.
    async fn complete(&self, game_match: Match) -> StorageResult<()>;
}

/// Derived standings rows plus the append-only opponent history.
#[async_trait]
pub trait PlayerStatRepo: Send + Sync {
    async fn upsert(&self, stat: PlayerStat) -> StorageResult<()>;
    async fn get(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StorageResult<Option<PlayerStat>>;
    async fn list(&self, tournament_id: TournamentId) -> StorageResult<Vec<PlayerStat>>;
    async fn append_history(&self, entry: OpponentHistoryEntry) -> StorageResult<()>;
    async fn list_history(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Vec<OpponentHistoryEntry>>;
}
