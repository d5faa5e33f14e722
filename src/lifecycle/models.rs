//! Tournament structure data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tournament ID type
pub type TournamentId = Uuid;
/// Player profile ID type
pub type PlayerId = Uuid;
/// Phase ID type
pub type PhaseId = Uuid;
/// Round ID type
pub type RoundId = Uuid;
/// Match ID type
pub type MatchId = Uuid;

/// Tournament status
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Draft,
    Upcoming,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl TournamentStatus {
    /// Whether the tournament has reached a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Legality of a status change.
    ///
    /// Transitions are monotonic (`draft -> upcoming -> active -> completed`)
    /// except for `paused <-> active` and `cancelled` from any non-terminal
    /// status.
    pub fn can_transition_to(self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        match (self, next) {
            (Draft, Upcoming) => true,
            (Upcoming, Active) => true,
            (Active, Paused) => true,
            (Paused, Active) => true,
            (Active, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Upcoming => "upcoming",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Phase type
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Swiss,
    SingleElimination,
    /// Any format the pairing generator has no dedicated algorithm for;
    /// paired by uniform random shuffle.
    #[serde(other)]
    Other,
}

/// Phase status
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Active,
    Completed,
}

/// Round status
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
}

impl RoundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

/// Match status
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Active,
    Completed,
}

/// Tournament record.
///
/// Tournaments are created externally (event setup); the engine mutates only
/// status, round counter, and phase reference.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub status: TournamentStatus,
    /// Registration cap; `None` means unbounded.
    pub max_participants: Option<u32>,
    pub current_round: u32,
    pub current_phase: Option<PhaseId>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    pub fn new(name: impl Into<String>, max_participants: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: TournamentStatus::Upcoming,
            max_participants,
            current_round: 0,
            current_phase: None,
            created_at: Utc::now(),
        }
    }
}

/// Structural segment of a tournament with its own round counter.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Phase {
    pub id: PhaseId,
    pub tournament_id: TournamentId,
    pub phase_order: u32,
    pub phase_type: PhaseType,
    pub status: PhaseStatus,
    pub planned_rounds: u32,
    pub current_round: u32,
}

impl Phase {
    pub fn new(
        tournament_id: TournamentId,
        phase_order: u32,
        phase_type: PhaseType,
        planned_rounds: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            phase_order,
            phase_type,
            status: PhaseStatus::Active,
            planned_rounds,
            current_round: 0,
        }
    }
}

/// Round record; `(phase_id, round_number)` is unique.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Round {
    pub id: RoundId,
    pub phase_id: PhaseId,
    pub round_number: u32,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
}

impl Round {
    pub fn new(phase_id: PhaseId, round_number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase_id,
            round_number,
            status: RoundStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Match record.
///
/// A bye has exactly one player, `is_bye = true`, and is created already
/// completed with that player as winner.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Match {
    pub id: MatchId,
    pub round_id: RoundId,
    pub tournament_id: TournamentId,
    pub round_number: u32,
    /// 1-indexed, assigned in pairing-creation order.
    pub table_number: u32,
    pub player_a: Option<PlayerId>,
    pub player_b: Option<PlayerId>,
    pub is_bye: bool,
    pub status: MatchStatus,
    pub match_points_a: u32,
    pub match_points_b: u32,
    pub game_wins_a: u32,
    pub game_wins_b: u32,
    pub winner: Option<PlayerId>,
    pub confirmed_a: bool,
    pub confirmed_b: bool,
    /// Raised by the presentation layer when a player calls for staff at the
    /// table; the engine never sets it and only clears it when a
    /// staff-entered result lands.
    pub staff_requested: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Create a regular pending match between two players.
    pub fn pairing(
        round: &Round,
        tournament_id: TournamentId,
        table_number: u32,
        player_a: PlayerId,
        player_b: PlayerId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            round_id: round.id,
            tournament_id,
            round_number: round.round_number,
            table_number,
            player_a: Some(player_a),
            player_b: Some(player_b),
            is_bye: false,
            status: MatchStatus::Pending,
            match_points_a: 0,
            match_points_b: 0,
            game_wins_a: 0,
            game_wins_b: 0,
            winner: None,
            confirmed_a: false,
            confirmed_b: false,
            staff_requested: false,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Create a bye match, completed on creation with `player` as winner.
    pub fn bye(
        round: &Round,
        tournament_id: TournamentId,
        table_number: u32,
        player: PlayerId,
        win_points: u32,
        bye_game_wins: u32,
        bye_game_losses: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            round_id: round.id,
            tournament_id,
            round_number: round.round_number,
            table_number,
            player_a: Some(player),
            player_b: None,
            is_bye: true,
            status: MatchStatus::Completed,
            match_points_a: win_points,
            match_points_b: 0,
            game_wins_a: bye_game_wins,
            game_wins_b: bye_game_losses,
            winner: Some(player),
            confirmed_a: true,
            confirmed_b: true,
            staff_requested: false,
            created_at: now,
            completed_at: Some(now),
        }
    }

    /// Both seats of a non-bye match.
    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.player_a.into_iter().chain(self.player_b)
    }
}
