//! Standings data models.

use serde::{Deserialize, Serialize};

use crate::lifecycle::models::{PlayerId, TournamentId};

/// Per-player aggregate row, rebuilt by the standings calculator whenever a
/// match completes. Nothing else writes these fields.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayerStat {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub match_points: u32,
    pub match_wins: u32,
    pub match_losses: u32,
    pub match_draws: u32,
    pub game_wins: u32,
    pub game_losses: u32,
    /// Match-win ratio, clamped to the configured floor.
    pub match_win_pct: f64,
    /// Game-win ratio, clamped to the configured floor.
    pub game_win_pct: f64,
    /// Mean of opponents' match-win percentages.
    pub opp_match_win_pct: f64,
    /// Mean of opponents' game-win percentages.
    pub opp_game_win_pct: f64,
    /// Sum of opponents' match points.
    pub buchholz: f64,
    /// Buchholz with the single best and worst opponent scores dropped.
    pub buchholz_trimmed: f64,
    pub has_received_bye: bool,
    /// Opponent ids in round order, one entry per match played.
    pub opponents: Vec<PlayerId>,
}

impl PlayerStat {
    /// Zeroed row for a player with no completed matches.
    pub fn empty(tournament_id: TournamentId, player_id: PlayerId) -> Self {
        Self {
            tournament_id,
            player_id,
            match_points: 0,
            match_wins: 0,
            match_losses: 0,
            match_draws: 0,
            game_wins: 0,
            game_losses: 0,
            match_win_pct: 0.0,
            game_win_pct: 0.0,
            opp_match_win_pct: 0.0,
            opp_game_win_pct: 0.0,
            buchholz: 0.0,
            buchholz_trimmed: 0.0,
            has_received_bye: false,
            opponents: Vec::new(),
        }
    }

    pub fn matches_played(&self) -> u32 {
        self.match_wins + self.match_losses + self.match_draws
    }
}

/// Append-only record of one played pairing, from one player's side.
///
/// Used to answer "have these two played" during pairing and to walk the
/// opponent list for OMW%/OGW%/Buchholz.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OpponentHistoryEntry {
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub opponent_id: PlayerId,
    pub round_number: u32,
}
