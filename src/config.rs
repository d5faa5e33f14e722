//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default match points awarded for a win.
pub const DEFAULT_WIN_POINTS: u32 = 3;
/// Default match points awarded for a draw.
pub const DEFAULT_DRAW_POINTS: u32 = 1;
/// Default match points awarded for a loss.
pub const DEFAULT_LOSS_POINTS: u32 = 0;
/// Floor applied to win percentages so early losses don't zero out tiebreaks.
pub const DEFAULT_PERCENTAGE_FLOOR: f64 = 0.25;
/// Maximum length of free-form registration notes.
pub const MAX_NOTES_LEN: usize = 500;
/// Maximum length of a registration team name.
pub const MAX_TEAM_NAME_LEN: usize = 100;

/// Scoring and validation settings shared by every engine component.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EngineConfig {
    /// Match points for a match win (byes award this value).
    pub win_points: u32,
    /// Match points for a drawn match.
    pub draw_points: u32,
    /// Match points for a match loss.
    pub loss_points: u32,
    /// Game wins credited to the recipient of a bye.
    pub bye_game_wins: u32,
    /// Game losses credited to the recipient of a bye.
    pub bye_game_losses: u32,
    /// Lower clamp for match-win% and game-win% tiebreakers.
    pub percentage_floor: f64,
    /// Whether a tied game score is recorded as a draw. When false, a tied
    /// score is rejected as a validation error.
    pub allow_draws: bool,
    /// Whether Buchholz columns participate in the tiebreak cascade.
    pub use_buchholz: bool,
    pub max_notes_len: usize,
    pub max_team_name_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            win_points: DEFAULT_WIN_POINTS,
            draw_points: DEFAULT_DRAW_POINTS,
            loss_points: DEFAULT_LOSS_POINTS,
            bye_game_wins: 2,
            bye_game_losses: 0,
            percentage_floor: DEFAULT_PERCENTAGE_FLOOR,
            allow_draws: true,
            use_buchholz: true,
            max_notes_len: MAX_NOTES_LEN,
            max_team_name_len: MAX_TEAM_NAME_LEN,
        }
    }
}

impl EngineConfig {
    /// Planned Swiss round count for a field of `players`.
    ///
    /// `ceil(log2(n))`, minimum 1 for a playable field.
    pub fn planned_rounds(players: usize) -> u32 {
        if players < 2 {
            return 1;
        }
        (usize::BITS - (players - 1).leading_zeros()).max(1)
    }
}
