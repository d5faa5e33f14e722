//! Standings and the tiebreaker cascade.
//!
//! Rankings order on match points, then opponent match-win%, then opponent
//! game-win%, then Buchholz. All derived rows are rebuilt from completed
//! matches whenever one finishes.

pub mod calculator;
pub mod models;

pub use calculator::{StandingsCalculator, rank_cmp};
pub use models::{OpponentHistoryEntry, PlayerStat};
