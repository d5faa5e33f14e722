//! Standings computation and the tiebreak cascade.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use crate::config::EngineConfig;
use crate::errors::EngineResult;
use crate::lifecycle::models::{PlayerId, TournamentId};
use crate::repo::{MatchRepo, PlayerStatRepo};
use crate::standings::models::PlayerStat;

/// Ranking order: match points, then opponent match-win%, then opponent
/// game-win%, then Buchholz, all descending. The final player-id comparison
/// only stabilizes output order; players equal through Buchholz are
/// considered tied.
pub fn rank_cmp(a: &PlayerStat, b: &PlayerStat) -> Ordering {
    b.match_points
        .cmp(&a.match_points)
        .then_with(|| b.opp_match_win_pct.total_cmp(&a.opp_match_win_pct))
        .then_with(|| b.opp_game_win_pct.total_cmp(&a.opp_game_win_pct))
        .then_with(|| b.buchholz.total_cmp(&a.buchholz))
        .then_with(|| a.player_id.cmp(&b.player_id))
}

#[derive(Default)]
struct RawTotals {
    match_points: u32,
    match_wins: u32,
    match_losses: u32,
    match_draws: u32,
    game_wins: u32,
    game_losses: u32,
    has_received_bye: bool,
    opponents: Vec<PlayerId>,
}

/// Rebuilds PlayerStat rows from completed matches.
///
/// Runs whenever a match transitions to completed. The tournament is
/// recomputed wholesale: OMW%, OGW%, and Buchholz depend on opponents'
/// totals, so a single result can shift the tiebreakers of every player who
/// has faced either participant. A full pass is linear in completed matches
/// and keeps the cascade numerically consistent as partial results arrive.
#[derive(Clone)]
pub struct StandingsCalculator {
    matches: Arc<dyn MatchRepo>,
    stats: Arc<dyn PlayerStatRepo>,
    config: EngineConfig,
}

impl StandingsCalculator {
    pub fn new(
        matches: Arc<dyn MatchRepo>,
        stats: Arc<dyn PlayerStatRepo>,
        config: EngineConfig,
    ) -> Self {
        Self {
            matches,
            stats,
            config,
        }
    }

    /// Recompute and store every PlayerStat row for the tournament.
    pub async fn recompute(&self, tournament_id: TournamentId) -> EngineResult<()> {
        let completed = self.matches.list_completed(tournament_id).await?;
        let mut raw: HashMap<PlayerId, RawTotals> = HashMap::new();

        for game_match in &completed {
            if game_match.is_bye {
                let Some(player) = game_match.player_a else {
                    continue;
                };
                let totals = raw.entry(player).or_default();
                totals.match_points += game_match.match_points_a;
                totals.match_wins += 1;
                totals.game_wins += game_match.game_wins_a;
                totals.game_losses += game_match.game_wins_b;
                totals.has_received_bye = true;
                continue;
            }
            let (Some(a), Some(b)) = (game_match.player_a, game_match.player_b) else {
                continue;
            };
            {
                let totals = raw.entry(a).or_default();
                totals.match_points += game_match.match_points_a;
                totals.game_wins += game_match.game_wins_a;
                totals.game_losses += game_match.game_wins_b;
                totals.opponents.push(b);
                match game_match.winner {
                    Some(winner) if winner == a => totals.match_wins += 1,
                    Some(_) => totals.match_losses += 1,
                    None => totals.match_draws += 1,
                }
            }
            {
                let totals = raw.entry(b).or_default();
                totals.match_points += game_match.match_points_b;
                totals.game_wins += game_match.game_wins_b;
                totals.game_losses += game_match.game_wins_a;
                totals.opponents.push(a);
                match game_match.winner {
                    Some(winner) if winner == b => totals.match_wins += 1,
                    Some(_) => totals.match_losses += 1,
                    None => totals.match_draws += 1,
                }
            }
        }

        // Own percentages first; opponent aggregates read them.
        let mut own_pcts: HashMap<PlayerId, (f64, f64)> = HashMap::new();
        for (player, totals) in &raw {
            own_pcts.insert(
                *player,
                (
                    self.ratio(
                        totals.match_wins,
                        totals.match_wins + totals.match_losses + totals.match_draws,
                    ),
                    self.ratio(totals.game_wins, totals.game_wins + totals.game_losses),
                ),
            );
        }

        for (player, totals) in raw {
            let (match_win_pct, game_win_pct) = own_pcts[&player];
            let mut opp_points: Vec<f64> = Vec::with_capacity(totals.opponents.len());
            let mut omw_sum = 0.0;
            let mut ogw_sum = 0.0;
            for opponent in &totals.opponents {
                let (opp_mwp, opp_gwp) = own_pcts.get(opponent).copied().unwrap_or((0.0, 0.0));
                omw_sum += opp_mwp;
                ogw_sum += opp_gwp;
            }
            let opponent_count = totals.opponents.len();
            let (opp_match_win_pct, opp_game_win_pct) = if opponent_count == 0 {
                (0.0, 0.0)
            } else {
                (
                    omw_sum / opponent_count as f64,
                    ogw_sum / opponent_count as f64,
                )
            };

            let (buchholz, buchholz_trimmed) = if self.config.use_buchholz {
                for opponent in &totals.opponents {
                    // Opponents of a completed match always have totals of
                    // their own; the fallback is for store inconsistency.
                    opp_points.push(f64::from(
                        raw_points(&completed, *opponent).unwrap_or_default(),
                    ));
                }
                let sum: f64 = opp_points.iter().sum();
                let trimmed = if opp_points.len() >= 3 {
                    let max = opp_points.iter().copied().fold(f64::MIN, f64::max);
                    let min = opp_points.iter().copied().fold(f64::MAX, f64::min);
                    sum - max - min
                } else {
                    sum
                };
                (sum, trimmed)
            } else {
                (0.0, 0.0)
            };

            let stat = PlayerStat {
                tournament_id,
                player_id: player,
                match_points: totals.match_points,
                match_wins: totals.match_wins,
                match_losses: totals.match_losses,
                match_draws: totals.match_draws,
                game_wins: totals.game_wins,
                game_losses: totals.game_losses,
                match_win_pct,
                game_win_pct,
                opp_match_win_pct,
                opp_game_win_pct,
                buchholz,
                buchholz_trimmed,
                has_received_bye: totals.has_received_bye,
                opponents: totals.opponents,
            };
            self.stats.upsert(stat).await?;
        }

        debug!("standings recomputed for tournament {tournament_id}");
        Ok(())
    }

    /// Ranked standings, best first.
    pub async fn standings(&self, tournament_id: TournamentId) -> EngineResult<Vec<PlayerStat>> {
        let mut stats = self.stats.list(tournament_id).await?;
        stats.sort_by(rank_cmp);
        Ok(stats)
    }

    fn ratio(&self, wins: u32, total: u32) -> f64 {
        if total == 0 {
            return self.config.percentage_floor;
        }
        (f64::from(wins) / f64::from(total)).max(self.config.percentage_floor)
    }
}

// Match points a player has accumulated across the completed set. Used for
// Buchholz, which sums opponents' points rather than their percentages.
fn raw_points(completed: &[crate::lifecycle::models::Match], player: PlayerId) -> Option<u32> {
    let mut found = false;
    let mut points = 0;
    for game_match in completed {
        if game_match.player_a == Some(player) {
            found = true;
            points += game_match.match_points_a;
        } else if game_match.player_b == Some(player) {
            found = true;
            points += game_match.match_points_b;
        }
    }
    found.then_some(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::models::{Match, MatchStatus, Round, Tournament};
    use crate::repo::{MemoryStore, TournamentRepo};
    use chrono::Utc;
    use uuid::Uuid;

    fn calculator(store: &MemoryStore) -> StandingsCalculator {
        StandingsCalculator::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            EngineConfig::default(),
        )
    }

    async fn completed_match(
        store: &MemoryStore,
        round: &Round,
        tournament_id: Uuid,
        table: u32,
        a: Uuid,
        b: Uuid,
        games: (u32, u32),
    ) {
        let mut m = Match::pairing(round, tournament_id, table, a, b);
        m.game_wins_a = games.0;
        m.game_wins_b = games.1;
        m.status = MatchStatus::Completed;
        m.completed_at = Some(Utc::now());
        match games.0.cmp(&games.1) {
            Ordering::Greater => {
                m.winner = Some(a);
                m.match_points_a = 3;
            }
            Ordering::Less => {
                m.winner = Some(b);
                m.match_points_b = 3;
            }
            Ordering::Equal => {
                m.match_points_a = 1;
                m.match_points_b = 1;
            }
        }
        MatchRepo::insert(store, m).await.unwrap();
    }

    async fn seed(store: &MemoryStore) -> (Uuid, Round) {
        let tournament = Tournament::new("Regional", None);
        let id = tournament.id;
        TournamentRepo::insert(store, tournament).await.unwrap();
        (id, Round::new(Uuid::new_v4(), 1))
    }

    #[tokio::test]
    async fn test_win_loss_points_and_tallies() {
        let store = MemoryStore::new();
        let calc = calculator(&store);
        let (tournament_id, round) = seed(&store).await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        completed_match(&store, &round, tournament_id, 1, a, b, (2, 1)).await;
        calc.recompute(tournament_id).await.unwrap();

        let winner = PlayerStatRepo::get(&store, tournament_id, a).await.unwrap().unwrap();
        let loser = PlayerStatRepo::get(&store, tournament_id, b).await.unwrap().unwrap();
        assert_eq!(winner.match_points, 3);
        assert_eq!(winner.match_wins, 1);
        assert_eq!(winner.game_wins, 2);
        assert_eq!(winner.game_losses, 1);
        assert_eq!(winner.opponents, vec![b]);
        assert_eq!(loser.match_points, 0);
        assert_eq!(loser.match_losses, 1);
    }

    #[tokio::test]
    async fn test_percentage_floor_clamps_losers() {
        let store = MemoryStore::new();
        let calc = calculator(&store);
        let (tournament_id, round) = seed(&store).await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        completed_match(&store, &round, tournament_id, 1, a, b, (2, 0)).await;
        calc.recompute(tournament_id).await.unwrap();

        let loser = PlayerStatRepo::get(&store, tournament_id, b).await.unwrap().unwrap();
        // 0/1 would be 0.0; clamped so the winner's OMW% isn't zeroed out.
        assert_eq!(loser.match_win_pct, 0.25);
        assert_eq!(loser.game_win_pct, 0.25);

        let winner = PlayerStatRepo::get(&store, tournament_id, a).await.unwrap().unwrap();
        assert_eq!(winner.opp_match_win_pct, 0.25);
    }

    #[tokio::test]
    async fn test_draw_splits_points_when_games_tie() {
        let store = MemoryStore::new();
        let calc = calculator(&store);
        let (tournament_id, round) = seed(&store).await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        completed_match(&store, &round, tournament_id, 1, a, b, (1, 1)).await;
        calc.recompute(tournament_id).await.unwrap();

        for player in [a, b] {
            let stat = PlayerStatRepo::get(&store, tournament_id, player).await.unwrap().unwrap();
            assert_eq!(stat.match_points, 1);
            assert_eq!(stat.match_draws, 1);
            assert_eq!(stat.match_wins, 0);
        }
    }

    #[tokio::test]
    async fn test_bye_counts_as_win_without_opponent() {
        let store = MemoryStore::new();
        let calc = calculator(&store);
        let (tournament_id, round) = seed(&store).await;
        let player = Uuid::new_v4();

        MatchRepo::insert(
            &store,
            Match::bye(&round, tournament_id, 1, player, 3, 2, 0),
        )
        .await
        .unwrap();
        calc.recompute(tournament_id).await.unwrap();

        let stat = PlayerStatRepo::get(&store, tournament_id, player).await.unwrap().unwrap();
        assert_eq!(stat.match_points, 3);
        assert_eq!(stat.match_wins, 1);
        assert!(stat.has_received_bye);
        assert!(stat.opponents.is_empty());
        assert_eq!(stat.opp_match_win_pct, 0.0);
    }

    #[tokio::test]
    async fn test_match_points_dominate_tiebreakers() {
        let store = MemoryStore::new();
        let calc = calculator(&store);
        let (tournament_id, _) = seed(&store).await;
        let phase = Uuid::new_v4();
        let players: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        // Rounds 1-2: players[0] wins twice; players[1] splits but faces
        // stronger opposition than anyone on 6 points.
        let round1 = Round::new(phase, 1);
        completed_match(
            &store, &round1, tournament_id, 1, players[0], players[2], (2, 0),
        )
        .await;
        completed_match(
            &store, &round1, tournament_id, 2, players[1], players[3], (2, 0),
        )
        .await;
        let round2 = Round::new(phase, 2);
        completed_match(
            &store, &round2, tournament_id, 1, players[0], players[3], (2, 1),
        )
        .await;
        completed_match(
            &store, &round2, tournament_id, 2, players[2], players[1], (2, 0),
        )
        .await;

        calc.recompute(tournament_id).await.unwrap();
        let standings = calc.standings(tournament_id).await.unwrap();

        let top = &standings[0];
        assert_eq!(top.player_id, players[0]);
        assert_eq!(top.match_points, 6);
        // Whatever the OMW% spread below, 6 points outranks fewer.
        for lower in &standings[1..] {
            assert!(lower.match_points < top.match_points);
        }
    }

    #[tokio::test]
    async fn test_buchholz_sums_opponent_points() {
        let store = MemoryStore::new();
        let calc = calculator(&store);
        let (tournament_id, round) = seed(&store).await;
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        completed_match(&store, &round, tournament_id, 1, a, b, (2, 0)).await;
        let round2 = Round::new(round.phase_id, 2);
        completed_match(&store, &round2, tournament_id, 1, a, c, (0, 2)).await;
        calc.recompute(tournament_id).await.unwrap();

        let stat = PlayerStatRepo::get(&store, tournament_id, a).await.unwrap().unwrap();
        // b has 0 points, c has 3.
        assert_eq!(stat.buchholz, 3.0);
        assert_eq!(stat.buchholz_trimmed, 3.0);
    }

    #[tokio::test]
    async fn test_trimmed_buchholz_drops_extremes() {
        let store = MemoryStore::new();
        let calc = calculator(&store);
        let (tournament_id, _) = seed(&store).await;
        let phase = Uuid::new_v4();
        let (a, b, c, d) = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        );

        // a faces b, c, and d; the opponents finish on 6, 3, and 3 points.
        let round1 = Round::new(phase, 1);
        completed_match(&store, &round1, tournament_id, 1, a, b, (2, 0)).await;
        completed_match(&store, &round1, tournament_id, 2, c, d, (2, 0)).await;
        let round2 = Round::new(phase, 2);
        completed_match(&store, &round2, tournament_id, 1, a, c, (2, 0)).await;
        completed_match(&store, &round2, tournament_id, 2, b, d, (2, 0)).await;
        let round3 = Round::new(phase, 3);
        completed_match(&store, &round3, tournament_id, 1, d, a, (2, 0)).await;
        completed_match(&store, &round3, tournament_id, 2, b, c, (2, 0)).await;
        calc.recompute(tournament_id).await.unwrap();

        let stat = PlayerStatRepo::get(&store, tournament_id, a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stat.opponents.len(), 3);
        // b: 6, c: 3, d: 3. Sum 12; trimming drops the 6 and one 3.
        assert_eq!(stat.buchholz, 12.0);
        assert_eq!(stat.buchholz_trimmed, 3.0);
    }

    #[test]
    fn test_rank_cmp_cascade() {
        let tournament_id = Uuid::new_v4();
        let mut a = PlayerStat::empty(tournament_id, Uuid::new_v4());
        let mut b = PlayerStat::empty(tournament_id, Uuid::new_v4());

        a.match_points = 6;
        b.match_points = 4;
        b.opp_match_win_pct = 0.9;
        assert_eq!(rank_cmp(&a, &b), Ordering::Less);

        b.match_points = 6;
        assert_eq!(rank_cmp(&a, &b), Ordering::Greater);

        a.opp_match_win_pct = 0.9;
        a.opp_game_win_pct = 0.5;
        b.opp_game_win_pct = 0.4;
        assert_eq!(rank_cmp(&a, &b), Ordering::Less);
    }
}
