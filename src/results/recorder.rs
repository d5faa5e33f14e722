//! Match result recording.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::lifecycle::machine::LifecycleManager;
use crate::lifecycle::models::{MatchId, MatchStatus, PlayerId};
use crate::ports::ActorId;
use crate::repo::{MatchRepo, PlayerStatRepo, StorageError};
use crate::standings::calculator::StandingsCalculator;
use crate::standings::models::OpponentHistoryEntry;

/// A reported match result.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct MatchResultInput {
    pub game_wins_a: u32,
    pub game_wins_b: u32,
    /// Staff-entered override; clears any pending staff request and counts
    /// as confirmation for both sides.
    pub staff_override: bool,
}

/// Applies submitted results and triggers standings recomputation.
#[derive(Clone)]
pub struct MatchResultRecorder {
    matches: Arc<dyn MatchRepo>,
    stats: Arc<dyn PlayerStatRepo>,
    lifecycle: LifecycleManager,
    calculator: StandingsCalculator,
    config: EngineConfig,
}

impl MatchResultRecorder {
    pub fn new(
        matches: Arc<dyn MatchRepo>,
        stats: Arc<dyn PlayerStatRepo>,
        lifecycle: LifecycleManager,
        calculator: StandingsCalculator,
        config: EngineConfig,
    ) -> Self {
        Self {
            matches,
            stats,
            lifecycle,
            calculator,
            config,
        }
    }

    /// Record a result on a pending or active match.
    ///
    /// A second submission for the same match is rejected with
    /// `InvalidTransition`, never treated as an idempotent no-op; the
    /// completion write is a compare-and-swap, so of two racing submissions
    /// exactly one lands.
    pub async fn record(
        &self,
        actor: Option<ActorId>,
        match_id: MatchId,
        input: MatchResultInput,
    ) -> EngineResult<Option<PlayerId>> {
        let game_match = self
            .matches
            .get(match_id)
            .await?
            .ok_or(EngineError::NotFound("match"))?;
        if game_match.is_bye || game_match.status == MatchStatus::Completed {
            return Err(EngineError::InvalidTransition {
                entity: "match",
                state: if game_match.is_bye {
                    "bye".to_string()
                } else {
                    "completed".to_string()
                },
                action: "record a result for",
            });
        }
        let (Some(player_a), Some(player_b)) = (game_match.player_a, game_match.player_b) else {
            return Err(EngineError::Validation(
                "match is missing a player".to_string(),
            ));
        };

        if input.game_wins_a == 0 && input.game_wins_b == 0 {
            return Err(EngineError::Validation("no games reported".to_string()));
        }
        let winner = match input.game_wins_a.cmp(&input.game_wins_b) {
            Ordering::Greater => Some(player_a),
            Ordering::Less => Some(player_b),
            Ordering::Equal if self.config.allow_draws => None,
            Ordering::Equal => {
                return Err(EngineError::Validation(
                    "tied game score is not permitted in this format".to_string(),
                ));
            }
        };

        let mut updated = game_match.clone();
        updated.game_wins_a = input.game_wins_a;
        updated.game_wins_b = input.game_wins_b;
        updated.winner = winner;
        updated.match_points_a = self.points_for(winner, player_a);
        updated.match_points_b = self.points_for(winner, player_b);
        updated.confirmed_a = true;
        updated.confirmed_b = true;
        if input.staff_override {
            updated.staff_requested = false;
        }
        updated.status = MatchStatus::Completed;
        updated.completed_at = Some(Utc::now());

        match self.matches.complete(updated).await {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => {
                return Err(EngineError::InvalidTransition {
                    entity: "match",
                    state: "completed".to_string(),
                    action: "record a result for",
                });
            }
            Err(err) => return Err(err.into()),
        }

        for (player, opponent) in [(player_a, player_b), (player_b, player_a)] {
            self.stats
                .append_history(OpponentHistoryEntry {
                    tournament_id: game_match.tournament_id,
                    player_id: player,
                    opponent_id: opponent,
                    round_number: game_match.round_number,
                })
                .await?;
        }

        self.calculator.recompute(game_match.tournament_id).await?;
        self.lifecycle
            .complete_round_if_finished(actor, game_match.tournament_id, game_match.round_id)
            .await?;

        info!(
            "match {match_id} completed {}-{} (winner {:?})",
            input.game_wins_a, input.game_wins_b, winner
        );
        Ok(winner)
    }

    fn points_for(&self, winner: Option<PlayerId>, player: PlayerId) -> u32 {
        match winner {
            Some(id) if id == player => self.config.win_points,
            Some(_) => self.config.loss_points,
            None => self.config.draw_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::models::{Match, Phase, PhaseType, Round, Tournament};
    use crate::ports::RecordingEventSink;
    use crate::repo::{MemoryStore, RoundRepo, TournamentRepo};
    use uuid::Uuid;

    struct Fixture {
        store: MemoryStore,
        recorder: MatchResultRecorder,
        tournament_id: Uuid,
        round: Round,
        player_a: Uuid,
        player_b: Uuid,
        match_id: MatchId,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let config = EngineConfig::default();
        let lifecycle = LifecycleManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(sink.clone()),
        );
        let calculator = StandingsCalculator::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            config.clone(),
        );
        let recorder = MatchResultRecorder::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            lifecycle,
            calculator,
            config,
        );

        let tournament = Tournament::new("City League", None);
        let tournament_id = tournament.id;
        TournamentRepo::insert(&store, tournament).await.unwrap();
        let phase = Phase::new(tournament_id, 1, PhaseType::Swiss, 3);
        store.insert_phase(phase.clone()).await.unwrap();
        let round = Round::new(phase.id, 1);
        store.insert_round(round.clone()).await.unwrap();

        let player_a = Uuid::new_v4();
        let player_b = Uuid::new_v4();
        let game_match = Match::pairing(&round, tournament_id, 1, player_a, player_b);
        let match_id = game_match.id;
        MatchRepo::insert(&store, game_match).await.unwrap();

        Fixture {
            store,
            recorder,
            tournament_id,
            round,
            player_a,
            player_b,
            match_id,
        }
    }

    #[tokio::test]
    async fn test_result_completes_match_and_standings() {
        let f = fixture().await;
        let winner = f
            .recorder
            .record(
                None,
                f.match_id,
                MatchResultInput {
                    game_wins_a: 2,
                    game_wins_b: 1,
                    staff_override: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(winner, Some(f.player_a));

        let stored = MatchRepo::get(&f.store, f.match_id).await.unwrap().unwrap();
        assert_eq!(stored.status, MatchStatus::Completed);
        assert_eq!(stored.match_points_a, 3);
        assert_eq!(stored.match_points_b, 0);
        assert!(stored.confirmed_a && stored.confirmed_b);

        let stat = PlayerStatRepo::get(&f.store, f.tournament_id, f.player_a)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stat.match_points, 3);
        assert_eq!(stat.opponents, vec![f.player_b]);
    }

    #[tokio::test]
    async fn test_second_submission_rejected_result_unchanged() {
        let f = fixture().await;
        let first = MatchResultInput {
            game_wins_a: 2,
            game_wins_b: 0,
            staff_override: false,
        };
        f.recorder.record(None, f.match_id, first).await.unwrap();

        let second = MatchResultInput {
            game_wins_a: 0,
            game_wins_b: 2,
            staff_override: false,
        };
        let err = f
            .recorder
            .record(None, f.match_id, second)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));

        let stored = MatchRepo::get(&f.store, f.match_id).await.unwrap().unwrap();
        assert_eq!(stored.winner, Some(f.player_a));
        assert_eq!(stored.game_wins_a, 2);
    }

    #[tokio::test]
    async fn test_tie_is_a_draw_when_allowed() {
        let f = fixture().await;
        let winner = f
            .recorder
            .record(
                None,
                f.match_id,
                MatchResultInput {
                    game_wins_a: 1,
                    game_wins_b: 1,
                    staff_override: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(winner, None);

        let stored = MatchRepo::get(&f.store, f.match_id).await.unwrap().unwrap();
        assert_eq!(stored.match_points_a, 1);
        assert_eq!(stored.match_points_b, 1);
    }

    #[tokio::test]
    async fn test_empty_result_rejected() {
        let f = fixture().await;
        let err = f
            .recorder
            .record(
                None,
                f.match_id,
                MatchResultInput {
                    game_wins_a: 0,
                    game_wins_b: 0,
                    staff_override: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_bye_rejects_results() {
        let f = fixture().await;
        let bye = Match::bye(&f.round, f.tournament_id, 2, Uuid::new_v4(), 3, 2, 0);
        let bye_id = bye.id;
        MatchRepo::insert(&f.store, bye).await.unwrap();

        let err = f
            .recorder
            .record(
                None,
                bye_id,
                MatchResultInput {
                    game_wins_a: 2,
                    game_wins_b: 0,
                    staff_override: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_staff_override_clears_intervention_request() {
        let f = fixture().await;
        let mut flagged = Match::pairing(&f.round, f.tournament_id, 2, Uuid::new_v4(), Uuid::new_v4());
        flagged.staff_requested = true;
        let flagged_id = flagged.id;
        MatchRepo::insert(&f.store, flagged).await.unwrap();

        f.recorder
            .record(
                None,
                flagged_id,
                MatchResultInput {
                    game_wins_a: 2,
                    game_wins_b: 0,
                    staff_override: true,
                },
            )
            .await
            .unwrap();

        let stored = MatchRepo::get(&f.store, flagged_id).await.unwrap().unwrap();
        assert!(!stored.staff_requested);
        assert_eq!(stored.status, MatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_last_result_completes_round() {
        let f = fixture().await;
        f.recorder
            .record(
                None,
                f.match_id,
                MatchResultInput {
                    game_wins_a: 2,
                    game_wins_b: 1,
                    staff_override: false,
                },
            )
            .await
            .unwrap();

        let round = f.store.get_round(f.round.id).await.unwrap().unwrap();
        assert_eq!(
            round.status,
            crate::lifecycle::models::RoundStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_history_appended_both_directions() {
        let f = fixture().await;
        f.recorder
            .record(
                None,
                f.match_id,
                MatchResultInput {
                    game_wins_a: 2,
                    game_wins_b: 0,
                    staff_override: false,
                },
            )
            .await
            .unwrap();

        let history = f.store.list_history(f.tournament_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(
            history
                .iter()
                .any(|e| e.player_id == f.player_a && e.opponent_id == f.player_b)
        );
        assert!(
            history
                .iter()
                .any(|e| e.player_id == f.player_b && e.opponent_id == f.player_a)
        );
        assert!(history.iter().all(|e| e.round_number == 1));
    }
}
