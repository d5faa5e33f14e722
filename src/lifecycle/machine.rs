//! Tournament, round, and match status transitions.

use std::sync::Arc;

use log::info;

use crate::errors::{EngineError, EngineResult};
use crate::lifecycle::models::{
    Round, RoundId, RoundStatus, TournamentId, TournamentStatus,
};
use crate::ports::{ActorId, AuditEvent, EventSink};
use crate::repo::{MatchRepo, RoundRepo, TournamentRepo};

/// Applies legal lifecycle transitions and emits status-change events.
///
/// Every status write in the engine funnels through here; other components
/// never patch status fields directly.
#[derive(Clone)]
pub struct LifecycleManager {
    tournaments: Arc<dyn TournamentRepo>,
    rounds: Arc<dyn RoundRepo>,
    matches: Arc<dyn MatchRepo>,
    events: Arc<dyn EventSink>,
}

impl LifecycleManager {
    pub fn new(
        tournaments: Arc<dyn TournamentRepo>,
        rounds: Arc<dyn RoundRepo>,
        matches: Arc<dyn MatchRepo>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            tournaments,
            rounds,
            matches,
            events,
        }
    }

    /// Move a tournament to `to`, rejecting illegal transitions.
    pub async fn transition_tournament(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        to: TournamentStatus,
    ) -> EngineResult<()> {
        let tournament = self
            .tournaments
            .get(tournament_id)
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;
        let from = tournament.status;
        if !from.can_transition_to(to) {
            return Err(EngineError::InvalidTransition {
                entity: "tournament",
                state: from.as_str().to_string(),
                action: transition_verb(to),
            });
        }

        self.tournaments.set_status(tournament_id, to).await?;
        info!(
            "tournament {tournament_id} {} -> {}",
            from.as_str(),
            to.as_str()
        );
        self.events
            .log_event(
                tournament_id,
                AuditEvent::TournamentStatusChanged { from, to },
                actor,
            )
            .await;
        Ok(())
    }

    /// Start a pending round: the round and every non-bye pending match in it
    /// flip to active. Bye matches are already completed and are untouched.
    ///
    /// Rounds produced by pairing generation are activated on creation, so
    /// calling this on one of those fails with `InvalidTransition`.
    pub async fn start_round(&self, actor: Option<ActorId>, round_id: RoundId) -> EngineResult<()> {
        let round = self
            .rounds
            .get_round(round_id)
            .await?
            .ok_or(EngineError::NotFound("round"))?;
        if round.status != RoundStatus::Pending {
            return Err(EngineError::InvalidTransition {
                entity: "round",
                state: round.status.as_str().to_string(),
                action: "start",
            });
        }
        let phase = self
            .rounds
            .get_phase(round.phase_id)
            .await?
            .ok_or(EngineError::NotFound("phase"))?;

        self.activate_round(actor, phase.tournament_id, &round).await
    }

    /// Activation body shared by `start_round` and pairing generation.
    pub(crate) async fn activate_round(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        round: &Round,
    ) -> EngineResult<()> {
        self.rounds
            .set_round_status(round.id, RoundStatus::Active)
            .await?;
        let activated = self.matches.activate_pending(round.id).await?;
        info!(
            "round {} of tournament {tournament_id} active, {activated} matches live",
            round.round_number
        );
        self.events
            .log_event(
                tournament_id,
                AuditEvent::RoundStatusChanged {
                    round_id: round.id,
                    round_number: round.round_number,
                    from: RoundStatus::Pending,
                    to: RoundStatus::Active,
                },
                actor,
            )
            .await;
        Ok(())
    }

    /// Complete the round once its last match finishes. Returns whether the
    /// round was flipped.
    pub(crate) async fn complete_round_if_finished(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        round_id: RoundId,
    ) -> EngineResult<bool> {
        let round = self
            .rounds
            .get_round(round_id)
            .await?
            .ok_or(EngineError::NotFound("round"))?;
        if round.status == RoundStatus::Completed {
            return Ok(false);
        }
        let matches = self.matches.list_by_round(round_id).await?;
        let all_done = matches
            .iter()
            .all(|m| m.status == crate::lifecycle::models::MatchStatus::Completed);
        if !all_done {
            return Ok(false);
        }

        self.rounds
            .set_round_status(round_id, RoundStatus::Completed)
            .await?;
        self.events
            .log_event(
                tournament_id,
                AuditEvent::RoundStatusChanged {
                    round_id,
                    round_number: round.round_number,
                    from: round.status,
                    to: RoundStatus::Completed,
                },
                actor,
            )
            .await;
        Ok(true)
    }
}

fn transition_verb(to: TournamentStatus) -> &'static str {
    match to {
        TournamentStatus::Draft => "draft",
        TournamentStatus::Upcoming => "publish",
        TournamentStatus::Active => "activate",
        TournamentStatus::Paused => "pause",
        TournamentStatus::Completed => "complete",
        TournamentStatus::Cancelled => "cancel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::models::{Match, MatchStatus, Phase, PhaseType, Tournament};
    use crate::ports::RecordingEventSink;
    use crate::repo::MemoryStore;
    use uuid::Uuid;

    fn manager(store: &MemoryStore, sink: &RecordingEventSink) -> LifecycleManager {
        LifecycleManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(sink.clone()),
        )
    }

    async fn seed(store: &MemoryStore) -> (TournamentId, Phase) {
        let tournament = Tournament::new("League Cup", None);
        let tournament_id = tournament.id;
        TournamentRepo::insert(store, tournament).await.unwrap();
        let phase = Phase::new(tournament_id, 1, PhaseType::Swiss, 3);
        store.insert_phase(phase.clone()).await.unwrap();
        (tournament_id, phase)
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let manager = manager(&store, &sink);
        let (tournament_id, _) = seed(&store).await;

        manager
            .transition_tournament(None, tournament_id, TournamentStatus::Active)
            .await
            .unwrap();
        manager
            .transition_tournament(None, tournament_id, TournamentStatus::Paused)
            .await
            .unwrap();
        manager
            .transition_tournament(None, tournament_id, TournamentStatus::Active)
            .await
            .unwrap();

        let err = manager
            .transition_tournament(None, tournament_id, TournamentStatus::Upcoming)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_cancel_terminal() {
        let store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let manager = manager(&store, &sink);
        let (tournament_id, _) = seed(&store).await;

        manager
            .transition_tournament(None, tournament_id, TournamentStatus::Cancelled)
            .await
            .unwrap();
        let err = manager
            .transition_tournament(None, tournament_id, TournamentStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_start_round_flips_matches() {
        let store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let manager = manager(&store, &sink);
        let (tournament_id, phase) = seed(&store).await;

        let round = Round::new(phase.id, 1);
        store.insert_round(round.clone()).await.unwrap();
        MatchRepo::insert(
            &store,
            Match::pairing(&round, tournament_id, 1, Uuid::new_v4(), Uuid::new_v4()),
        )
        .await
        .unwrap();

        manager.start_round(None, round.id).await.unwrap();

        let stored = store.get_round(round.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RoundStatus::Active);
        let matches = store.list_by_round(round.id).await.unwrap();
        assert_eq!(matches[0].status, MatchStatus::Active);

        // Second start is an illegal transition.
        let err = manager.start_round(None, round.id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_round_completes_when_all_matches_done() {
        let store = MemoryStore::new();
        let sink = RecordingEventSink::new();
        let manager = manager(&store, &sink);
        let (tournament_id, phase) = seed(&store).await;

        let round = Round::new(phase.id, 1);
        store.insert_round(round.clone()).await.unwrap();
        let mut m = Match::pairing(&round, tournament_id, 1, Uuid::new_v4(), Uuid::new_v4());
        let open = Match::pairing(&round, tournament_id, 2, Uuid::new_v4(), Uuid::new_v4());
        MatchRepo::insert(&store, m.clone()).await.unwrap();
        MatchRepo::insert(&store, open.clone()).await.unwrap();

        assert!(
            !manager
                .complete_round_if_finished(None, tournament_id, round.id)
                .await
                .unwrap()
        );

        m.status = MatchStatus::Completed;
        store.complete(m).await.unwrap();
        let mut open = open;
        open.status = MatchStatus::Completed;
        store.complete(open).await.unwrap();

        assert!(
            manager
                .complete_round_if_finished(None, tournament_id, round.id)
                .await
                .unwrap()
        );
        assert_eq!(
            store.get_round(round.id).await.unwrap().unwrap().status,
            RoundStatus::Completed
        );
    }
}
