//! In-memory store implementing every repository trait.
//!
//! Reference implementation and test harness. All state lives behind a single
//! `tokio::sync::RwLock`, so the uniqueness and compare-and-swap contracts in
//! [`super`] hold under concurrent callers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    MatchRepo, PlayerStatRepo, RegistrationRepo, RoundRepo, StorageError, StorageResult,
    TournamentRepo,
};
use crate::lifecycle::models::{
    Match, MatchId, MatchStatus, Phase, PhaseId, PhaseStatus, PlayerId, Round, RoundId,
    RoundStatus, Tournament, TournamentId, TournamentStatus,
};
use crate::registration::models::{Registration, RegistrationStatus};
use crate::standings::models::{OpponentHistoryEntry, PlayerStat};

#[derive(Default)]
struct MemoryState {
    tournaments: HashMap<TournamentId, Tournament>,
    registrations: HashMap<(TournamentId, PlayerId), Registration>,
    phases: HashMap<PhaseId, Phase>,
    rounds: HashMap<RoundId, Round>,
    matches: HashMap<MatchId, Match>,
    stats: HashMap<(TournamentId, PlayerId), PlayerStat>,
    history: Vec<OpponentHistoryEntry>,
}

/// HashMap-backed store shared via `Arc`; cloning is cheap.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepo for MemoryStore {
    async fn insert(&self, tournament: Tournament) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.tournaments.contains_key(&tournament.id) {
            return Err(StorageError::Duplicate("tournament"));
        }
        state.tournaments.insert(tournament.id, tournament);
        Ok(())
    }

    async fn get(&self, id: TournamentId) -> StorageResult<Option<Tournament>> {
        Ok(self.state.read().await.tournaments.get(&id).cloned())
    }

    async fn set_status(&self, id: TournamentId, status: TournamentStatus) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let tournament = state
            .tournaments
            .get_mut(&id)
            .ok_or(StorageError::Missing("tournament"))?;
        tournament.status = status;
        Ok(())
    }

    async fn set_round_state(
        &self,
        id: TournamentId,
        current_round: u32,
        current_phase: PhaseId,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let tournament = state
            .tournaments
            .get_mut(&id)
            .ok_or(StorageError::Missing("tournament"))?;
        tournament.current_round = current_round;
        tournament.current_phase = Some(current_phase);
        Ok(())
    }
}

#[async_trait]
impl RegistrationRepo for MemoryStore {
    async fn insert(&self, registration: Registration) -> StorageResult<()> {
        let key = (registration.tournament_id, registration.player_id);
        let mut state = self.state.write().await;
        if state.registrations.contains_key(&key) {
            return Err(StorageError::Duplicate("registration"));
        }
        state.registrations.insert(key, registration);
        Ok(())
    }

    async fn find(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StorageResult<Option<Registration>> {
        Ok(self
            .state
            .read()
            .await
            .registrations
            .get(&(tournament_id, player_id))
            .cloned())
    }

    async fn delete(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StorageResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .registrations
            .remove(&(tournament_id, player_id))
            .is_some())
    }

    async fn count(&self, tournament_id: TournamentId) -> StorageResult<u64> {
        let state = self.state.read().await;
        Ok(state
            .registrations
            .keys()
            .filter(|(t, _)| *t == tournament_id)
            .count() as u64)
    }

    async fn list(&self, tournament_id: TournamentId) -> StorageResult<Vec<Registration>> {
        let state = self.state.read().await;
        let mut registrations: Vec<_> = state
            .registrations
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        registrations.sort_by_key(|r| (r.registered_at, r.player_id));
        Ok(registrations)
    }

    async fn set_status(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
        status: RegistrationStatus,
        checked_in_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let registration = state
            .registrations
            .get_mut(&(tournament_id, player_id))
            .ok_or(StorageError::Missing("registration"))?;
        registration.status = status;
        if checked_in_at.is_some() {
            registration.checked_in_at = checked_in_at;
        }
        Ok(())
    }
}

#[async_trait]
impl RoundRepo for MemoryStore {
    async fn insert_phase(&self, phase: Phase) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.phases.contains_key(&phase.id) {
            return Err(StorageError::Duplicate("phase"));
        }
        state.phases.insert(phase.id, phase);
        Ok(())
    }

    async fn get_phase(&self, id: PhaseId) -> StorageResult<Option<Phase>> {
        Ok(self.state.read().await.phases.get(&id).cloned())
    }

    async fn active_phase(&self, tournament_id: TournamentId) -> StorageResult<Option<Phase>> {
        let state = self.state.read().await;
        let mut phases: Vec<_> = state
            .phases
            .values()
            .filter(|p| p.tournament_id == tournament_id && p.status == PhaseStatus::Active)
            .cloned()
            .collect();
        phases.sort_by_key(|p| p.phase_order);
        Ok(phases.into_iter().next())
    }

    async fn update_phase(&self, phase: Phase) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if !state.phases.contains_key(&phase.id) {
            return Err(StorageError::Missing("phase"));
        }
        state.phases.insert(phase.id, phase);
        Ok(())
    }

    async fn insert_round(&self, round: Round) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let collision = state
            .rounds
            .values()
            .any(|r| r.phase_id == round.phase_id && r.round_number == round.round_number);
        if collision {
            return Err(StorageError::Duplicate("round"));
        }
        state.rounds.insert(round.id, round);
        Ok(())
    }

    async fn delete_round(&self, id: RoundId) -> StorageResult<()> {
        self.state.write().await.rounds.remove(&id);
        Ok(())
    }

    async fn get_round(&self, id: RoundId) -> StorageResult<Option<Round>> {
        Ok(self.state.read().await.rounds.get(&id).cloned())
    }

    async fn count_rounds(&self, phase_id: PhaseId) -> StorageResult<u32> {
        let state = self.state.read().await;
        Ok(state
            .rounds
            .values()
            .filter(|r| r.phase_id == phase_id)
            .count() as u32)
    }

    async fn set_round_status(&self, id: RoundId, status: RoundStatus) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let round = state
            .rounds
            .get_mut(&id)
            .ok_or(StorageError::Missing("round"))?;
        round.status = status;
        Ok(())
    }
}

#[async_trait]
impl MatchRepo for MemoryStore {
    async fn insert(&self, game_match: Match) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.matches.contains_key(&game_match.id) {
            return Err(StorageError::Duplicate("match"));
        }
        state.matches.insert(game_match.id, game_match);
        Ok(())
    }

    async fn get(&self, id: MatchId) -> StorageResult<Option<Match>> {
        Ok(self.state.read().await.matches.get(&id).cloned())
    }

    async fn list_by_round(&self, round_id: RoundId) -> StorageResult<Vec<Match>> {
        let state = self.state.read().await;
        let mut matches: Vec<_> = state
            .matches
            .values()
            .filter(|m| m.round_id == round_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.table_number);
        Ok(matches)
    }

    async fn list_completed(&self, tournament_id: TournamentId) -> StorageResult<Vec<Match>> {
        let state = self.state.read().await;
        let mut matches: Vec<_> = state
            .matches
            .values()
            .filter(|m| m.tournament_id == tournament_id && m.status == MatchStatus::Completed)
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.round_number, m.table_number));
        Ok(matches)
    }

    async fn activate_pending(&self, round_id: RoundId) -> StorageResult<u32> {
        let mut state = self.state.write().await;
        let mut flipped = 0;
        for game_match in state.matches.values_mut() {
            if game_match.round_id == round_id
                && !game_match.is_bye
                && game_match.status == MatchStatus::Pending
            {
                game_match.status = MatchStatus::Active;
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn complete(&self, game_match: Match) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .matches
            .get_mut(&game_match.id)
            .ok_or(StorageError::Missing("match"))?;
        if stored.status == MatchStatus::Completed {
            return Err(StorageError::Conflict("match"));
        }
        *stored = game_match;
        Ok(())
    }
}

#[async_trait]
impl PlayerStatRepo for MemoryStore {
    async fn upsert(&self, stat: PlayerStat) -> StorageResult<()> {
        let mut state = self.state.write().await;
        state
            .stats
            .insert((stat.tournament_id, stat.player_id), stat);
        Ok(())
    }

    async fn get(
        &self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StorageResult<Option<PlayerStat>> {
        Ok(self
            .state
            .read()
            .await
            .stats
            .get(&(tournament_id, player_id))
            .cloned())
    }

    async fn list(&self, tournament_id: TournamentId) -> StorageResult<Vec<PlayerStat>> {
        let state = self.state.read().await;
        Ok(state
            .stats
            .values()
            .filter(|s| s.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn append_history(&self, entry: OpponentHistoryEntry) -> StorageResult<()> {
        self.state.write().await.history.push(entry);
        Ok(())
    }

    async fn list_history(
        &self,
        tournament_id: TournamentId,
    ) -> StorageResult<Vec<OpponentHistoryEntry>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .iter()
            .filter(|e| e.tournament_id == tournament_id)
            .copied()
            .collect())
    }
}
