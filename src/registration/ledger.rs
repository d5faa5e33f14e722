//! Capacity-bounded registration ledger.

use std::sync::Arc;

use log::{debug, info};

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::lifecycle::models::{PlayerId, TournamentId, TournamentStatus};
use crate::ports::{ActorId, AuditEvent, EventSink};
use crate::registration::models::{
    Registration, RegistrationId, RegistrationInput, RegistrationStats, RegistrationStatus,
};
use crate::repo::{RegistrationRepo, StorageError, TournamentRepo};

/// Tracks registration status per player and enforces the participant cap.
#[derive(Clone)]
pub struct RegistrationLedger {
    tournaments: Arc<dyn TournamentRepo>,
    registrations: Arc<dyn RegistrationRepo>,
    events: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl RegistrationLedger {
    pub fn new(
        tournaments: Arc<dyn TournamentRepo>,
        registrations: Arc<dyn RegistrationRepo>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            tournaments,
            registrations,
            events,
            config,
        }
    }

    /// Register a player for an upcoming tournament.
    ///
    /// Capacity is enforced insert-first: the registration is created, the
    /// total is counted, and on overflow the just-created row is deleted and
    /// `TournamentFull` returned. Count-then-insert would silently admit
    /// extra players when registrants race; this ordering keeps the overflow
    /// detectable and reversible, so the count never permanently exceeds
    /// `max_participants`.
    pub async fn register(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        player_id: PlayerId,
        input: RegistrationInput,
    ) -> EngineResult<RegistrationId> {
        self.validate(&input)?;

        let tournament = self
            .tournaments
            .get(tournament_id)
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;
        if tournament.status != TournamentStatus::Upcoming {
            return Err(EngineError::InvalidTransition {
                entity: "tournament",
                state: tournament.status.as_str().to_string(),
                action: "register for",
            });
        }

        let registration =
            Registration::new(tournament_id, player_id, input.team_name, input.notes);
        let registration_id = registration.id;
        match self.registrations.insert(registration).await {
            Ok(()) => {}
            Err(StorageError::Duplicate(_)) => return Err(EngineError::AlreadyRegistered),
            Err(err) => return Err(err.into()),
        }

        if let Some(max) = tournament.max_participants {
            let count = self.registrations.count(tournament_id).await?;
            if count > u64::from(max) {
                // Overflow under concurrent registration: compensate.
                self.registrations.delete(tournament_id, player_id).await?;
                debug!("registration rolled back, tournament {tournament_id} at capacity {max}");
                return Err(EngineError::TournamentFull);
            }
        }

        info!("player {player_id} registered for tournament {tournament_id}");
        self.events
            .log_event(
                tournament_id,
                AuditEvent::PlayerRegistered { player: player_id },
                actor,
            )
            .await;
        Ok(registration_id)
    }

    /// Delete a player's registration before the tournament goes active.
    pub async fn withdraw(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> EngineResult<()> {
        let tournament = self
            .tournaments
            .get(tournament_id)
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;
        if self
            .registrations
            .find(tournament_id, player_id)
            .await?
            .is_none()
        {
            return Err(EngineError::NotRegistered);
        }
        if matches!(
            tournament.status,
            TournamentStatus::Active | TournamentStatus::Completed
        ) {
            return Err(EngineError::InvalidTransition {
                entity: "tournament",
                state: tournament.status.as_str().to_string(),
                action: "withdraw from",
            });
        }

        self.registrations.delete(tournament_id, player_id).await?;
        self.events
            .log_event(
                tournament_id,
                AuditEvent::RegistrationWithdrawn { player: player_id },
                actor,
            )
            .await;
        Ok(())
    }

    /// Mark a registered player as checked in. Only checked-in players are
    /// eligible for pairing.
    pub async fn check_in(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> EngineResult<()> {
        let tournament = self
            .tournaments
            .get(tournament_id)
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;
        if tournament.status.is_terminal() {
            return Err(EngineError::InvalidTransition {
                entity: "tournament",
                state: tournament.status.as_str().to_string(),
                action: "check in for",
            });
        }
        let registration = self
            .registrations
            .find(tournament_id, player_id)
            .await?
            .ok_or(EngineError::NotRegistered)?;
        if !registration.status.is_live() {
            return Err(EngineError::InvalidTransition {
                entity: "registration",
                state: registration.status.as_str().to_string(),
                action: "check in",
            });
        }

        self.registrations
            .set_status(
                tournament_id,
                player_id,
                RegistrationStatus::CheckedIn,
                Some(chrono::Utc::now()),
            )
            .await?;
        self.events
            .log_event(
                tournament_id,
                AuditEvent::PlayerCheckedIn { player: player_id },
                actor,
            )
            .await;
        Ok(())
    }

    /// Drop a player from further pairings. Unlike withdrawal this is legal
    /// while the tournament is active; the registration row is kept.
    pub async fn drop_player(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> EngineResult<()> {
        let registration = self
            .registrations
            .find(tournament_id, player_id)
            .await?
            .ok_or(EngineError::NotRegistered)?;
        if !registration.status.is_live() {
            return Err(EngineError::InvalidTransition {
                entity: "registration",
                state: registration.status.as_str().to_string(),
                action: "drop",
            });
        }

        self.registrations
            .set_status(tournament_id, player_id, RegistrationStatus::Dropped, None)
            .await?;
        self.events
            .log_event(
                tournament_id,
                AuditEvent::PlayerDropped { player: player_id },
                actor,
            )
            .await;
        Ok(())
    }

    /// Registration counters for a tournament.
    pub async fn stats(&self, tournament_id: TournamentId) -> EngineResult<RegistrationStats> {
        let registrations = self.registrations.list(tournament_id).await?;
        let mut stats = RegistrationStats::default();
        for registration in &registrations {
            stats.total += 1;
            match registration.status {
                RegistrationStatus::Pending => stats.pending += 1,
                RegistrationStatus::CheckedIn => stats.checked_in += 1,
                RegistrationStatus::Withdrawn => stats.withdrawn += 1,
                _ => {}
            }
            if registration.team_name.is_some() {
                stats.with_teams += 1;
            }
        }
        Ok(stats)
    }

    /// Players eligible for pairing: checked in, in registration order.
    pub async fn eligible_players(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<PlayerId>> {
        let registrations = self.registrations.list(tournament_id).await?;
        Ok(registrations
            .into_iter()
            .filter(|r| r.status == RegistrationStatus::CheckedIn)
            .map(|r| r.player_id)
            .collect())
    }

    fn validate(&self, input: &RegistrationInput) -> EngineResult<()> {
        if let Some(notes) = &input.notes {
            if notes.len() > self.config.max_notes_len {
                return Err(EngineError::Validation(format!(
                    "notes exceed {} characters",
                    self.config.max_notes_len
                )));
            }
        }
        if let Some(team_name) = &input.team_name {
            if team_name.is_empty() || team_name.len() > self.config.max_team_name_len {
                return Err(EngineError::Validation(format!(
                    "team name must be 1-{} characters",
                    self.config.max_team_name_len
                )));
            }
        }
        Ok(())
    }
}
