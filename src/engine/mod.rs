//! Public engine facade.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::lifecycle::machine::LifecycleManager;
use crate::lifecycle::models::{MatchId, PlayerId, RoundId, TournamentId, TournamentStatus};
use crate::pairing::generator::{PairingGenerator, PairingSummary};
use crate::ports::{ActionKind, ActorId, AuthorizationPort, EventSink, ResourceRef};
use crate::registration::ledger::RegistrationLedger;
use crate::registration::models::{RegistrationId, RegistrationInput, RegistrationStats};
use crate::repo::{MatchRepo, PlayerStatRepo, RegistrationRepo, RoundRepo, TournamentRepo};
use crate::results::recorder::{MatchResultInput, MatchResultRecorder};
use crate::standings::calculator::StandingsCalculator;
use crate::standings::models::PlayerStat;

/// Swiss tournament engine.
///
/// Composes the registration ledger, lifecycle state machine, pairing
/// generator, standings calculator, and result recorder over injected
/// repositories. Every mutating operation is authorized through the
/// [`AuthorizationPort`] before any data is touched; the engine never
/// evaluates roles itself.
#[derive(Clone)]
pub struct TournamentEngine {
    auth: Arc<dyn AuthorizationPort>,
    ledger: RegistrationLedger,
    lifecycle: LifecycleManager,
    generator: PairingGenerator,
    calculator: StandingsCalculator,
    recorder: MatchResultRecorder,
}

impl TournamentEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tournaments: Arc<dyn TournamentRepo>,
        registrations: Arc<dyn RegistrationRepo>,
        rounds: Arc<dyn RoundRepo>,
        matches: Arc<dyn MatchRepo>,
        stats: Arc<dyn PlayerStatRepo>,
        auth: Arc<dyn AuthorizationPort>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self {
        let lifecycle = LifecycleManager::new(
            Arc::clone(&tournaments),
            Arc::clone(&rounds),
            Arc::clone(&matches),
            Arc::clone(&events),
        );
        let calculator = StandingsCalculator::new(
            Arc::clone(&matches),
            Arc::clone(&stats),
            config.clone(),
        );
        let ledger = RegistrationLedger::new(
            Arc::clone(&tournaments),
            Arc::clone(&registrations),
            Arc::clone(&events),
            config.clone(),
        );
        let generator = PairingGenerator::new(
            Arc::clone(&tournaments),
            ledger.clone(),
            Arc::clone(&rounds),
            Arc::clone(&matches),
            Arc::clone(&stats),
            Arc::clone(&events),
            lifecycle.clone(),
            calculator.clone(),
            config.clone(),
        );
        let recorder = MatchResultRecorder::new(
            Arc::clone(&matches),
            Arc::clone(&stats),
            lifecycle.clone(),
            calculator.clone(),
            config,
        );
        Self {
            auth,
            ledger,
            lifecycle,
            generator,
            calculator,
            recorder,
        }
    }

    /// Build an engine over one store that implements every repository trait
    /// (such as [`crate::repo::MemoryStore`]).
    pub fn with_store<S>(
        store: S,
        auth: Arc<dyn AuthorizationPort>,
        events: Arc<dyn EventSink>,
        config: EngineConfig,
    ) -> Self
    where
        S: TournamentRepo
            + RegistrationRepo
            + RoundRepo
            + MatchRepo
            + PlayerStatRepo
            + Clone
            + 'static,
    {
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store),
            auth,
            events,
            config,
        )
    }

    /// Register the calling player for a tournament.
    pub async fn register(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        input: RegistrationInput,
    ) -> EngineResult<RegistrationId> {
        let actor = self
            .authorize(
                actor,
                ActionKind::Register,
                ResourceRef::Tournament(tournament_id),
            )
            .await?;
        self.ledger
            .register(Some(actor), tournament_id, actor, input)
            .await
    }

    /// Withdraw the calling player's registration.
    pub async fn withdraw(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
    ) -> EngineResult<()> {
        let actor = self
            .authorize(
                actor,
                ActionKind::Withdraw,
                ResourceRef::Tournament(tournament_id),
            )
            .await?;
        self.ledger.withdraw(Some(actor), tournament_id, actor).await
    }

    /// Check a player in, making them eligible for pairing.
    pub async fn check_in(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> EngineResult<()> {
        let actor = self
            .authorize(
                actor,
                ActionKind::CheckIn,
                ResourceRef::Tournament(tournament_id),
            )
            .await?;
        self.ledger
            .check_in(Some(actor), tournament_id, player_id)
            .await
    }

    /// Drop a player from further pairings.
    pub async fn drop_player(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> EngineResult<()> {
        let actor = self
            .authorize(
                actor,
                ActionKind::Drop,
                ResourceRef::Tournament(tournament_id),
            )
            .await?;
        self.ledger
            .drop_player(Some(actor), tournament_id, player_id)
            .await
    }

    /// Generate pairings for the next (or given) round.
    pub async fn generate_pairings(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        round_number: Option<u32>,
    ) -> EngineResult<PairingSummary> {
        let actor = self
            .authorize(
                actor,
                ActionKind::GeneratePairings,
                ResourceRef::Tournament(tournament_id),
            )
            .await?;
        self.generator
            .generate(Some(actor), tournament_id, round_number)
            .await
    }

    /// Start a pending round.
    pub async fn start_round(
        &self,
        actor: Option<ActorId>,
        round_id: RoundId,
    ) -> EngineResult<()> {
        let actor = self
            .authorize(actor, ActionKind::StartRound, ResourceRef::Round(round_id))
            .await?;
        self.lifecycle.start_round(Some(actor), round_id).await
    }

    /// Record a reported match result. Returns the winner, `None` on a draw.
    pub async fn record_match_result(
        &self,
        actor: Option<ActorId>,
        match_id: MatchId,
        input: MatchResultInput,
    ) -> EngineResult<Option<PlayerId>> {
        let actor = self
            .authorize(actor, ActionKind::RecordResult, ResourceRef::Match(match_id))
            .await?;
        self.recorder.record(Some(actor), match_id, input).await
    }

    /// Ranked standings, best first.
    pub async fn get_standings(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<Vec<PlayerStat>> {
        self.calculator.standings(tournament_id).await
    }

    /// Registration counters.
    pub async fn get_registration_stats(
        &self,
        tournament_id: TournamentId,
    ) -> EngineResult<RegistrationStats> {
        self.ledger.stats(tournament_id).await
    }

    pub async fn pause_tournament(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
    ) -> EngineResult<()> {
        self.manage(actor, tournament_id, TournamentStatus::Paused)
            .await
    }

    pub async fn resume_tournament(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
    ) -> EngineResult<()> {
        self.manage(actor, tournament_id, TournamentStatus::Active)
            .await
    }

    pub async fn complete_tournament(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
    ) -> EngineResult<()> {
        self.manage(actor, tournament_id, TournamentStatus::Completed)
            .await
    }

    pub async fn cancel_tournament(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
    ) -> EngineResult<()> {
        self.manage(actor, tournament_id, TournamentStatus::Cancelled)
            .await
    }

    async fn manage(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        to: TournamentStatus,
    ) -> EngineResult<()> {
        let actor = self
            .authorize(
                actor,
                ActionKind::ManageTournament,
                ResourceRef::Tournament(tournament_id),
            )
            .await?;
        self.lifecycle
            .transition_tournament(Some(actor), tournament_id, to)
            .await
    }

    async fn authorize(
        &self,
        actor: Option<ActorId>,
        action: ActionKind,
        resource: ResourceRef,
    ) -> EngineResult<ActorId> {
        let actor = actor.ok_or(EngineError::NotAuthenticated)?;
        if !self.auth.has_permission(actor, action, resource).await {
            return Err(EngineError::PermissionDenied);
        }
        Ok(actor)
    }
}
