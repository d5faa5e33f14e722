//! Interfaces to external collaborators.
//!
//! Identity, authorization, and audit logging live outside this engine. The
//! engine calls [`AuthorizationPort`] once per public mutating operation and
//! appends [`AuditEvent`]s through an [`EventSink`]; sink failures never roll
//! back the primary operation.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::lifecycle::models::{
    MatchId, PlayerId, RoundId, RoundStatus, TournamentId, TournamentStatus,
};

/// Authenticated actor id, resolved by the surrounding system.
pub type ActorId = Uuid;

/// Mutating operations subject to authorization.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Register,
    Withdraw,
    CheckIn,
    Drop,
    GeneratePairings,
    StartRound,
    RecordResult,
    ManageTournament,
}

/// Resource an action targets.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "id")]
pub enum ResourceRef {
    Tournament(TournamentId),
    Round(RoundId),
    Match(MatchId),
}

/// Capability check performed by the external permission system.
#[async_trait]
pub trait AuthorizationPort: Send + Sync {
    /// A `false` result short-circuits the operation before any data is
    /// touched.
    async fn has_permission(
        &self,
        actor: ActorId,
        action: ActionKind,
        resource: ResourceRef,
    ) -> bool;
}

/// Closed set of audit events this engine emits.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum AuditEvent {
    PairingForcedRematch {
        round_number: u32,
        player: PlayerId,
        opponent: PlayerId,
    },
    PairingMultipleBye {
        round_number: u32,
        player: PlayerId,
    },
    TournamentStatusChanged {
        from: TournamentStatus,
        to: TournamentStatus,
    },
    RoundStatusChanged {
        round_id: RoundId,
        round_number: u32,
        from: RoundStatus,
        to: RoundStatus,
    },
    PlayerRegistered {
        player: PlayerId,
    },
    RegistrationWithdrawn {
        player: PlayerId,
    },
    PlayerCheckedIn {
        player: PlayerId,
    },
    PlayerDropped {
        player: PlayerId,
    },
}

impl AuditEvent {
    /// Stable event-type tag consumers key on.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PairingForcedRematch { .. } => "pairing_forced_rematch",
            Self::PairingMultipleBye { .. } => "pairing_multiple_bye",
            Self::TournamentStatusChanged { .. } => "tournament_status_changed",
            Self::RoundStatusChanged { .. } => "round_status_changed",
            Self::PlayerRegistered { .. } => "player_registered",
            Self::RegistrationWithdrawn { .. } => "registration_withdrawn",
            Self::PlayerCheckedIn { .. } => "player_checked_in",
            Self::PlayerDropped { .. } => "player_dropped",
        }
    }

    /// Structured payload for sinks that store JSON.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "event": self.event_type() }))
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PairingForcedRematch {
                round_number,
                player,
                opponent,
            } => write!(
                f,
                "round {round_number}: forced rematch between {player} and {opponent}"
            ),
            Self::PairingMultipleBye {
                round_number,
                player,
            } => write!(f, "round {round_number}: repeat bye assigned to {player}"),
            Self::TournamentStatusChanged { from, to } => {
                write!(f, "tournament {} -> {}", from.as_str(), to.as_str())
            }
            Self::RoundStatusChanged {
                round_number,
                from,
                to,
                ..
            } => write!(
                f,
                "round {round_number} {} -> {}",
                from.as_str(),
                to.as_str()
            ),
            Self::PlayerRegistered { player } => write!(f, "{player} registered"),
            Self::RegistrationWithdrawn { player } => write!(f, "{player} withdrew"),
            Self::PlayerCheckedIn { player } => write!(f, "{player} checked in"),
            Self::PlayerDropped { player } => write!(f, "{player} dropped"),
        }
    }
}

/// Fire-and-forget audit append.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn log_event(
        &self,
        tournament_id: TournamentId,
        event: AuditEvent,
        actor: Option<ActorId>,
    );
}

/// Authorization port that approves everything. For embedding the engine in
/// systems that gate access upstream, and for tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAllAuthorization;

#[async_trait]
impl AuthorizationPort for AllowAllAuthorization {
    async fn has_permission(&self, _: ActorId, _: ActionKind, _: ResourceRef) -> bool {
        true
    }
}

/// Sink that writes events to the `log` facade with their JSON payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingEventSink;

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn log_event(
        &self,
        tournament_id: TournamentId,
        event: AuditEvent,
        actor: Option<ActorId>,
    ) {
        info!(
            "audit tournament={tournament_id} type={} actor={:?} payload={}",
            event.event_type(),
            actor,
            event.payload()
        );
    }
}

/// Sink that records events in memory so callers can inspect them.
#[derive(Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<(TournamentId, AuditEvent, Option<ActorId>)>>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub async fn events(&self) -> Vec<(TournamentId, AuditEvent, Option<ActorId>)> {
        self.events.lock().await.clone()
    }

    /// Events of one type for one tournament.
    pub async fn of_type(&self, tournament_id: TournamentId, event_type: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(t, e, _)| *t == tournament_id && e.event_type() == event_type)
            .map(|(_, e, _)| e.clone())
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn log_event(
        &self,
        tournament_id: TournamentId,
        event: AuditEvent,
        actor: Option<ActorId>,
    ) {
        self.events.lock().await.push((tournament_id, event, actor));
    }
}
