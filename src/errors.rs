//! Engine error types.

use thiserror::Error;

use crate::repo::StorageError;

/// Errors surfaced by the tournament engine.
///
/// Every variant is terminal for the calling operation: the engine performs
/// no internal retries, and partial writes are compensated before an error
/// is returned (registration capacity rollback is the canonical case).
#[derive(Debug, Error)]
pub enum EngineError {
    /// No authenticated actor was supplied for a mutating operation
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The authorization port rejected the operation
    #[error("Permission denied")]
    PermissionDenied,

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Requested state change is illegal for the entity's current status
    #[error("Cannot {action} {entity} in state {state}")]
    InvalidTransition {
        entity: &'static str,
        state: String,
        action: &'static str,
    },

    /// Round number collision within a phase
    #[error("Round {round_number} already exists in this phase")]
    DuplicateRound { round_number: u32 },

    /// Too few eligible players to generate pairings
    #[error("Insufficient players: need {needed}, have {current}")]
    InsufficientPlayers { needed: usize, current: usize },

    /// Registration would exceed the participant cap
    #[error("Tournament is full")]
    TournamentFull,

    /// Player already has a registration for this tournament
    #[error("Player already registered")]
    AlreadyRegistered,

    /// Player has no registration for this tournament
    #[error("Player is not registered")]
    NotRegistered,

    /// Malformed input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Stable machine-readable kind for the presentation layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::DuplicateRound { .. } => "duplicate_round",
            Self::InsufficientPlayers { .. } => "insufficient_players",
            Self::TournamentFull => "tournament_full",
            Self::AlreadyRegistered => "already_registered",
            Self::NotRegistered => "not_registered",
            Self::Validation(_) => "validation_error",
            Self::Storage(_) => "storage_error",
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(EngineError::TournamentFull.kind(), "tournament_full");
        assert_eq!(
            EngineError::DuplicateRound { round_number: 2 }.kind(),
            "duplicate_round"
        );
        assert_eq!(
            EngineError::Validation("notes too long".into()).kind(),
            "validation_error"
        );
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = EngineError::InsufficientPlayers {
            needed: 2,
            current: 1,
        };
        assert_eq!(err.to_string(), "Insufficient players: need 2, have 1");
    }
}
