//! Registration data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::models::{PlayerId, TournamentId};

/// Registration ID type
pub type RegistrationId = Uuid;

/// Registration status
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Pending,
    Registered,
    Confirmed,
    Waitlist,
    CheckedIn,
    Dropped,
    Withdrawn,
}

impl RegistrationStatus {
    /// Whether the player is still part of the tournament in some capacity.
    pub fn is_live(self) -> bool {
        !matches!(self, Self::Dropped | Self::Withdrawn)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Registered => "registered",
            Self::Confirmed => "confirmed",
            Self::Waitlist => "waitlist",
            Self::CheckedIn => "checked_in",
            Self::Dropped => "dropped",
            Self::Withdrawn => "withdrawn",
        }
    }
}

/// Registration record; at most one per `(tournament, player)` pair.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub team_name: Option<String>,
    pub notes: Option<String>,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Registration {
    pub fn new(
        tournament_id: TournamentId,
        player_id: PlayerId,
        team_name: Option<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            player_id,
            team_name,
            notes,
            status: RegistrationStatus::Pending,
            registered_at: Utc::now(),
            checked_in_at: None,
        }
    }
}

/// Input for a registration request.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RegistrationInput {
    pub team_name: Option<String>,
    pub notes: Option<String>,
}

/// Registration counters for a tournament.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RegistrationStats {
    pub total: u64,
    pub pending: u64,
    pub checked_in: u64,
    pub withdrawn: u64,
    pub with_teams: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registration_is_pending() {
        let reg = Registration::new(Uuid::new_v4(), Uuid::new_v4(), None, None);
        assert_eq!(reg.status, RegistrationStatus::Pending);
        assert!(reg.checked_in_at.is_none());
    }

    #[test]
    fn test_live_statuses() {
        assert!(RegistrationStatus::Pending.is_live());
        assert!(RegistrationStatus::CheckedIn.is_live());
        assert!(!RegistrationStatus::Dropped.is_live());
        assert!(!RegistrationStatus::Withdrawn.is_live());
    }
}
