//! # Swiss Engine
//!
//! A Swiss-system tournament pairing, standings, and round-lifecycle engine.
//!
//! The engine partitions a checked-in player pool into pairings each round
//! under Swiss rules (equal-points grouping, rematch avoidance, fair bye
//! rotation), advances the tournament → phase → round → match lifecycle
//! through legal states only, computes standings with a cascading tiebreaker
//! formula (match points, opponent match-win%, opponent game-win%,
//! Buchholz), and enforces a capacity-bounded registration ledger.
//!
//! ## Architecture
//!
//! Storage and the outside world are injected:
//!
//! - [`repo`] defines repository traits for each entity plus a bundled
//!   in-memory store; callers bring their own SQL-backed implementations.
//! - [`ports`] defines the authorization capability check and the typed
//!   audit event sink the engine emits into.
//! - [`engine::TournamentEngine`] is the facade the API layer calls.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use swiss_engine::{
//!     EngineConfig, MemoryStore, Tournament, TournamentEngine,
//!     ports::{AllowAllAuthorization, LoggingEventSink},
//!     repo::TournamentRepo,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let tournament = Tournament::new("Spring Open", Some(32));
//! let tournament_id = tournament.id;
//! store.insert(tournament).await?;
//!
//! let engine = TournamentEngine::with_store(
//!     store,
//!     Arc::new(AllowAllAuthorization),
//!     Arc::new(LoggingEventSink),
//!     EngineConfig::default(),
//! );
//! let stats = engine.get_registration_stats(tournament_id).await?;
//! assert_eq!(stats.total, 0);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod lifecycle;
pub mod pairing;
pub mod ports;
pub mod registration;
pub mod repo;
pub mod results;
pub mod standings;

pub use config::EngineConfig;
pub use engine::TournamentEngine;
pub use errors::{EngineError, EngineResult};
pub use lifecycle::{
    Match, MatchId, MatchStatus, Phase, PhaseId, PhaseStatus, PhaseType, PlayerId, Round, RoundId,
    RoundStatus, Tournament, TournamentId, TournamentStatus,
};
pub use pairing::PairingSummary;
pub use registration::{Registration, RegistrationId, RegistrationInput, RegistrationStats};
pub use repo::MemoryStore;
pub use results::MatchResultInput;
pub use standings::{OpponentHistoryEntry, PlayerStat};
