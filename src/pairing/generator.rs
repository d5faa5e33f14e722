//! Round pairing generation.
//!
//! The Swiss path partitions the field into point groups and pairs greedily
//! within each group before sweeping leftovers across groups. Grouping first
//! shrinks the candidate scan from O(n^2) over the whole field to O(sum of
//! g_i^2) over group sizes, while keeping the Swiss property that players on
//! equal points meet preferentially.

use std::collections::HashSet;
use std::sync::Arc;

use log::{info, warn};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::lifecycle::machine::LifecycleManager;
use crate::lifecycle::models::{
    Match, Phase, PhaseType, PlayerId, Round, RoundId, TournamentId, TournamentStatus,
};
use crate::ports::{ActorId, AuditEvent, EventSink};
use crate::registration::ledger::RegistrationLedger;
use crate::repo::{MatchRepo, PlayerStatRepo, RoundRepo, StorageError, TournamentRepo};
use crate::standings::calculator::StandingsCalculator;

/// One ranked entrant as the pairing algorithms see it.
#[derive(Clone, Copy, Debug)]
pub struct SwissEntry {
    pub player: PlayerId,
    pub match_points: u32,
    pub opp_match_win_pct: f64,
    pub has_received_bye: bool,
}

/// One produced pairing; `player_b = None` is a bye.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pairing {
    pub player_a: PlayerId,
    pub player_b: Option<PlayerId>,
}

/// Audit-worthy incidents the pure pairing pass records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PairingNote {
    ForcedRematch { player: PlayerId, opponent: PlayerId },
    MultipleBye { player: PlayerId },
}

/// Unordered played-pair set keyed on the normalized id pair.
pub type PlayedPairs = HashSet<(PlayerId, PlayerId)>;

fn pair_key(a: PlayerId, b: PlayerId) -> (PlayerId, PlayerId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Whether two players share match history.
pub fn have_played(played: &PlayedPairs, a: PlayerId, b: PlayerId) -> bool {
    played.contains(&pair_key(a, b))
}

/// Pair a pool greedily: each unpaired player first scans forward for an
/// opponent they have not played; failing that they take the first available
/// opponent and a forced-rematch note is recorded.
fn pair_pool(
    pool: &mut Vec<SwissEntry>,
    played: &PlayedPairs,
    pairings: &mut Vec<Pairing>,
    notes: &mut Vec<PairingNote>,
) {
    while pool.len() >= 2 {
        let first = pool.remove(0);
        let fresh = pool
            .iter()
            .position(|candidate| !have_played(played, first.player, candidate.player));
        let (opponent, rematch) = match fresh {
            Some(index) => (pool.remove(index), false),
            None => (pool.remove(0), true),
        };
        if rematch {
            notes.push(PairingNote::ForcedRematch {
                player: first.player,
                opponent: opponent.player,
            });
        }
        pairings.push(Pairing {
            player_a: first.player,
            player_b: Some(opponent.player),
        });
    }
}

/// Swiss pairings for a ranked field (best first: points desc, then OMW%).
///
/// Odd fields pick the bye recipient before pairing, walking the ranking
/// from the bottom for the first player without a prior bye; if everyone has
/// one, the bottom-ranked player takes a repeat bye and a note is recorded.
/// The remaining even field is paired per point group, highest group first,
/// and leftovers from odd-sized groups are paired across groups with the
/// same two-pass policy. The bye pairing is appended last.
pub fn swiss_pairings(entries: &[SwissEntry], played: &PlayedPairs) -> (Vec<Pairing>, Vec<PairingNote>) {
    let mut pairings = Vec::with_capacity(entries.len() / 2 + 1);
    let mut notes = Vec::new();
    let mut field: Vec<SwissEntry> = entries.to_vec();

    let bye_recipient = if field.len() % 2 == 1 {
        let index = match field.iter().rposition(|entry| !entry.has_received_bye) {
            Some(index) => index,
            None => {
                let index = field.len() - 1;
                notes.push(PairingNote::MultipleBye {
                    player: field[index].player,
                });
                index
            }
        };
        Some(field.remove(index))
    } else {
        None
    };

    // Point groups are runs of equal points in the ranked field.
    let mut carry: Vec<SwissEntry> = Vec::new();
    let mut cursor = 0;
    while cursor < field.len() {
        let points = field[cursor].match_points;
        let mut end = cursor;
        while end < field.len() && field[end].match_points == points {
            end += 1;
        }
        let mut group: Vec<SwissEntry> = field[cursor..end].to_vec();
        pair_pool(&mut group, played, &mut pairings, &mut notes);
        carry.extend(group);
        cursor = end;
    }

    // Odd groups each leave one player; sweep them across groups in rank
    // order with the same unplayed-first policy.
    pair_pool(&mut carry, played, &mut pairings, &mut notes);
    debug_assert!(carry.is_empty());

    if let Some(entry) = bye_recipient {
        pairings.push(Pairing {
            player_a: entry.player,
            player_b: None,
        });
    }

    (pairings, notes)
}

/// Seeded single-elimination pairings: rank `i` meets rank `n-1-i`. An odd
/// field leaves the middle seed with a placeholder bye.
pub fn single_elimination_pairings(entries: &[SwissEntry]) -> Vec<Pairing> {
    let n = entries.len();
    let mut pairings = Vec::with_capacity(n / 2 + 1);
    for i in 0..n / 2 {
        pairings.push(Pairing {
            player_a: entries[i].player,
            player_b: Some(entries[n - 1 - i].player),
        });
    }
    if n % 2 == 1 {
        pairings.push(Pairing {
            player_a: entries[n / 2].player,
            player_b: None,
        });
    }
    pairings
}

/// Uniform random pairings for formats without a dedicated algorithm.
pub fn shuffle_pairings(players: &[PlayerId]) -> Vec<Pairing> {
    let mut shuffled = players.to_vec();
    shuffled.shuffle(&mut rand::rng());
    let mut pairings = Vec::with_capacity(shuffled.len() / 2 + 1);
    let mut chunks = shuffled.chunks_exact(2);
    for chunk in &mut chunks {
        pairings.push(Pairing {
            player_a: chunk[0],
            player_b: Some(chunk[1]),
        });
    }
    if let [trailing] = chunks.remainder() {
        pairings.push(Pairing {
            player_a: *trailing,
            player_b: None,
        });
    }
    pairings
}

/// Outcome of a pairing generation call.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct PairingSummary {
    pub round_id: RoundId,
    pub round_number: u32,
    pub match_count: u32,
    pub bye_count: u32,
}

/// Builds a round of pairings from the checked-in field and standings.
#[derive(Clone)]
pub struct PairingGenerator {
    tournaments: Arc<dyn TournamentRepo>,
    ledger: RegistrationLedger,
    rounds: Arc<dyn RoundRepo>,
    matches: Arc<dyn MatchRepo>,
    stats: Arc<dyn PlayerStatRepo>,
    events: Arc<dyn EventSink>,
    lifecycle: LifecycleManager,
    calculator: StandingsCalculator,
    config: EngineConfig,
}

impl PairingGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tournaments: Arc<dyn TournamentRepo>,
        ledger: RegistrationLedger,
        rounds: Arc<dyn RoundRepo>,
        matches: Arc<dyn MatchRepo>,
        stats: Arc<dyn PlayerStatRepo>,
        events: Arc<dyn EventSink>,
        lifecycle: LifecycleManager,
        calculator: StandingsCalculator,
        config: EngineConfig,
    ) -> Self {
        Self {
            tournaments,
            ledger,
            rounds,
            matches,
            stats,
            events,
            lifecycle,
            calculator,
            config,
        }
    }

    /// Generate the next (or an explicitly numbered) round of pairings.
    pub async fn generate(
        &self,
        actor: Option<ActorId>,
        tournament_id: TournamentId,
        round_number: Option<u32>,
    ) -> EngineResult<PairingSummary> {
        let tournament = self
            .tournaments
            .get(tournament_id)
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;
        if !matches!(
            tournament.status,
            TournamentStatus::Upcoming | TournamentStatus::Active
        ) {
            return Err(EngineError::InvalidTransition {
                entity: "tournament",
                state: tournament.status.as_str().to_string(),
                action: "pair",
            });
        }

        let eligible = self.ledger.eligible_players(tournament_id).await?;
        if eligible.len() < 2 {
            return Err(EngineError::InsufficientPlayers {
                needed: 2,
                current: eligible.len(),
            });
        }

        let phase = match self.rounds.active_phase(tournament_id).await? {
            Some(phase) => phase,
            None => {
                let phase = Phase::new(
                    tournament_id,
                    1,
                    PhaseType::Swiss,
                    EngineConfig::planned_rounds(eligible.len()),
                );
                self.rounds.insert_phase(phase.clone()).await?;
                phase
            }
        };

        let round_number = match round_number {
            Some(explicit) => explicit,
            None => self.rounds.count_rounds(phase.id).await? + 1,
        };
        // The unique (phase, round_number) key is what serializes concurrent
        // generation calls for the same round.
        let round = Round::new(phase.id, round_number);
        match self.rounds.insert_round(round.clone()).await {
            Ok(()) => {}
            Err(StorageError::Duplicate(_)) => {
                return Err(EngineError::DuplicateRound { round_number });
            }
            Err(err) => return Err(err.into()),
        }

        // Re-read after taking the round slot: a pause or cancel may have
        // landed since the entry check. The fresh round is the only write so
        // far, so backing out is a single delete.
        let tournament = self
            .tournaments
            .get(tournament_id)
            .await?
            .ok_or(EngineError::NotFound("tournament"))?;
        match tournament.status {
            TournamentStatus::Active => {}
            TournamentStatus::Upcoming => {
                if let Err(err) = self
                    .lifecycle
                    .transition_tournament(actor, tournament_id, TournamentStatus::Active)
                    .await
                {
                    self.rounds.delete_round(round.id).await?;
                    return Err(err);
                }
            }
            other => {
                self.rounds.delete_round(round.id).await?;
                return Err(EngineError::InvalidTransition {
                    entity: "tournament",
                    state: other.as_str().to_string(),
                    action: "pair",
                });
            }
        }

        let (pairings, notes) = self.build_pairings(tournament_id, &eligible, phase.phase_type).await?;

        let mut match_count = 0;
        let mut bye_count = 0;
        for (index, pairing) in pairings.iter().enumerate() {
            let table_number = index as u32 + 1;
            let game_match = match pairing.player_b {
                Some(player_b) => Match::pairing(
                    &round,
                    tournament_id,
                    table_number,
                    pairing.player_a,
                    player_b,
                ),
                None => {
                    bye_count += 1;
                    Match::bye(
                        &round,
                        tournament_id,
                        table_number,
                        pairing.player_a,
                        self.config.win_points,
                        self.config.bye_game_wins,
                        self.config.bye_game_losses,
                    )
                }
            };
            self.matches.insert(game_match).await?;
            match_count += 1;
        }

        for note in notes {
            let event = match note {
                PairingNote::ForcedRematch { player, opponent } => {
                    warn!("tournament {tournament_id} round {round_number}: forced rematch");
                    AuditEvent::PairingForcedRematch {
                        round_number,
                        player,
                        opponent,
                    }
                }
                PairingNote::MultipleBye { player } => {
                    warn!("tournament {tournament_id} round {round_number}: repeat bye");
                    AuditEvent::PairingMultipleBye {
                        round_number,
                        player,
                    }
                }
            };
            self.events.log_event(tournament_id, event, actor).await;
        }

        self.lifecycle
            .activate_round(actor, tournament_id, &round)
            .await?;

        self.tournaments
            .set_round_state(tournament_id, round_number, phase.id)
            .await?;
        let mut phase = phase;
        phase.current_round = round_number;
        self.rounds.update_phase(phase).await?;

        // Byes are born completed, so they count toward standings right away.
        if bye_count > 0 {
            self.calculator.recompute(tournament_id).await?;
        }

        info!(
            "tournament {tournament_id} round {round_number}: {match_count} matches ({bye_count} byes)"
        );
        Ok(PairingSummary {
            round_id: round.id,
            round_number,
            match_count,
            bye_count,
        })
    }

    async fn build_pairings(
        &self,
        tournament_id: TournamentId,
        eligible: &[PlayerId],
        phase_type: PhaseType,
    ) -> EngineResult<(Vec<Pairing>, Vec<PairingNote>)> {
        let entries = self.ranked_entries(tournament_id, eligible).await?;
        Ok(match phase_type {
            PhaseType::Swiss => {
                let history = self.stats.list_history(tournament_id).await?;
                let played: PlayedPairs = history
                    .iter()
                    .map(|entry| pair_key(entry.player_id, entry.opponent_id))
                    .collect();
                swiss_pairings(&entries, &played)
            }
            PhaseType::SingleElimination => (single_elimination_pairings(&entries), Vec::new()),
            PhaseType::Other => (shuffle_pairings(eligible), Vec::new()),
        })
    }

    /// Eligible players in standings order, zero rows for the unplayed.
    async fn ranked_entries(
        &self,
        tournament_id: TournamentId,
        eligible: &[PlayerId],
    ) -> EngineResult<Vec<SwissEntry>> {
        let stats = self.stats.list(tournament_id).await?;
        let mut entries: Vec<SwissEntry> = eligible
            .iter()
            .map(|player| {
                stats
                    .iter()
                    .find(|stat| stat.player_id == *player)
                    .map(|stat| SwissEntry {
                        player: *player,
                        match_points: stat.match_points,
                        opp_match_win_pct: stat.opp_match_win_pct,
                        has_received_bye: stat.has_received_bye,
                    })
                    .unwrap_or(SwissEntry {
                        player: *player,
                        match_points: 0,
                        opp_match_win_pct: 0.0,
                        has_received_bye: false,
                    })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.match_points
                .cmp(&a.match_points)
                .then_with(|| b.opp_match_win_pct.total_cmp(&a.opp_match_win_pct))
                .then_with(|| a.player.cmp(&b.player))
        });
        Ok(entries)
    }
}
