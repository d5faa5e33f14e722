//! Round pairing generation.

pub mod generator;

pub use generator::{
    Pairing, PairingGenerator, PairingNote, PairingSummary, PlayedPairs, SwissEntry, have_played,
    shuffle_pairings, single_elimination_pairings, swiss_pairings,
};
