//! Player registration and the capacity ledger.

pub mod ledger;
pub mod models;

pub use ledger::RegistrationLedger;
pub use models::{
    Registration, RegistrationId, RegistrationInput, RegistrationStats, RegistrationStatus,
};
