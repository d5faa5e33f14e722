//! Match result recording.

pub mod recorder;

pub use recorder::{MatchResultInput, MatchResultRecorder};
