//! orchard-replay: consumer-side decoding of the orchard event stream.
//!
//! A visualizer replays the engine's stdout after (or while) a run
//! executes. This crate is that consumer's parsing and accounting layer:
//! defensive line splitting, state-text decoding back into the engine's
//! typed states, and run-level bookkeeping with the conservation checks a
//! complete stream must satisfy. Malformed input is discarded, never
//! fatal; a consumer must not be able to crash on a corrupt line.

mod parse;
mod tally;

pub use parse::{parse_state, split_row};
pub use tally::{Replay, ReplayError, RunSummary};
