//! DMX512 signal recovery from oversampled line captures.
//!
//! The decoder follows a layered structure:
//! - `timing`: sample-count windows for the 2 MHz capture clock (source of
//!   truth)
//! - `edges`: single-transition byte predicates (noise rejection)
//! - `parser`: the framing state machine
//!
//! There is no error module here: a serial receiver that loses lock on a
//! noisy line simply waits for the next break, so every malformed region
//! resynchronises silently instead of surfacing an error.

mod edges;
mod parser;
pub mod timing;

pub use parser::{FrameCallback, SpiDmxParser};
