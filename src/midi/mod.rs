//! MIDI input — reading the source file and assembling the sequence model.

mod build;
mod load;
mod types;

pub use build::build;
pub use load::{load, parse, LoadError};
pub use types::{EventKind, ParsedSong, ParsedTrack, TimedEvent};
