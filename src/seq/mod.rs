//! Sequence model — the in-memory representation a conversion run operates on.
//!
//! A [`Sequence`] owns the track list and the shared pool of controller
//! curves. Tracks reference curves by index; a curve has at most one semantic
//! owner. The model is built once from parsed input, mutated in place by the
//! pipeline stages (clock-base conversion, curve optimization, pitch-bend
//! refactoring), then consumed read-only by the encoder.

mod normalize;
mod optimize;
mod refactor;
mod source;
mod track;

use std::fmt;

pub use source::{ControllerEvent, ControllerKind, ControllerSource};
pub use track::{NoteEvent, NoteKind, NoteRemap, ParamKind, Track};

/// The target engine's fixed internal resolution.
pub const TARGET_TICKS_PER_QUARTER: u32 = 48;

/// The target engine addresses at most 16 track slots.
pub const MAX_TRACKS: usize = 16;

/// A structural defect in the model.
///
/// These are programming or data errors, not user input problems: any stage
/// that detects one aborts the whole conversion with no partial output.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    NoTracks,
    TooManyTracks(usize),
    /// A curve sample out of tick order, by source and sample index.
    UnsortedCurve(usize, usize),
    /// A note entry out of tick order, by track and entry index.
    UnsortedNotes(usize, usize),
    /// Two adjacent rests, by track and entry index of the second.
    AdjacentRests(usize, usize),
    /// A tick at or past the end of the piece.
    TickOutOfRange { tick: u32, total_ticks: u32 },
    /// A track's parameter slot references a missing source.
    BadSourceIndex { track: usize, source: usize },
    /// The sequence tempo slot references a missing source.
    BadTempoSource(usize),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NoTracks => write!(f, "sequence has no tracks"),
            ModelError::TooManyTracks(n) => {
                write!(f, "sequence has {n} tracks, the engine supports {MAX_TRACKS}")
            }
            ModelError::UnsortedCurve(source, index) => {
                write!(f, "source {source} sample {index} is out of tick order")
            }
            ModelError::UnsortedNotes(track, index) => {
                write!(f, "track {track} entry {index} is out of tick order")
            }
            ModelError::AdjacentRests(track, index) => {
                write!(f, "track {track} entry {index} is a rest following a rest")
            }
            ModelError::TickOutOfRange { tick, total_ticks } => {
                write!(f, "tick {tick} is past the end of the piece ({total_ticks})")
            }
            ModelError::BadSourceIndex { track, source } => {
                write!(f, "track {track} references missing source {source}")
            }
            ModelError::BadTempoSource(source) => {
                write!(f, "tempo slot references missing source {source}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// The complete musical model for one conversion run.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub tracks: Vec<Track>,
    pub sources: Vec<ControllerSource>,
    /// Source time resolution; fixed to [`TARGET_TICKS_PER_QUARTER`] after
    /// clock-base conversion and unused by the encoder beyond that point.
    pub ticks_per_quarter: u32,
    pub total_ticks: u32,
    /// Instrument bank of the target engine.
    pub bank: u8,
    /// Master volume in 0.0–1.0.
    pub volume: f32,
    /// Index of the tempo curve, if the piece has tempo changes.
    pub tempo_source: Option<usize>,
    /// Semitone span of a full pitch-bend excursion in the source material.
    pub fine_pitch_range: f32,
    /// Semitone span of a full vibrato excursion in the source material.
    pub vibrato_range: f32,
}

impl Sequence {
    pub fn new(ticks_per_quarter: u32, total_ticks: u32) -> Self {
        Self {
            tracks: Vec::new(),
            sources: Vec::new(),
            ticks_per_quarter,
            total_ticks,
            bank: 0,
            volume: 1.0,
            tempo_source: None,
            fine_pitch_range: 12.0,
            vibrato_range: 4.0,
        }
    }

    /// Append a constant curve and return its index, for override rules that
    /// pin a parameter to a fixed value.
    pub fn fixed_source(&mut self, value: f32) -> usize {
        self.sources.push(ControllerSource::fixed(value));
        self.sources.len() - 1
    }

    /// Index of the track named `name`.
    pub fn track_by_name(&self, name: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t.name == name)
    }

    /// Drop trailing curve samples at or past the end of the piece.
    pub fn trim_events(&mut self) {
        for source in &mut self.sources {
            while source
                .events
                .last()
                .is_some_and(|e| e.tick >= self.total_ticks)
            {
                source.events.pop();
            }
        }
    }

    /// Check the structural invariants the encoder relies on.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.tracks.is_empty() {
            return Err(ModelError::NoTracks);
        }
        if self.tracks.len() > MAX_TRACKS {
            return Err(ModelError::TooManyTracks(self.tracks.len()));
        }
        for (si, source) in self.sources.iter().enumerate() {
            for (i, event) in source.events.iter().enumerate() {
                if i > 0 && event.tick <= source.events[i - 1].tick {
                    return Err(ModelError::UnsortedCurve(si, i));
                }
                if event.tick >= self.total_ticks {
                    return Err(ModelError::TickOutOfRange {
                        tick: event.tick,
                        total_ticks: self.total_ticks,
                    });
                }
            }
        }
        for (ti, track) in self.tracks.iter().enumerate() {
            for (i, entry) in track.notes.iter().enumerate() {
                if i > 0 {
                    if entry.tick <= track.notes[i - 1].tick {
                        return Err(ModelError::UnsortedNotes(ti, i));
                    }
                    if entry.is_rest() && track.notes[i - 1].is_rest() {
                        return Err(ModelError::AdjacentRests(ti, i));
                    }
                }
                if entry.tick >= self.total_ticks {
                    return Err(ModelError::TickOutOfRange {
                        tick: entry.tick,
                        total_ticks: self.total_ticks,
                    });
                }
            }
            for param in [
                ParamKind::Echo,
                ParamKind::FinePitch,
                ParamKind::Pan,
                ParamKind::Vibrato,
                ParamKind::Volume,
            ] {
                if let Some(source) = track.bound(param) {
                    if source >= self.sources.len() {
                        return Err(ModelError::BadSourceIndex { track: ti, source });
                    }
                }
            }
        }
        if let Some(source) = self.tempo_source {
            if source >= self.sources.len() {
                return Err(ModelError::BadTempoSource(source));
            }
        }
        Ok(())
    }
}
