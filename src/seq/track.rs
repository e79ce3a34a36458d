//! Tracks — the per-voice note/rest timeline and its parameter bindings.
//!
//! A [`Track`] holds a time-ordered run of notes and rests plus up to five
//! optional bindings into the sequence's shared controller-source list.
//! Durations are implicit: each entry lasts until the next entry's tick (or
//! the end of the piece for the last one).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// What a timeline entry sounds: a pitched note or silence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteKind {
    Note {
        /// MIDI note number (0–127).
        pitch: u8,
        /// Velocity in 0.0–1.0.
        velocity: f32,
    },
    Rest,
}

/// A single entry on a track's timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// Absolute position in ticks.
    pub tick: u32,
    pub kind: NoteKind,
}

impl NoteEvent {
    /// Create a note entry.
    pub fn note(tick: u32, pitch: u8, velocity: f32) -> Self {
        Self {
            tick,
            kind: NoteKind::Note { pitch, velocity },
        }
    }

    /// Create a rest entry.
    pub fn rest(tick: u32) -> Self {
        Self {
            tick,
            kind: NoteKind::Rest,
        }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, NoteKind::Rest)
    }

    pub fn is_note(&self) -> bool {
        matches!(self.kind, NoteKind::Note { .. })
    }
}

/// The five per-track parameter slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamKind {
    Echo,
    FinePitch,
    Pan,
    Vibrato,
    Volume,
}

/// Explicit note remapping with identity fallback.
///
/// Pitches without an entry map to themselves, so a remap only needs to list
/// the notes it actually moves (e.g. drum keys onto percussion-bank slots).
#[derive(Debug, Clone, Default)]
pub struct NoteRemap {
    mapping: HashMap<u8, u8>,
}

impl NoteRemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `from` onto `to`.
    pub fn set(&mut self, from: u8, to: u8) {
        self.mapping.insert(from, to);
    }

    /// Remapped value for `pitch`, or `pitch` itself when unmapped.
    pub fn get(&self, pitch: u8) -> u8 {
        self.mapping.get(&pitch).copied().unwrap_or(pitch)
    }
}

impl From<HashMap<u8, u8>> for NoteRemap {
    fn from(mapping: HashMap<u8, u8>) -> Self {
        Self { mapping }
    }
}

/// One voice of the sequence.
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub name: String,
    /// Instrument slot in the target bank.
    pub instrument: u8,
    /// Time-ordered notes and rests. No two adjacent entries are rests.
    pub notes: Vec<NoteEvent>,
    /// Applied to every note velocity at encode time.
    pub velocity_multiplier: f32,
    pub echo_source: Option<usize>,
    pub fine_pitch_source: Option<usize>,
    pub pan_source: Option<usize>,
    pub vibrato_source: Option<usize>,
    pub volume_source: Option<usize>,
    /// Encode pitches directly instead of through the movable group window.
    pub direct_pitch: bool,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            velocity_multiplier: 1.0,
            ..Self::default()
        }
    }

    /// Append a note entry.
    pub fn push_note(&mut self, tick: u32, pitch: u8, velocity: f32) {
        self.notes.push(NoteEvent::note(tick, pitch, velocity));
    }

    /// Append a rest, coalescing with a trailing rest.
    ///
    /// Rest/rest adjacency is forbidden by the model invariants; a rest
    /// following a rest adds no information and is dropped here.
    pub fn push_rest(&mut self, tick: u32) {
        if self.notes.last().is_some_and(NoteEvent::is_rest) {
            return;
        }
        self.notes.push(NoteEvent::rest(tick));
    }

    /// Source bound to the given parameter slot.
    pub fn bound(&self, param: ParamKind) -> Option<usize> {
        match param {
            ParamKind::Echo => self.echo_source,
            ParamKind::FinePitch => self.fine_pitch_source,
            ParamKind::Pan => self.pan_source,
            ParamKind::Vibrato => self.vibrato_source,
            ParamKind::Volume => self.volume_source,
        }
    }

    /// Bind (or unbind) a parameter slot.
    pub fn bind(&mut self, param: ParamKind, source: Option<usize>) {
        let slot = match param {
            ParamKind::Echo => &mut self.echo_source,
            ParamKind::FinePitch => &mut self.fine_pitch_source,
            ParamKind::Pan => &mut self.pan_source,
            ParamKind::Vibrato => &mut self.vibrato_source,
            ParamKind::Volume => &mut self.volume_source,
        };
        *slot = source;
    }

    /// Rewrite every note pitch through `map` and switch the track to direct
    /// pitch encoding (remapped values address engine slots, not semitones).
    pub fn remap(&mut self, map: &NoteRemap) {
        for entry in &mut self.notes {
            if let NoteKind::Note { pitch, .. } = &mut entry.kind {
                *pitch = map.get(*pitch);
            }
        }
        self.direct_pitch = true;
    }
}
