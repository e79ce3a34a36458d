//! Input contract — the parsed, time-linearized event stream the codec consumes.
//!
//! Ticks are absolute (not delta), note-ons carry their linked release tick,
//! and tracks arrive in file order. The loader produces this from a Standard
//! MIDI File; the builder turns it into the sequence model.

/// A whole parsed song.
#[derive(Debug, Clone)]
pub struct ParsedSong {
    /// Source resolution in ticks per quarter note.
    pub ticks_per_quarter: u32,
    /// Highest tick reached by any event in any track.
    pub total_ticks: u32,
    pub tracks: Vec<ParsedTrack>,
}

/// One source track: an ordered run of absolute-tick events.
#[derive(Debug, Clone, Default)]
pub struct ParsedTrack {
    pub events: Vec<TimedEvent>,
}

/// An event at an absolute tick position.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub tick: u32,
    pub kind: EventKind,
}

/// The event kinds the conversion cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A sounding note with its linked release tick.
    Note { key: u8, velocity: u8, off_tick: u32 },
    /// A control change (7-bit controller number and value).
    Controller { number: u8, value: u8 },
    /// A 14-bit pitch-bend value, 8192 at center.
    PitchBend { value: u16 },
    /// A tempo change in microseconds per quarter note.
    Tempo { us_per_quarter: u32 },
    /// The track's name.
    TrackName(String),
    /// The end-of-track marker.
    EndOfTrack,
}
