//! Cadenza — a MIDI to Nintendo 64 audio sequence (.m64) converter.

pub mod encode;
pub mod midi;
pub mod overrides;
pub mod seq;
