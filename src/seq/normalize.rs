//! Clock-base conversion — rescaling the model to the engine's 48-tick base.
//!
//! Source material arrives at an arbitrary ticks-per-quarter resolution; the
//! target engine runs at a fixed 48. Every tick is scaled by `48/R` and
//! truncated, which can land two neighbors on the same tick. Strict
//! monotonicity is restored by dropping one of the pair: for curves the
//! sample with the longer surviving duration wins; for note timelines the
//! same rule applies except that audible content always beats silence.

use super::source::ControllerEvent;
use super::track::NoteEvent;
use super::{Sequence, TARGET_TICKS_PER_QUARTER};

impl Sequence {
    /// Rescale every curve and track in place, then fix the resolution to
    /// [`TARGET_TICKS_PER_QUARTER`]. Idempotent once the resolution is 48.
    pub fn convert_clock_base(&mut self) {
        let divisor = TARGET_TICKS_PER_QUARTER as f32 / self.ticks_per_quarter as f32;
        for source in &mut self.sources {
            rescale_curve(&mut source.events, divisor, self.total_ticks);
        }
        for track in &mut self.tracks {
            rescale_notes(&mut track.notes, divisor, self.total_ticks);
        }
        self.total_ticks = (self.total_ticks as f32 * divisor) as u32;
        self.ticks_per_quarter = TARGET_TICKS_PER_QUARTER;
    }
}

/// Scaled duration from `tick` to `next_tick`, truncated like the tick
/// positions themselves so collisions are judged in target units.
fn scaled_duration(tick: u32, next_tick: u32, divisor: f32) -> i64 {
    ((next_tick as i64 - tick as i64) as f32 * divisor) as i64
}

/// Rescale curve samples left to right, re-scanning after each removal.
///
/// `total_ticks` is the unscaled piece length; the last sample's duration is
/// measured against it rather than a following sample.
pub(super) fn rescale_curve(events: &mut Vec<ControllerEvent>, divisor: f32, total_ticks: u32) {
    let mut prev_duration = 0i64;
    let mut i = 0;
    while i < events.len() {
        let next_tick = if i + 1 < events.len() {
            events[i + 1].tick
        } else {
            total_ticks
        };
        let duration = scaled_duration(events[i].tick, next_tick, divisor);
        events[i].tick = (events[i].tick as f32 * divisor) as u32;
        if i > 0 && events[i].tick == events[i - 1].tick {
            if duration > prev_duration {
                events.remove(i - 1);
                prev_duration = duration;
            } else {
                events.remove(i);
            }
        } else {
            prev_duration = duration;
            i += 1;
        }
    }
}

/// Rescale a note timeline, with the audibility override on collisions:
/// a note landing on a preceding rest's tick always survives, and a rest
/// never displaces a preceding note.
pub(super) fn rescale_notes(notes: &mut Vec<NoteEvent>, divisor: f32, total_ticks: u32) {
    let mut prev_duration = 0i64;
    let mut i = 0;
    while i < notes.len() {
        let next_tick = if i + 1 < notes.len() {
            notes[i + 1].tick
        } else {
            total_ticks
        };
        let duration = scaled_duration(notes[i].tick, next_tick, divisor);
        notes[i].tick = (notes[i].tick as f32 * divisor) as u32;
        if i > 0 && notes[i].tick == notes[i - 1].tick {
            let keep_current = (duration > prev_duration
                || (notes[i].is_note() && notes[i - 1].is_rest()))
                && !(notes[i].is_rest() && notes[i - 1].is_note());
            if keep_current {
                notes.remove(i - 1);
                prev_duration = duration;
            } else {
                notes.remove(i);
            }
        } else {
            prev_duration = duration;
            i += 1;
        }
    }
}
