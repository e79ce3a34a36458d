//! Curve optimization — dropping samples that cannot be heard.
//!
//! A controller curve bound to a track carries information only while that
//! track is sounding. Two reductions run in order: silence masking (within a
//! silent region only the sample in effect when sound resumes matters) and
//! flat-run collapse (a sample equal to its predecessor changes nothing).
//! Both are value-preserving under step-hold re-expansion, and the whole
//! pass is idempotent.

use super::source::ControllerEvent;
use super::track::NoteEvent;
use super::{ParamKind, Sequence};

impl Sequence {
    /// Reduce every bound (track, source) pair, slots in fixed order.
    pub fn optimize_all(&mut self) {
        for ti in 0..self.tracks.len() {
            for param in [
                ParamKind::Echo,
                ParamKind::FinePitch,
                ParamKind::Pan,
                ParamKind::Vibrato,
                ParamKind::Volume,
            ] {
                if let Some(si) = self.tracks[ti].bound(param) {
                    let track = &self.tracks[ti];
                    reduce(&track.notes, &mut self.sources[si].events);
                }
            }
        }
    }
}

/// Drop masked and redundant samples from one curve, against one timeline.
pub(super) fn reduce(notes: &[NoteEvent], events: &mut Vec<ControllerEvent>) {
    if notes.is_empty() || events.is_empty() {
        return;
    }

    // Silence masking. `active` walks the timeline entry sounding at each
    // sample; when consecutive samples both fall in silence (or the later one
    // lands exactly on a note onset), the earlier sample is unheard.
    let mut active = 0;
    let mut last_was_rest = false;
    let mut cur = 0;
    while cur < events.len() {
        while active + 1 < notes.len() && notes[active + 1].tick <= events[cur].tick {
            active += 1;
        }
        let masked = notes[active].is_rest()
            || (notes[active].tick == events[cur].tick && notes[active].is_note());
        if masked && last_was_rest {
            events.remove(cur - 1);
        } else {
            cur += 1;
        }
        last_was_rest = notes[active].is_rest();
    }

    // Nothing sounds after the final rest begins, so a sample at or past it
    // is dead weight.
    if let Some(last_entry) = notes.last() {
        if last_entry.is_rest() && events.last().is_some_and(|e| e.tick >= last_entry.tick) {
            events.pop();
        }
    }

    // Flat-run collapse: only value changes must survive.
    if events.is_empty() {
        return;
    }
    let mut last_value = events[0].value;
    let mut cur = 1;
    while cur < events.len() {
        if events[cur].value == last_value {
            events.remove(cur);
        } else {
            last_value = events[cur].value;
            cur += 1;
        }
    }
}
