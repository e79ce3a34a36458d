//! Pitch-bend refactoring — trading wide bends for note transpositions.
//!
//! The target engine resolves fine pitch within one octave either way; a
//! bend past that has to be realized by transposing the note itself. When a
//! note's curve leaves the ±12-semitone window, the nearest whole-octave
//! offset is moved into the note (transposing it in place when the deviation
//! is already there at onset, splitting it otherwise) and the curve is
//! lowered by the same amount for the rest of the note's span, so the
//! residual bend stays encodable.

use super::source::ControllerEvent;
use super::track::{NoteEvent, NoteKind};
use super::Sequence;

impl Sequence {
    /// Apply the rewrite to every track with a bound fine-pitch curve.
    pub fn refactor_pitch_bends(&mut self) {
        let range = self.fine_pitch_range;
        let total_ticks = self.total_ticks;
        for ti in 0..self.tracks.len() {
            if let Some(si) = self.tracks[ti].fine_pitch_source {
                wide_bends(
                    &mut self.tracks[ti].notes,
                    &mut self.sources[si].events,
                    range,
                    total_ticks,
                );
            }
        }
    }
}

/// Whole-octave offset (in semitones, signed) that brings `shift` back into
/// the ±12 window.
fn octave_offset(shift: f32) -> i32 {
    let magnitude = (((shift.abs() - 1.0).ceil() / 12.0) + 0.5).floor() * 12.0;
    if shift < 0.0 {
        -magnitude as i32
    } else {
        magnitude as i32
    }
}

/// Rewrite one track's notes and fine-pitch curve in lock-step.
///
/// `range` is the semitone span of a full-scale curve excursion; a sample
/// value `v` means a deviation of `(2v-1)*range` semitones.
pub(super) fn wide_bends(
    notes: &mut Vec<NoteEvent>,
    events: &mut Vec<ControllerEvent>,
    range: f32,
    total_ticks: u32,
) {
    if notes.is_empty() || events.is_empty() {
        return;
    }
    let mut j = 0;
    let mut i = 0;
    while i < notes.len() {
        let NoteKind::Note { pitch, velocity } = notes[i].kind else {
            i += 1;
            continue;
        };
        let onset = notes[i].tick;
        let span_end = notes.get(i + 1).map_or(total_ticks, |n| n.tick);

        // The sample in effect at onset governs the note's starting pitch.
        while j + 1 < events.len() && events[j + 1].tick <= onset {
            j += 1;
        }

        let mut chain_pitch = pitch;
        let mut chain_len = 1;
        let mut idx = j;
        while idx < events.len() && events[idx].tick < span_end {
            let shift = (events[idx].value * 2.0 - 1.0) * range;
            if shift.abs() > 12.0 {
                let offset = octave_offset(shift);
                chain_pitch = (chain_pitch as i32 + offset) as u8;
                if events[idx].tick <= onset {
                    if let NoteKind::Note { pitch, .. } = &mut notes[i + chain_len - 1].kind {
                        *pitch = chain_pitch;
                    }
                } else {
                    notes.insert(
                        i + chain_len,
                        NoteEvent::note(events[idx].tick, chain_pitch, velocity),
                    );
                    chain_len += 1;
                }
                if events[idx].tick < onset {
                    // The deviation predates the note; synthesize a sample at
                    // onset so the reduction below starts there and the
                    // original sample keeps governing earlier material.
                    let value = events[idx].value;
                    events.insert(idx + 1, ControllerEvent::new(onset, value));
                    idx += 1;
                }
                let adjust = offset as f32 / range * 0.5;
                let mut a = idx;
                while a < events.len() && events[a].tick < span_end {
                    events[a].value -= adjust;
                    a += 1;
                }
            }
            idx += 1;
        }
        if idx > j {
            j = idx - 1;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn deviation_value(semitones: f32, range: f32) -> f32 {
        (semitones / range + 1.0) / 2.0
    }

    fn pitches(notes: &[NoteEvent]) -> Vec<u8> {
        notes
            .iter()
            .filter_map(|n| match n.kind {
                NoteKind::Note { pitch, .. } => Some(pitch),
                NoteKind::Rest => None,
            })
            .collect()
    }

    #[test]
    fn octave_offset_rounds_to_whole_octaves() {
        assert_eq!(octave_offset(18.0), 12);
        assert_eq!(octave_offset(-18.0), -12);
        assert_eq!(octave_offset(13.0), 12);
        assert_eq!(octave_offset(25.0), 24);
        assert_eq!(octave_offset(-25.0), -24);
    }

    #[test]
    fn mid_note_deviation_splits_the_note() {
        let range = 48.0;
        let mut notes = vec![NoteEvent::note(0, 60, 0.9)];
        let mut events = vec![
            ControllerEvent::new(0, deviation_value(0.0, range)),
            ControllerEvent::new(40, deviation_value(18.0, range)),
        ];
        wide_bends(&mut notes, &mut events, range, 96);

        assert_eq!(notes.len(), 2);
        assert_eq!(pitches(&notes), vec![60, 72]);
        assert_eq!(notes[1].tick, 40);
        match notes[1].kind {
            NoteKind::Note { velocity, .. } => assert_approx_eq!(velocity, 0.9),
            NoteKind::Rest => panic!("expected a note"),
        }
        // the split sample is lowered by 12/range*0.5
        assert_approx_eq!(
            events[1].value,
            deviation_value(18.0, range) - 12.0 / range * 0.5
        );
        // residual deviation is back inside one octave
        assert_approx_eq!((events[1].value * 2.0 - 1.0) * range, 6.0);
        // the onset sample is untouched
        assert_approx_eq!(events[0].value, deviation_value(0.0, range));
    }

    #[test]
    fn onset_deviation_transposes_in_place() {
        let range = 48.0;
        let mut notes = vec![NoteEvent::note(0, 60, 1.0)];
        let mut events = vec![ControllerEvent::new(0, deviation_value(18.0, range))];
        wide_bends(&mut notes, &mut events, range, 96);

        assert_eq!(notes.len(), 1);
        assert_eq!(pitches(&notes), vec![72]);
        assert_approx_eq!((events[0].value * 2.0 - 1.0) * range, 6.0);
    }

    #[test]
    fn deviation_before_onset_synthesizes_an_onset_sample() {
        let range = 48.0;
        let mut notes = vec![NoteEvent::rest(0), NoteEvent::note(20, 60, 1.0)];
        let mut events = vec![ControllerEvent::new(5, deviation_value(-18.0, range))];
        wide_bends(&mut notes, &mut events, range, 96);

        assert_eq!(pitches(&notes), vec![48]);
        assert_eq!(events.len(), 2);
        // original sample keeps its value for the material before the note
        assert_approx_eq!(events[0].value, deviation_value(-18.0, range));
        assert_eq!(events[1].tick, 20);
        assert_approx_eq!((events[1].value * 2.0 - 1.0) * range, -6.0);
    }

    #[test]
    fn in_range_bends_are_left_alone() {
        let range = 12.0;
        let mut notes = vec![NoteEvent::note(0, 60, 1.0)];
        let mut events = vec![
            ControllerEvent::new(0, 0.5),
            ControllerEvent::new(10, 1.0), // +12: at the limit, not past it
        ];
        let before = events.clone();
        wide_bends(&mut notes, &mut events, range, 96);
        assert_eq!(events, before);
        assert_eq!(pitches(&notes), vec![60]);
    }

    #[test]
    fn ordering_invariants_hold_after_split() {
        let range = 48.0;
        let mut notes = vec![
            NoteEvent::note(0, 60, 1.0),
            NoteEvent::rest(50),
            NoteEvent::note(60, 64, 1.0),
        ];
        let mut events = vec![
            ControllerEvent::new(0, deviation_value(0.0, range)),
            ControllerEvent::new(20, deviation_value(15.0, range)),
            ControllerEvent::new(40, deviation_value(30.0, range)),
        ];
        wide_bends(&mut notes, &mut events, range, 96);

        for pair in notes.windows(2) {
            assert!(pair[0].tick < pair[1].tick);
            assert!(!(pair[0].is_rest() && pair[1].is_rest()));
        }
        for pair in events.windows(2) {
            assert!(pair[0].tick < pair[1].tick);
        }
    }

    #[test]
    fn deviation_past_the_span_belongs_to_the_next_note() {
        let range = 48.0;
        let mut notes = vec![NoteEvent::note(0, 60, 1.0), NoteEvent::note(30, 62, 1.0)];
        let mut events = vec![
            ControllerEvent::new(0, deviation_value(0.0, range)),
            ControllerEvent::new(30, deviation_value(18.0, range)),
        ];
        wide_bends(&mut notes, &mut events, range, 96);

        // the first note is untouched; the second starts transposed
        assert_eq!(pitches(&notes), vec![60, 74]);
        assert_eq!(notes.len(), 2);
    }
}
