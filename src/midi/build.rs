//! Model construction — assembling a [`Sequence`] from the parsed stream.
//!
//! Each source track is scanned once: notes become the track's timeline with
//! rests filling the gaps between linked note spans, and controller/bend/
//! tempo events become per-track curves in a small registry keyed by kind.
//! Tracks without notes contribute their curves but no track entry.

use crate::seq::{ControllerKind, ControllerSource, ParamKind, Sequence, Track};

use super::types::{EventKind, ParsedSong};

/// Build the sequence model from a parsed song.
pub fn build(song: &ParsedSong) -> Sequence {
    let mut seq = Sequence::new(song.ticks_per_quarter, song.total_ticks);

    for parsed in &song.tracks {
        let mut track = Track::new("");
        let mut locals: Vec<ControllerSource> = Vec::new();
        let mut last_note_end = 0;

        for event in &parsed.events {
            match &event.kind {
                EventKind::Note {
                    key,
                    velocity,
                    off_tick,
                } => {
                    if event.tick > last_note_end {
                        track.push_rest(last_note_end);
                    }
                    last_note_end = *off_tick;
                    track.push_note(event.tick, *key, *velocity as f32 / 127.0);
                }
                EventKind::PitchBend { value } if event.tick < song.total_ticks => {
                    let slot = source_slot(&mut locals, ControllerKind::FinePitch);
                    locals[slot].push(event.tick, *value as f32 / 16383.0);
                }
                EventKind::Controller { number, value } if event.tick < song.total_ticks => {
                    let kind = match number {
                        7 => ControllerKind::Volume,
                        10 => ControllerKind::Pan,
                        n => ControllerKind::Unknown(*n),
                    };
                    let slot = source_slot(&mut locals, kind);
                    locals[slot].push(event.tick, *value as f32 / 127.0);
                }
                EventKind::Tempo { us_per_quarter } if event.tick < song.total_ticks => {
                    let bpm = (60_000_000.0 / *us_per_quarter as f32 + 0.5) as u32;
                    let slot = source_slot(&mut locals, ControllerKind::Tempo);
                    locals[slot].push(event.tick, bpm as f32 / 255.0);
                }
                EventKind::TrackName(name) => track.name = name.clone(),
                EventKind::EndOfTrack => {
                    if !track.notes.is_empty() && event.tick > last_note_end {
                        track.push_rest(last_note_end);
                    }
                }
                // events at or past the end of the piece carry no information
                _ => {}
            }
        }

        let first_new = seq.sources.len();
        seq.sources.extend(locals);
        if !track.notes.is_empty() {
            // bind the curves discovered in this track's own scan
            for si in first_new..seq.sources.len() {
                match seq.sources[si].kind {
                    ControllerKind::FinePitch => track.fine_pitch_source = Some(si),
                    ControllerKind::Pan => track.pan_source = Some(si),
                    ControllerKind::Volume => track.volume_source = Some(si),
                    _ => {}
                }
            }
            track.instrument = seq.tracks.len() as u8;
            seq.tracks.push(track);
        }
    }

    seq.tempo_source = seq
        .sources
        .iter()
        .position(|s| s.kind == ControllerKind::Tempo);

    for ti in 0..seq.tracks.len() {
        for param in [
            ParamKind::Echo,
            ParamKind::FinePitch,
            ParamKind::Pan,
            ParamKind::Vibrato,
            ParamKind::Volume,
        ] {
            if let Some(si) = seq.tracks[ti].bound(param) {
                seq.sources[si].owner_track = Some(ti);
            }
        }
    }
    seq
}

/// Registry lookup: the slot for `kind`, created on first use.
fn source_slot(locals: &mut Vec<ControllerSource>, kind: ControllerKind) -> usize {
    match locals.iter().position(|s| s.kind == kind) {
        Some(slot) => slot,
        None => {
            locals.push(ControllerSource::new(kind));
            locals.len() - 1
        }
    }
}
