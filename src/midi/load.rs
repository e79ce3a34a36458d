//! SMF reading — delta-to-absolute conversion and note-pair linking.
//!
//! Thin shim over `midly`: walks each track accumulating absolute ticks,
//! links every note-on to its release (a note-on at velocity zero counts as
//! a release), and keeps only the event kinds the conversion consumes.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

use super::types::{EventKind, ParsedSong, ParsedTrack, TimedEvent};

/// A problem with the source file.
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    /// The file is not a well-formed Standard MIDI File.
    Malformed(String),
    /// SMPTE-timecode files have no tick resolution to rescale from.
    UnsupportedTiming,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "cannot read file: {e}"),
            LoadError::Malformed(e) => write!(f, "malformed MIDI file: {e}"),
            LoadError::UnsupportedTiming => {
                write!(f, "SMPTE-timecode MIDI files are not supported")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// Read and parse a Standard MIDI File.
pub fn load(path: &Path) -> Result<ParsedSong, LoadError> {
    let bytes = std::fs::read(path)?;
    parse(&bytes)
}

/// Parse SMF bytes into the input contract.
pub fn parse(bytes: &[u8]) -> Result<ParsedSong, LoadError> {
    let smf = Smf::parse(bytes).map_err(|e| LoadError::Malformed(e.to_string()))?;
    let ticks_per_quarter = match smf.header.timing {
        Timing::Metrical(t) => t.as_int() as u32,
        Timing::Timecode(..) => return Err(LoadError::UnsupportedTiming),
    };

    let mut tracks = Vec::with_capacity(smf.tracks.len());
    let mut total_ticks = 0;
    for track in &smf.tracks {
        let mut events: Vec<TimedEvent> = Vec::new();
        // open note-ons per (channel, key), linked first-in first-out
        let mut open: HashMap<(u8, u8), Vec<usize>> = HashMap::new();
        let mut tick = 0u32;
        for event in track {
            tick += event.delta.as_int();
            match event.kind {
                TrackEventKind::Midi { channel, message } => match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        open.entry((channel.as_int(), key.as_int()))
                            .or_default()
                            .push(events.len());
                        events.push(TimedEvent {
                            tick,
                            kind: EventKind::Note {
                                key: key.as_int(),
                                velocity: vel.as_int(),
                                off_tick: tick,
                            },
                        });
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        link_release(&mut events, &mut open, channel.as_int(), key.as_int(), tick);
                    }
                    MidiMessage::Controller { controller, value } => {
                        events.push(TimedEvent {
                            tick,
                            kind: EventKind::Controller {
                                number: controller.as_int(),
                                value: value.as_int(),
                            },
                        });
                    }
                    MidiMessage::PitchBend { bend } => {
                        events.push(TimedEvent {
                            tick,
                            kind: EventKind::PitchBend {
                                value: bend.0.as_int(),
                            },
                        });
                    }
                    _ => {}
                },
                TrackEventKind::Meta(meta) => match meta {
                    MetaMessage::Tempo(t) => {
                        events.push(TimedEvent {
                            tick,
                            kind: EventKind::Tempo {
                                us_per_quarter: t.as_int(),
                            },
                        });
                    }
                    MetaMessage::TrackName(name) => {
                        events.push(TimedEvent {
                            tick,
                            kind: EventKind::TrackName(String::from_utf8_lossy(name).into_owned()),
                        });
                    }
                    MetaMessage::EndOfTrack => {
                        events.push(TimedEvent {
                            tick,
                            kind: EventKind::EndOfTrack,
                        });
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        // close anything left hanging at the end of the track
        for indices in open.into_values() {
            for idx in indices {
                if let EventKind::Note { off_tick, .. } = &mut events[idx].kind {
                    *off_tick = tick;
                }
            }
        }
        let track_end = events
            .iter()
            .map(|e| match e.kind {
                EventKind::Note { off_tick, .. } => e.tick.max(off_tick),
                _ => e.tick,
            })
            .max()
            .unwrap_or(0);
        total_ticks = total_ticks.max(track_end);
        tracks.push(ParsedTrack { events });
    }

    Ok(ParsedSong {
        ticks_per_quarter,
        total_ticks,
        tracks,
    })
}

fn link_release(
    events: &mut [TimedEvent],
    open: &mut HashMap<(u8, u8), Vec<usize>>,
    channel: u8,
    key: u8,
    tick: u32,
) {
    if let Some(indices) = open.get_mut(&(channel, key)) {
        if !indices.is_empty() {
            let idx = indices.remove(0);
            if let EventKind::Note { off_tick, .. } = &mut events[idx].kind {
                *off_tick = tick;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::num::{u15, u24, u28, u4, u7};
    use midly::{Format, Header, TrackEvent};

    fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::NoteOn {
                    key: u7::from(key),
                    vel: u7::from(vel),
                },
            },
        }
    }

    fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(0),
                message: MidiMessage::NoteOff {
                    key: u7::from(key),
                    vel: u7::from(0),
                },
            },
        }
    }

    fn meta(delta: u32, message: MetaMessage<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Meta(message),
        }
    }

    fn smf_bytes(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let smf = Smf {
            header: Header {
                format: Format::Parallel,
                timing: Timing::Metrical(u15::from(96)),
            },
            tracks,
        };
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn links_note_pairs_and_absolute_ticks() {
        let bytes = smf_bytes(vec![vec![
            note_on(0, 60, 100),
            note_off(96, 60),
            note_on(24, 62, 80),
            note_off(48, 62),
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        let song = parse(&bytes).unwrap();
        assert_eq!(song.ticks_per_quarter, 96);
        assert_eq!(song.total_ticks, 168);

        let events = &song.tracks[0].events;
        assert_eq!(
            events[0],
            TimedEvent {
                tick: 0,
                kind: EventKind::Note {
                    key: 60,
                    velocity: 100,
                    off_tick: 96
                }
            }
        );
        assert_eq!(
            events[1],
            TimedEvent {
                tick: 120,
                kind: EventKind::Note {
                    key: 62,
                    velocity: 80,
                    off_tick: 168
                }
            }
        );
        assert_eq!(events[2].kind, EventKind::EndOfTrack);
    }

    #[test]
    fn velocity_zero_note_on_counts_as_release() {
        let bytes = smf_bytes(vec![vec![
            note_on(0, 60, 100),
            note_on(48, 60, 0),
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        let song = parse(&bytes).unwrap();
        assert_eq!(
            song.tracks[0].events[0].kind,
            EventKind::Note {
                key: 60,
                velocity: 100,
                off_tick: 48
            }
        );
    }

    #[test]
    fn hanging_notes_close_at_track_end() {
        let bytes = smf_bytes(vec![vec![
            note_on(0, 60, 100),
            meta(96, MetaMessage::EndOfTrack),
        ]]);
        let song = parse(&bytes).unwrap();
        assert_eq!(
            song.tracks[0].events[0].kind,
            EventKind::Note {
                key: 60,
                velocity: 100,
                off_tick: 96
            }
        );
    }

    #[test]
    fn keeps_controllers_bends_tempo_and_names() {
        let bytes = smf_bytes(vec![vec![
            meta(0, MetaMessage::TrackName(b"Pad 1")),
            meta(0, MetaMessage::Tempo(u24::from(500_000))),
            TrackEvent {
                delta: u28::from(10),
                kind: TrackEventKind::Midi {
                    channel: u4::from(0),
                    message: MidiMessage::Controller {
                        controller: u7::from(7),
                        value: u7::from(64),
                    },
                },
            },
            TrackEvent {
                delta: u28::from(10),
                kind: TrackEventKind::Midi {
                    channel: u4::from(0),
                    message: MidiMessage::PitchBend {
                        bend: midly::PitchBend(midly::num::u14::from(8192)),
                    },
                },
            },
            meta(0, MetaMessage::EndOfTrack),
        ]]);
        let song = parse(&bytes).unwrap();
        let events = &song.tracks[0].events;
        assert_eq!(events[0].kind, EventKind::TrackName("Pad 1".into()));
        assert_eq!(events[1].kind, EventKind::Tempo { us_per_quarter: 500_000 });
        assert_eq!(
            events[2],
            TimedEvent {
                tick: 10,
                kind: EventKind::Controller { number: 7, value: 64 }
            }
        );
        assert_eq!(
            events[3],
            TimedEvent {
                tick: 20,
                kind: EventKind::PitchBend { value: 8192 }
            }
        );
    }

    #[test]
    fn total_ticks_spans_all_tracks() {
        let bytes = smf_bytes(vec![
            vec![note_on(0, 60, 100), note_off(48, 60), meta(0, MetaMessage::EndOfTrack)],
            vec![note_on(0, 40, 90), note_off(192, 40), meta(0, MetaMessage::EndOfTrack)],
        ]);
        let song = parse(&bytes).unwrap();
        assert_eq!(song.tracks.len(), 2);
        assert_eq!(song.total_ticks, 192);
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse(b"not a midi file"),
            Err(LoadError::Malformed(_))
        ));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mid");
        std::fs::write(
            &path,
            smf_bytes(vec![vec![
                note_on(0, 60, 100),
                note_off(96, 60),
                meta(0, MetaMessage::EndOfTrack),
            ]]),
        )
        .unwrap();
        let song = load(&path).unwrap();
        assert_eq!(song.total_ticks, 96);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("absent.mid")),
            Err(LoadError::Io(_))
        ));
    }
}
