//! Per-song overrides — hand-tuned fixes applied to a built sequence.
//!
//! Real source material rarely maps cleanly onto the target engine: a bend
//! curve recorded on an effects track belongs on the pad it modulates, a
//! drum track needs its keys remapped onto percussion-bank slots, a pad
//! wants a fixed pan. Those decisions are data, not code: they load from a
//! YAML file as an ordered rule list and are applied here, top to bottom.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encode::Calibration;
use crate::seq::{NoteRemap, ParamKind, Sequence};

/// One override applied to the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OverrideRule {
    /// Rebind a parameter curve from one named track to another.
    MoveSource {
        param: ParamKind,
        from: String,
        to: String,
    },
    /// Unbind a parameter slot.
    ClearSource { param: ParamKind, track: String },
    /// Bind a slot to a new constant-value curve.
    FixedSource {
        param: ParamKind,
        track: String,
        value: f32,
    },
    /// Assign an instrument slot (0x7F selects the percussion bank).
    SetInstrument { track: String, instrument: u8 },
    /// Remap note keys (identity for unlisted keys) and switch the track to
    /// direct pitch encoding.
    RemapNotes {
        track: String,
        map: HashMap<u8, u8>,
    },
    /// Scale every note velocity on the track at encode time.
    VelocityMultiplier { track: String, value: f32 },
    /// Encode pitches directly instead of through the group window.
    DirectPitch { track: String },
}

/// Override file for one song.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongConfig {
    /// Instrument bank of the target engine.
    #[serde(default)]
    pub bank: Option<u8>,
    /// Master volume in 0.0–1.0.
    #[serde(default)]
    pub master_volume: Option<f32>,
    /// Encoder calibration constants.
    #[serde(default)]
    pub calibration: Option<Calibration>,
    /// When present, only the named tracks survive, in their original order.
    #[serde(default)]
    pub keep_tracks: Option<Vec<String>>,
    /// Rules applied top to bottom.
    #[serde(default)]
    pub rules: Vec<OverrideRule>,
}

/// A problem loading or applying an override file.
#[derive(Debug)]
pub enum OverrideError {
    Io(std::io::Error),
    Parse(String),
    /// A rule names a track the sequence does not have.
    TrackNotFound(String),
}

impl fmt::Display for OverrideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverrideError::Io(e) => write!(f, "cannot read override file: {e}"),
            OverrideError::Parse(e) => write!(f, "malformed override file: {e}"),
            OverrideError::TrackNotFound(name) => {
                write!(f, "no track named \"{name}\" exists")
            }
        }
    }
}

impl std::error::Error for OverrideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OverrideError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OverrideError {
    fn from(e: std::io::Error) -> Self {
        OverrideError::Io(e)
    }
}

impl SongConfig {
    /// Load an override file.
    pub fn load(path: &Path) -> Result<Self, OverrideError> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| OverrideError::Parse(e.to_string()))
    }

    /// Apply every override to the sequence.
    pub fn apply(&self, seq: &mut Sequence) -> Result<(), OverrideError> {
        if let Some(bank) = self.bank {
            seq.bank = bank;
        }
        if let Some(volume) = self.master_volume {
            seq.volume = volume;
        }
        for rule in &self.rules {
            apply_rule(rule, seq)?;
        }
        if let Some(keep) = &self.keep_tracks {
            // resolve the names first so a typo still fails loudly
            for name in keep {
                resolve(seq, name)?;
            }
            seq.tracks.retain(|t| keep.iter().any(|n| *n == t.name));
        }
        Ok(())
    }
}

fn apply_rule(rule: &OverrideRule, seq: &mut Sequence) -> Result<(), OverrideError> {
    match rule {
        OverrideRule::MoveSource { param, from, to } => {
            let from = resolve(seq, from)?;
            let to = resolve(seq, to)?;
            let source = seq.tracks[from].bound(*param);
            seq.tracks[to].bind(*param, source);
            seq.tracks[from].bind(*param, None);
        }
        OverrideRule::ClearSource { param, track } => {
            let track = resolve(seq, track)?;
            seq.tracks[track].bind(*param, None);
        }
        OverrideRule::FixedSource {
            param,
            track,
            value,
        } => {
            let track = resolve(seq, track)?;
            let source = seq.fixed_source(*value);
            seq.tracks[track].bind(*param, Some(source));
        }
        OverrideRule::SetInstrument { track, instrument } => {
            let track = resolve(seq, track)?;
            seq.tracks[track].instrument = *instrument;
        }
        OverrideRule::RemapNotes { track, map } => {
            let track = resolve(seq, track)?;
            seq.tracks[track].remap(&NoteRemap::from(map.clone()));
        }
        OverrideRule::VelocityMultiplier { track, value } => {
            let track = resolve(seq, track)?;
            seq.tracks[track].velocity_multiplier = *value;
        }
        OverrideRule::DirectPitch { track } => {
            let track = resolve(seq, track)?;
            seq.tracks[track].direct_pitch = true;
        }
    }
    Ok(())
}

fn resolve(seq: &Sequence, name: &str) -> Result<usize, OverrideError> {
    seq.track_by_name(name)
        .ok_or_else(|| OverrideError::TrackNotFound(name.to_string()))
}
