//! cadenza — convert a Standard MIDI File to an N64 audio sequence.
//!
//! Pipeline: load and link the source file, build the sequence model, apply
//! per-song overrides, normalize to the engine's clock base, optionally
//! refactor wide pitch bends, optimize the curves, encode, write.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use cadenza::encode;
use cadenza::midi;
use cadenza::overrides::SongConfig;

#[derive(Parser)]
#[command(name = "cadenza", version, about = "MIDI to N64 audio sequence converter")]
struct Cli {
    /// Input Standard MIDI File.
    input: PathBuf,
    /// Output path. Defaults to the input with an .m64 extension.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Per-song override rules (YAML).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Rewrite out-of-range pitch bends as note transpositions.
    #[arg(long)]
    refactor_bends: bool,
}

fn main() {
    let cli = Cli::parse();

    let song = match midi::load(&cli.input) {
        Ok(song) => song,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    let mut seq = midi::build(&song);

    let config = match &cli.config {
        Some(path) => match SongConfig::load(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        None => None,
    };

    seq.convert_clock_base();
    seq.trim_events();
    if let Some(config) = &config {
        if let Err(e) = config.apply(&mut seq) {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
    if cli.refactor_bends {
        seq.refactor_pitch_bends();
    }
    seq.optimize_all();

    let calibration = config
        .as_ref()
        .and_then(|c| c.calibration.clone())
        .unwrap_or_default();
    let bytes = match encode::sequence(&seq, &calibration) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let output = cli
        .output
        .unwrap_or_else(|| cli.input.with_extension("m64"));
    if let Err(e) = std::fs::write(&output, &bytes) {
        eprintln!("error: cannot write {}: {e}", output.display());
        process::exit(1);
    }
    println!(
        "{}: {} tracks, {} bytes",
        output.display(),
        seq.tracks.len(),
        bytes.len()
    );
}
