use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use bitarcade::{ArcadeConfig, ArcadeEngine, ArcadeError, ChordRequest, NotesStore, RecordingKind, WaveformType};

const POLL: Duration = Duration::from_millis(20);
const RELEASE_TAIL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Master frequency in Hz (20-2000)
    #[arg(long, global = true, default_value_t = 440.0)]
    frequency: f32,

    /// Volume in percent (0-100)
    #[arg(long, global = true, default_value_t = 50.0)]
    volume: f32,

    /// Record the playback to a timestamped WAV file in the current directory
    #[arg(long, global = true)]
    record: bool,

    /// Loop this WAV file underneath the playback
    #[arg(long, global = true)]
    background: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ChordArgs {
    /// Comma-separated note names, e.g. "C4,E4,G4"
    notes: String,

    #[arg(long, default_value = "sine", value_parser = parse_waveform)]
    wave: WaveformType,

    /// Duration in milliseconds
    #[arg(long, default_value_t = 1000)]
    duration: u32,

    /// Echo amount in percent, 0 disables the delay
    #[arg(long, default_value_t = 0.0)]
    delay: f32,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a tone sequence such as "1,0,300hz,80%,pausa"
    Sequence { text: String },

    /// Play a melody such as "C4:250,D4:500,_:250,E4"
    Melody { text: String },

    /// Play a chord through the 32-bit chord voice
    Chord(ChordArgs),

    /// Show or replace the saved custom notes
    Notes {
        #[arg(long)]
        set: Option<String>,
    },
}

fn parse_waveform(name: &str) -> Result<WaveformType, String> {
    WaveformType::from_name(name).ok_or_else(|| format!("unknown waveform '{}'", name))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::Notes { set } = &cli.command {
        return notes(set.as_deref());
    }

    let config = ArcadeConfig::default()
        .with_master_frequency(cli.frequency)
        .with_volume(cli.volume);
    let engine = ArcadeEngine::new(config)?;
    if cli.record {
        log::info!("Recordings go to {}", engine.recordings_dir().display());
    }

    if let Some(path) = &cli.background {
        let seconds = engine.load_background(path)?;
        log::info!("Background track is {:.1}s long", seconds);
        engine.play_background()?;
    }

    match &cli.command {
        Commands::Sequence { text } => {
            if cli.record {
                engine.start_recording(RecordingKind::General)?;
            }
            let steps = engine.play_sequence(text)?;
            println!("Playing {} steps", steps);
            wait_while(|| engine.is_busy());
        }
        Commands::Melody { text } => {
            let notes = if cli.record {
                engine.record_melody(text)?
            } else {
                engine.play_melody(text)?
            };
            println!("Playing {} notes", notes);
            wait_while(|| engine.is_busy());
        }
        Commands::Chord(args) => {
            if cli.record {
                engine.start_recording(RecordingKind::Chord)?;
            }
            let request = ChordRequest {
                notes: args.notes.clone(),
                waveform: args.wave,
                duration_ms: args.duration,
                delay_percent: args.delay,
            };
            let voices = engine.play_chord(&request)?;
            println!("Playing {} voices", voices);
            wait_while(|| engine.is_chord_active() || engine.recording_kind().is_some());
        }
        Commands::Notes { .. } => {}
    }

    thread::sleep(RELEASE_TAIL);
    engine.stop_all();

    for path in engine.take_saved_recordings() {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn wait_while(busy: impl Fn() -> bool) {
    while busy() {
        thread::sleep(POLL);
    }
}

fn notes(set: Option<&str>) -> Result<(), Box<dyn Error>> {
    let store = NotesStore::open_default()?;
    match set {
        Some(text) => {
            store.save_custom_notes(text)?;
            println!("Saved notes to {}", store.path().display());
        }
        None => match store.load_custom_notes()? {
            Some(text) => println!("{}", text),
            None => return Err(Box::new(ArcadeError::StoreError("No custom notes saved yet".to_string()))),
        },
    }
    Ok(())
}
