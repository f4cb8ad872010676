pub mod error;
pub mod config;
pub mod utils;
pub mod waveform;
pub mod notes;
pub mod param;
pub mod tone;
pub mod effects;
pub mod chord;
pub mod background;
pub mod recorder;
pub mod sequence;
pub mod timer;
pub mod sequencer;
pub mod mixer;
pub mod store;
pub mod engine;

pub use error::ArcadeError;
pub use config::ArcadeConfig;
pub use waveform::WaveformType;
pub use notes::note_frequency;
pub use tone::{ToneGenerator, ToneRequest};
pub use effects::{DelayParams, FeedbackDelay};
pub use chord::{ChordRequest, ChordVoice, parse_chord_notes};
pub use background::{BackgroundTrack, SampleData};
pub use recorder::{Recorder, Recording, RecordingKind};
pub use sequence::{Bit, Controls, MelodyStep, SequenceStep, parse_melody, tokenize_sequence};
pub use timer::{ManualTimer, TaskHandle, ThreadTimer, Timer};
pub use sequencer::{Sequencer, Voice};
pub use mixer::{Mixer, MixerVoice};
pub use store::NotesStore;
pub use engine::ArcadeEngine;
