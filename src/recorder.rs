use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ArcadeError;
use crate::mixer::Mixer;
use crate::utils::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingKind {
    General,
    Melody,
    Chord,
}

impl RecordingKind {
    pub fn file_prefix(&self) -> &'static str {
        match self {
            RecordingKind::General => "arcade_audio",
            RecordingKind::Melody => "arcade_melody",
            RecordingKind::Chord => "chord_32bit",
        }
    }
}

/// Captured master output, filled by the mixer while a recording is active.
#[derive(Debug, Clone)]
pub struct Recording {
    kind: RecordingKind,
    samples: Vec<f32>,
}

impl Recording {
    pub fn new(kind: RecordingKind) -> Self {
        Recording { kind, samples: Vec::new() }
    }

    pub fn kind(&self) -> RecordingKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.samples.push(sample);
    }

    /// Writes `<prefix>_<unix millis>.wav` into `dir` as mono 16-bit PCM.
    pub fn save(&self, dir: &Path, sample_rate: u32) -> Result<PathBuf, ArcadeError> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let path = dir.join(format!("{}_{}.wav", self.kind.file_prefix(), millis));
        self.save_to(&path, sample_rate)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path, sample_rate: u32) -> Result<(), ArcadeError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let file_err = |e: hound::Error| ArcadeError::RecordingError(format!("{}: {}", path.display(), e));

        let mut writer = hound::WavWriter::create(path, spec).map_err(file_err)?;
        for &s in &self.samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).map_err(file_err)?;
        }
        writer.finalize().map_err(file_err)?;

        log::info!("Saved {:?} recording ({} samples) to {}", self.kind, self.samples.len(), path.display());
        Ok(())
    }
}

/// Starts and finalizes recordings of the mixer's master output into one directory.
#[derive(Debug)]
pub struct Recorder {
    output_dir: PathBuf,
    saved: Mutex<Vec<PathBuf>>,
}

impl Recorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Recorder { output_dir: output_dir.into(), saved: Mutex::new(Vec::new()) }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn start(&self, mixer: &Mutex<Mixer>, kind: RecordingKind) -> Result<(), ArcadeError> {
        lock(mixer).start_recording(kind)?;
        log::info!("{:?} recording started", kind);
        Ok(())
    }

    /// Ends the active recording and writes it out. With `only` set, a recording of
    /// another kind is left running. `Ok(None)` when there was nothing to finish.
    pub fn finish(&self, mixer: &Mutex<Mixer>, only: Option<RecordingKind>) -> Result<Option<PathBuf>, ArcadeError> {
        let (recording, sample_rate) = {
            let mut mixer = lock(mixer);
            match (mixer.recording_kind(), only) {
                (None, _) => return Ok(None),
                (Some(active), Some(wanted)) if active != wanted => return Ok(None),
                _ => {}
            }
            (mixer.take_recording(), mixer.sample_rate())
        };

        let Some(recording) = recording else { return Ok(None) };
        if recording.is_empty() {
            log::warn!("{:?} recording captured no audio, writing an empty file", recording.kind());
        }
        let path = recording.save(&self.output_dir, sample_rate as u32)?;
        lock(&self.saved).push(path.clone());
        Ok(Some(path))
    }

    /// Discards the active recording without writing anything.
    pub fn discard(&self, mixer: &Mutex<Mixer>) {
        if let Some(recording) = lock(mixer).take_recording() {
            log::info!("{:?} recording discarded", recording.kind());
        }
    }

    /// Paths written since the last call.
    pub fn take_saved(&self) -> Vec<PathBuf> {
        std::mem::take(&mut *lock(&self.saved))
    }
}
