use std::path::Path;
use std::sync::Arc;

use crate::error::ArcadeError;

#[derive(Debug, Clone)]
pub struct SampleData {
    pub samples: Arc<Vec<f32>>,
    pub sample_rate: u32,
}

impl SampleData {
    /// Decodes a WAV file into mono f32 samples.
    pub fn load_wav(path: &Path) -> Result<Self, ArcadeError> {
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| ArcadeError::FileError(format!("{}: {}", path.display(), e)))?;
        let spec = reader.spec();

        let interleaved: Result<Vec<f32>, _> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader.samples::<i32>()
                    .map(|r| r.map(|s| s as f32 / scale))
                    .collect()
            }
        };
        let interleaved = interleaved
            .map_err(|e| ArcadeError::FileError(format!("Could not decode {}: {}", path.display(), e)))?;

        let channels = spec.channels.max(1) as usize;
        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        log::info!("Loaded background '{}': {} Hz, {} channels, {:.2}s",
            path.display(), spec.sample_rate, spec.channels,
            samples.len() as f32 / spec.sample_rate as f32);

        Ok(SampleData {
            samples: Arc::new(samples),
            sample_rate: spec.sample_rate,
        })
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// A decoded file playing on a loop under the arcade voice.
#[derive(Debug, Clone)]
pub struct BackgroundTrack {
    data: SampleData,
    position: f64, // in source samples
    playing: bool,
    gain: f32,
}

impl BackgroundTrack {
    pub fn new(data: SampleData, gain: f32) -> Self {
        BackgroundTrack { data, position: 0.0, playing: false, gain }
    }

    pub fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn play(&mut self) {
        self.position = 0.0;
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let len = self.data.samples.len();
        if !self.playing || len == 0 {
            return 0.0;
        }

        let value = Self::interpolate_sample(&self.data, self.position);
        self.position += self.data.sample_rate as f64 / sample_rate as f64;
        if self.position >= len as f64 {
            self.position -= len as f64; // loop
        }
        value * self.gain
    }

    #[inline]
    fn interpolate_sample(sample_data: &SampleData, src_pos: f64) -> f32 {
        let src_idx = src_pos as usize;
        let samples = &sample_data.samples;

        if src_idx >= samples.len() {
            return 0.0;
        }

        // Linear interpolation, wrapping into the loop start
        let frac = (src_pos - src_idx as f64) as f32;
        let s1 = samples[src_idx];
        let s2 = samples[(src_idx + 1) % samples.len()];
        s1 * (1.0 - frac) + s2 * frac
    }
}
