use std::path::PathBuf;
use std::time::Duration;

use crate::sequence::DEFAULT_NOTE_MS;
use crate::tone::{MAX_FREQUENCY, MIN_FREQUENCY};

#[derive(Debug, Clone)]
pub struct ArcadeConfig {
    pub master_frequency: f32,
    pub volume: f32, // percent
    pub master_gain: f32,
    pub step_delay: Duration,
    pub default_note_ms: u32,
    pub chord_delay_time: f32, // seconds
    pub chord_delay_feedback: f32,
    pub background_volume: f32, // percent
    pub max_background: Duration,
    pub recordings_dir: PathBuf,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        ArcadeConfig {
            master_frequency: 440.0,
            volume: 50.0,
            master_gain: 0.5,
            step_delay: Duration::from_millis(200),
            default_note_ms: DEFAULT_NOTE_MS,
            chord_delay_time: 0.5,
            chord_delay_feedback: 0.5,
            background_volume: 50.0,
            max_background: Duration::from_secs(20),
            recordings_dir: PathBuf::from("."),
        }
    }
}

impl ArcadeConfig {
    pub fn with_master_frequency(mut self, hz: f32) -> Self {
        self.master_frequency = clamp_frequency(hz);
        self
    }

    pub fn with_volume(mut self, percent: f32) -> Self {
        self.volume = clamp_percent(percent);
        self
    }

    pub fn with_recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recordings_dir = dir.into();
        self
    }
}

pub fn clamp_frequency(hz: f32) -> f32 {
    hz.max(MIN_FREQUENCY).min(MAX_FREQUENCY)
}

pub fn clamp_percent(percent: f32) -> f32 {
    percent.max(0.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_toy() {
        let config = ArcadeConfig::default();
        assert_eq!(config.step_delay, Duration::from_millis(200));
        assert_eq!(config.default_note_ms, 250);
        assert_eq!(config.max_background, Duration::from_secs(20));
        assert_eq!(config.master_gain, 0.5);
    }

    #[test]
    fn builders_clamp() {
        let config = ArcadeConfig::default().with_master_frequency(5.0).with_volume(140.0);
        assert_eq!(config.master_frequency, 20.0);
        assert_eq!(config.volume, 100.0);
    }
}
