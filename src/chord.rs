use crate::effects::{DelayParams, FeedbackDelay};
use crate::error::ArcadeError;
use crate::notes::note_frequency;
use crate::param::Param;
use crate::waveform::WaveformType;

const FADE_TIME: f64 = 0.05;

// Chord request for the "32-bit" experiment
#[derive(Debug, Clone)]
pub struct ChordRequest {
    pub notes: String,
    pub waveform: WaveformType,
    pub duration_ms: u32,
    pub delay_percent: f32,
}

impl ChordRequest {
    pub fn new(notes: &str) -> Self {
        ChordRequest {
            notes: notes.to_string(),
            waveform: WaveformType::Sine,
            duration_ms: 1000,
            delay_percent: 0.0,
        }
    }
}

/// Resolves `"C4, E4, G4"` to frequencies. Unknown names are dropped, not defaulted.
pub fn parse_chord_notes(text: &str) -> Result<Vec<f32>, ArcadeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ArcadeError::EmptyInput("Enter at least one chord note (e.g. C4)".to_string()));
    }

    let frequencies: Vec<f32> = text
        .split(',')
        .filter_map(|note| {
            let name = note.trim().to_uppercase();
            let freq = note_frequency(&name);
            if freq.is_none() {
                log::warn!("Unknown chord note '{}', skipping", name);
            }
            freq
        })
        .collect();

    if frequencies.is_empty() {
        return Err(ArcadeError::NoValidNotes(
            "None of the chord notes are valid, use names like C4 or E5".to_string()
        ));
    }
    Ok(frequencies)
}

/// One transient oscillator per chord note, summed through a shared gain and an
/// optional feedback echo.
pub struct ChordVoice {
    waveform: WaveformType,
    phases: Vec<(f32, f32)>, // (frequency, phase)
    gain: Param,
    start: f64,
    stop_at: f64,
    delay: Option<FeedbackDelay>,
}

impl ChordVoice {
    pub fn new(
        frequencies: &[f32],
        waveform: WaveformType,
        level: f32,
        start: f64,
        duration: f64,
        delay: Option<DelayParams>,
        sample_rate: f32,
    ) -> Self {
        let stop_at = start + duration;
        let fade_start = (stop_at - FADE_TIME).max(start);

        let mut gain = Param::new(0.0);
        gain.set_value_at_time(level, start);
        gain.set_value_at_time(level, fade_start);
        gain.linear_ramp_to_value_at_time(0.0, stop_at);

        ChordVoice {
            waveform,
            phases: frequencies.iter().map(|&f| (f, 0.0)).collect(),
            gain,
            start,
            stop_at,
            delay: delay.map(|params| FeedbackDelay::new(sample_rate, params)),
        }
    }

    pub fn voice_count(&self) -> usize {
        self.phases.len()
    }

    pub fn has_delay(&self) -> bool {
        self.delay.is_some()
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_at
    }

    pub fn next_sample(&mut self, time: f64, sample_rate: f32) -> f32 {
        let mut dry = 0.0;

        if time >= self.start && time < self.stop_at {
            for (freq, phase) in self.phases.iter_mut() {
                dry += self.waveform.generate_sample(*phase);
                *phase = (*phase + *freq / sample_rate).fract();
            }
            dry *= self.gain.value_at(time);
        }

        let wet = match &mut self.delay {
            Some(delay) => delay.process(dry),
            None => 0.0,
        };

        dry + wet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_notes_are_filtered() {
        let freqs = parse_chord_notes("c4, X9, E4,G4").unwrap();
        assert_eq!(freqs, vec![261.63, 329.63, 392.00]);
    }

    #[test]
    fn empty_and_all_invalid_are_rejected() {
        assert!(matches!(parse_chord_notes("   "), Err(ArcadeError::EmptyInput(_))));
        assert!(matches!(parse_chord_notes("foo,bar"), Err(ArcadeError::NoValidNotes(_))));
    }

    #[test]
    fn sounds_until_duration_then_silence() {
        let sr = 1000.0;
        let mut chord = ChordVoice::new(&[100.0, 150.0], WaveformType::Square, 0.25, 0.0, 0.2, None, sr);
        assert_eq!(chord.voice_count(), 2);

        let samples: Vec<f32> = (0..400).map(|i| chord.next_sample(i as f64 / sr as f64, sr)).collect();
        assert!(samples[..150].iter().any(|s| s.abs() > 0.1));
        assert!(samples[200..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn phase_stays_wrapped_at_low_sample_rates() {
        let sr = 1000.0;
        let mut chord = ChordVoice::new(&[1500.0], WaveformType::Square, 0.5, 0.0, 1.0, None, sr);
        let samples: Vec<f32> = (0..100).map(|i| chord.next_sample(i as f64 / sr as f64, sr)).collect();
        assert!(samples.iter().any(|s| *s > 0.1));
        assert!(samples.iter().any(|s| *s < -0.1));
    }

    #[test]
    fn fades_over_last_fifty_ms() {
        let sr = 1000.0;
        let mut chord = ChordVoice::new(&[100.0], WaveformType::Square, 0.5, 0.0, 0.2, None, sr);
        let samples: Vec<f32> = (0..200).map(|i| chord.next_sample(i as f64 / sr as f64, sr).abs()).collect();

        assert!((samples[100] - 0.5).abs() < 1e-4);
        assert!(samples[175] < 0.3);
        assert!(samples[199] < 0.02);
    }

    #[test]
    fn echo_rings_after_chord_stops() {
        let sr = 1000.0;
        let delay = DelayParams::from_percent(0.1, 0.5, 100.0);
        let mut chord = ChordVoice::new(&[100.0], WaveformType::Square, 0.5, 0.0, 0.1, delay, sr);
        assert!(chord.has_delay());

        let tail: Vec<f32> = (0..300).map(|i| chord.next_sample(i as f64 / sr as f64, sr)).collect();
        assert!(tail[110..190].iter().any(|s| s.abs() > 0.1));
    }
}
