use crate::param::Param;
use crate::waveform::WaveformType;

pub const MIN_FREQUENCY: f32 = 20.0;
pub const MAX_FREQUENCY: f32 = 2000.0;
pub const MAX_GAIN: f32 = 0.5; // hard ceiling, keeps the square wave from clipping

const DIP_TIME: f64 = 0.005;
const ATTACK_TIME: f64 = 0.010;
const RELEASE_TIME: f64 = 0.050;

/// What a single step asks the voice to sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRequest {
    pub frequency: f32,
    pub volume: f32, // percent, 0-100
}

impl ToneRequest {
    pub fn new(frequency: f32, volume: f32) -> Self {
        ToneRequest {
            frequency: frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY),
            volume: volume.clamp(0.0, 100.0),
        }
    }

    pub fn gain(&self) -> f32 {
        MAX_GAIN * (self.volume / 100.0)
    }
}

/// The single square-wave voice shared by bit tones, key holds, sequences and melodies.
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    waveform: WaveformType,
    frequency: Param,
    gain: Param,
    phase: f32,
    sounding: bool,
}

impl ToneGenerator {
    pub fn new() -> Self {
        ToneGenerator {
            waveform: WaveformType::Square,
            frequency: Param::new(440.0),
            gain: Param::new(0.0),
            phase: 0.0,
            sounding: false,
        }
    }

    /// Starts (or retunes) the tone at `now` seconds on the mixer clock.
    pub fn play(&mut self, request: ToneRequest, now: f64) {
        self.gain.cancel_scheduled_values(now);

        let mut switch_at = now;
        if self.sounding {
            switch_at = now + DIP_TIME;
            self.gain.linear_ramp_to_value_at_time(0.0, switch_at);
        }

        self.frequency.set_value_at_time(request.frequency, switch_at);
        self.gain.linear_ramp_to_value_at_time(request.gain(), switch_at + ATTACK_TIME);
        self.sounding = true;
    }

    pub fn stop(&mut self, now: f64) {
        self.gain.cancel_scheduled_values(now);
        self.gain.linear_ramp_to_value_at_time(0.0, now + RELEASE_TIME);
        self.sounding = false;
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding
    }

    pub fn gain_at(&self, time: f64) -> f32 {
        self.gain.value_at(time)
    }

    pub fn frequency_at(&self, time: f64) -> f32 {
        self.frequency.value_at(time)
    }

    /// Gain the voice is heading for once pending ramps finish.
    pub fn target_gain(&self) -> f32 {
        self.gain.final_value()
    }

    pub fn target_frequency(&self) -> f32 {
        self.frequency.final_value()
    }

    pub fn next_sample(&mut self, time: f64, sample_rate: f32) -> f32 {
        let gain = self.gain.value_at(time);
        let freq = self.frequency.value_at(time);

        let output = if gain > 0.0 { self.waveform.generate_sample(self.phase) * gain } else { 0.0 };

        self.phase = (self.phase + freq / sample_rate).fract();
        output
    }

    pub fn prune(&mut self, time: f64) {
        self.gain.prune(time);
        self.frequency.prune(time);
    }
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self::new()
    }
}
