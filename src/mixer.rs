use std::sync::{Arc, Mutex};

use crate::background::BackgroundTrack;
use crate::chord::ChordVoice;
use crate::error::ArcadeError;
use crate::recorder::{Recording, RecordingKind};
use crate::sequencer::Voice;
use crate::tone::{ToneGenerator, ToneRequest};
use crate::utils::lock;

const PRUNE_INTERVAL: u64 = 1024;

/// The whole output graph: arcade voice, transient chord and background track summed
/// into the master gain, with an optional recording tap after it.
pub struct Mixer {
    sample_rate: f32,
    frame: u64,
    master_gain: f32,
    volume: f32, // percent
    background_volume: f32, // percent
    tone: ToneGenerator,
    chord: Option<ChordVoice>,
    background: Option<BackgroundTrack>,
    recording: Option<Recording>,
}

impl Mixer {
    pub fn new(sample_rate: f32, master_gain: f32) -> Self {
        Mixer {
            sample_rate,
            frame: 0,
            master_gain,
            volume: 100.0,
            background_volume: 100.0,
            tone: ToneGenerator::new(),
            chord: None,
            background: None,
            recording: None,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Mixer clock in seconds, advanced by rendering.
    pub fn now(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// Scales the whole output at once, sounding voices included.
    pub fn set_volume(&mut self, percent: f32) {
        self.volume = percent.clamp(0.0, 100.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Effective output gain: master gain times volume.
    pub fn output_gain(&self) -> f32 {
        self.master_gain * self.volume / 100.0
    }

    pub fn tone(&self) -> &ToneGenerator {
        &self.tone
    }

    pub fn play_tone(&mut self, request: ToneRequest) {
        let now = self.now();
        self.tone.play(request, now);
    }

    pub fn stop_tone(&mut self) {
        let now = self.now();
        self.tone.stop(now);
    }

    pub fn set_chord(&mut self, chord: ChordVoice) {
        self.chord = Some(chord);
    }

    pub fn clear_chord(&mut self) -> bool {
        self.chord.take().is_some()
    }

    pub fn chord(&self) -> Option<&ChordVoice> {
        self.chord.as_ref()
    }

    /// Replaces the background track; it takes the current background volume.
    pub fn set_background(&mut self, mut track: BackgroundTrack) {
        track.set_gain(self.background_volume / 100.0);
        self.background = Some(track);
    }

    pub fn set_background_volume(&mut self, percent: f32) {
        self.background_volume = percent.clamp(0.0, 100.0);
        if let Some(track) = &mut self.background {
            track.set_gain(self.background_volume / 100.0);
        }
    }

    pub fn background_volume(&self) -> f32 {
        self.background_volume
    }

    pub fn background(&self) -> Option<&BackgroundTrack> {
        self.background.as_ref()
    }

    pub fn background_mut(&mut self) -> Option<&mut BackgroundTrack> {
        self.background.as_mut()
    }

    pub fn start_recording(&mut self, kind: RecordingKind) -> Result<(), ArcadeError> {
        if let Some(active) = &self.recording {
            return Err(ArcadeError::RecordingError(format!("A {:?} recording is already running", active.kind())));
        }
        self.recording = Some(Recording::new(kind));
        Ok(())
    }

    pub fn recording_kind(&self) -> Option<RecordingKind> {
        self.recording.as_ref().map(Recording::kind)
    }

    pub fn take_recording(&mut self) -> Option<Recording> {
        self.recording.take()
    }

    pub fn next_sample(&mut self) -> f32 {
        let time = self.now();
        let sr = self.sample_rate;

        let mut output = self.tone.next_sample(time, sr);
        if let Some(chord) = &mut self.chord {
            output += chord.next_sample(time, sr);
        }
        if let Some(track) = &mut self.background {
            output += track.next_sample(sr);
        }
        output *= self.output_gain();

        if let Some(recording) = &mut self.recording {
            recording.push(output);
        }

        self.frame += 1;
        if self.frame % PRUNE_INTERVAL == 0 {
            self.tone.prune(time);
        }
        output
    }

    /// Fills an interleaved buffer, the same mono signal on every channel.
    pub fn render(&mut self, data: &mut [f32], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let value = self.next_sample();
            for sample in frame.iter_mut() {
                *sample = value;
            }
        }
    }
}

/// [`Voice`] that drives the mixer's tone generator at the mixer's current time.
pub struct MixerVoice {
    mixer: Arc<Mutex<Mixer>>,
}

impl MixerVoice {
    pub fn new(mixer: Arc<Mutex<Mixer>>) -> Self {
        MixerVoice { mixer }
    }
}

impl Voice for MixerVoice {
    fn play(&mut self, request: ToneRequest) {
        lock(&self.mixer).play_tone(request);
    }

    fn stop(&mut self) {
        lock(&self.mixer).stop_tone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::SampleData;
    use crate::waveform::WaveformType;

    #[test]
    fn silent_until_something_plays() {
        let mut mixer = Mixer::new(1000.0, 0.5);
        let mut buf = vec![1.0; 200];
        mixer.render(&mut buf, 2);
        assert!(buf.iter().all(|s| *s == 0.0));
        assert!((mixer.now() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn tone_goes_through_master_gain() {
        let mut mixer = Mixer::new(1000.0, 0.5);
        mixer.play_tone(ToneRequest::new(100.0, 100.0));
        let mut buf = vec![0.0; 100];
        mixer.render(&mut buf, 1);
        let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.25).abs() < 1e-4);
    }

    #[test]
    fn channels_carry_the_same_signal() {
        let mut mixer = Mixer::new(1000.0, 1.0);
        mixer.play_tone(ToneRequest::new(100.0, 100.0));
        let mut buf = vec![0.0; 64];
        mixer.render(&mut buf, 2);
        for frame in buf.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn voice_stop_fades_out() {
        let mixer = Arc::new(Mutex::new(Mixer::new(1000.0, 1.0)));
        let mut voice = MixerVoice::new(Arc::clone(&mixer));
        voice.play(ToneRequest::new(100.0, 100.0));
        lock(&mixer).render(&mut [0.0; 100], 1);

        voice.stop();
        let mut tail = vec![0.0; 100];
        lock(&mixer).render(&mut tail, 1);
        assert!(tail[..10].iter().any(|s| s.abs() > 0.1));
        assert!(tail[55..].iter().all(|s| s.abs() < 1e-6));
        assert!(!lock(&mixer).tone().is_sounding());
    }

    #[test]
    fn sums_chord_and_background() {
        let mut mixer = Mixer::new(1000.0, 1.0);
        mixer.set_chord(ChordVoice::new(&[100.0], WaveformType::Square, 0.25, 0.0, 1.0, None, 1000.0));
        let data = SampleData { samples: Arc::new(vec![0.5]), sample_rate: 1000 };
        let mut track = BackgroundTrack::new(data, 1.0);
        track.play();
        mixer.set_background(track);

        assert_eq!(mixer.next_sample(), 0.75);
        assert!(mixer.clear_chord());
        assert!(!mixer.clear_chord());
        assert_eq!(mixer.next_sample(), 0.5);
    }

    #[test]
    fn volume_scales_a_sounding_tone() {
        let mut mixer = Mixer::new(1000.0, 0.5);
        mixer.play_tone(ToneRequest::new(100.0, 100.0));
        mixer.render(&mut [0.0; 50], 1);

        mixer.set_volume(50.0);
        let mut half = vec![0.0; 50];
        mixer.render(&mut half, 1);
        let peak = half.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 0.125).abs() < 1e-4);

        mixer.set_volume(0.0);
        let mut muted = vec![1.0; 50];
        mixer.render(&mut muted, 1);
        assert!(muted.iter().all(|s| *s == 0.0));
        assert!(mixer.tone().is_sounding());
    }

    #[test]
    fn background_volume_survives_a_new_track() {
        let mut mixer = Mixer::new(1000.0, 1.0);
        mixer.set_background_volume(0.0);

        let data = SampleData { samples: Arc::new(vec![0.5]), sample_rate: 1000 };
        let mut track = BackgroundTrack::new(data, 1.0);
        track.play();
        mixer.set_background(track);
        assert_eq!(mixer.next_sample(), 0.0);

        mixer.set_background_volume(50.0);
        assert_eq!(mixer.next_sample(), 0.25);
    }

    #[test]
    fn recording_taps_the_master_output() {
        let mut mixer = Mixer::new(1000.0, 0.5);
        mixer.start_recording(RecordingKind::General).unwrap();
        assert!(mixer.start_recording(RecordingKind::Melody).is_err());

        mixer.play_tone(ToneRequest::new(100.0, 100.0));
        let mut buf = vec![0.0; 50];
        mixer.render(&mut buf, 1);

        let recording = mixer.take_recording().unwrap();
        assert_eq!(recording.kind(), RecordingKind::General);
        assert_eq!(recording.len(), 50);
        assert_eq!(mixer.recording_kind(), None);
    }
}
