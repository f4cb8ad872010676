use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};

use crate::background::{BackgroundTrack, SampleData};
use crate::chord::{parse_chord_notes, ChordRequest, ChordVoice};
use crate::config::{clamp_percent, ArcadeConfig};
use crate::effects::DelayParams;
use crate::error::ArcadeError;
use crate::mixer::{Mixer, MixerVoice};
use crate::recorder::{Recorder, RecordingKind};
use crate::sequence::Bit;
use crate::sequencer::Sequencer;
use crate::timer::{TaskHandle, ThreadTimer, Timer};
use crate::tone::MAX_GAIN;
use crate::utils::lock;

const CHORD_CLEANUP_GRACE: Duration = Duration::from_millis(100);
const CHORD_RECORD_TAIL: Duration = Duration::from_millis(200);

#[derive(Default)]
struct PendingTasks {
    chord_cleanup: Option<TaskHandle>,
    chord_record_stop: Option<TaskHandle>,
    background_autostop: Option<TaskHandle>,
}

fn cancel(task: &mut Option<TaskHandle>) {
    if let Some(task) = task.take() {
        task.cancel();
    }
}

/// The arcade toy: one output graph, the sequencer driving its voice, the chord
/// player, the background track and the recorder.
pub struct ArcadeEngine {
    config: ArcadeConfig,
    mixer: Arc<Mutex<Mixer>>,
    sequencer: Sequencer<MixerVoice>,
    recorder: Arc<Recorder>,
    timer: Arc<dyn Timer>,
    tasks: Mutex<PendingTasks>,
    stream: Option<Stream>,
}

impl ArcadeEngine {
    /// Opens the default output device and starts streaming right away.
    pub fn new(config: ArcadeConfig) -> Result<Self, ArcadeError> {
        let host = cpal::default_host();
        let device = host.default_output_device()
            .ok_or_else(|| ArcadeError::AudioError("No output device found".to_string()))?;
        let supported = device.default_output_config()
            .map_err(|e| ArcadeError::AudioError(e.to_string()))?;
        let stream_config = supported.config();

        let mut engine = Self::headless(config, stream_config.sample_rate.0 as f32, Arc::new(ThreadTimer::new()));
        engine.start_stream(&device, stream_config)?;
        Ok(engine)
    }

    /// Same graph without an audio device; pull samples with [`ArcadeEngine::render`].
    pub fn headless(config: ArcadeConfig, sample_rate: f32, timer: Arc<dyn Timer>) -> Self {
        let mut mixer = Mixer::new(sample_rate, config.master_gain);
        mixer.set_volume(clamp_percent(config.volume));
        mixer.set_background_volume(clamp_percent(config.background_volume));
        let mixer = Arc::new(Mutex::new(mixer));
        let sequencer = Sequencer::new(MixerVoice::new(Arc::clone(&mixer)), Arc::clone(&timer), &config);
        let recorder = Arc::new(Recorder::new(config.recordings_dir.clone()));

        // A melody that ends on its own, or is halted, closes its recording
        let (hook_mixer, hook_recorder) = (Arc::clone(&mixer), Arc::clone(&recorder));
        sequencer.set_melody_hook(move || {
            if let Err(e) = hook_recorder.finish(&hook_mixer, Some(RecordingKind::Melody)) {
                log::error!("Could not save melody recording: {}", e);
            }
        });

        ArcadeEngine {
            config,
            mixer,
            sequencer,
            recorder,
            timer,
            tasks: Mutex::new(PendingTasks::default()),
            stream: None,
        }
    }

    fn start_stream(&mut self, device: &Device, config: StreamConfig) -> Result<(), ArcadeError> {
        let channels = config.channels as usize;
        let mixer = Arc::clone(&self.mixer);

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                lock(&mixer).render(data, channels);
            },
            |err| log::error!("Stream error: {}", err),
            None
        ).map_err(|e| ArcadeError::AudioError(e.to_string()))?;

        stream.play().map_err(|e| ArcadeError::AudioError(e.to_string()))?;
        self.stream = Some(stream);

        Ok(())
    }

    pub fn config(&self) -> &ArcadeConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &Sequencer<MixerVoice> {
        &self.sequencer
    }

    pub fn sample_rate(&self) -> f32 {
        lock(&self.mixer).sample_rate()
    }

    /// Mono render for headless use.
    pub fn render(&self, data: &mut [f32]) {
        lock(&self.mixer).render(data, 1);
    }

    pub fn set_master_frequency(&self, hz: f32) {
        self.sequencer.set_master_frequency(hz);
    }

    /// Volume of new tones and chords, and of the whole output right away.
    pub fn set_volume(&self, percent: f32) {
        self.sequencer.set_volume(percent);
        lock(&self.mixer).set_volume(clamp_percent(percent));
    }

    pub fn press_bit(&self, bit: Bit) {
        self.sequencer.press_bit(bit);
    }

    pub fn release_bit(&self, bit: Bit) {
        self.sequencer.release_bit(bit);
    }

    pub fn key_down(&self, bit: Bit) -> bool {
        self.sequencer.key_down(bit)
    }

    pub fn key_up(&self, bit: Bit) {
        self.sequencer.key_up(bit);
    }

    pub fn play_sequence(&self, text: &str) -> Result<usize, ArcadeError> {
        self.sequencer.play_sequence(text)
    }

    pub fn play_melody(&self, text: &str) -> Result<usize, ArcadeError> {
        self.sequencer.play_melody(text)
    }

    pub fn halt_melody(&self) {
        self.sequencer.halt_melody();
    }

    /// True while a tone sequence or melody is still advancing.
    pub fn is_busy(&self) -> bool {
        self.sequencer.is_sequence_active() || self.sequencer.is_melody_active()
    }

    /// Stops the arcade voice along with any sequence or melody.
    pub fn stop_generated(&self) {
        self.sequencer.stop();
    }

    pub fn stop_all(&self) {
        self.stop_generated();
        self.stop_background();
        self.stop_chord();
        if let Err(e) = self.stop_recording() {
            log::error!("Could not save recording: {}", e);
        }
    }

    // Recording

    pub fn start_recording(&self, kind: RecordingKind) -> Result<(), ArcadeError> {
        self.recorder.start(&self.mixer, kind)
    }

    pub fn stop_recording(&self) -> Result<Option<PathBuf>, ArcadeError> {
        cancel(&mut lock(&self.tasks).chord_record_stop);
        self.recorder.finish(&self.mixer, None)
    }

    pub fn recordings_dir(&self) -> &Path {
        self.recorder.output_dir()
    }

    pub fn recording_kind(&self) -> Option<RecordingKind> {
        lock(&self.mixer).recording_kind()
    }

    /// Recordings written to disk since the last call, including those finalized
    /// in the background.
    pub fn take_saved_recordings(&self) -> Vec<PathBuf> {
        self.recorder.take_saved()
    }

    /// Records while the melody plays; the file is written when the melody ends.
    pub fn record_melody(&self, text: &str) -> Result<usize, ArcadeError> {
        if text.trim().is_empty() {
            return Err(ArcadeError::EmptyInput("Enter a note sequence to record".to_string()));
        }

        self.recorder.start(&self.mixer, RecordingKind::Melody)?;
        match self.sequencer.play_melody(text) {
            Ok(count) => Ok(count),
            Err(e) => {
                self.recorder.discard(&self.mixer);
                Err(e)
            }
        }
    }

    /// Halts the melody and writes the recording now.
    pub fn stop_melody_recording(&self) -> Result<Option<PathBuf>, ArcadeError> {
        self.sequencer.halt_melody();
        self.recorder.finish(&self.mixer, Some(RecordingKind::Melody))
    }

    // Chord

    pub fn play_chord(&self, request: &ChordRequest) -> Result<usize, ArcadeError> {
        let frequencies = parse_chord_notes(&request.notes)?;
        let volume = self.sequencer.controls().volume;
        let duration = Duration::from_millis(request.duration_ms as u64);
        let delay = DelayParams::from_percent(
            self.config.chord_delay_time,
            self.config.chord_delay_feedback,
            request.delay_percent,
        );

        let mut tasks = lock(&self.tasks);
        cancel(&mut tasks.chord_cleanup);

        let (stop_time, recording) = {
            let mut mixer = lock(&self.mixer);
            let chord = ChordVoice::new(
                &frequencies,
                request.waveform,
                MAX_GAIN * volume / 100.0,
                mixer.now(),
                duration.as_secs_f64(),
                delay,
                mixer.sample_rate(),
            );
            let stop_time = chord.stop_time();
            mixer.set_chord(chord);
            (stop_time, mixer.recording_kind())
        };

        let weak = Arc::downgrade(&self.mixer);
        tasks.chord_cleanup = Some(self.timer.schedule(duration + CHORD_CLEANUP_GRACE, Box::new(move || {
            let Some(mixer) = weak.upgrade() else { return };
            let mut mixer = lock(&mixer);
            if mixer.chord().is_some_and(|c| c.stop_time() == stop_time) {
                mixer.clear_chord();
            }
        })));

        if recording == Some(RecordingKind::Chord) {
            cancel(&mut tasks.chord_record_stop);
            let (mixer, recorder) = (Arc::downgrade(&self.mixer), Arc::downgrade(&self.recorder));
            tasks.chord_record_stop = Some(self.timer.schedule(duration + CHORD_RECORD_TAIL, Box::new(move || {
                let (Some(mixer), Some(recorder)) = (mixer.upgrade(), recorder.upgrade()) else { return };
                if let Err(e) = recorder.finish(&mixer, Some(RecordingKind::Chord)) {
                    log::error!("Could not save chord recording: {}", e);
                }
            })));
        }

        Ok(frequencies.len())
    }

    /// Cuts the chord and its echo; an active chord recording is written out.
    pub fn stop_chord(&self) {
        {
            let mut tasks = lock(&self.tasks);
            cancel(&mut tasks.chord_cleanup);
            cancel(&mut tasks.chord_record_stop);
        }
        lock(&self.mixer).clear_chord();

        if let Err(e) = self.recorder.finish(&self.mixer, Some(RecordingKind::Chord)) {
            log::error!("Could not save chord recording: {}", e);
        }
    }

    pub fn is_chord_active(&self) -> bool {
        lock(&self.mixer).chord().is_some()
    }

    // Background track

    /// Decodes a WAV file as the new background track and returns its length in seconds.
    pub fn load_background(&self, path: &Path) -> Result<f32, ArcadeError> {
        let data = SampleData::load_wav(path)?;
        let seconds = data.duration_secs();

        cancel(&mut lock(&self.tasks).background_autostop);
        lock(&self.mixer).set_background(BackgroundTrack::new(data, 1.0));
        Ok(seconds)
    }

    /// Plays the loaded track from the start, looping, auto-stopped after the cap.
    pub fn play_background(&self) -> Result<(), ArcadeError> {
        let seconds = {
            let mut mixer = lock(&self.mixer);
            let track = mixer.background_mut()
                .ok_or_else(|| ArcadeError::FileError("Load a background track first".to_string()))?;
            track.play();
            track.data().duration_secs()
        };
        log::info!("Background track playing");

        let mut tasks = lock(&self.tasks);
        cancel(&mut tasks.background_autostop);

        let cap = self.config.max_background;
        if Duration::from_secs_f32(seconds) > cap {
            let weak = Arc::downgrade(&self.mixer);
            tasks.background_autostop = Some(self.timer.schedule(cap, Box::new(move || {
                let Some(mixer) = weak.upgrade() else { return };
                if let Some(track) = lock(&mixer).background_mut().filter(|t| t.is_playing()) {
                    track.stop();
                    log::warn!("Background track stopped automatically after {}s", cap.as_secs_f32());
                }
            })));
        }
        Ok(())
    }

    pub fn stop_background(&self) {
        cancel(&mut lock(&self.tasks).background_autostop);
        if let Some(track) = lock(&self.mixer).background_mut().filter(|t| t.is_playing()) {
            track.stop();
            log::info!("Background track stopped");
        }
    }

    pub fn is_background_playing(&self) -> bool {
        lock(&self.mixer).background().is_some_and(BackgroundTrack::is_playing)
    }

    pub fn set_background_volume(&self, percent: f32) {
        lock(&self.mixer).set_background_volume(clamp_percent(percent));
    }
}
