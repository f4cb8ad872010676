use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::config::{clamp_frequency, clamp_percent, ArcadeConfig};
use crate::error::ArcadeError;
use crate::sequence::{parse_melody, tokenize_sequence, Bit, Controls, MelodyStep, SequenceStep};
use crate::timer::{TaskHandle, Timer};
use crate::tone::ToneRequest;
use crate::utils::lock;

/// Whatever actually makes the sound. Only one logical voice exists, so every
/// `play` implicitly replaces the previous tone.
pub trait Voice: Send {
    fn play(&mut self, request: ToneRequest);
    fn stop(&mut self);
}

pub type SessionHook = Box<dyn FnMut() + Send>;

struct SequenceSession {
    id: u64,
    slots: Vec<Option<SequenceStep>>,
    index: usize,
    task: Option<TaskHandle>,
}

struct MelodySession {
    id: u64,
    steps: Vec<MelodyStep>,
    index: usize,
    playing: bool,
    task: Option<TaskHandle>,
}

struct State {
    controls: Controls,
    step_delay: Duration,
    default_note_ms: u32,
    next_id: u64,
    sequence: Option<SequenceSession>,
    melody: Option<MelodySession>,
    held: HashSet<Bit>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

// Lock order: state, then voice. The hook is only called with neither held.
struct Shared<V> {
    state: Mutex<State>,
    voice: Mutex<V>,
    timer: Arc<dyn Timer>,
    melody_hook: Mutex<Option<SessionHook>>,
}

/// Drives the shared voice from the tone mini-language, melodies and bit buttons.
/// At most one sequence session and one melody session exist, and starting either
/// silences and discards both.
pub struct Sequencer<V: Voice + 'static> {
    shared: Arc<Shared<V>>,
}

impl<V: Voice + 'static> Clone for Sequencer<V> {
    fn clone(&self) -> Self {
        Sequencer { shared: Arc::clone(&self.shared) }
    }
}

impl<V: Voice + 'static> Sequencer<V> {
    pub fn new(voice: V, timer: Arc<dyn Timer>, config: &ArcadeConfig) -> Self {
        let state = State {
            controls: Controls {
                master_frequency: clamp_frequency(config.master_frequency),
                volume: clamp_percent(config.volume),
            },
            step_delay: config.step_delay,
            default_note_ms: config.default_note_ms,
            next_id: 0,
            sequence: None,
            melody: None,
            held: HashSet::new(),
        };

        Sequencer {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                voice: Mutex::new(voice),
                timer,
                melody_hook: Mutex::new(None),
            }),
        }
    }

    pub fn with_voice<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut *lock(&self.shared.voice))
    }

    pub fn controls(&self) -> Controls {
        lock(&self.shared.state).controls
    }

    pub fn set_master_frequency(&self, hz: f32) {
        lock(&self.shared.state).controls.master_frequency = clamp_frequency(hz);
    }

    pub fn set_volume(&self, percent: f32) {
        lock(&self.shared.state).controls.volume = clamp_percent(percent);
    }

    /// Called whenever a melody session ends on its own: list exhausted or halted
    /// through [`Sequencer::halt_melody`].
    pub fn set_melody_hook(&self, hook: impl FnMut() + Send + 'static) {
        *lock(&self.shared.melody_hook) = Some(Box::new(hook));
    }

    pub fn is_sequence_active(&self) -> bool {
        lock(&self.shared.state).sequence.is_some()
    }

    pub fn is_melody_active(&self) -> bool {
        lock(&self.shared.state).melody.is_some()
    }

    pub fn press_bit(&self, bit: Bit) {
        let state = lock(&self.shared.state);
        let controls = state.controls;
        lock(&self.shared.voice).play(ToneRequest::new(bit.frequency(controls.master_frequency), controls.volume));
    }

    pub fn release_bit(&self, _bit: Bit) {
        self.stop();
    }

    /// Keyboard variant of [`Sequencer::press_bit`]: auto-repeat is ignored until the key
    /// goes up. Returns whether this press started a tone.
    pub fn key_down(&self, bit: Bit) -> bool {
        let mut state = lock(&self.shared.state);
        if !state.held.insert(bit) {
            return false;
        }
        let controls = state.controls;
        lock(&self.shared.voice).play(ToneRequest::new(bit.frequency(controls.master_frequency), controls.volume));
        true
    }

    pub fn key_up(&self, bit: Bit) {
        lock(&self.shared.state).held.remove(&bit);
        self.stop();
    }

    /// Silences the voice and discards any sequence or melody in flight.
    pub fn stop(&self) {
        let mut state = lock(&self.shared.state);
        let mut voice = lock(&self.shared.voice);
        Self::stop_locked(&mut state, &mut *voice);
    }

    fn stop_locked(state: &mut State, voice: &mut V) {
        if let Some(task) = state.sequence.take().and_then(|s| s.task) {
            task.cancel();
        }
        if let Some(task) = state.melody.take().and_then(|m| m.task) {
            task.cancel();
        }
        voice.stop();
    }

    /// Starts the comma-separated tone sequence, returning how many steps it has.
    pub fn play_sequence(&self, text: &str) -> Result<usize, ArcadeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ArcadeError::EmptyInput("Enter a valid sequence (e.g. 1,0,300hz,80%)".to_string()));
        }

        let slots = tokenize_sequence(text);
        let count = slots.len();

        let mut state = lock(&self.shared.state);
        {
            let mut voice = lock(&self.shared.voice);
            Self::stop_locked(&mut state, &mut *voice);
        }
        let id = state.next_id();
        state.sequence = Some(SequenceSession { id, slots, index: 0, task: None });
        log::debug!("Sequence {} started with {} steps", id, count);

        Self::advance_sequence(&self.shared, &mut state, id);
        Ok(count)
    }

    fn advance_sequence(shared: &Arc<Shared<V>>, state: &mut State, id: u64) {
        let next = match state.sequence.as_mut() {
            Some(session) if session.id == id => {
                let slot = session.slots.get(session.index).copied();
                session.index += 1;
                slot
            }
            _ => return,
        };

        let Some(slot) = next else {
            lock(&shared.voice).stop();
            state.sequence = None;
            log::debug!("Sequence {} finished", id);
            return;
        };

        // Unrecognized segments make no sound but still take a step's time
        let sounded = match slot {
            Some(step) => {
                let mut voice = lock(&shared.voice);
                match step.tone(&state.controls) {
                    Some(request) => voice.play(request),
                    None => voice.stop(),
                }
                true
            }
            None => false,
        };

        let weak = Arc::downgrade(shared);
        let handle = shared.timer.schedule(state.step_delay, Box::new(move || {
            Self::sequence_step_elapsed(&weak, id, sounded);
        }));
        if let Some(session) = state.sequence.as_mut() {
            session.task = Some(handle);
        }
    }

    fn sequence_step_elapsed(weak: &Weak<Shared<V>>, id: u64, sounded: bool) {
        let Some(shared) = weak.upgrade() else { return };
        let mut state = lock(&shared.state);
        if !state.sequence.as_ref().is_some_and(|s| s.id == id) {
            return;
        }
        if sounded {
            lock(&shared.voice).stop();
        }
        Self::advance_sequence(&shared, &mut state, id);
    }

    /// Starts a `NOTE[:ms]` melody, returning how many notes it has.
    pub fn play_melody(&self, text: &str) -> Result<usize, ArcadeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ArcadeError::EmptyInput("Enter a note sequence (e.g. C4:250, D4:500)".to_string()));
        }

        let (ended, count) = {
            let mut state = lock(&self.shared.state);
            let steps = parse_melody(text, state.default_note_ms);
            let count = steps.len();
            {
                let mut voice = lock(&self.shared.voice);
                Self::stop_locked(&mut state, &mut *voice);
            }
            let id = state.next_id();
            state.melody = Some(MelodySession { id, steps, index: 0, playing: true, task: None });
            log::debug!("Melody {} started with {} notes", id, count);

            (Self::advance_melody(&self.shared, &mut state, id), count)
        };

        if ended {
            Self::fire_melody_hook(&self.shared);
        }
        Ok(count)
    }

    /// External stop request: the melody is marked not-playing and silenced now, and
    /// its already queued continuation ends the session when it fires.
    pub fn halt_melody(&self) {
        let mut state = lock(&self.shared.state);
        if let Some(melody) = state.melody.as_mut() {
            melody.playing = false;
            lock(&self.shared.voice).stop();
        }
    }

    /// Returns true when the session ended and the hook should run.
    fn advance_melody(shared: &Arc<Shared<V>>, state: &mut State, id: u64) -> bool {
        let next = match state.melody.as_mut() {
            Some(melody) if melody.id == id => {
                if melody.playing {
                    let step = melody.steps.get(melody.index).cloned();
                    melody.index += 1;
                    step
                } else {
                    None
                }
            }
            _ => return false,
        };

        let Some(step) = next else {
            lock(&shared.voice).stop();
            if let Some(task) = state.melody.take().and_then(|m| m.task) {
                task.cancel();
            }
            log::debug!("Melody {} finished", id);
            return true;
        };

        {
            let mut voice = lock(&shared.voice);
            match step.frequency() {
                Some(freq) if freq > 0.0 => voice.play(ToneRequest::new(freq, state.controls.volume)),
                _ => voice.stop(),
            }
        }

        let weak = Arc::downgrade(shared);
        let delay = Duration::from_millis(step.duration_ms as u64);
        let handle = shared.timer.schedule(delay, Box::new(move || {
            Self::melody_step_elapsed(&weak, id);
        }));
        if let Some(melody) = state.melody.as_mut() {
            melody.task = Some(handle);
        }
        false
    }

    fn melody_step_elapsed(weak: &Weak<Shared<V>>, id: u64) {
        let Some(shared) = weak.upgrade() else { return };

        let finished = {
            let mut state = lock(&shared.state);
            let playing = match state.melody.as_ref() {
                Some(melody) if melody.id == id => melody.playing,
                _ => return,
            };
            if playing {
                lock(&shared.voice).stop();
            }
            Self::advance_melody(&shared, &mut state, id)
        };

        if finished {
            Self::fire_melody_hook(&shared);
        }
    }

    fn fire_melody_hook(shared: &Arc<Shared<V>>) {
        let hook = lock(&shared.melody_hook).take();
        if let Some(mut hook) = hook {
            hook();
            let mut slot = lock(&shared.melody_hook);
            // Keep a hook installed while this one ran
            if slot.is_none() {
                *slot = Some(hook);
            }
        }
    }
}
