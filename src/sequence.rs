use crate::notes::{is_silence_token, note_frequency};
use crate::tone::ToneRequest;
use crate::utils::{all_digits, parse_leading_int};

pub const DEFAULT_NOTE_MS: u32 = 250;

const HIGH_BIT_RATIO: f32 = 1.1;
const LOW_BIT_RATIO: f32 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    One,
    Zero,
}

impl Bit {
    pub fn frequency(&self, master_frequency: f32) -> f32 {
        match self {
            Bit::One => master_frequency * HIGH_BIT_RATIO,
            Bit::Zero => master_frequency * LOW_BIT_RATIO,
        }
    }
}

/// One recognized segment of the tone mini-language.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SequenceStep {
    Bit(Bit),
    ExplicitHz(f32),
    ExplicitPercent(f32),
    RawNumber(f32),
    Silence,
}

/// Live slider values a step resolves against when it plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Controls {
    pub master_frequency: f32,
    pub volume: f32,
}

impl SequenceStep {
    /// Rules in order, first match wins. A bare "1" is always the high bit, never 1 Hz.
    pub fn parse(segment: &str) -> Option<SequenceStep> {
        let segment = segment.trim();
        let lower = segment.to_lowercase();

        if segment == "1" {
            return Some(SequenceStep::Bit(Bit::One));
        }
        if segment == "0" {
            return Some(SequenceStep::Bit(Bit::Zero));
        }
        if let Some(hz) = lower.strip_suffix("hz").filter(|d| all_digits(d)) {
            return Some(SequenceStep::ExplicitHz(parse_digits(hz)));
        }
        if let Some(pct) = segment.strip_suffix('%').filter(|d| all_digits(d)) {
            return Some(SequenceStep::ExplicitPercent(parse_digits(pct)));
        }
        if all_digits(segment) {
            return Some(SequenceStep::RawNumber(parse_digits(segment)));
        }
        if is_silence_token(segment) {
            return Some(SequenceStep::Silence);
        }
        None
    }

    /// What the voice should play for this step, or `None` for a silence.
    pub fn tone(&self, controls: &Controls) -> Option<ToneRequest> {
        let master = controls.master_frequency;
        let volume = controls.volume;
        match *self {
            SequenceStep::Bit(bit) => Some(ToneRequest::new(bit.frequency(master), volume)),
            SequenceStep::ExplicitHz(hz) | SequenceStep::RawNumber(hz) => Some(ToneRequest::new(hz, volume)),
            SequenceStep::ExplicitPercent(pct) => Some(ToneRequest::new(master, pct)),
            SequenceStep::Silence => None,
        }
    }
}

fn parse_digits(digits: &str) -> f32 {
    digits.parse::<f32>().unwrap_or(f32::MAX)
}

/// Splits on `,` keeping one slot per segment. Unrecognized segments become `None`
/// (logged) so they still take up their slot in the timeline.
pub fn tokenize_sequence(text: &str) -> Vec<Option<SequenceStep>> {
    text.trim()
        .split(',')
        .map(|segment| {
            let step = SequenceStep::parse(segment);
            if step.is_none() {
                log::warn!("Unknown sequence segment '{}', ignoring", segment.trim());
            }
            step
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MelodyStep {
    pub note: String,
    pub duration_ms: u32,
}

impl MelodyStep {
    pub fn is_silence(&self) -> bool {
        is_silence_token(&self.note)
    }

    /// Frequency to play, `None` for pauses and for names outside the note table.
    pub fn frequency(&self) -> Option<f32> {
        if self.is_silence() {
            return None;
        }
        let freq = note_frequency(&self.note);
        if freq.is_none() {
            log::warn!("Unknown note '{}', treating as silence", self.note);
        }
        freq
    }
}

/// Duration in ms from the text after `:`, or why it can't be used.
fn parse_duration(raw: Option<&str>) -> Result<u32, &'static str> {
    let Some(raw) = raw else { return Err("missing") };
    match parse_leading_int(raw) {
        Some(ms) if ms > 0 => Ok(ms.min(u32::MAX as i64) as u32),
        Some(_) => Err("not positive"),
        None => Err("not a number"),
    }
}

/// Parses `"C4:250, D4:500, _:300"`. Missing, non-numeric or non-positive durations
/// fall back to `default_ms` with a warning.
pub fn parse_melody(text: &str, default_ms: u32) -> Vec<MelodyStep> {
    text.trim()
        .split(',')
        .map(|segment| {
            let mut parts = segment.trim().split(':');
            let note = parts.next().unwrap_or("").trim().to_uppercase();
            let raw = parts.next();

            let duration_ms = match parse_duration(raw) {
                Ok(ms) => ms,
                Err(reason) => {
                    log::warn!("Invalid duration for {} ({}): {:?}, using {}ms", note, reason, raw.map(str::trim), default_ms);
                    default_ms
                }
            };

            MelodyStep { note, duration_ms }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTROLS: Controls = Controls { master_frequency: 400.0, volume: 60.0 };

    #[test]
    fn tokenizes_every_rule() {
        let steps = tokenize_sequence("1,0,300hz,80%,pausa");
        assert_eq!(steps, vec![
            Some(SequenceStep::Bit(Bit::One)),
            Some(SequenceStep::Bit(Bit::Zero)),
            Some(SequenceStep::ExplicitHz(300.0)),
            Some(SequenceStep::ExplicitPercent(80.0)),
            Some(SequenceStep::Silence),
        ]);
    }

    #[test]
    fn unknown_segments_keep_their_slot() {
        let steps = tokenize_sequence("foo,1");
        assert_eq!(steps, vec![None, Some(SequenceStep::Bit(Bit::One))]);
    }

    #[test]
    fn whitespace_and_case() {
        assert_eq!(SequenceStep::parse("  440HZ "), Some(SequenceStep::ExplicitHz(440.0)));
        assert_eq!(SequenceStep::parse("SILENCIO"), Some(SequenceStep::Silence));
        assert_eq!(SequenceStep::parse("_"), Some(SequenceStep::Silence));
        assert_eq!(SequenceStep::parse("250"), Some(SequenceStep::RawNumber(250.0)));
        assert_eq!(SequenceStep::parse("hz"), None);
        assert_eq!(SequenceStep::parse("%"), None);
        assert_eq!(SequenceStep::parse("3.5hz"), None);
        assert_eq!(SequenceStep::parse(""), None);
    }

    #[test]
    fn bare_one_is_a_bit_not_a_frequency() {
        assert_eq!(SequenceStep::parse("1"), Some(SequenceStep::Bit(Bit::One)));
        assert_eq!(SequenceStep::parse("01"), Some(SequenceStep::RawNumber(1.0)));
        assert_eq!(SequenceStep::parse("1hz"), Some(SequenceStep::ExplicitHz(1.0)));
    }

    #[test]
    fn steps_resolve_against_controls() {
        let tone = |s: &str| SequenceStep::parse(s).unwrap().tone(&CONTROLS);

        let high = tone("1").unwrap();
        assert!((high.frequency - 440.0).abs() < 1e-3);
        assert_eq!(high.volume, 60.0);

        let low = tone("0").unwrap();
        assert!((low.frequency - 360.0).abs() < 1e-3);

        assert_eq!(tone("80%"), Some(ToneRequest::new(400.0, 80.0)));
        assert_eq!(tone("300hz"), Some(ToneRequest::new(300.0, 60.0)));
        assert_eq!(tone("5000").unwrap().frequency, 2000.0);
        assert_eq!(tone("1hz").unwrap().frequency, 20.0);
        assert_eq!(tone("pausa"), None);
    }

    #[test]
    fn silence_words_are_interchangeable() {
        for word in ["pausa", "silencio", "_", "Pausa"] {
            assert_eq!(SequenceStep::parse(word), Some(SequenceStep::Silence));
        }
    }

    #[test]
    fn melody_durations_default_when_invalid() {
        let steps = parse_melody("C4:0,D4:-5,E4", DEFAULT_NOTE_MS);
        let durations: Vec<u32> = steps.iter().map(|s| s.duration_ms).collect();
        assert_eq!(durations, vec![250, 250, 250]);

        let steps = parse_melody("c4:abc, d#4:120ms", DEFAULT_NOTE_MS);
        assert_eq!(steps[0], MelodyStep { note: "C4".to_string(), duration_ms: 250 });
        assert_eq!(steps[1], MelodyStep { note: "D#4".to_string(), duration_ms: 120 });
    }

    #[test]
    fn missing_duration_counts_as_invalid() {
        assert_eq!(parse_duration(None), Err("missing"));
        assert_eq!(parse_duration(Some("")), Err("not a number"));
        assert_eq!(parse_duration(Some("-5")), Err("not positive"));
        assert_eq!(parse_duration(Some(" 300ms")), Ok(300));
    }

    #[test]
    fn melody_notes_resolve_or_fall_silent() {
        let steps = parse_melody("a4:100, _:300, pausa, zz9:50", DEFAULT_NOTE_MS);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].frequency(), Some(440.0));
        assert!(steps[1].is_silence());
        assert_eq!(steps[1].frequency(), None);
        assert!(steps[2].is_silence());
        assert!(!steps[3].is_silence());
        assert_eq!(steps[3].frequency(), None);
    }
}
