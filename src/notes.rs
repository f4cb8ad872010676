// Equal-tempered note frequencies, A4 = 440 Hz, octaves 3 to 6.
const NOTE_TABLE: [(&str, f32); 48] = [
    ("C3", 130.81), ("C#3", 138.59), ("D3", 146.83), ("D#3", 155.56), ("E3", 164.81), ("F3", 174.61),
    ("F#3", 185.00), ("G3", 196.00), ("G#3", 207.65), ("A3", 220.00), ("A#3", 233.08), ("B3", 246.94),
    ("C4", 261.63), ("C#4", 277.18), ("D4", 293.66), ("D#4", 311.13), ("E4", 329.63), ("F4", 349.23),
    ("F#4", 369.99), ("G4", 392.00), ("G#4", 415.30), ("A4", 440.00), ("A#4", 466.16), ("B4", 493.88),
    ("C5", 523.25), ("C#5", 554.37), ("D5", 587.33), ("D#5", 622.25), ("E5", 659.25), ("F5", 698.46),
    ("F#5", 739.99), ("G5", 783.99), ("G#5", 830.61), ("A5", 880.00), ("A#5", 932.33), ("B5", 987.77),
    ("C6", 1046.50), ("C#6", 1108.73), ("D6", 1174.66), ("D#6", 1244.51), ("E6", 1318.51), ("F6", 1396.91),
    ("F#6", 1479.98), ("G6", 1567.98), ("G#6", 1661.22), ("A6", 1760.00), ("A#6", 1864.66), ("B6", 1975.53),
];

/// Frequency in Hz for a note name such as `"F#5"`. Names are matched case-insensitively.
pub fn note_frequency(name: &str) -> Option<f32> {
    let name = name.trim().to_uppercase();
    NOTE_TABLE.iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, freq)| freq)
}

/// `pausa`, `silencio` and `_` all mean "no sound for this step".
pub fn is_silence_token(token: &str) -> bool {
    let token = token.trim();
    token == "_" || token.eq_ignore_ascii_case("pausa") || token.eq_ignore_ascii_case("silencio")
}

pub fn note_names() -> impl Iterator<Item = &'static str> {
    NOTE_TABLE.iter().map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_four_octaves() {
        assert_eq!(note_names().count(), 48);
        assert_eq!(note_frequency("C3"), Some(130.81));
        assert_eq!(note_frequency("B6"), Some(1975.53));
    }

    #[test]
    fn a4_is_reference_pitch() {
        assert_eq!(note_frequency("A4"), Some(440.0));
        assert_eq!(note_frequency("A5"), Some(880.0));
    }

    #[test]
    fn lookup_normalizes_case() {
        assert_eq!(note_frequency("f#5"), Some(739.99));
        assert_eq!(note_frequency(" c4 "), Some(261.63));
    }

    #[test]
    fn unknown_names_miss() {
        assert_eq!(note_frequency("H4"), None);
        assert_eq!(note_frequency("C7"), None);
        assert_eq!(note_frequency("Db4"), None);
        assert_eq!(note_frequency(""), None);
    }

    #[test]
    fn table_is_ascending() {
        let freqs: Vec<f32> = note_names().filter_map(note_frequency).collect();
        assert!(freqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn silence_tokens() {
        assert!(is_silence_token("pausa"));
        assert!(is_silence_token("SILENCIO"));
        assert!(is_silence_token("_"));
        assert!(!is_silence_token("__"));
        assert!(!is_silence_token("rest"));
    }
}
