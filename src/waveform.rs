#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveformType {
    Sine,
    Square,
    Triangle,
    Sawtooth,
    Noise,
}

impl WaveformType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "sine" => Some(WaveformType::Sine),
            "square" => Some(WaveformType::Square),
            "triangle" => Some(WaveformType::Triangle),
            "sawtooth" | "saw" => Some(WaveformType::Sawtooth),
            "noise" => Some(WaveformType::Noise),
            _ => None,
        }
    }

    pub fn generate_sample(&self, phase: f32) -> f32 { // Phase should be in the range [0.0, 1.0)
        match self {
            WaveformType::Sine => (phase * std::f32::consts::TAU).sin(),
            WaveformType::Square => if phase < 0.5 { 1.0 } else { -1.0 },
            WaveformType::Sawtooth => phase * 2.0 - 1.0,
            WaveformType::Noise => fastrand::f32() * 2.0 - 1.0,
            WaveformType::Triangle => {
                if phase < 0.5 { phase * 4.0 - 1.0 } else { 3.0 - phase * 4.0 }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(WaveformType::from_name("Square"), Some(WaveformType::Square));
        assert_eq!(WaveformType::from_name(" sawtooth "), Some(WaveformType::Sawtooth));
        assert_eq!(WaveformType::from_name("pulse"), None);
    }

    #[test]
    fn samples_stay_in_range() {
        for wave in [WaveformType::Sine, WaveformType::Square, WaveformType::Triangle,
                     WaveformType::Sawtooth, WaveformType::Noise] {
            for i in 0..100 {
                let s = wave.generate_sample(i as f32 / 100.0);
                assert!((-1.0..=1.0).contains(&s), "{:?} out of range: {}", wave, s);
            }
        }
    }

    #[test]
    fn square_flips_at_half_period() {
        assert_eq!(WaveformType::Square.generate_sample(0.25), 1.0);
        assert_eq!(WaveformType::Square.generate_sample(0.75), -1.0);
    }
}
