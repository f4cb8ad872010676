use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct DelayParams {
    pub time: f32, // seconds
    pub feedback: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        DelayParams {
            time: 0.5,
            feedback: 0.5,
        }
    }
}

impl DelayParams {
    /// Echo for the chord player: base feedback scaled by the "delay amount" slider.
    pub fn from_percent(time: f32, base_feedback: f32, percent: f32) -> Option<Self> {
        if percent <= 0.0 {
            return None;
        }
        Some(DelayParams {
            time,
            feedback: base_feedback * (percent.min(100.0) / 100.0),
        })
    }
}

/// Feedback echo line. The output is only the delayed signal; callers mix it with the dry one.
pub struct FeedbackDelay {
    params: DelayParams,
    delay_samples: usize,
    buffer: VecDeque<f32>,
}

impl FeedbackDelay {
    pub const MAX_DELAY_SECONDS: f32 = 1.0;

    pub fn new(sample_rate: f32, params: DelayParams) -> Self {
        let capacity = ((sample_rate * Self::MAX_DELAY_SECONDS) as usize).max(2);
        let delay_samples = ((params.time * sample_rate).round() as usize).clamp(1, capacity - 1);

        FeedbackDelay {
            params,
            delay_samples,
            buffer: VecDeque::from(vec![0.0; capacity]),
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.delay_samples - 1];
        Self::cycle_buffer(&mut self.buffer, input + delayed * self.params.feedback);
        delayed
    }

    #[inline]
    fn cycle_buffer(buffer: &mut VecDeque<f32>, new_value: f32) {
        buffer.pop_back();
        buffer.push_front(new_value);
    }
}
