/// A time-automated audio parameter (gain, frequency).
///
/// Values are scheduled against the mixer clock in seconds. Between a point and a
/// following ramp the value moves linearly; after the last event it holds.
#[derive(Debug, Clone)]
pub struct Param {
    base_time: f64,
    base_value: f32,
    events: Vec<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    Set { time: f64, value: f32 },
    Ramp { time: f64, value: f32 },
}

impl Event {
    fn time(&self) -> f64 {
        match *self {
            Event::Set { time, .. } | Event::Ramp { time, .. } => time,
        }
    }

    fn value(&self) -> f32 {
        match *self {
            Event::Set { value, .. } | Event::Ramp { value, .. } => value,
        }
    }
}

impl Param {
    pub fn new(value: f32) -> Self {
        Param { base_time: 0.0, base_value: value, events: Vec::new() }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(Event::Set { time, value });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(Event::Ramp { time, value });
    }

    /// Drops every event at or after `time` and pins the value it had at that instant,
    /// so a following ramp starts from where the parameter actually is.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        let current = self.value_at(time);
        self.events.retain(|e| e.time() < time);
        self.events.push(Event::Set { time, value: current });
    }

    pub fn value_at(&self, time: f64) -> f32 {
        let (mut t0, mut v0) = (self.base_time, self.base_value);

        for event in &self.events {
            if event.time() <= time {
                t0 = event.time();
                v0 = event.value();
                continue;
            }
            return match *event {
                Event::Ramp { time: t1, value: v1 } if t1 > t0 => {
                    let progress = ((time - t0) / (t1 - t0)) as f32;
                    v0 + (v1 - v0) * progress
                }
                _ => v0,
            };
        }

        v0
    }

    /// Value the parameter settles at once every scheduled event has passed.
    pub fn final_value(&self) -> f32 {
        self.events.last().map(Event::value).unwrap_or(self.base_value)
    }

    /// Folds events that are entirely in the past into the base point.
    pub fn prune(&mut self, time: f64) {
        let passed = self.events.iter().take_while(|e| e.time() <= time).count();
        if passed == 0 {
            return;
        }
        let last = self.events[passed - 1];
        self.base_time = last.time();
        self.base_value = last.value();
        self.events.drain(..passed);
    }

    fn insert(&mut self, event: Event) {
        // Equal times keep insertion order
        let idx = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(idx, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn holds_initial_value() {
        let p = Param::new(0.25);
        assert_eq!(p.value_at(0.0), 0.25);
        assert_eq!(p.value_at(10.0), 0.25);
    }

    #[test]
    fn linear_ramp_interpolates() {
        let mut p = Param::new(0.0);
        p.set_value_at_time(0.0, 1.0);
        p.linear_ramp_to_value_at_time(1.0, 2.0);
        assert!(close(p.value_at(1.0), 0.0));
        assert!(close(p.value_at(1.5), 0.5));
        assert!(close(p.value_at(2.0), 1.0));
        assert!(close(p.value_at(3.0), 1.0));
    }

    #[test]
    fn ramp_without_anchor_starts_from_base() {
        let mut p = Param::new(0.4);
        p.linear_ramp_to_value_at_time(0.0, 0.1);
        assert!(close(p.value_at(0.05), 0.2));
    }

    #[test]
    fn cancel_pins_current_value() {
        let mut p = Param::new(0.0);
        p.linear_ramp_to_value_at_time(1.0, 1.0);
        p.cancel_scheduled_values(0.5);
        assert!(close(p.value_at(0.5), 0.5));
        assert!(close(p.value_at(5.0), 0.5));

        p.linear_ramp_to_value_at_time(0.0, 1.0);
        assert!(close(p.value_at(0.75), 0.25));
    }

    #[test]
    fn prune_keeps_values_identical() {
        let mut p = Param::new(0.0);
        p.set_value_at_time(0.5, 0.1);
        p.linear_ramp_to_value_at_time(1.0, 0.3);
        p.linear_ramp_to_value_at_time(0.0, 0.5);

        let before: Vec<f32> = (0..10).map(|i| p.value_at(0.2 + i as f64 * 0.05)).collect();
        p.prune(0.2);
        let after: Vec<f32> = (0..10).map(|i| p.value_at(0.2 + i as f64 * 0.05)).collect();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!(close(*a, *b));
        }
        assert_eq!(p.final_value(), 0.0);
    }
}
