use viewport_sense_protocol::{ScrollDirection, ScrollState};

/// Raw scroll reading taken from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub y: f64,
    /// Host clock, milliseconds.
    pub time_ms: f64,
    pub document_height: f64,
    pub window_height: f64,
}

/// Last-sample memory for one scroll subscription.
///
/// Each subscription owns its own tracker; two consumers observing scroll
/// at the same time never see each other's previous sample.
#[derive(Debug, Clone)]
pub struct ScrollTracker {
    last_y: f64,
    last_time_ms: f64,
    margin: f64,
}

impl ScrollTracker {
    /// Start tracking from `initial`, with `margin` px for the near-top and
    /// near-bottom flags.
    pub fn new(initial: &ScrollSample, margin: f64) -> Self {
        Self {
            last_y: sanitize_offset(initial.y),
            last_time_ms: initial.time_ms,
            margin,
        }
    }

    /// Derive a [`ScrollState`] from `sample` and remember it as the previous
    /// sample.
    pub fn update(&mut self, sample: &ScrollSample) -> ScrollState {
        let y = sanitize_offset(sample.y);
        let delta_y = y - self.last_y;
        let delta_t = sample.time_ms - self.last_time_ms;
        let velocity = if delta_t > 0.0 {
            (delta_y / delta_t).abs() * 1000.0
        } else {
            0.0
        };

        self.last_y = y;
        self.last_time_ms = sample.time_ms;

        ScrollState {
            y,
            direction_y: ScrollDirection::from_delta(delta_y),
            velocity,
            is_near_top: y < self.margin,
            is_near_bottom: y > sample.document_height - sample.window_height - self.margin,
        }
    }
}

/// Elastic overscroll reports negative offsets; NaN comes from broken hosts.
fn sanitize_offset(y: f64) -> f64 {
    if y.is_finite() { y.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(y: f64, time_ms: f64) -> ScrollSample {
        ScrollSample {
            y,
            time_ms,
            document_height: 3000.0,
            window_height: 800.0,
        }
    }

    #[test]
    fn velocity_in_pixels_per_second() {
        let mut tracker = ScrollTracker::new(&sample(0.0, 0.0), 100.0);
        let state = tracker.update(&sample(200.0, 100.0));
        assert_eq!(state.direction_y, ScrollDirection::Down);
        assert!((state.velocity - 2000.0).abs() < 1e-9);

        let state = tracker.update(&sample(150.0, 200.0));
        assert_eq!(state.direction_y, ScrollDirection::Up);
        assert!((state.velocity - 500.0).abs() < 1e-9);
    }

    #[test]
    fn same_timestamp_has_zero_velocity() {
        let mut tracker = ScrollTracker::new(&sample(0.0, 50.0), 100.0);
        let state = tracker.update(&sample(400.0, 50.0));
        assert_eq!(state.velocity, 0.0);
        assert_eq!(state.direction_y, ScrollDirection::Down);
    }

    #[test]
    fn clock_going_backwards_is_not_negative() {
        let mut tracker = ScrollTracker::new(&sample(0.0, 100.0), 100.0);
        let state = tracker.update(&sample(10.0, 90.0));
        assert_eq!(state.velocity, 0.0);
    }

    #[test]
    fn edge_flags() {
        let mut tracker = ScrollTracker::new(&sample(0.0, 0.0), 100.0);
        let top = tracker.update(&sample(99.0, 10.0));
        assert!(top.is_near_top);
        assert!(!top.is_near_bottom);

        let bottom = tracker.update(&sample(2101.0, 20.0));
        assert!(!bottom.is_near_top);
        assert!(bottom.is_near_bottom);

        // 3000 - 800 - 100 = 2100 is not strictly past the margin.
        let edge = tracker.update(&sample(2100.0, 30.0));
        assert!(!edge.is_near_bottom);
    }

    #[test]
    fn negative_overscroll_clamps_to_zero() {
        let mut tracker = ScrollTracker::new(&sample(0.0, 0.0), 100.0);
        let state = tracker.update(&sample(-30.0, 16.0));
        assert_eq!(state.y, 0.0);
        assert_eq!(state.direction_y, ScrollDirection::None);
    }
}
