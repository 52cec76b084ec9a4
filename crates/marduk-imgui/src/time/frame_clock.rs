use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,
    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

/// Produces clamped per-frame delta times.
///
/// A host debugger pause or a minimized window would otherwise hand every UI
/// context a multi-second delta on resume.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Clock whose first tick measures from `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            last: start,
            frame_index: 0,
            dt_min: Duration::from_micros(100),
            dt_max: Duration::from_millis(250),
        }
    }

    /// Replaces the delta-time clamps.
    pub fn with_clamps(mut self, dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        self.dt_min = dt_min;
        self.dt_max = dt_max;
        self
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    ///
    /// A `now` earlier than the previous tick yields the minimum delta.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime { dt: dt.as_secs_f32(), frame_index: self.frame_index };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_index_counts_ticks() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        assert_eq!(clock.tick_at(start + Duration::from_millis(16)).frame_index, 0);
        assert_eq!(clock.tick_at(start + Duration::from_millis(32)).frame_index, 1);
    }

    #[test]
    fn long_stall_is_clamped() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert!((ft.dt - 0.25).abs() < 1e-6);
    }

    #[test]
    fn zero_delta_is_raised_to_minimum() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        let ft = clock.tick_at(start);
        assert!(ft.dt > 0.0);
    }
}
