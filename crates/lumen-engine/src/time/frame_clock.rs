use std::time::{Duration, Instant};

/// Timing of one frame, handed to scene nodes before rendering.
#[derive(Debug, Copy, Clone, Default)]
pub struct FrameTime {
    /// Seconds since the previous frame, clamped.
    pub dt: f32,
    /// Seconds since the clock was created.
    pub elapsed: f32,
    /// Starts at zero.
    pub frame_index: u64,
    /// Smoothed frames per second after this frame.
    pub framerate: f32,
}

/// Weight of the newest sample in the smoothed frame rate.
const FRAMERATE_WEIGHT: f32 = 0.6;

/// Per-loop frame timer.
///
/// The frame rate is smoothed exponentially:
/// `0.6 * current + 0.4 * previous`. Delta time is clamped so a stall
/// (debugger, minimized window) does not read as a near-zero frame rate.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
    frame_index: u64,
    clamp: (Duration, Duration),
    framerate: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            frame_index: 0,
            clamp: (dt_min, dt_max),
            framerate: 0.0,
        }
    }

    /// Closes the current frame.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let (lo, hi) = self.clamp;
        let dt = now.saturating_duration_since(self.last).clamp(lo, hi).as_secs_f32();
        self.last = now;

        self.framerate = smooth_framerate(self.framerate, 1.0 / dt);
        let time = FrameTime {
            dt,
            elapsed: now.saturating_duration_since(self.start).as_secs_f32(),
            frame_index: self.frame_index,
            framerate: self.framerate,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
    }

    /// Smoothed frames per second; zero before the first tick.
    pub fn framerate(&self) -> f32 {
        self.framerate
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn smooth_framerate(previous: f32, current: f32) -> f32 {
    FRAMERATE_WEIGHT * current + (1.0 - FRAMERATE_WEIGHT) * previous
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framerate_blends_new_and_old_samples() {
        assert!((smooth_framerate(0.0, 100.0) - 60.0).abs() < 1e-3);
        assert!((smooth_framerate(50.0, 100.0) - 80.0).abs() < 1e-3);
    }

    #[test]
    fn tick_clamps_delta_and_counts_frames() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(10), Duration::from_millis(20));
        let a = clock.tick();
        let b = clock.tick();

        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert!(a.dt >= 0.010 && a.dt <= 0.020);
        assert!(b.elapsed >= a.elapsed);
        // 1 / dt is between 50 and 100 fps; two samples blend to at least 0.84 of that.
        assert!(clock.framerate() > 40.0);
    }
}
