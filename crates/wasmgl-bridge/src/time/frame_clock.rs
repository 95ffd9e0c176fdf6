use std::time::{Duration, Instant};

/// Weight of a new FPS sample.
const FPS_SMOOTHING: f32 = 0.1;
/// Weight of a new CPU frame time sample.
const CPU_SMOOTHING: f32 = 0.2;

/// Exponential moving average: `old * (1 - alpha) + new * alpha`.
#[inline]
pub fn ema(old: f32, new: f32, alpha: f32) -> f32 {
    old * (1.0 - alpha) + new * alpha
}

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick, in seconds, clamped.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Smoothed frame statistics. Both start at zero and converge over a few
/// dozen frames.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameStats {
    pub fps: f32,
    pub cpu_ms: f32,
}

/// Frame clock producing `FrameTime` snapshots plus smoothed FPS and CPU time.
///
/// Delta time is clamped to avoid pathological values when the host is paused
/// by the debugger or stalls. FPS uses the unclamped delta (floored at 1 ms).
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
    stats: FrameStats,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            frame_index: 0,
            dt_min,
            dt_max,
            stats: FrameStats::default(),
        }
    }

    /// Resets the clock baseline.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock to now.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let raw = now.saturating_duration_since(self.last);
        let dt = raw.clamp(self.dt_min, self.dt_max);

        let dt_ms = (raw.as_secs_f32() * 1000.0).max(1.0);
        self.stats.fps = ema(self.stats.fps, 1000.0 / dt_ms, FPS_SMOOTHING);

        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    /// Folds the CPU time spent in one frame into the estimate.
    pub fn record_cpu(&mut self, elapsed: Duration) {
        let ms = elapsed.as_secs_f32() * 1000.0;
        self.stats.cpu_ms = ema(self.stats.cpu_ms, ms, CPU_SMOOTHING);
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
