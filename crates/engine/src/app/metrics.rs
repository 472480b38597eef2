use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub avg_frame_ms: f32,
    pub worst_frame_ms: f32,
    pub clamped_frames: u32,
}

#[derive(Debug)]
pub(crate) struct LoopMetrics {
    window_start: Instant,
    window: Duration,
    frames: u32,
    ticks: u32,
    clamped_frames: u32,
    frame_total: Duration,
    worst_frame: Duration,
}

impl LoopMetrics {
    pub(crate) fn new(window: Duration) -> Self {
        Self::with_start(Instant::now(), window)
    }

    pub(crate) fn with_start(window_start: Instant, window: Duration) -> Self {
        Self {
            window_start,
            window,
            frames: 0,
            ticks: 0,
            clamped_frames: 0,
            frame_total: Duration::ZERO,
            worst_frame: Duration::ZERO,
        }
    }

    pub(crate) fn frame(&mut self, frame_dt: Duration, ticks_run: u32, clamped: bool) {
        self.frames = self.frames.saturating_add(1);
        self.ticks = self.ticks.saturating_add(ticks_run);
        if clamped {
            self.clamped_frames = self.clamped_frames.saturating_add(1);
        }
        self.frame_total = self.frame_total.saturating_add(frame_dt);
        self.worst_frame = self.worst_frame.max(frame_dt);
    }

    pub(crate) fn poll(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let avg_frame_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            avg_frame_ms,
            worst_frame_ms: self.worst_frame.as_secs_f32() * 1000.0,
            clamped_frames: self.clamped_frames,
        };

        *self = Self::with_start(now, self.window);
        Some(snapshot)
    }
}
