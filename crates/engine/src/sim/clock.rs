use crate::config::ClockConfig;

/// Normalizes a raw frame delta into the logical time scale every per-tick
/// delta is multiplied by. Non-finite or negative deltas produce zero.
pub fn time_scale(raw_delta_ms: f32, target_frame_ms: f32, cap: f32) -> f32 {
    if !raw_delta_ms.is_finite() || raw_delta_ms <= 0.0 {
        return 0.0;
    }
    if !target_frame_ms.is_finite() || target_frame_ms <= 0.0 {
        return 0.0;
    }
    let cap = if cap.is_finite() { cap.max(0.0) } else { 0.0 };
    (raw_delta_ms / target_frame_ms).min(cap)
}

#[derive(Debug, Clone)]
pub struct SimClock {
    target_frame_ms: f32,
    cap: f32,
    tick_count: u64,
    elapsed_ms: f64,
    last_time_scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockStep {
    pub time_scale: f32,
    pub elapsed_ms: f32,
    pub tick: u64,
}

impl SimClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            target_frame_ms: 1000.0 / config.ticks_per_second as f32,
            cap: config.time_scale_cap,
            tick_count: 0,
            elapsed_ms: 0.0,
            last_time_scale: 0.0,
        }
    }

    pub fn advance(&mut self, raw_delta_ms: f32) -> ClockStep {
        let scale = time_scale(raw_delta_ms, self.target_frame_ms, self.cap);
        // Wall time drives user-facing delays, so it is clamped only to be non-negative.
        let elapsed_ms = if raw_delta_ms.is_finite() {
            raw_delta_ms.max(0.0)
        } else {
            0.0
        };
        self.tick_count = self.tick_count.saturating_add(1);
        self.elapsed_ms += f64::from(elapsed_ms);
        self.last_time_scale = scale;
        ClockStep {
            time_scale: scale,
            elapsed_ms,
            tick: self.tick_count,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn last_time_scale(&self) -> f32 {
        self.last_time_scale
    }

    pub fn target_frame_ms(&self) -> f32 {
        self.target_frame_ms
    }
}
