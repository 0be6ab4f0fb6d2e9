//! 呼吸动作发生器

use std::time::Instant;

/// 基于正弦的呼吸偏移；按毫秒周期采样
pub struct BreathingMotor {
    start: Instant,
}

impl BreathingMotor {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// 周期为 period_ms 的正弦偏移
    ///
    /// half_range 为真时映射到 [0,1]，用于只朝单侧摆动的轴。
    pub fn sin_offset(&self, period_ms: f32, half_range: bool) -> f32 {
        let elapsed_ms = self.start.elapsed().as_secs_f32() * 1000.0;
        let s = (elapsed_ms / period_ms * std::f32::consts::TAU).sin();
        if half_range {
            (s + 1.0) / 2.0
        } else {
            s
        }
    }
}

impl Default for BreathingMotor {
    fn default() -> Self {
        Self::new()
    }
}
