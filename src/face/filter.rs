//! 标量卡尔曼滤波

/// 一维卡尔曼滤波器；R 为过程噪声，Q 为测量噪声
///
/// 用于头部姿态角平滑。测量噪声越大，输出越平滑、滞后越明显。
#[derive(Clone, Debug)]
pub struct KalmanFilter {
    r: f32,
    q: f32,
    a: f32,
    c: f32,
    cov: f32,
    state: Option<f32>,
}

impl KalmanFilter {
    pub fn new(r: f32, q: f32) -> Self {
        Self {
            r,
            q,
            a: 1.0,
            c: 1.0,
            cov: 0.0,
            state: None,
        }
    }

    /// 滤波一个测量值，返回新的估计值
    pub fn filter(&mut self, measurement: f32) -> f32 {
        let next = match self.state {
            None => {
                self.cov = self.q / (self.c * self.c);
                measurement / self.c
            }
            Some(state) => {
                let predicted = self.a * state;
                let predicted_cov = self.a * self.cov * self.a + self.r;
                let gain = predicted_cov * self.c / (self.c * predicted_cov * self.c + self.q);
                self.cov = predicted_cov - gain * self.c * predicted_cov;
                predicted + gain * (measurement - self.c * predicted)
            }
        };
        self.state = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.cov = 0.0;
    }
}
