//! 適応型指数平滑化フィルタ (2 種)

use crate::pose::{vec_distance, Quat, Vec3};

use super::PoseFilter;

/// Exponential smoothing whose coefficient follows the motion amplitude.
///
/// `alpha = 1 - exp(-k * d)` where `d` is the distance moved since the
/// previous sample and `k = -ln(1 - target_alpha) / distance_scale` is
/// fixed at construction. Large motion pushes alpha toward 1 (little
/// lag); near-zero motion approaches full smoothing. Orientation is
/// untouched.
pub struct DistanceAdaptive {
    k: f64,
    prev: Option<Vec3>,
}

impl DistanceAdaptive {
    pub fn new(target_alpha: f64, distance_scale: f64) -> Self {
        Self {
            k: -(1.0 - target_alpha).ln() / distance_scale,
            prev: None,
        }
    }
}

impl PoseFilter for DistanceAdaptive {
    fn process(&mut self, position: &mut Vec3, _rotation: &mut Quat) {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(*position);
                return;
            }
        };

        let d = vec_distance(*position, prev);
        let alpha = 1.0 - (-self.k * d).exp();

        for axis in 0..3 {
            position[axis] = alpha * position[axis] + (1.0 - alpha) * prev[axis];
        }
        self.prev = Some(*position);
    }

    fn reset(&mut self) {
        self.prev = None;
    }

    fn name(&self) -> &'static str {
        "distance_adaptive"
    }
}

/// Per-axis self-tuning exponential smoothing.
///
/// 各軸が独立した係数を持ち、ブレンド後に
/// `alpha[i] = beta * |raw - blended| + (1 - beta) * alpha[i]`
/// で更新される。予測誤差の大きい軸ほど平滑化が弱まる。
pub struct ErrorAdaptive {
    alpha: [f64; 3],
    beta: f64,
    prev: Option<Vec3>,
}

impl ErrorAdaptive {
    pub fn new(initial_alpha: f64, beta: f64) -> Self {
        Self {
            alpha: [initial_alpha; 3],
            beta,
            prev: None,
        }
    }
}

impl PoseFilter for ErrorAdaptive {
    fn process(&mut self, position: &mut Vec3, _rotation: &mut Quat) {
        let prev = match self.prev {
            Some(prev) => prev,
            None => {
                self.prev = Some(*position);
                return;
            }
        };

        for axis in 0..3 {
            let raw = position[axis];
            let blended = self.alpha[axis] * raw + (1.0 - self.alpha[axis]) * prev[axis];
            position[axis] = blended;

            let err = (raw - blended).abs();
            self.alpha[axis] = self.beta * err + (1.0 - self.beta) * self.alpha[axis];
        }
        self.prev = Some(*position);
    }

    fn reset(&mut self) {
        // 係数は再シードしない (学習済みの alpha はそのまま)
        self.prev = None;
    }

    fn name(&self) -> &'static str {
        "error_adaptive"
    }
}
