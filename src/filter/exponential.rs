//! 指数平滑化フィルタ (EMA + SLERP)

use crate::pose::{quat_normalize, quat_slerp, Quat, Vec3};

use super::PoseFilter;

/// Fixed-coefficient exponential smoothing.
///
/// 位置: 成分ごとの EMA (`alpha_pos`)
/// 回転: 前回出力と新サンプルの shortest-arc SLERP (`alpha_rot`)、正規化
pub struct Exponential {
    alpha_pos: f64,
    alpha_rot: f64,
    prev: Option<(Vec3, Quat)>,
}

impl Exponential {
    pub fn new(alpha_pos: f64, alpha_rot: f64) -> Self {
        Self {
            alpha_pos,
            alpha_rot,
            prev: None,
        }
    }
}

impl PoseFilter for Exponential {
    fn process(&mut self, position: &mut Vec3, rotation: &mut Quat) {
        let (prev_pos, prev_rot) = match self.prev {
            Some(prev) => prev,
            None => {
                // 初回はそのまま通してシードする
                self.prev = Some((*position, *rotation));
                return;
            }
        };

        let a = self.alpha_pos;
        for axis in 0..3 {
            position[axis] = a * position[axis] + (1.0 - a) * prev_pos[axis];
        }

        *rotation = quat_normalize(quat_slerp(prev_rot, *rotation, self.alpha_rot));

        self.prev = Some((*position, *rotation));
    }

    fn reset(&mut self) {
        self.prev = None;
    }

    fn name(&self) -> &'static str {
        "exponential"
    }
}
