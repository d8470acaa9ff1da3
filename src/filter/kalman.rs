//! 簡易カルマンフィルタ

use crate::pose::{Quat, Vec3};

use super::PoseFilter;

/// Error-covariance-weighted blend, one state per axis.
///
/// Deliberately partial: there is no process-noise term, so the estimate
/// error only ever shrinks and the filter converges toward ignoring new
/// measurements. Kept as an experimental variant, not a textbook Kalman.
pub struct SingleStateKalman {
    e_est: [f64; 3],
    e_mea: [f64; 3],
    prev_est: Option<Vec3>,
}

impl SingleStateKalman {
    pub fn new(e_est: f64, e_mea: f64) -> Self {
        Self {
            e_est: [e_est; 3],
            e_mea: [e_mea; 3],
            prev_est: None,
        }
    }
}

impl PoseFilter for SingleStateKalman {
    fn process(&mut self, position: &mut Vec3, _rotation: &mut Quat) {
        let prev = match self.prev_est {
            Some(prev) => prev,
            None => {
                self.prev_est = Some(*position);
                return;
            }
        };

        let mut est = [0.0; 3];
        for axis in 0..3 {
            let gain = self.e_est[axis] / (self.e_est[axis] + self.e_mea[axis]);
            est[axis] = prev[axis] + gain * (position[axis] - prev[axis]);
            self.e_est[axis] = (1.0 - gain) * self.e_est[axis];
        }
        *position = est;
        self.prev_est = Some(est);
    }

    fn reset(&mut self) {
        self.prev_est = None;
    }

    fn name(&self) -> &'static str {
        "kalman"
    }
}
