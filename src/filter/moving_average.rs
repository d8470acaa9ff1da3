//! 移動平均フィルタ

use crate::pose::{Quat, Vec3};

use super::PoseFilter;

/// Fixed-window arithmetic mean over positions.
///
/// Until the window is full the raw sample passes through unchanged while
/// the history accumulates. Orientation is untouched.
pub struct MovingAverage {
    window: usize,
    samples: Vec<Vec3>,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: Vec::with_capacity(window.max(1)),
        }
    }
}

impl PoseFilter for MovingAverage {
    fn process(&mut self, position: &mut Vec3, _rotation: &mut Quat) {
        if self.samples.len() < self.window {
            self.samples.push(*position);
            return;
        }

        self.samples.rotate_left(1);
        if let Some(last) = self.samples.last_mut() {
            *last = *position;
        }

        let mut mean = [0.0; 3];
        for sample in &self.samples {
            for axis in 0..3 {
                mean[axis] += sample[axis];
            }
        }
        for axis in 0..3 {
            mean[axis] /= self.window as f64;
        }
        *position = mean;
    }

    fn reset(&mut self) {
        self.samples.clear();
    }

    fn name(&self) -> &'static str {
        "moving_average"
    }
}
