//! メディアンフィルタ (placeholder)

use crate::pose::{Quat, Vec3};

use super::PoseFilter;

/// Declared in the filter set but performs no computation; every sample
/// passes through unchanged. Retained so configs that name it keep
/// working.
pub struct Median {
    #[allow(dead_code)]
    window: usize,
}

impl Median {
    pub fn new(window: usize) -> Self {
        Self { window }
    }
}

impl PoseFilter for Median {
    fn process(&mut self, _position: &mut Vec3, _rotation: &mut Quat) {}

    fn reset(&mut self) {}

    fn name(&self) -> &'static str {
        "median"
    }
}
