//! ポーズ平滑化フィルタ
//!
//! Each stage consumes and produces one position sample (some also touch
//! the orientation), keeps private state between invocations and never
//! errors. Stages are not thread-safe; they are only ever driven from the
//! single polling loop.

pub mod adaptive;
pub mod exponential;
pub mod kalman;
pub mod median;
pub mod moving_average;

use serde::Deserialize;

use crate::pose::{Quat, Vec3};

pub use adaptive::{DistanceAdaptive, ErrorAdaptive};
pub use exponential::Exponential;
pub use kalman::SingleStateKalman;
pub use median::Median;
pub use moving_average::MovingAverage;

/// 全フィルタ共通のインターフェース
pub trait PoseFilter {
    /// Apply the filter in place to one sample.
    fn process(&mut self, position: &mut Vec3, rotation: &mut Quat);

    /// Drop all accumulated state.
    fn reset(&mut self);

    fn name(&self) -> &'static str;
}

/// フィルタ構成 (config.toml の [[camera.filter]] エントリ)
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSpec {
    MovingAverage { window: usize },
    Exponential { alpha_pos: f64, alpha_rot: f64 },
    DistanceAdaptive { target_alpha: f64, distance_scale: f64 },
    ErrorAdaptive { initial_alpha: f64, beta: f64 },
    Median { window: usize },
    Kalman { e_est: f64, e_mea: f64 },
}

impl FilterSpec {
    pub fn build(&self) -> Box<dyn PoseFilter> {
        match *self {
            FilterSpec::MovingAverage { window } => Box::new(MovingAverage::new(window)),
            FilterSpec::Exponential { alpha_pos, alpha_rot } => {
                Box::new(Exponential::new(alpha_pos, alpha_rot))
            }
            FilterSpec::DistanceAdaptive { target_alpha, distance_scale } => {
                Box::new(DistanceAdaptive::new(target_alpha, distance_scale))
            }
            FilterSpec::ErrorAdaptive { initial_alpha, beta } => {
                Box::new(ErrorAdaptive::new(initial_alpha, beta))
            }
            FilterSpec::Median { window } => Box::new(Median::new(window)),
            FilterSpec::Kalman { e_est, e_mea } => Box::new(SingleStateKalman::new(e_est, e_mea)),
        }
    }
}

/// 設定順に適用されるフィルタ列
pub struct FilterChain {
    stages: Vec<Box<dyn PoseFilter>>,
}

impl FilterChain {
    pub fn new(stages: Vec<Box<dyn PoseFilter>>) -> Self {
        Self { stages }
    }

    pub fn from_specs(specs: &[FilterSpec]) -> Self {
        Self::new(specs.iter().map(FilterSpec::build).collect())
    }

    pub fn process(&mut self, position: &mut Vec3, rotation: &mut Quat) {
        for stage in &mut self.stages {
            stage.process(position, rotation);
        }
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
