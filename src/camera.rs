//! 仮想カメラの導出パイプライン
//!
//! Raw tracked pose → filter chain → convention conversion →
//! reference-relative resolve → free-d broadcast.

use anyhow::Result;

use crate::config::CameraConfig;
use crate::convert;
use crate::devices::DeviceRegistry;
use crate::filter::FilterChain;
use crate::freed::{encode_frame, FreedSender};
use crate::pose::{
    euler_from_quat, quat_from_yaw, quat_inverse, quat_multiply, quat_normalize, rotate_vector,
    vec_add, vec_sub, Pose, Vec3,
};

/// 基準フレーム: オペレータが指定した移動原点 + 固定アンカー
///
/// Until a body is designated, the pose stays identity so camera poses
/// come out reference-free (tracked pose translated to the anchor).
#[derive(Debug, Clone)]
pub struct ReferenceFrame {
    /// 指定されたボディの生ポーズ (capture convention)
    pub pose: Pose,
    /// ワールド固定のアンカー点 (target convention)
    pub anchor: Vec3,
}

impl ReferenceFrame {
    pub fn new(anchor: Vec3) -> Self {
        Self {
            pose: Pose::identity(),
            anchor,
        }
    }

    pub fn designate(&mut self, pose: Pose) {
        self.pose = pose;
    }
}

/// Reference-relative camera pose.
///
/// Both `tracked` and `reference` must already be in the target
/// convention. The displacement is re-rotated by the reference's
/// yaw-only component, compensating for its heading at binding time; the
/// formula is preserved as-is for interoperability with existing
/// receivers, not derived from first principles.
pub fn resolve_camera_pose(tracked: &Pose, reference: &Pose, anchor: Vec3, arm: Vec3) -> Pose {
    let orientation = quat_normalize(quat_multiply(
        tracked.rotation,
        quat_inverse(reference.rotation),
    ));

    let delta = vec_sub(tracked.position, reference.position);
    let (yaw, _, _) = euler_from_quat(reference.rotation);
    let delta = rotate_vector(quat_from_yaw(yaw), delta);

    let mut position = vec_add(delta, anchor);

    // lever arm: report the optical point, not the tracked-body origin
    let arm_world = rotate_vector(quat_inverse(orientation), arm);
    position = vec_add(position, arm_world);

    Pose::new(position, orientation)
}

/// 1 台の仮想カメラ: フィルタ列・バインド先シリアル・送信先を所有する
pub struct VirtualCamera {
    name: String,
    serial: String,
    arm: Vec3,
    /// free-d frame camera identifier (1-based)
    id: u8,
    chain: FilterChain,
    sender: FreedSender,
    bound: Option<u32>,
    last_pose: Option<Pose>,
}

impl VirtualCamera {
    /// `index` is the camera's position in the config list (0-based).
    pub fn from_config(index: usize, config: &CameraConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            serial: config.serial.clone(),
            arm: config.arm,
            id: (index + 1) as u8,
            chain: FilterChain::from_specs(&config.filters),
            sender: FreedSender::new(&config.destinations)?,
            bound: None,
            last_pose: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    pub fn last_pose(&self) -> Option<&Pose> {
        self.last_pose.as_ref()
    }

    /// フィルタ → 座標変換 → 基準相対の解決。last_pose を更新して返す。
    pub fn process_sample(&mut self, raw: &Pose, reference: &ReferenceFrame) -> Pose {
        let mut position = raw.position;
        let mut rotation = raw.rotation;
        self.chain.process(&mut position, &mut rotation);

        let tracked = convert::pose_to_target(&Pose::new(position, rotation));
        let reference_pose = convert::pose_to_target(&reference.pose);
        let resolved =
            resolve_camera_pose(&tracked, &reference_pose, reference.anchor, self.arm);

        self.last_pose = Some(resolved);
        resolved
    }

    /// 1 tick 分の処理。
    ///
    /// Binds lazily by serial and stays bound. A fresh valid pose runs
    /// the full pipeline; either way the last known pose is re-broadcast
    /// so receivers keep getting frames through transient tracking loss.
    pub fn tick(&mut self, registry: &DeviceRegistry, reference: &ReferenceFrame) {
        if self.bound.is_none() {
            self.bound = registry.find_by_serial(&self.serial);
            if let Some(index) = self.bound {
                log::info!("camera {} bound to device {} ({})", self.name, index, self.serial);
            }
        }

        if let Some(index) = self.bound {
            if let Some(body) = registry.get(index) {
                if body.connected && body.valid {
                    let raw = body.pose;
                    self.process_sample(&raw, reference);
                }
            }
        }

        if let Some(pose) = self.last_pose {
            self.sender.send(&encode_frame(self.id, &pose));
        }
    }
}
