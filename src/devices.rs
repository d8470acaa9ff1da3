//! トラッキング対象デバイスのレジストリ
//!
//! Entries are created the first time an index is observed connected and
//! are never removed while the process runs, so identity and serial
//! mapping survive transient disconnects.

use crate::pose::{quat_multiply, Pose};
use crate::source::DeviceSample;

pub const MAX_DEVICE_SLOTS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Hmd,
    Controller,
    GenericTracker,
    TrackingReference,
    DisplayRedirect,
    Invalid,
}

impl DeviceClass {
    pub fn name(self) -> &'static str {
        match self {
            DeviceClass::Hmd => "HMD",
            DeviceClass::Controller => "Controller",
            DeviceClass::GenericTracker => "GenericTracker",
            DeviceClass::TrackingReference => "TrackingReference",
            DeviceClass::DisplayRedirect => "DisplayRedirect",
            DeviceClass::Invalid => "Invalid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingStatus {
    Uninitialized,
    Ok,
    OutOfRange,
    Calibrating,
}

/// 1 デバイス分の状態
#[derive(Debug, Clone)]
pub struct TrackedBody {
    pub index: u32,
    pub class: DeviceClass,
    pub serial: String,
    /// "openvr/<Class>/<serial or index>"
    pub name: String,
    /// 最新の有効なポーズ (capture convention)
    pub pose: Pose,
    pub connected: bool,
    pub valid: bool,
    pub status: TrackingStatus,
}

pub struct DeviceRegistry {
    slots: Vec<Option<TrackedBody>>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(MAX_DEVICE_SLOTS),
        }
    }

    /// Fold one tick's worth of samples into the registry. Returns the
    /// indices of bodies created this tick (callers register protocol
    /// sensors for those).
    pub fn update(&mut self, samples: &[DeviceSample]) -> Vec<u32> {
        let mut created = Vec::new();

        if self.slots.len() < samples.len() {
            self.slots.resize(samples.len(), None);
        }

        for (index, sample) in samples.iter().enumerate() {
            if !sample.connected {
                // keep the entry, just flag it stale
                if let Some(body) = self.slots[index].as_mut() {
                    body.connected = false;
                    body.valid = false;
                }
                continue;
            }

            if self.slots[index].is_none() {
                let display = if sample.serial.is_empty() {
                    format!("openvr/{}/{}", sample.class.name(), index)
                } else {
                    format!("openvr/{}/{}", sample.class.name(), sample.serial)
                };
                log::info!("new device {}: {}", index, display);
                self.slots[index] = Some(TrackedBody {
                    index: index as u32,
                    class: sample.class,
                    serial: sample.serial.clone(),
                    name: display,
                    pose: Pose::identity(),
                    connected: true,
                    valid: false,
                    status: sample.status,
                });
                created.push(index as u32);
            }

            if let Some(body) = self.slots[index].as_mut() {
                body.connected = true;
                body.status = sample.status;
                body.valid = sample.valid;
                if sample.valid {
                    body.pose = adjusted_pose(sample.class, &sample.pose);
                }
                // invalid this tick: keep the prior pose
            }
        }

        created
    }

    pub fn get(&self, index: u32) -> Option<&TrackedBody> {
        self.slots.get(index as usize)?.as_ref()
    }

    /// 最小インデックス優先でシリアル一致を探す
    /// (同一シリアルが複数ある場合の動作は上流未定義なので first-match)
    pub fn find_by_serial(&self, serial: &str) -> Option<u32> {
        self.iter().find(|b| b.serial == serial).map(|b| b.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedBody> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}

/// Vive トラッカーは筐体の向きが 90° ずれているので、
/// ロール -90° のプリローテーションを後ろから掛ける。
fn adjusted_pose(class: DeviceClass, pose: &Pose) -> Pose {
    if class == DeviceClass::GenericTracker {
        let half = std::f64::consts::FRAC_PI_4;
        let prerot = [-half.sin(), 0.0, 0.0, half.cos()];
        Pose::new(pose.position, quat_multiply(pose.rotation, prerot))
    } else {
        *pose
    }
}
