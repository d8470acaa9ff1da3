//! 上流トラッキングソースのインターフェース
//!
//! The runtime talks to the tracking system exclusively through
//! [`TrackingSource`], so the whole pipeline runs against scripted
//! samples in tests. The real OpenVR backend sits behind the `openvr`
//! feature because it needs the native runtime installed.

use anyhow::Result;

use crate::devices::{DeviceClass, TrackingStatus};
use crate::pose::Pose;

/// 1 デバイススロット分の観測値 (capture convention)
#[derive(Debug, Clone)]
pub struct DeviceSample {
    pub connected: bool,
    pub valid: bool,
    pub status: TrackingStatus,
    pub class: DeviceClass,
    pub serial: String,
    pub pose: Pose,
}

impl DeviceSample {
    /// 未接続スロット
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            valid: false,
            status: TrackingStatus::Uninitialized,
            class: DeviceClass::Invalid,
            serial: String::new(),
            pose: Pose::identity(),
        }
    }
}

/// Polled once per tick; returns one entry per device slot.
pub trait TrackingSource {
    fn poll(&mut self) -> Result<Vec<DeviceSample>>;
}

#[cfg(feature = "openvr")]
pub use self::openvr_source::OpenVrSource;

#[cfg(feature = "openvr")]
mod openvr_source {
    use anyhow::{Context as _, Result};

    use super::{DeviceSample, TrackingSource};
    use crate::devices::{DeviceClass, TrackingStatus};
    use crate::pose::{Pose, Quat, Vec3};

    pub struct OpenVrSource {
        // context owns the runtime; dropped last
        _context: openvr::Context,
        system: openvr::System,
    }

    impl OpenVrSource {
        pub fn new() -> Result<Self> {
            let context = unsafe { openvr::init(openvr::ApplicationType::Utility) }
                .context("unable to init VR runtime")?;
            let system = context.system().context("acquire IVRSystem")?;
            Ok(Self {
                _context: context,
                system,
            })
        }
    }

    impl TrackingSource for OpenVrSource {
        fn poll(&mut self) -> Result<Vec<DeviceSample>> {
            let poses = self.system.device_to_absolute_tracking_pose(
                openvr::TrackingUniverseOrigin::Standing,
                0.0,
            );

            let mut samples = Vec::with_capacity(poses.len());
            for (index, device_pose) in poses.iter().enumerate() {
                if !device_pose.device_is_connected() {
                    samples.push(DeviceSample::disconnected());
                    continue;
                }

                let class = match self.system.tracked_device_class(index as u32) {
                    openvr::TrackedDeviceClass::HMD => DeviceClass::Hmd,
                    openvr::TrackedDeviceClass::Controller => DeviceClass::Controller,
                    openvr::TrackedDeviceClass::GenericTracker => DeviceClass::GenericTracker,
                    openvr::TrackedDeviceClass::TrackingReference => DeviceClass::TrackingReference,
                    openvr::TrackedDeviceClass::DisplayRedirect => DeviceClass::DisplayRedirect,
                    _ => DeviceClass::Invalid,
                };

                let serial = self
                    .system
                    .string_tracked_device_property(index as u32, openvr::property::SerialNumber_String)
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();

                let status = match device_pose.tracking_result() {
                    openvr::TrackingResult::RunningOK => TrackingStatus::Ok,
                    openvr::TrackingResult::RunningOutOfRange => TrackingStatus::OutOfRange,
                    openvr::TrackingResult::CalibratingInProgress
                    | openvr::TrackingResult::CalibratingOutOfRange => TrackingStatus::Calibrating,
                    _ => TrackingStatus::Uninitialized,
                };

                let matrix = device_pose.device_to_absolute_tracking();
                samples.push(DeviceSample {
                    connected: true,
                    valid: device_pose.pose_is_valid(),
                    status,
                    class,
                    serial,
                    pose: Pose::new(position_from_matrix(matrix), quat_from_matrix(matrix)),
                });
            }
            Ok(samples)
        }
    }

    fn position_from_matrix(m: &[[f32; 4]; 3]) -> Vec3 {
        [m[0][3] as f64, m[1][3] as f64, m[2][3] as f64]
    }

    /// Shepperd's method on the 3x3 rotation part.
    fn quat_from_matrix(m: &[[f32; 4]; 3]) -> Quat {
        let m = [
            [m[0][0] as f64, m[0][1] as f64, m[0][2] as f64],
            [m[1][0] as f64, m[1][1] as f64, m[1][2] as f64],
            [m[2][0] as f64, m[2][1] as f64, m[2][2] as f64],
        ];
        let w = (0f64.max(1.0 + m[0][0] + m[1][1] + m[2][2])).sqrt() / 2.0;
        let x = (0f64.max(1.0 + m[0][0] - m[1][1] - m[2][2])).sqrt() / 2.0;
        let y = (0f64.max(1.0 - m[0][0] + m[1][1] - m[2][2])).sqrt() / 2.0;
        let z = (0f64.max(1.0 - m[0][0] - m[1][1] + m[2][2])).sqrt() / 2.0;
        [
            x.copysign(m[2][1] - m[1][2]),
            y.copysign(m[0][2] - m[2][0]),
            z.copysign(m[1][0] - m[0][1]),
            w,
        ]
    }
}
