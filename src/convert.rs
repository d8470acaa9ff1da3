//! 座標系変換
//!
//! Capture convention: right-handed, Y-up, X-right, -Z-forward.
//! Target convention: right-handed, Z-up, X-forward, Y-right.
//!
//! The axis permutation itself realizes the rotation between the two
//! conventions, so no extra rotation is composed onto quaternions.

use crate::pose::{Pose, Quat, Vec3};

pub fn position_to_target(p: Vec3) -> Vec3 {
    [-p[2], p[0], p[1]]
}

/// Inverse of [`position_to_target`].
pub fn position_to_capture(p: Vec3) -> Vec3 {
    [p[1], p[2], -p[0]]
}

pub fn quat_to_target(q: Quat) -> Quat {
    [-q[2], q[0], q[1], q[3]]
}

/// Inverse of [`quat_to_target`].
pub fn quat_to_capture(q: Quat) -> Quat {
    [q[1], q[2], -q[0], q[3]]
}

pub fn pose_to_target(pose: &Pose) -> Pose {
    Pose::new(
        position_to_target(pose.position),
        quat_to_target(pose.rotation),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_mapping() {
        // 2m in front in capture space (-Z) is +X in target space
        assert_eq!(position_to_target([0.0, 0.0, -2.0]), [2.0, 0.0, 0.0]);
        assert_eq!(position_to_target([1.0, 2.0, 3.0]), [-3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_position_self_inverse() {
        let p = [0.3, -1.7, 2.9];
        assert_eq!(position_to_capture(position_to_target(p)), p);
        assert_eq!(position_to_target(position_to_capture(p)), p);
    }

    #[test]
    fn test_quat_mapping() {
        assert_eq!(quat_to_target([1.0, 2.0, 3.0, 4.0]), [-3.0, 1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_quat_self_inverse() {
        let q = [0.1, 0.2, 0.3, 0.9];
        assert_eq!(quat_to_capture(quat_to_target(q)), q);
        assert_eq!(quat_to_target(quat_to_capture(q)), q);
    }

    #[test]
    fn test_identity_stays_identity() {
        let pose = Pose::identity();
        let converted = pose_to_target(&pose);
        assert_eq!(converted.position, [0.0, 0.0, 0.0]);
        assert_eq!(converted.rotation, [0.0, 0.0, 0.0, 1.0]);
    }
}
