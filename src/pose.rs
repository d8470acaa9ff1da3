//! ポーズ型とクォータニオン演算
//!
//! Quaternions are stored as `[x, y, z, w]`, positions as `[x, y, z]`.
//! Everything is f64; orientations are renormalized after any
//! interpolation so consumers always see unit quaternions.

pub type Vec3 = [f64; 3];
pub type Quat = [f64; 4];

pub const QUAT_IDENTITY: Quat = [0.0, 0.0, 0.0, 1.0];

/// トラッカーの位置と回転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// 位置 (x, y, z)
    pub position: Vec3,
    /// 回転 (クォータニオン: x, y, z, w)
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// 原点、回転なし
    pub fn identity() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: QUAT_IDENTITY,
        }
    }
}

pub fn vec_add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn vec_sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn vec_distance(a: Vec3, b: Vec3) -> f64 {
    let d = vec_sub(a, b);
    (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt()
}

pub fn quat_normalize(q: Quat) -> Quat {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len > 0.0 {
        [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
    } else {
        QUAT_IDENTITY
    }
}

/// Hamilton product a ⊗ b (apply b first, then a).
pub fn quat_multiply(a: Quat, b: Quat) -> Quat {
    let (ax, ay, az, aw) = (a[0], a[1], a[2], a[3]);
    let (bx, by, bz, bw) = (b[0], b[1], b[2], b[3]);
    [
        aw * bx + ax * bw + ay * bz - az * by,
        aw * by - ax * bz + ay * bw + az * bx,
        aw * bz + ax * by - ay * bx + az * bw,
        aw * bw - ax * bx - ay * by - az * bz,
    ]
}

/// Inverse of a unit quaternion (conjugate).
pub fn quat_inverse(q: Quat) -> Quat {
    [-q[0], -q[1], -q[2], q[3]]
}

/// v' = q v q⁻¹
pub fn rotate_vector(q: Quat, v: Vec3) -> Vec3 {
    // t = 2 * (q.xyz × v); v' = v + w*t + q.xyz × t
    let t = [
        2.0 * (q[1] * v[2] - q[2] * v[1]),
        2.0 * (q[2] * v[0] - q[0] * v[2]),
        2.0 * (q[0] * v[1] - q[1] * v[0]),
    ];
    [
        v[0] + q[3] * t[0] + q[1] * t[2] - q[2] * t[1],
        v[1] + q[3] * t[1] + q[2] * t[0] - q[0] * t[2],
        v[2] + q[3] * t[2] + q[0] * t[1] - q[1] * t[0],
    ]
}

/// Shortest-arc SLERP.
///
/// "to" を dot < 0 なら反転。角度が十分小さいとき (1 - cosom <= 0.0005)
/// は線形補間にフォールバックしてゼロ除算を避ける。
pub fn quat_slerp(from: Quat, to: Quat, t: f64) -> Quat {
    let mut cosom = from[0] * to[0] + from[1] * to[1] + from[2] * to[2] + from[3] * to[3];

    let to1 = if cosom < 0.0 {
        cosom = -cosom;
        [-to[0], -to[1], -to[2], -to[3]]
    } else {
        to
    };

    let (scale0, scale1) = if (1.0 - cosom) > 0.0005 {
        let omega = cosom.acos();
        let sinom = omega.sin();
        (((1.0 - t) * omega).sin() / sinom, (t * omega).sin() / sinom)
    } else {
        // quaternions are very close: linear interpolation
        (1.0 - t, t)
    };

    [
        scale0 * from[0] + scale1 * to1[0],
        scale0 * from[1] + scale1 * to1[1],
        scale0 * from[2] + scale1 * to1[2],
        scale0 * from[3] + scale1 * to1[3],
    ]
}

/// ZYX 分解: (yaw, pitch, roll) in radians.
///
/// Yaw is about +Z, pitch about +Y, roll about +X. At gimbal lock
/// (pitch ≈ ±90°) pitch saturates and yaw comes from the degenerate
/// branch, which is an accepted approximation here.
pub fn euler_from_quat(q: Quat) -> (f64, f64, f64) {
    let (x, y, z, w) = (q[0], q[1], q[2], q[3]);

    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

    let sinp = 2.0 * (w * y - z * x);
    let pitch = if sinp.abs() >= 1.0 {
        std::f64::consts::FRAC_PI_2.copysign(sinp)
    } else {
        sinp.asin()
    };

    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));

    (yaw, pitch, roll)
}

/// Rz(yaw) · Ry(pitch) · Rx(roll)
pub fn quat_from_euler(yaw: f64, pitch: f64, roll: f64) -> Quat {
    let qz = [0.0, 0.0, (yaw * 0.5).sin(), (yaw * 0.5).cos()];
    let qy = [0.0, (pitch * 0.5).sin(), 0.0, (pitch * 0.5).cos()];
    let qx = [(roll * 0.5).sin(), 0.0, 0.0, (roll * 0.5).cos()];
    quat_multiply(quat_multiply(qz, qy), qx)
}

/// ヨー成分のみの回転
pub fn quat_from_yaw(yaw: f64) -> Quat {
    [0.0, 0.0, (yaw * 0.5).sin(), (yaw * 0.5).cos()]
}
