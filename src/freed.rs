//! free-d 形式のカメラトラッキングフレーム (UDP ブロードキャスト)
//!
//! Fixed 29-byte layout expected by third-party broadcast/AR receivers:
//! marker, camera id, pan/tilt/roll as 3-byte big-endian fixed point
//! (1/32768 degree), X/Y/Z as 3-byte big-endian fixed point (1/64 mm),
//! zoom/focus/spare zeroed, trailing two's-complement checksum so the
//! whole frame sums to 0 mod 256.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use anyhow::{Context, Result};

use crate::pose::{euler_from_quat, Pose};

pub const FRAME_LEN: usize = 29;
pub const FRAME_MARKER: u8 = 0xD1;

/// units of 1/32768 degree
const ANGLE_SCALE: f64 = 32768.0;
/// units of 1/64 millimeter
const POSITION_SCALE: f64 = 64.0;

const I24_MAX: i32 = 0x7F_FFFF;
const I24_MIN: i32 = -0x80_0000;

fn write_i24(buf: &mut [u8], value: f64) {
    let v = (value.round() as i64).clamp(I24_MIN as i64, I24_MAX as i64) as i32;
    buf[0] = ((v >> 16) & 0xFF) as u8;
    buf[1] = ((v >> 8) & 0xFF) as u8;
    buf[2] = (v & 0xFF) as u8;
}

/// Sign-extending 24-bit big-endian read, for receivers and tests.
pub fn read_i24(buf: &[u8]) -> i32 {
    let raw = ((buf[0] as i32) << 16) | ((buf[1] as i32) << 8) | (buf[2] as i32);
    (raw << 8) >> 8
}

/// Encode one camera pose into a wire frame.
///
/// `camera_id` is the 1-based camera index. Position is in meters in the
/// target convention; angles come out of the ZYX Euler decomposition of
/// the orientation (pan = yaw, tilt = pitch, roll = roll).
pub fn encode_frame(camera_id: u8, pose: &Pose) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = FRAME_MARKER;
    frame[1] = camera_id;

    let (yaw, pitch, roll) = euler_from_quat(pose.rotation);
    write_i24(&mut frame[2..5], yaw.to_degrees() * ANGLE_SCALE);
    write_i24(&mut frame[5..8], pitch.to_degrees() * ANGLE_SCALE);
    write_i24(&mut frame[8..11], roll.to_degrees() * ANGLE_SCALE);

    // meters → millimeters
    write_i24(&mut frame[11..14], pose.position[0] * 1000.0 * POSITION_SCALE);
    write_i24(&mut frame[14..17], pose.position[1] * 1000.0 * POSITION_SCALE);
    write_i24(&mut frame[17..20], pose.position[2] * 1000.0 * POSITION_SCALE);

    // zoom (20..23), focus (23..26), spare (26..28) stay zero

    let sum = frame[..FRAME_LEN - 1]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b));
    frame[FRAME_LEN - 1] = 0u8.wrapping_sub(sum);
    frame
}

/// Decode helpers for the position/angle fields (tests, diagnostics).
pub fn decode_position_mm(frame: &[u8; FRAME_LEN]) -> [f64; 3] {
    [
        read_i24(&frame[11..14]) as f64 / POSITION_SCALE,
        read_i24(&frame[14..17]) as f64 / POSITION_SCALE,
        read_i24(&frame[17..20]) as f64 / POSITION_SCALE,
    ]
}

pub fn decode_angles_deg(frame: &[u8; FRAME_LEN]) -> [f64; 3] {
    [
        read_i24(&frame[2..5]) as f64 / ANGLE_SCALE,
        read_i24(&frame[5..8]) as f64 / ANGLE_SCALE,
        read_i24(&frame[8..11]) as f64 / ANGLE_SCALE,
    ]
}

/// 1 カメラ分の送信先へフレームをファンアウトする UDP センダ
pub struct FreedSender {
    socket: UdpSocket,
    destinations: Vec<SocketAddr>,
}

impl FreedSender {
    pub fn new<S: AsRef<str>>(destinations: &[S]) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("bind freed socket")?;
        socket.set_nonblocking(true).context("freed socket nonblocking")?;

        let mut resolved = Vec::with_capacity(destinations.len());
        for dest in destinations {
            let addr = dest
                .as_ref()
                .to_socket_addrs()
                .with_context(|| format!("resolve freed destination {}", dest.as_ref()))?
                .next()
                .with_context(|| format!("empty address for {}", dest.as_ref()))?;
            resolved.push(addr);
        }

        Ok(Self {
            socket,
            destinations: resolved,
        })
    }

    /// Fire-and-forget: a dropped frame is superseded one tick later, so
    /// send errors are only visible at debug level.
    pub fn send(&self, frame: &[u8; FRAME_LEN]) {
        for dest in &self.destinations {
            if let Err(e) = self.socket.send_to(frame, dest) {
                log::debug!("freed send to {} failed: {}", dest, e);
            }
        }
    }

    pub fn destination_count(&self) -> usize {
        self.destinations.len()
    }
}
