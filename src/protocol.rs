//! 汎用ポーズストリームプロトコル (OSC over UDP)
//!
//! Per device: one named sensor registration, then per-tick
//! `(timestamp, position, orientation)` updates. Updates queue up during
//! the tick and go out together as one OSC bundle on `flush()`.
//! Best-effort: no ordering or delivery guarantees beyond that.

use std::net::UdpSocket;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use rosc::{encoder, OscBundle, OscMessage, OscPacket, OscTime, OscType};

use crate::pose::Pose;

/// プロトコルサーバのデフォルトアドレス
pub const DEFAULT_ADDR: &str = "127.0.0.1:3883";

/// NTP epoch offset from the unix epoch, for OSC timetags.
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// センサ登録メッセージを構築
pub fn build_register_message(sensor: u32, name: &str) -> OscMessage {
    OscMessage {
        addr: "/tracker/register".to_string(),
        args: vec![OscType::Int(sensor as i32), OscType::String(name.to_string())],
    }
}

/// ポーズ更新メッセージを構築
/// 引数: sensor, timestamp, x, y, z, qx, qy, qz, qw
pub fn build_pose_message(sensor: u32, timestamp: f64, pose: &Pose) -> OscMessage {
    OscMessage {
        addr: "/tracker/pose".to_string(),
        args: vec![
            OscType::Int(sensor as i32),
            OscType::Double(timestamp),
            OscType::Float(pose.position[0] as f32),
            OscType::Float(pose.position[1] as f32),
            OscType::Float(pose.position[2] as f32),
            OscType::Float(pose.rotation[0] as f32),
            OscType::Float(pose.rotation[1] as f32),
            OscType::Float(pose.rotation[2] as f32),
            OscType::Float(pose.rotation[3] as f32),
        ],
    }
}

fn osc_now() -> OscTime {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let fractional = ((since_epoch.subsec_nanos() as u64) << 32) / 1_000_000_000;
    OscTime {
        seconds: (since_epoch.as_secs() + NTP_UNIX_OFFSET) as u32,
        fractional: fractional as u32,
    }
}

/// ポーズストリームクライアント
pub struct PoseStreamClient {
    socket: UdpSocket,
    target_addr: String,
    sensors: Vec<String>,
    pending: Vec<OscPacket>,
    healthy: bool,
}

impl PoseStreamClient {
    pub fn new(target_addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            target_addr: target_addr.to_string(),
            sensors: Vec::new(),
            pending: Vec::new(),
            healthy: true,
        })
    }

    /// 名前付きセンサを一度だけ登録し、センサ ID を返す
    pub fn register_sensor(&mut self, name: &str) -> u32 {
        let sensor = self.sensors.len() as u32;
        self.sensors.push(name.to_string());
        self.pending
            .push(OscPacket::Message(build_register_message(sensor, name)));
        sensor
    }

    /// 今 tick 分のポーズ更新をキューに積む
    pub fn push_pose(&mut self, sensor: u32, timestamp: f64, pose: &Pose) {
        self.pending
            .push(OscPacket::Message(build_pose_message(sensor, timestamp, pose)));
    }

    /// キューを 1 つの OSC バンドルとして送信
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let bundle = OscBundle {
            timetag: osc_now(),
            content: std::mem::take(&mut self.pending),
        };
        match encoder::encode(&OscPacket::Bundle(bundle)) {
            Ok(data) => match self.socket.send_to(&data, &self.target_addr) {
                Ok(_) => self.healthy = true,
                Err(e) => {
                    log::debug!("protocol send to {} failed: {}", self.target_addr, e);
                    self.healthy = false;
                }
            },
            Err(e) => {
                log::debug!("osc encode failed: {:?}", e);
                self.healthy = false;
            }
        }
    }

    /// Liveness: failure is logged by the caller, never fatal.
    pub fn is_alive(&self) -> bool {
        self.healthy && self.socket.local_addr().is_ok()
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn target_addr(&self) -> &str {
        &self.target_addr
    }
}
