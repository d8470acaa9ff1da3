//! End-to-end pipeline test: scripted tracking samples through registry,
//! camera derivation and the free-d wire format, received over loopback
//! UDP.

use std::collections::VecDeque;
use std::net::UdpSocket;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use rosc::{OscMessage, OscPacket, OscType};

use vcam_bridge::app::{App, Command};
use vcam_bridge::camera::{ReferenceFrame, VirtualCamera};
use vcam_bridge::config::{AppConfig, CameraConfig, Config, ProtocolConfig, ReferenceConfig};
use vcam_bridge::devices::{DeviceClass, DeviceRegistry, TrackingStatus};
use vcam_bridge::filter::FilterSpec;
use vcam_bridge::freed::{self, FRAME_LEN, FRAME_MARKER};
use vcam_bridge::pose::{Pose, QUAT_IDENTITY};
use vcam_bridge::source::{DeviceSample, TrackingSource};

fn sample(serial: &str, pose: Pose) -> DeviceSample {
    DeviceSample {
        connected: true,
        valid: true,
        status: TrackingStatus::Ok,
        class: DeviceClass::GenericTracker,
        serial: serial.to_string(),
        pose,
    }
}

fn recv_frame(socket: &UdpSocket) -> [u8; FRAME_LEN] {
    let mut buf = [0u8; 64];
    let (len, _) = socket.recv_from(&mut buf).expect("no frame received");
    assert_eq!(len, FRAME_LEN);
    let mut frame = [0u8; FRAME_LEN];
    frame.copy_from_slice(&buf[..FRAME_LEN]);
    frame
}

#[test]
fn camera_bound_to_serial_broadcasts_anchored_pose() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let dest = receiver.local_addr().unwrap().to_string();

    let config = CameraConfig {
        name: "cam1".to_string(),
        serial: "ABC".to_string(),
        arm: [0.0, 0.0, 0.0],
        destinations: vec![dest],
        filters: vec![],
    };
    let mut camera = VirtualCamera::from_config(0, &config).unwrap();
    let mut registry = DeviceRegistry::new();
    // reference never designated; anchor at (5, 0, 0)
    let reference = ReferenceFrame::new([5.0, 0.0, 0.0]);

    // tracked body "ABC" reports 2 meters in front in capture space. The
    // device is a controller here so no tracker pre-rotation applies.
    let mut body = sample("ABC", Pose::new([0.0, 0.0, -2.0], QUAT_IDENTITY));
    body.class = DeviceClass::Controller;
    registry.update(&[body]);

    camera.tick(&registry, &reference);
    assert!(camera.is_bound());

    // expected camera position: conversion (0,0,-2) → (2,0,0), plus anchor
    let pose = camera.last_pose().unwrap();
    assert!((pose.position[0] - 7.0).abs() < 1e-9);
    assert!(pose.position[1].abs() < 1e-9);
    assert!(pose.position[2].abs() < 1e-9);

    let frame = recv_frame(&receiver);
    assert_eq!(frame[0], FRAME_MARKER);
    assert_eq!(frame[1], 1);

    let mm = freed::decode_position_mm(&frame);
    assert!((mm[0] - 7000.0).abs() < 0.1, "x={}mm", mm[0]);
    assert!(mm[1].abs() < 0.1);
    assert!(mm[2].abs() < 0.1);

    let sum = frame.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    assert_eq!(sum, 0, "frame checksum must zero the byte sum");
}

#[test]
fn camera_keeps_broadcasting_last_pose_through_tracking_loss() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let dest = receiver.local_addr().unwrap().to_string();

    let config = CameraConfig {
        name: "cam1".to_string(),
        serial: "ABC".to_string(),
        arm: [0.0, 0.0, 0.0],
        destinations: vec![dest],
        filters: vec![],
    };
    let mut camera = VirtualCamera::from_config(0, &config).unwrap();
    let mut registry = DeviceRegistry::new();
    let reference = ReferenceFrame::new([0.0, 0.0, 0.0]);

    let mut body = sample("ABC", Pose::new([0.0, 1.5, 0.0], QUAT_IDENTITY));
    body.class = DeviceClass::Controller;
    registry.update(&[body]);
    camera.tick(&registry, &reference);
    let first = recv_frame(&receiver);

    // tracking drops out; the same pose must be re-broadcast
    registry.update(&[DeviceSample::disconnected()]);
    camera.tick(&registry, &reference);
    let second = recv_frame(&receiver);

    assert_eq!(first, second);
}

#[test]
fn designated_reference_offsets_camera_pose() {
    let config = CameraConfig {
        name: "cam1".to_string(),
        serial: "ABC".to_string(),
        arm: [0.0, 0.0, 0.0],
        destinations: vec![],
        filters: vec![],
    };
    let mut camera = VirtualCamera::from_config(0, &config).unwrap();
    let mut reference = ReferenceFrame::new([0.0, 0.0, 0.0]);

    // reference body sits 1m to capture-space right of the tracked body
    reference.designate(Pose::new([1.0, 0.0, 0.0], QUAT_IDENTITY));

    let raw = Pose::new([1.0, 0.0, -2.0], QUAT_IDENTITY);
    let resolved = camera.process_sample(&raw, &reference);
    // both convert to target; delta = (2,1,0) - (0,1,0) = (2,0,0)
    assert!((resolved.position[0] - 2.0).abs() < 1e-9);
    assert!(resolved.position[1].abs() < 1e-9);
    assert!(resolved.position[2].abs() < 1e-9);
}

/// 1 tick ごとにスクリプトされたフレームを返すソース。
/// フレームが尽きたら最後のフレームを返し続ける。
struct ScriptedSource {
    frames: VecDeque<Vec<DeviceSample>>,
    last: Vec<DeviceSample>,
}

impl ScriptedSource {
    fn new(frames: Vec<Vec<DeviceSample>>) -> Self {
        Self {
            frames: frames.into(),
            last: Vec::new(),
        }
    }
}

impl TrackingSource for ScriptedSource {
    fn poll(&mut self) -> Result<Vec<DeviceSample>> {
        if let Some(frame) = self.frames.pop_front() {
            self.last = frame;
        }
        Ok(self.last.clone())
    }
}

fn flatten_messages(packet: OscPacket) -> Vec<OscMessage> {
    match packet {
        OscPacket::Message(msg) => vec![msg],
        OscPacket::Bundle(bundle) => bundle
            .content
            .into_iter()
            .flat_map(flatten_messages)
            .collect(),
    }
}

fn recv_messages(socket: &UdpSocket) -> Vec<OscMessage> {
    let mut buf = [0u8; 2048];
    let (len, _) = socket.recv_from(&mut buf).expect("no bundle received");
    let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).expect("bad osc packet");
    flatten_messages(packet)
}

#[test]
fn tick_streams_raw_pose_and_registers_sensor_once() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    let config = Config {
        app: AppConfig { interval_ms: 1 },
        protocol: ProtocolConfig {
            addr: receiver.local_addr().unwrap().to_string(),
        },
        reference: ReferenceConfig { anchor: [0.0; 3] },
        cameras: vec![CameraConfig {
            name: "cam1".to_string(),
            serial: "ABC".to_string(),
            arm: [0.0; 3],
            destinations: vec![],
            filters: vec![FilterSpec::Exponential {
                alpha_pos: 0.5,
                alpha_rot: 0.5,
            }],
        }],
    };

    let mut body1 = sample("ABC", Pose::new([1.0, 2.0, 3.0], QUAT_IDENTITY));
    body1.class = DeviceClass::Controller;
    let mut body2 = sample("ABC", Pose::new([5.0, 2.0, 3.0], QUAT_IDENTITY));
    body2.class = DeviceClass::Controller;

    let source = ScriptedSource::new(vec![vec![body1], vec![body2]]);
    let mut app = App::new(Box::new(source), &config).unwrap();
    let (_tx, rx) = mpsc::channel();

    // tick 1: 新規デバイス → 登録メッセージ + 生ポーズが同じバンドルで届く
    app.tick(&rx).unwrap();
    let messages = recv_messages(&receiver);
    let register: Vec<_> = messages
        .iter()
        .filter(|m| m.addr == "/tracker/register")
        .collect();
    assert_eq!(register.len(), 1);
    assert_eq!(register[0].args[0], OscType::Int(0));
    assert_eq!(
        register[0].args[1],
        OscType::String("openvr/Controller/ABC".to_string())
    );

    // tick 2: 登録は一度きり、ポーズのみ
    app.tick(&rx).unwrap();
    let messages = recv_messages(&receiver);
    assert!(messages.iter().all(|m| m.addr == "/tracker/pose"));
    assert_eq!(messages.len(), 1);

    // プロトコル側は無加工の capture convention の生ポーズを受け取る。
    // カメラ側の EMA (0.5 * 5 + 0.5 * 1 = 3) は影響しない。
    let pose_msg = &messages[0];
    assert_eq!(pose_msg.args[2], OscType::Float(5.0));
    assert_eq!(pose_msg.args[3], OscType::Float(2.0));
    assert_eq!(pose_msg.args[4], OscType::Float(3.0));

    // カメラの導出ポーズの方はフィルタ済み: capture (3,2,3) → target (-3,3,2)
    let camera_pose = app.cameras()[0].last_pose().unwrap();
    assert!((camera_pose.position[0] + 3.0).abs() < 1e-9);
    assert!((camera_pose.position[1] - 3.0).abs() < 1e-9);
    assert!((camera_pose.position[2] - 2.0).abs() < 1e-9);
}

#[test]
fn designation_applies_at_top_of_next_tick() {
    let config = Config::default();
    let mut body = sample("ABC", Pose::new([1.0, 2.0, 3.0], QUAT_IDENTITY));
    body.class = DeviceClass::Controller;

    let source = ScriptedSource::new(vec![vec![body]]);
    let mut app = App::new(Box::new(source), &config).unwrap();
    let (tx, rx) = mpsc::channel();

    app.tick(&rx).unwrap();
    assert_eq!(app.reference().pose, Pose::identity());

    // tick の途中 (= tick と tick の間) に積まれたコマンドは
    // 次の tick の先頭で反映される
    tx.send(Command::Designate(0)).unwrap();
    assert_eq!(app.reference().pose, Pose::identity());

    app.tick(&rx).unwrap();
    assert_eq!(app.reference().pose.position, [1.0, 2.0, 3.0]);
}
