//! メインの polling ループ
//!
//! Single-threaded tick: poll source → update registry → queue raw poses
//! on the protocol client → apply operator commands → update cameras →
//! flush → sleep. All mutable state is owned here, so no locks anywhere.
//! The stdin thread only feeds a channel.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::camera::{ReferenceFrame, VirtualCamera};
use crate::config::Config;
use crate::devices::DeviceRegistry;
use crate::protocol::PoseStreamClient;
use crate::source::TrackingSource;

/// オペレータコマンド (stdin 1 行ずつ)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 指定インデックスのボディを基準に指定
    Designate(u32),
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    match trimmed {
        "" => None,
        "q" | "quit" => Some(Command::Quit),
        _ => trimmed.parse::<u32>().ok().map(Command::Designate),
    }
}

/// stdin を行単位で読むコマンドスレッドを起動
pub fn spawn_command_thread() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            match parse_command(&line) {
                Some(command) => {
                    let quit = command == Command::Quit;
                    if tx.send(command).is_err() || quit {
                        break;
                    }
                }
                None => {
                    let trimmed = line.trim();
                    // 空行は黙って読み飛ばす
                    if !trimmed.is_empty() {
                        println!("不明なコマンド: {}", trimmed);
                    }
                }
            }
        }
    });
    rx
}

pub struct App {
    // フィールドは宣言順にドロップされる: camera → protocol → source (取得の逆順)
    cameras: Vec<VirtualCamera>,
    protocol: PoseStreamClient,
    source: Box<dyn TrackingSource>,
    registry: DeviceRegistry,
    reference: ReferenceFrame,
    /// device index → protocol sensor id
    sensors: HashMap<u32, u32>,
    interval: Duration,
    done: bool,
    status_timer: Instant,
    tick_count: u32,
}

impl App {
    pub fn new(source: Box<dyn TrackingSource>, config: &Config) -> Result<Self> {
        let protocol = PoseStreamClient::new(&config.protocol.addr)?;

        let mut cameras = Vec::with_capacity(config.cameras.len());
        for (index, camera_config) in config.cameras.iter().enumerate() {
            cameras.push(VirtualCamera::from_config(index, camera_config)?);
        }

        Ok(Self {
            cameras,
            protocol,
            source,
            registry: DeviceRegistry::new(),
            reference: ReferenceFrame::new(config.reference.anchor),
            sensors: HashMap::new(),
            interval: Duration::from_millis(config.app.interval_ms),
            done: false,
            status_timer: Instant::now(),
            tick_count: 0,
        })
    }

    pub fn run(&mut self, commands: &mpsc::Receiver<Command>) -> Result<()> {
        while !self.done {
            self.tick(commands)?;
            std::thread::sleep(self.interval);
        }
        println!("終了します");
        Ok(())
    }

    /// 1 tick 分の処理。テストから直接呼べるよう公開している。
    pub fn tick(&mut self, commands: &mpsc::Receiver<Command>) -> Result<()> {
        // コマンドは tick の先頭で反映
        while let Ok(command) = commands.try_recv() {
            match command {
                Command::Quit => {
                    self.done = true;
                    return Ok(());
                }
                Command::Designate(index) => self.designate_reference(index),
            }
        }

        let samples = self.source.poll()?;
        let created = self.registry.update(&samples);
        for index in created {
            if let Some(body) = self.registry.get(index) {
                let sensor = self.protocol.register_sensor(&body.name);
                self.sensors.insert(index, sensor);
            }
        }

        // 生ポーズは無加工のままプロトコル側へ (カメラパイプラインとは独立)
        let timestamp = unix_timestamp();
        for body in self.registry.iter() {
            if body.connected && body.valid {
                if let Some(&sensor) = self.sensors.get(&body.index) {
                    self.protocol.push_pose(sensor, timestamp, &body.pose);
                }
            }
        }

        for camera in &mut self.cameras {
            camera.tick(&self.registry, &self.reference);
        }

        self.protocol.flush();
        if !self.protocol.is_alive() {
            log::warn!("protocol connection to {} is not doing ok", self.protocol.target_addr());
        }

        self.tick_count += 1;
        if self.status_timer.elapsed() >= Duration::from_secs(1) {
            self.print_status();
            self.status_timer = Instant::now();
            self.tick_count = 0;
        }
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn reference(&self) -> &ReferenceFrame {
        &self.reference
    }

    pub fn cameras(&self) -> &[VirtualCamera] {
        &self.cameras
    }

    fn designate_reference(&mut self, index: u32) {
        match self.registry.get(index) {
            Some(body) => {
                self.reference.designate(body.pose);
                println!("基準を設定: {} ({})", index, body.name);
            }
            None => println!("デバイス {} は未登録です", index),
        }
    }

    fn print_status(&self) {
        let bound = self.cameras.iter().filter(|c| c.is_bound()).count();
        println!(
            "ticks/s: {} | devices: {} | cameras bound: {}/{}",
            self.tick_count,
            self.registry.count(),
            bound,
            self.cameras.len()
        );
        for camera in &self.cameras {
            if let Some(pose) = camera.last_pose() {
                println!(
                    "  {} [{:.3}, {:.3}, {:.3}]",
                    camera.name(),
                    pose.position[0],
                    pose.position[1],
                    pose.position[2]
                );
            }
        }
    }
}

fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
