use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::filter::FilterSpec;
use crate::pose::Vec3;
use crate::protocol;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default, rename = "camera")]
    pub cameras: Vec<CameraConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// ポーリング周期（ミリ秒）
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProtocolConfig {
    /// ポーズストリームの送信先
    #[serde(default = "default_protocol_addr")]
    pub addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReferenceConfig {
    /// アンカー点 (target convention, メートル)
    #[serde(default)]
    pub anchor: Vec3,
}

/// 1 台分の仮想カメラ定義
#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// 表示名
    pub name: String,
    /// バインド先トラッカーのシリアル
    pub serial: String,
    /// 機械的オフセット (カメラローカル座標系, メートル)
    #[serde(default)]
    pub arm: Vec3,
    /// free-d フレームの UDP 送信先 ("host:port")
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(default, rename = "filter")]
    pub filters: Vec<FilterSpec>,
}

fn default_interval_ms() -> u64 {
    10
}

fn default_protocol_addr() -> String {
    protocol::DEFAULT_ADDR.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            addr: default_protocol_addr(),
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            anchor: [0.0, 0.0, 0.0],
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルが無ければデフォルト。壊れた設定は致命的エラー。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            log::warn!("config {} not found, using defaults", path.as_ref().display());
            return Ok(Self::default());
        }
        Self::load(&path).with_context(|| format!("parse {}", path.as_ref().display()))
    }
}
