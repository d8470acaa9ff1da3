use anyhow::Result;

use vcam_bridge::app::{spawn_command_thread, App};
use vcam_bridge::config::Config;
use vcam_bridge::source::TrackingSource;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load_or_default(CONFIG_PATH)?;

    println!("=== vcam-bridge {} ===", env!("GIT_VERSION"));
    println!("プロトコル送信先: {}", config.protocol.addr);
    println!("周期: {}ms", config.app.interval_ms);
    println!("アンカー: {:?}", config.reference.anchor);
    for camera in &config.cameras {
        println!(
            "camera: {} serial={} arm={:?} destinations={:?}",
            camera.name, camera.serial, camera.arm, camera.destinations
        );
    }
    println!();
    println!("コマンド:");
    println!("  <index>  - 指定デバイスを基準に設定");
    println!("  q        - 終了");
    println!();

    let source = create_source()?;
    let commands = spawn_command_thread();

    let mut app = App::new(source, &config)?;
    app.run(&commands)
}

#[cfg(feature = "openvr")]
fn create_source() -> Result<Box<dyn TrackingSource>> {
    let source = vcam_bridge::source::OpenVrSource::new()?;
    println!("VR runtime initialized");
    Ok(Box::new(source))
}

#[cfg(not(feature = "openvr"))]
fn create_source() -> Result<Box<dyn TrackingSource>> {
    anyhow::bail!("built without the `openvr` feature; no tracking source available")
}
