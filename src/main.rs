use std::sync::Arc;

use clap::Parser;
use glam::DVec2;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use vts_zoom::config::Config;
use vts_zoom::controller::ZoomController;
use vts_zoom::scene::{BoundsMode, ItemTransform, MemoryItem, MemoryScene};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::parse();
    let scene = harness_scene(&config.source);

    let mut controller = ZoomController::new(
        config.controller_settings(),
        config.client_config(),
        config.token_store(),
        scene,
    );
    controller.start();

    info!(
        source = %config.source,
        port = config.ws_port,
        "vts-zoom running; press Enter to toggle the zoom, ctrl-c to exit"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(_)) => {
                        match controller.toggle() {
                            Ok(()) => info!(state = ?controller.state(), "zoom toggled"),
                            Err(e) => warn!(error = %e, "zoom toggle rejected"),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown().await;
}

/// A virtual 1080p scene with one item, standing in for the host
/// compositor. Transform writes show up as trace logs, which makes the
/// binary usable for tuning offsets against a live tracker.
fn harness_scene(source: &str) -> Arc<MemoryScene> {
    let item = MemoryItem::new(
        ItemTransform {
            scale: DVec2::ONE,
            pos: DVec2::ZERO,
            bounds: DVec2::ZERO,
            bounds_mode: BoundsMode::None,
        },
        DVec2::new(1920.0, 1080.0),
    );
    Arc::new(MemoryScene::new(DVec2::new(1920.0, 1080.0)).with_item(source, item))
}
