//! Operator configuration, parsed from flags and environment variables.

use std::path::PathBuf;

use clap::Parser;

use crate::controller::ControllerSettings;
use crate::settings::TokenStore;
use crate::vts::client::ClientConfig;
use crate::zoom::transform::ZoomOffsets;

#[derive(Parser, Debug)]
#[command(name = "vts-zoom", about = "Smart zoom for a scene item, driven by VTube Studio model tracking")]
pub struct Config {
    /// Name of the scene item to zoom (must match fully, including case).
    #[arg(long, env = "VTS_ZOOM_SOURCE", default_value = "")]
    pub source: String,

    /// Tracking-application websocket port.
    #[arg(long, env = "VTS_ZOOM_WS_PORT", default_value_t = 8001,
          value_parser = clap::value_parser!(u16).range(1..=9999))]
    pub ws_port: u16,

    /// Zoom animation length in frames at 60 fps.
    #[arg(long, env = "VTS_ZOOM_SPEED", default_value_t = 25,
          value_parser = clap::value_parser!(u32).range(1..=120))]
    pub zoom_speed: u32,

    /// Keep the zoomed item's edges outside the canvas.
    #[arg(long, env = "VTS_ZOOM_CLAMP", default_value_t = true, action = clap::ArgAction::Set)]
    pub zoom_clamp: bool,

    /// Target apparent model size; larger values zoom in further.
    #[arg(long, env = "VTS_ZOOM_OFFSET_SIZE", default_value_t = 50.0)]
    pub offset_zoom: f64,

    /// Horizontal focus nudge in percent of model size.
    #[arg(long, env = "VTS_ZOOM_OFFSET_X", default_value_t = 0.0)]
    pub offset_x: f64,

    /// Vertical focus nudge in percent of model size.
    #[arg(long, env = "VTS_ZOOM_OFFSET_Y", default_value_t = -2.0)]
    pub offset_y: f64,

    /// Path of the JSON file holding the persisted tracker token.
    #[arg(long, env = "VTS_ZOOM_SETTINGS", default_value = "vts-zoom.json")]
    pub settings_path: PathBuf,
}

impl Config {
    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            source_name: self.source.clone(),
            zoom_speed: self.zoom_speed,
            clamp_to_canvas: self.zoom_clamp,
            offsets: ZoomOffsets { size: self.offset_zoom, xpos: self.offset_x, ypos: self.offset_y },
        }
    }

    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.ws_port)
    }

    #[must_use]
    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(&self.settings_path)
    }
}
