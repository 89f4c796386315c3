//! Lauepix GUI application entry point.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod message;
mod state;
mod ui;
mod util;

use std::time::Duration;

use anyhow::anyhow;
use app::LauepixApp;
use clap::Parser;
use eframe::egui;
use lauepix_io::config::{DEFAULT_CLIENT_ID, DEFAULT_URL};
use lauepix_io::ChannelConfig;

/// Operator console for Laue time-of-flight processing.
#[derive(Parser, Debug)]
#[command(name = "lauepix-gui", version, about)]
struct Args {
    /// Backend WebSocket endpoint.
    #[arg(long, default_value = DEFAULT_URL)]
    server: String,

    /// Channel name registered with the backend.
    #[arg(long, default_value = DEFAULT_CLIENT_ID)]
    client_id: String,

    /// Delay before reconnecting after the backend goes away (ms).
    #[arg(long, default_value_t = 5000)]
    reconnect_ms: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = ChannelConfig::new(args.server)
        .with_reconnect_delay(Duration::from_millis(args.reconnect_ms));
    config.client_id = args.client_id;
    let app = LauepixApp::new(config)?;

    let opts = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Lauepix",
        opts,
        Box::new(|cc| {
            ui::theme::configure_style(&cc.egui_ctx);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow!("{e}"))
}
