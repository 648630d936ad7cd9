//! Stripchart - live multi-channel signal viewer.

mod app;
mod source;
mod state;

use std::path::PathBuf;

use anyhow::{Context, Result};
use stripchart_config::Config;
use winit::event_loop::{ControlFlow, EventLoop};

use app::App;

fn run() -> Result<()> {
    env_logger::init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
    }
}
