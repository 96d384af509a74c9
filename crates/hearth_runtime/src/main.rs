//! Hearth Engine Runtime
//!
//! Minimal binary that boots logging, loads settings and runs the demo scene
//! headless for a fixed number of frames.

mod demo;
mod settings;

use anyhow::Result;
use clap::Parser;
use demo::{DemoScene, RenderSystem, Transform};
use hearth_core::scene::SceneHost;
use hearth_core::time::SimulationTime;
use settings::RuntimeSettings;
use std::path::PathBuf;
use tracing::Level;

/// Hearth Engine headless runtime
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// JSON settings file. Missing fields use defaults.
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Number of frames to simulate (overrides the settings file).
    #[arg(long)]
    frames: Option<u64>,

    /// Log registry lifecycle events.
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => RuntimeSettings::load(path)?,
        None => RuntimeSettings::default(),
    };
    if let Some(frames) = cli.frames {
        settings.frames = frames;
    }
    settings.registry.debug |= cli.debug;

    let level = if settings.registry.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    tracing::info!("Hearth Engine v{}", hearth_core::VERSION);
    tracing::info!(
        frames = settings.frames,
        tick_rate_hz = settings.tick_rate_hz,
        "Starting demo scene"
    );

    let mut time = SimulationTime::with_tick_rate(settings.tick_rate_hz);
    let mut host = SceneHost::new(DemoScene::new(), settings.registry.clone())?;

    for _ in 0..settings.frames {
        host.frame(time.dt_seconds());
        time.advance_tick();
    }

    if let Some(player3) = host.scene().player3() {
        let transform = host.registry().component::<Transform>(player3)?;
        tracing::info!(
            x = transform.position.x,
            y = transform.position.y,
            "player3 final position"
        );
    }
    if let Ok(render) = host.registry().system::<RenderSystem>() {
        tracing::info!(
            draws = render.total_draws(),
            last_frame = render.last_frame().len(),
            "render summary"
        );
    }

    tracing::info!(
        ticks = time.tick_count(),
        simulated_secs = time.total_time().as_secs_f64(),
        "Runtime finished"
    );
    host.finish();

    Ok(())
}
