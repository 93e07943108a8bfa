mod renderer;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use viewport_sense_core::{EngineConfig, HeadlessPlatform, ViewportEngine};

#[derive(Parser)]
#[command(
    name = "viewport-sense",
    version,
    about = "Live viewport, scroll and preference state for a simulated page, sized to this terminal"
)]
struct Cli {
    /// Engine config (JSON: breakpoints, nearEdgeMargin, visibilityThreshold, ...)
    #[arg(long)]
    config: Option<PathBuf>,
    /// User-agent string reported by the simulated browser
    #[arg(long, default_value = "")]
    user_agent: String,
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f64,
    #[arg(long, default_value_t = 0)]
    touch_points: u32,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    EngineConfig::from_json(&data).with_context(|| format!("invalid config {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let platform = Rc::new(
        HeadlessPlatform::new()
            .with_user_agent(cli.user_agent)
            .with_pixel_ratio(cli.pixel_ratio)
            .with_touch_points(cli.touch_points),
    );
    let engine = ViewportEngine::with_config(platform, config)?;

    renderer::run_tui(&engine)
}
