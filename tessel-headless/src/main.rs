//! tessel-headless - drive a grid engine without a window.
//!
//! Loads a config, optionally a dataset and an event script, replays the
//! script on a real timer loop and prints the resulting grid as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tessel_grid::{Dataset, SizePreset};
use tessel_headless::{FrameDriver, parse_script};
use tessel_render::{EngineConfig, ThemeSpec, frame_timing};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tessel-headless", about = "Run a grid engine off-screen", version)]
struct Cli {
    /// Engine config (JSON). Missing fields take their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TTF/OTF font for glyphs. Without one, block glyphs are drawn.
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Theme preset: default, dark or green.
    #[arg(short, long)]
    theme: Option<String>,

    /// Size preset: small, medium or large.
    #[arg(short, long)]
    size: Option<String>,

    /// Dataset preset: employees, products or sales.
    #[arg(short, long)]
    dataset: Option<String>,

    /// Event script (JSON array of steps).
    #[arg(long)]
    script: Option<PathBuf>,

    /// How long to keep ticking after the last event.
    #[arg(long, default_value = "600")]
    settle_ms: f64,

    /// Log sampled frame timings at debug level.
    #[arg(long)]
    timings: bool,
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            EngineConfig::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if let Some(font) = &cli.font {
        config.font_path = Some(font.clone());
    }
    if let Some(name) = &cli.theme {
        config.theme = ThemeSpec::preset(name).context("Unknown theme")?;
    }
    if let Some(name) = &cli.size {
        config.size = SizePreset::preset(name).context("Unknown size")?;
        config.fit_to_viewport = false;
    }
    config.validate().context("Invalid config")?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if cli.timings {
        frame_timing::enable();
    }

    let config = load_config(&cli)?;
    let mut driver = FrameDriver::new(config).context("Failed to create engine")?;

    if let Some(name) = &cli.dataset {
        let dataset = Dataset::preset(name).context("Unknown dataset")?;
        driver.engine_mut().load_dataset(&dataset)?;
    }

    let script = match &cli.script {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            parse_script(&json).with_context(|| format!("Invalid script {}", path.display()))?
        }
        None => Vec::new(),
    };

    tracing::info!("replaying {} scripted events", script.len());
    let report = driver.run(script, cli.settle_ms).await?;
    tracing::info!(
        "done: {} frames ({} yielded), outcomes {:?}",
        report.frames,
        report.yields,
        report.outcomes
    );

    let engine = driver.into_engine();
    let grid = serde_json::json!({
        "headers": engine.model().headers(),
        "rows": engine.model().rows_iter().collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&grid)?);
    engine.destroy();
    Ok(())
}
