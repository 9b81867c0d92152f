use anyhow::{Context, Result};
use clap::Parser;
use grid_snake::game::{GameConfig, GameEngine, SpeedLevel};
use grid_snake::modes::HumanMode;
use grid_snake::storage::{HighScoreStore, JsonFileStore, MemoryStore};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grid_snake")]
#[command(version, about = "Snake in the terminal")]
struct Cli {
    /// Cells per side of the square grid (overrides the config file)
    #[arg(long)]
    tile_count: Option<usize>,

    /// Speed level, 1 (slowest) to 20 (fastest)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u8).range(1..=20))]
    speed: u8,

    /// JSON file with game parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the high score is kept between runs
    #[arg(long, default_value = "snake_high_score.json")]
    high_score_file: PathBuf,

    /// Keep the high score in memory only
    #[arg(long)]
    no_persist: bool,

    /// Write logs to this file (the terminal is taken by the game)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Seed for food placement
    #[arg(long)]
    seed: Option<u64>,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create log file {:?}", path))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grid_snake=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }

    // Build game configuration from the optional file, then CLI overrides
    let mut config = match &cli.config {
        Some(path) => GameConfig::from_file(path)?,
        None => GameConfig::default(),
    };
    if let Some(tile_count) = cli.tile_count {
        config.tile_count = tile_count;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }

    let speed = SpeedLevel::new(cli.speed).context("Speed level must be between 1 and 20")?;

    let store: Box<dyn HighScoreStore> = if cli.no_persist {
        Box::new(MemoryStore::new())
    } else {
        Box::new(JsonFileStore::new(cli.high_score_file.clone()))
    };

    let engine = GameEngine::new(config, speed, store)?;
    info!(
        "Starting on a {0}x{0} grid, high score {1}",
        engine.config().tile_count,
        engine.high_score()
    );

    let mut human_mode = HumanMode::new(engine);
    human_mode.run().await?;

    Ok(())
}
