mod app;
mod devices;
mod engine;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use nullcue_core::ColourName;
use nullcue_experiment::{ExperimentConfig, Monitor};
use tracing::info;
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

pub use app::{App, UiCommand};
pub use engine::{Engine, SessionInfo};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MonitorPreset {
    Laptop,
    Lab,
}

impl MonitorPreset {
    fn monitor(self) -> Monitor {
        match self {
            MonitorPreset::Laptop => Monitor::laptop(),
            MonitorPreset::Lab => Monitor::lab(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "nullcue", about = "Action-coupled null-cue working memory task")]
struct Cli {
    /// Participant identifier, used in the output file names.
    #[arg(long)]
    participant: String,
    #[arg(long, default_value_t = 1)]
    session: u32,
    /// The participant's assigned colour (blue, green, orange).
    #[arg(long)]
    colour: ColourName,
    #[arg(long, value_enum)]
    monitor: Option<MonitorPreset>,
    /// Dry run: short design, no event markers.
    #[arg(long)]
    testing: bool,
    #[arg(long)]
    blocks: Option<usize>,
    #[arg(long)]
    trials_per_block: Option<usize>,
    /// JSON file overriding the built-in configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// TrueType font for instructions and feedback.
    #[arg(long)]
    font: Option<PathBuf>,
    #[arg(long, default_value = "data")]
    output: PathBuf,
    /// Seed for design and stimulus randomisation.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    skip_practice: bool,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn experiment_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None if self.testing => ExperimentConfig::testing(),
            None => ExperimentConfig::default(),
        };
        config.testing |= self.testing;
        if let Some(preset) = self.monitor {
            config.monitor = preset.monitor();
        }
        if let Some(n) = self.blocks {
            config.n_blocks = n;
        }
        if let Some(n) = self.trials_per_block {
            config.trials_per_block = n;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.experiment_config()?;
    let seed = cli.seed.unwrap_or_else(rand::random);
    info!(
        participant = %cli.participant,
        session = cli.session,
        colour = %cli.colour,
        seed,
        testing = config.testing,
        blocks = config.n_blocks,
        trials_per_block = config.trials_per_block,
        "starting session"
    );

    let font = cli
        .font
        .as_deref()
        .map(nullcue_render::load_font)
        .transpose()?;
    let info = SessionInfo {
        participant: cli.participant,
        session: cli.session,
        assigned_colour: cli.colour,
        seed,
        output_dir: cli.output,
        skip_practice: cli.skip_practice,
    };

    let event_loop = EventLoop::<UiCommand>::with_user_event().build()?;
    let engine = Engine::new(config, info, event_loop.create_proxy());
    App::new(engine, font).run(event_loop)
}
