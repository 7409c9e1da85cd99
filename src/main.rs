use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use speed_ramp::{config::Config, pipeline::RampEngine, video::FfmpegToolkit};

#[derive(Parser)]
#[command(
    name = "speed-ramp",
    version,
    about = "Speed-ramp videos according to on-screen motion",
    long_about = "Speed-Ramp measures motion with optical flow, derives a playback speed for every short segment of the video and re-renders it so calm parts slow down and busy parts speed up."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render a speed-ramped copy of a video
    Render {
        /// Input video file (mp4, mov, avi, mkv)
        input: PathBuf,

        /// Output video file path
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        ramp: RampArgs,
    },

    /// Print the speed curve without rendering
    Analyze {
        /// Input video file (mp4, mov, avi, mkv)
        input: PathBuf,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        ramp: RampArgs,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        #[arg(default_value = "speed-ramp.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Overrides for the `[ramp]` configuration section
#[derive(clap::Args)]
struct RampArgs {
    /// Speed of the calmest segment
    #[arg(long)]
    min_speed: Option<f64>,

    /// Speed of the busiest segment
    #[arg(long)]
    max_speed: Option<f64>,

    /// Segment length in seconds
    #[arg(long)]
    segment_duration: Option<f64>,
}

impl RampArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(min_speed) = self.min_speed {
            config.ramp.min_speed = min_speed;
        }
        if let Some(max_speed) = self.max_speed {
            config.ramp.max_speed = max_speed;
        }
        if let Some(segment_duration) = self.segment_duration {
            config.ramp.segment_duration = segment_duration;
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Ok(Config::from_file(config_path)?)
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting Speed-Ramp v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Render { input, output, ramp } => {
            let mut config = load_config(cli.config.as_ref())?;
            ramp.apply(&mut config);

            let toolkit = FfmpegToolkit::new(config.tools.clone(), config.encoding.clone());
            if !toolkit.check_available() {
                bail!("'{}' could not be started. Please make sure FFmpeg is installed.", config.tools.ffmpeg);
            }

            let engine = RampEngine::new(config).map_err(|e| anyhow::anyhow!(e.user_message()))?;
            let summary = engine
                .ramp(&input, &output)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            info!("Rendered {} segments: {:.2}s -> ~{:.2}s",
                  summary.segments_rendered, summary.source_duration, summary.estimated_output_duration);
        }

        Command::Analyze { input, json, ramp } => {
            let mut config = load_config(cli.config.as_ref())?;
            ramp.apply(&mut config);

            let engine = RampEngine::new(config).map_err(|e| anyhow::anyhow!(e.user_message()))?;
            let report = engine
                .analyze(&input)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Segments: {} x {:.3}s ({} frames @ {:.3} fps)",
                         report.speeds.len(), report.segment_duration,
                         report.segment_frame_count, report.frame_rate);
                println!("Range:    {:.2}x - {:.2}x", report.min_speed, report.max_speed);
                for (index, speed) in report.speeds.iter().enumerate() {
                    println!("  {:>4}  {:>7.3}s  {:.4}x", index, index as f64 * report.segment_duration, speed);
                }
            }

            if report.window_clamped {
                warn!("Requested segment duration was shorter than one frame");
            }
        }

        Command::InitConfig { path, force } => {
            if path.exists() && !force {
                bail!("{:?} already exists (use --force to overwrite)", path);
            }

            Config::default()
                .save_to_file(&path)
                .with_context(|| format!("writing {:?}", path))?;
            info!("Default configuration written to {:?}", path);
        }
    }

    Ok(())
}
