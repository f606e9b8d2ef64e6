//! Facial gesture control application: play webcam games with your face.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use facial_gesture_control::{
    app::{AppConfig, GameMode, GestureApp, VideoSource},
    config::{Config, EXAMPLE_CONFIG},
    session::RoundEndPolicy,
};
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    cam: i32,

    /// Video file to process instead of the camera
    #[arg(short, long)]
    video: Option<String>,

    /// Game mode
    #[arg(short, long, value_enum, default_value = "expression")]
    mode: Mode,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Number of rounds in expression mode
    #[arg(short, long)]
    rounds: Option<u32>,

    /// End a round as soon as the hold succeeds
    #[arg(long)]
    end_on_success: bool,

    /// Do not mirror the camera image
    #[arg(long)]
    no_mirror: bool,

    /// Show the camera window with overlays
    #[arg(short, long)]
    gui: bool,

    /// Enable debug output and the ratio overlay
    #[arg(short, long)]
    debug: bool,

    /// Seed for target selection
    #[arg(long)]
    seed: Option<u64>,

    /// Write the example configuration to this path and exit
    #[arg(long)]
    write_config: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    /// Match the shown expression
    Expression,
    /// Raise eyebrows to flap
    Flap,
    /// Lean to move, raise eyebrows to rotate
    Zones,
}

impl From<Mode> for GameMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Expression => Self::Expression,
            Mode::Flap => Self::Flap,
            Mode::Zones => Self::Zones,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if let Some(path) = &args.write_config {
        std::fs::write(path, EXAMPLE_CONFIG).with_context(|| format!("Failed to write {path}"))?;
        info!("Example configuration written to {}", path);
        return Ok(());
    }

    info!("Facial Gesture Control");

    let mut settings = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config file {config_path}"))?
    } else {
        Config::default()
    };

    if let Some(rounds) = args.rounds {
        if rounds == 0 {
            bail!("--rounds must be at least 1");
        }
        settings.session.total_rounds = rounds;
    }
    if args.end_on_success {
        settings.session.end_policy = RoundEndPolicy::EndOnSuccess;
    }
    settings.validate().context("Invalid configuration")?;

    let config = AppConfig {
        video_source: if let Some(video_path) = args.video {
            VideoSource::File(video_path)
        } else {
            VideoSource::Camera(args.cam)
        },
        mode: args.mode.into(),
        gui: args.gui || settings.display.gui,
        mirror: !args.no_mirror && settings.display.mirror,
        debug: args.debug,
        seed: args.seed,
        settings,
    };

    let mut app = GestureApp::new(config)?;
    app.run()?;

    Ok(())
}
