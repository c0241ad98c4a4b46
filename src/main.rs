#![deny(unsafe_code)]

mod common;
mod config;
mod fleet;
mod platform;
mod session;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use common::types::parse_slot_list;
use config::FleetConfig;
use fleet::Topology;
use platform::{DisplaySource, X11Platform};

/// Grace period for in-flight window operations when the session ends
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "browser-fleet")]
#[command(version)]
#[command(about = "Launch, arrange and drive many browser-profile windows at once", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging plus session diagnostics at start-up
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Interactive session reading commands from stdin (default)
    Session,
    /// Print the detected displays and which ones hold the grid
    Displays,
    /// Print the target rectangle of each slot on the current displays
    Layout {
        /// Slots or ranges, e.g. `1-8 12`
        #[arg(required = true)]
        slots: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --debug
    let default_level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    if cli.debug {
        common::debug::log_session_info();
    }

    let config_path = cli.config.unwrap_or_else(FleetConfig::path);
    let config = FleetConfig::load_from(&config_path)?;

    match cli.command.unwrap_or(Mode::Session) {
        Mode::Session => run_session(config),
        Mode::Displays => print_displays(&config),
        Mode::Layout { slots } => print_layout(&config, &slots),
    }
}

fn run_session(config: FleetConfig) -> Result<()> {
    let platform = Arc::new(X11Platform::connect(&config)?);
    let session = session::Session::new(platform, config);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;
    let result = rt.block_on(session.run());
    rt.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

fn print_displays(config: &FleetConfig) -> Result<()> {
    let platform = X11Platform::connect(config)?;
    let displays = platform.displays()?;

    for (idx, display) in displays.iter().enumerate() {
        println!(
            "display {}: {}{}",
            idx,
            display.bounds(),
            if display.is_primary { " (primary)" } else { "" }
        );
    }

    match Topology::resolve(&displays) {
        Some(topology) => {
            println!("primary grid:   {}", topology.primary.bounds());
            println!("secondary grid: {}", topology.secondary.bounds());
            Ok(())
        }
        None => bail!("no displays detected"),
    }
}

fn print_layout(config: &FleetConfig, slots: &[String]) -> Result<()> {
    let slots = parse_slot_list(slots.iter().map(String::as_str))?;
    let platform = X11Platform::connect(config)?;
    let Some(topology) = Topology::discover(&platform)? else {
        bail!("no displays detected");
    };

    for slot in slots {
        println!("slot {:>3}: {}", slot, topology.target_rect(slot));
    }
    Ok(())
}
