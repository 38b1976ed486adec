//! CAN Trace CLI Application
//!
//! This is the command-line host for the can-trace-engine library.
//! It loads a log (or generates mock traffic), optionally a DBC, and drives
//! the trace view:
//! - `info`: recording and database overview
//! - `trace`: seek and step, printing each update
//! - `play`: timed playback, the CLI owns the timer
//! - `series`: one signal's values over the whole recording

use anyhow::{bail, Context, Result};
use can_trace_engine::{PlaybackTick, Session, TraceConfig, TraceUpdate};
use clap::{Args as ClapArgs, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod render;

/// CAN Trace - Replay CAN logs and watch bytes and signals change
#[derive(Parser, Debug)]
#[command(name = "can-trace")]
#[command(about = "Replay CAN log files (CSV, BusMaster, ASC, BLF, candump)", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show recording and database statistics
    Info {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Seek to a frame and step from there
    Trace {
        #[command(flatten)]
        input: InputArgs,

        /// Frame index to jump to first
        #[arg(long, value_name = "INDEX")]
        seek: Option<usize>,

        /// Forward steps after the jump
        #[arg(long, default_value_t = 0)]
        steps: usize,

        /// Backward steps after the forward steps
        #[arg(long, default_value_t = 0)]
        back: usize,
    },
    /// Play the recording forward on a timer
    Play {
        #[command(flatten)]
        input: InputArgs,

        /// Frame index to start from
        #[arg(long, default_value_t = 0)]
        from: usize,

        /// Timer interval in milliseconds (overrides the config file)
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,

        /// Stop after this many frames
        #[arg(long, value_name = "COUNT")]
        max_steps: Option<usize>,
    },
    /// Print one signal (or the occurrences of an ID) over time
    Series {
        #[command(flatten)]
        input: InputArgs,

        /// CAN ID, decimal or 0x-prefixed hex
        #[arg(long, value_parser = parse_can_id)]
        id: u32,

        /// Signal name; omit to list occurrences of the ID
        #[arg(long)]
        signal: Option<String>,
    },
}

/// Where the frames and signal definitions come from
#[derive(ClapArgs, Debug, Clone)]
struct InputArgs {
    /// Log file to load
    #[arg(short, long, value_name = "FILE", conflicts_with = "mock")]
    log: Option<PathBuf>,

    /// Generate this many frames of mock traffic instead of loading a log
    #[arg(long, value_name = "COUNT")]
    mock: Option<usize>,

    /// Seed for mock traffic
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// DBC file for signal decoding
    #[arg(long, value_name = "FILE")]
    dbc: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn parse_can_id(text: &str) -> std::result::Result<u32, String> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|e| format!("invalid CAN ID '{}': {}", text, e))
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Trace CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using trace engine library v{}", can_trace_engine::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    match &args.command {
        Command::Info { input } => {
            let session = open_session(input, &app_config)?;
            let database = session.database();
            render::print_info(
                session.store(),
                database.stats(),
                |id| database.message_name(id).map(str::to_string),
                input.json,
            )
        }
        Command::Trace {
            input,
            seek,
            steps,
            back,
        } => run_trace(input, &app_config, *seek, *steps, *back),
        Command::Play {
            input,
            from,
            interval_ms,
            max_steps,
        } => run_play(input, &app_config, *from, *interval_ms, *max_steps),
        Command::Series { input, id, signal } => {
            let session = open_session(input, &app_config)?;
            let series = match signal {
                Some(name) => {
                    if !session.signals_for_id(*id).contains(name) {
                        log::warn!("Signal {} is not defined for 0x{:X}", name, id);
                    }
                    session.signal_series(*id, name)
                }
                None => session.occurrences(*id),
            };
            render::print_series(&series, input.json)
        }
    }
}

/// Build a session from the command line, falling back to the config file
fn open_session(input: &InputArgs, app_config: &config::AppConfig) -> Result<Session> {
    let trace_config: TraceConfig = app_config.trace_config();
    let mut session = Session::new(trace_config);

    if let Some(count) = input.mock {
        session.load_mock(count, &mut StdRng::seed_from_u64(input.seed));
    } else {
        let log_path = input
            .log
            .as_ref()
            .or(app_config.input.log.as_ref())
            .context("No input specified: pass --log <FILE> or --mock <COUNT>")?;
        session
            .load_log(log_path)
            .with_context(|| format!("Failed to load log file {:?}", log_path))?;
    }

    if let Some(dbc_path) = input.dbc.as_ref().or(app_config.input.dbc.as_ref()) {
        session
            .load_dbc(dbc_path)
            .with_context(|| format!("Failed to load DBC file {:?}", dbc_path))?;
    }

    if session.store().is_empty() {
        bail!("Recording is empty");
    }

    Ok(session)
}

fn emit(update: Option<TraceUpdate>, json: bool) -> Result<()> {
    match update {
        Some(update) => render::print_update(&update, json),
        None => {
            log::debug!("Navigation was a no-op");
            Ok(())
        }
    }
}

fn run_trace(
    input: &InputArgs,
    app_config: &config::AppConfig,
    seek: Option<usize>,
    steps: usize,
    back: usize,
) -> Result<()> {
    let mut session = open_session(input, app_config)?;

    let first = match seek {
        Some(target) => session.seek(target),
        None => session.refresh(),
    };
    emit(first, input.json)?;

    for _ in 0..steps {
        let update = session.step_forward();
        if update.is_none() {
            log::info!("Reached the last frame");
            break;
        }
        emit(update, input.json)?;
    }

    for _ in 0..back {
        let update = session.step_back();
        if update.is_none() {
            log::info!("Reached the first frame");
            break;
        }
        emit(update, input.json)?;
    }

    Ok(())
}

fn run_play(
    input: &InputArgs,
    app_config: &config::AppConfig,
    from: usize,
    interval_ms: Option<u64>,
    max_steps: Option<usize>,
) -> Result<()> {
    let mut session = open_session(input, app_config)?;
    let interval =
        Duration::from_millis(interval_ms.unwrap_or(session.config().playback_interval_ms));

    emit(session.seek(from), input.json)?;
    session.toggle_playback();

    let mut advanced = 0usize;
    loop {
        if max_steps.is_some_and(|max| advanced >= max) {
            session.toggle_playback();
            break;
        }
        std::thread::sleep(interval);
        match session.playback_tick() {
            PlaybackTick::Advanced(update) => {
                advanced += 1;
                render::print_update(&update, input.json)?;
            }
            PlaybackTick::Finished | PlaybackTick::Idle => break,
        }
    }

    log::info!("Playback stopped at frame {} after {} steps", session.position(), advanced);
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
