//! Blitz CLI: replay bar files through the signal engine.
//!
//! Commands:
//! - `run`: replay a CSV bar file, write events as JSON lines, print a summary
//! - `synthetic`: write a seeded random-walk bar file
//! - `config`: print the default strategy config as TOML

mod data;
mod replay;
mod synthetic;

use anyhow::{bail, Context, Result};
use blitz_core::config::StrategyConfig;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::replay::ReplaySummary;

#[derive(Parser)]
#[command(name = "blitz", about = "Blitz: UT-Bot / Hull / STC signal engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV bar file through the engine.
    Run {
        /// CSV with columns timestamp,open,high,low,close.
        #[arg(long)]
        bars: PathBuf,

        /// Strategy config (TOML). Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write events here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Close positions when a bar's range touches the stop or target.
        #[arg(long, default_value_t = false)]
        simulate_exits: bool,
    },
    /// Write a seeded synthetic bar file (hourly random walk).
    Synthetic {
        #[arg(long, default_value_t = 5_000)]
        count: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First bar timestamp (RFC 3339 or unix seconds).
        #[arg(long, default_value = "2024-01-01T00:00:00Z")]
        start: String,

        #[arg(long)]
        output: PathBuf,
    },
    /// Print the default strategy config as TOML.
    Config,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            bars,
            config,
            output,
            simulate_exits,
        } => run_replay(&bars, config.as_deref(), output.as_deref(), simulate_exits),
        Commands::Synthetic {
            count,
            seed,
            start,
            output,
        } => run_synthetic(count, seed, &start, &output),
        Commands::Config => {
            print!("{}", StrategyConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

/// Logs go to stderr so JSON lines on stdout stay clean. `RUST_LOG`
/// overrides the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_replay(
    bars_path: &Path,
    config_path: Option<&Path>,
    output: Option<&Path>,
    simulate_exits: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => StrategyConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StrategyConfig::default(),
    };
    let bars = data::load_bars(bars_path)?;
    if bars.is_empty() {
        bail!("{} contains no bars", bars_path.display());
    }

    let summary = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            let summary = replay::replay(&config, &bars, simulate_exits, &mut writer)?;
            print_summary(&mut io::stdout().lock(), &summary)?;
            println!("Events written to: {}", path.display());
            summary
        }
        None => {
            let mut stdout = io::stdout().lock();
            let summary = replay::replay(&config, &bars, simulate_exits, &mut stdout)?;
            print_summary(&mut io::stderr().lock(), &summary)?;
            summary
        }
    };

    if summary.rejected_bars > 0 {
        tracing::warn!(rejected = summary.rejected_bars, "some bars were skipped");
    }
    Ok(())
}

fn run_synthetic(count: usize, seed: u64, start: &str, output: &Path) -> Result<()> {
    if count == 0 {
        bail!("--count must be at least 1");
    }
    let start = data::parse_timestamp(start).context("invalid --start")?;
    let bars = synthetic::generate(count, seed, start);
    data::write_bars(output, &bars)?;
    println!("Wrote {count} bars (seed {seed}) to {}", output.display());
    Ok(())
}

fn print_summary<W: Write>(out: &mut W, s: &ReplaySummary) -> Result<()> {
    writeln!(out, "=== Replay Summary ===")?;
    writeln!(out, "Bars:            {}", s.bars)?;
    writeln!(out, "Warm-up bars:    {}", s.warmup_bars)?;
    if s.rejected_bars > 0 {
        writeln!(out, "Rejected bars:   {}", s.rejected_bars)?;
    }
    writeln!(
        out,
        "Signals:         {} ({} long, {} short)",
        s.signals(),
        s.long_signals,
        s.short_signals
    )?;
    writeln!(out, "Stop adjustments: {}", s.stop_adjustments)?;
    for (reason, count) in &s.closes {
        writeln!(out, "Closed {reason:<10} {count}")?;
    }
    writeln!(out, "Open at end:     {}", if s.open_at_end { "yes" } else { "no" })?;
    writeln!(out, "Config hash:     {}", s.config_fingerprint)?;
    writeln!(out, "Events hash:     {}", s.events_fingerprint)?;
    Ok(())
}
