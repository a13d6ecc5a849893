//! Cohort engine model CLI.
//!
//! This binary drives the engine model from the command line. It performs:
//! 1. **Check:** Load and validate a configuration, then build the system.
//! 2. **Run:** Replay a JSON request trace against a configured system and report statistics.
//! 3. **Scenario:** Run one of the built-in demonstration setups.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use cohort_core::common::SimError;
use cohort_core::common::time::format_ticks;
use cohort_core::config::Config;
use cohort_core::sim::{Simulator, TraceEntry, loader, scenario};
use cohort_core::soc::System;
use cohort_core::stats::STATS_SECTIONS;

#[derive(Parser, Debug)]
#[command(
    name = "cohort",
    author,
    version,
    about = "Cohort memory-timing engine model",
    long_about = "Validate configurations, replay request traces, or run built-in scenarios.\n\nLogging is controlled with RUST_LOG (e.g. RUST_LOG=cohort_core=debug).\n\nExamples:\n  cohort check engine.json\n  cohort run --config engine.json --trace reads.json --stats summary,latency\n  cohort scenario single-read"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a JSON configuration and build the system it describes.
    Check {
        /// Configuration file.
        config: PathBuf,
    },

    /// Replay a JSON trace and print statistics.
    Run {
        /// Configuration file.
        #[arg(short, long)]
        config: PathBuf,

        /// Trace file: a JSON array of `{at, cmd, addr, size, data}` records.
        #[arg(short, long)]
        trace: PathBuf,

        /// Comma-separated statistics sections; all when omitted.
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,

        /// Print every completion as a JSON line.
        #[arg(long)]
        completions: bool,
    },

    /// Run a built-in scenario with default parameters.
    Scenario {
        /// Scenario name.
        #[arg(value_parser = clap::builder::PossibleValuesParser::new(scenario::SCENARIOS))]
        name: String,

        /// Comma-separated statistics sections; all when omitted.
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
    },
}

/// One completion as printed with `--completions`.
#[derive(Serialize)]
struct CompletionRecord<'a> {
    id: u64,
    cmd: String,
    addr: u64,
    size: u64,
    issued_at: u64,
    completed_at: u64,
    latency: u64,
    data: &'a [u8],
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Check { config } => cmd_check(&config),
        Commands::Run {
            config,
            trace,
            stats,
            completions,
        } => loader::load_config(&config).and_then(|cfg| {
            let trace = loader::load_trace(&trace)?;
            simulate(&cfg, trace, &stats, completions)
        }),
        Commands::Scenario { name, stats } => match scenario::by_name(&name) {
            Some((cfg, trace)) => simulate(&cfg, trace, &stats, false),
            None => {
                eprintln!("unknown scenario `{name}`");
                process::exit(1);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("\n[!] FATAL: {e}");
        process::exit(1);
    }
}

/// Validates `path` and prints the resulting memory map.
fn cmd_check(path: &Path) -> Result<(), SimError> {
    let config = loader::load_config(path)?;
    let system = System::new(&config)?;
    println!("[*] {} is valid", path.display());
    println!("    mode:         {:?}", system.engine.mode());
    println!("    queue region: {}", system.engine.queue_region());
    println!("    latency:      {}", format_ticks(config.engine.latency));
    println!("    variance:     {}", format_ticks(config.engine.latency_var));
    println!("    bandwidth:    {} B/s", config.engine.bandwidth);
    for range in &config.system.mem_ranges {
        println!("    dram:         {range}");
    }
    Ok(())
}

/// Runs `trace` to completion and prints the requested statistics.
fn simulate(
    config: &Config,
    trace: Vec<TraceEntry>,
    sections: &[String],
    completions: bool,
) -> Result<(), SimError> {
    if let Some(bad) = sections
        .iter()
        .find(|s| !STATS_SECTIONS.contains(&s.as_str()))
    {
        eprintln!(
            "[!] unknown stats section `{bad}` (expected one of {})",
            STATS_SECTIONS.join(", ")
        );
    }

    tracing::info!(entries = trace.len(), mode = ?config.engine.mode, "starting run");
    let mut sim = Simulator::new(config, trace)?;
    let end = sim.run()?;
    println!("[*] Finished at {} ({end} ticks)", format_ticks(end));

    if completions {
        for c in sim.requester.completions() {
            let record = CompletionRecord {
                id: c.id,
                cmd: c.cmd.to_string(),
                addr: c.addr,
                size: c.size,
                issued_at: c.issued_at,
                completed_at: c.completed_at,
                latency: c.latency(),
                data: &c.data,
            };
            println!("{}", serde_json::to_string(&record)?);
        }
    }
    sim.stats().print_sections(sections);
    Ok(())
}
