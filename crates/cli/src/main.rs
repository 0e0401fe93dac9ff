//! Capability-tag cache simulator CLI.
//!
//! This binary provides a single entry point for all replay modes. It performs:
//! 1. **Simulate:** Replay an access trace through L1/L2 and the tag controller, writing the LLC request trace.
//! 2. **Tag cache replay:** Replay an LLC request trace through the uncompressed tag cache.
//! 3. **Trace info:** Print statistics of an access trace or of a request trace without simulating.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tagsim_core::common::Result;
use tagsim_core::config::Config;
use tagsim_core::memory::TagTable;
use tagsim_core::sim::{Simulator, TagCacheReplay, report};
use tagsim_core::stats::{RequestStats, TraceStats};
use tagsim_core::trace::{AccessEntry, LlcRequest, TraceReader, TraceWriter};

#[derive(Parser, Debug)]
#[command(
    name = "tagsim",
    author,
    version,
    about = "Capability-tag cache hierarchy simulator",
    long_about = "Replay CHERI memory-access traces through a tag-tracking cache hierarchy.\n\nExamples:\n  tagsim simulate trace.bin requests.bin --initial-state tags.bin\n  tagsim simulate-tag-cache requests.bin\n  tagsim get-info trace.bin --config tagsim.json\n  tagsim requests-get-info requests.bin"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay an access trace and write the LLC request trace.
    Simulate {
        /// Access trace to replay.
        trace: PathBuf,

        /// Output file for the LLC request trace.
        output: PathBuf,

        /// Tag memory snapshot (one bit per capability, all tags known).
        #[arg(long)]
        initial_state: Option<PathBuf>,

        /// JSON configuration file (defaults are used for missing fields).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite the output without asking.
        #[arg(short, long)]
        force: bool,
    },

    /// Replay an LLC request trace through the uncompressed tag cache.
    SimulateTagCache {
        /// LLC request trace to replay.
        requests: PathBuf,

        /// Tag memory snapshot (one bit per capability, all tags known).
        #[arg(long)]
        initial_state: Option<PathBuf>,

        /// JSON configuration file (defaults are used for missing fields).
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print access-trace statistics.
    GetInfo {
        /// Access trace to inspect.
        trace: PathBuf,

        /// JSON configuration file; its memory section decides which entries are invalid.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print LLC request-trace statistics.
    RequestsGetInfo {
        /// LLC request trace to inspect.
        requests: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Simulate {
            trace,
            output,
            initial_state,
            config,
            force,
        } => cmd_simulate(&trace, &output, initial_state.as_deref(), config.as_deref(), force),
        Commands::SimulateTagCache {
            requests,
            initial_state,
            config,
        } => cmd_simulate_tag_cache(&requests, initial_state.as_deref(), config.as_deref()),
        Commands::GetInfo { trace, config } => cmd_get_info(&trace, config.as_deref()),
        Commands::RequestsGetInfo { requests } => cmd_requests_get_info(&requests),
    };

    if let Err(e) = result {
        eprintln!("\n[!] FATAL: {e}");
        process::exit(1);
    }
}

/// Installs the stderr `fmt` subscriber; `RUST_LOG` overrides `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(p) => Config::from_json_file(p)?,
        None => Config::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Builds the tag table from a snapshot, or an all-unknown table.
fn load_table(config: &Config, initial_state: Option<&Path>) -> Result<TagTable> {
    let layout = config.layout()?;
    match initial_state {
        Some(p) => {
            println!("[*] Initial tag state: {}", p.display());
            TagTable::from_snapshot_file(layout, p)
        }
        None => Ok(TagTable::new(layout)),
    }
}

/// Asks on stdin whether `path` may be replaced.
fn confirm_overwrite(path: &Path) -> Result<bool> {
    print!("Output {} exists. Overwrite? [y/N] ", path.display());
    io::stdout().flush()?;
    let mut answer = String::new();
    let _ = io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Replays an access trace through the configured hierarchy.
fn cmd_simulate(
    trace: &Path,
    output: &Path,
    initial_state: Option<&Path>,
    config: Option<&Path>,
    force: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let reader = TraceReader::<AccessEntry, _>::open(trace)?;
    let table = load_table(&config, initial_state)?;
    let overwrite = force || (output.exists() && confirm_overwrite(output)?);
    let writer = TraceWriter::<LlcRequest, _>::create(output, overwrite)?;

    let mut sim = Simulator::new(&config, table, writer)?;
    report::print_configuration(sim.hierarchy());
    println!("[*] Replaying {} -> {}", trace.display(), output.display());

    sim.run(reader)?;

    let (hierarchy, stats) = sim.into_parts();
    hierarchy.check_invariants()?;
    stats.print();
    report::print_statistics(&hierarchy);

    if let Some(writer) = hierarchy.into_sink() {
        let written = writer.records_written();
        let _ = writer.finish()?;
        info!(records = written, path = %output.display(), "request trace written");
    }
    Ok(())
}

/// Replays an LLC request trace through the uncompressed tag cache.
fn cmd_simulate_tag_cache(
    requests: &Path,
    initial_state: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let table = load_table(&config, initial_state)?;

    let mut replay = TagCacheReplay::new(&config, table)?;
    report::print_configuration(replay.hierarchy());
    println!("[*] Replaying {}", requests.display());

    let reader = TraceReader::<LlcRequest, _>::open(requests)?;
    replay.run(reader)?;

    let stats = replay.stats();
    println!("\n==========================================================");
    println!("REPLAY STATISTICS");
    println!("==========================================================");
    println!("  requests:       {}", stats.requests);
    println!("  tag mismatches: {}", stats.tag_mismatches);
    println!("  tags adopted:   {}", stats.tags_adopted);
    report::print_statistics(replay.hierarchy());
    Ok(())
}

/// Prints access-trace statistics without simulating.
fn cmd_get_info(trace: &Path, config: Option<&Path>) -> Result<()> {
    trace_stats(trace, &load_config(config)?)?.print();
    Ok(())
}

/// Classifies every entry of `trace` against the configured memory layout.
fn trace_stats(trace: &Path, config: &Config) -> Result<TraceStats> {
    let layout = config.layout()?;
    let mut stats = TraceStats::default();
    for entry in TraceReader::<AccessEntry, _>::open(trace)? {
        let _ = stats.record(&entry?, &layout);
    }
    Ok(stats)
}

/// Prints LLC request-trace statistics.
fn cmd_requests_get_info(requests: &Path) -> Result<()> {
    let mut stats = RequestStats::default();
    for request in TraceReader::<LlcRequest, _>::open(requests)? {
        stats.record(&request?);
    }
    stats.print();
    Ok(())
}
