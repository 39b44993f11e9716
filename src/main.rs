use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, BufWriter};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wikisplit::checkpoint::{self, CheckpointManager};
use wikisplit::extract::{self, ExtractOptions};
use wikisplit::split::{self, Split};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "wikisplit")]
#[command(about = "Split-aware revision extraction from Wikipedia XML dumps")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every window of a dump in parallel and write per-window shards
    Scan(ScanArgs),
    /// Scan one byte window and print its revisions as JSON lines
    Window(WindowArgs),
    /// Print the window plan for a dump
    Splits(SplitsArgs),
    /// Merge per-window shards into revisions.csv and text.jsonl
    Merge(MergeArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Path to the dump file (.xml or .xml.bz2)
    #[arg(short, long)]
    input: String,

    /// Output directory for generated files
    #[arg(short, long)]
    output: String,

    /// Window length in bytes (ignored for bzip2 input)
    #[arg(long, default_value_t = wikisplit::config::DEFAULT_SPLIT_SIZE)]
    split_size: u64,

    /// Also write revision bodies to text_NNNNN.jsonl
    #[arg(long)]
    text: bool,

    /// Reduce written bodies to plain text
    #[arg(long, requires = "text")]
    plain_text: bool,

    /// Dry run - don't write output files
    #[arg(long)]
    dry_run: bool,

    /// Resume from last checkpoint if available
    #[arg(long)]
    resume: bool,

    /// Clear existing checkpoint and outputs before starting
    #[arg(long)]
    clean: bool,

    /// Checkpoint interval in completed windows
    #[arg(long, default_value_t = wikisplit::config::CHECKPOINT_INTERVAL)]
    checkpoint_interval: u32,
}

#[derive(Args)]
struct WindowArgs {
    /// Path to the dump file
    #[arg(short, long)]
    input: String,

    /// First byte of the window
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Window length in bytes (default: to the end of the file)
    #[arg(long)]
    length: Option<u64>,
}

#[derive(Args)]
struct SplitsArgs {
    /// Path to the dump file
    #[arg(short, long)]
    input: String,

    /// Window length in bytes
    #[arg(long, default_value_t = wikisplit::config::DEFAULT_SPLIT_SIZE)]
    split_size: u64,
}

#[derive(Args)]
struct MergeArgs {
    /// Output directory containing revisions_NNNNN.csv shards
    #[arg(short, long)]
    output: String,
}

fn run_scan(args: ScanArgs) -> Result<()> {
    if args.clean {
        let output_path = Path::new(&args.output);
        if output_path.exists() {
            info!("Cleaning output directory: {}", args.output);
            fs::remove_dir_all(output_path)
                .with_context(|| format!("Failed to clean output directory: {}", args.output))?;
        }
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {}", args.output))?;

    let checkpoint_mgr = if !args.dry_run {
        Some(CheckpointManager::new(
            &args.input,
            &args.output,
            args.split_size,
            args.checkpoint_interval,
        )?)
    } else {
        None
    };

    let checkpoint = if args.resume && !args.clean {
        match checkpoint::load_if_valid(&args.input, &args.output, args.split_size)? {
            Some(cp) => {
                info!(
                    completed = cp.completed_splits.len(),
                    revisions = cp.stats.revisions_emitted,
                    "Resuming from checkpoint"
                );
                Some(cp)
            }
            None => {
                info!("No valid checkpoint found, starting fresh");
                None
            }
        }
    } else {
        None
    };

    let options = ExtractOptions {
        split_size: args.split_size,
        write_text: args.text,
        plain_text: args.plain_text,
        dry_run: args.dry_run,
    };

    info!("Starting scan");
    let started = Instant::now();
    let stats = extract::run_extraction(
        &args.input,
        &args.output,
        &options,
        checkpoint.as_ref(),
        checkpoint_mgr.as_ref(),
    )?;
    let elapsed = started.elapsed();
    info!(duration_secs = elapsed.as_secs_f64(), "Scan complete");

    // aborted windows still need a resumed run
    if stats.aborted() == 0 {
        if let Some(ref mgr) = checkpoint_mgr {
            if let Err(e) = mgr.clear() {
                warn!(error = %e, "Failed to clear checkpoint");
            }
        }
    }

    println!();
    println!("=== Summary ===");
    println!("Scan time:          {:.2}s", elapsed.as_secs_f64());
    println!();
    println!("Windows scanned:    {}", stats.windows());
    println!("Windows aborted:    {}", stats.aborted());
    println!("Pages seen:         {}", stats.pages());
    println!("Revisions emitted:  {}", stats.revisions());
    println!("Revisions skipped:  {}", stats.skipped());
    println!("Redirects:          {}", stats.redirect_count());
    println!("Stubs:              {}", stats.stub_count());
    println!("Metadata only:      {}", stats.metadata_only_count());

    if stats.aborted() > 0 {
        bail!(
            "{} window(s) aborted on truncated input; rerun with --resume to retry them",
            stats.aborted()
        );
    }

    Ok(())
}

fn run_window(args: WindowArgs) -> Result<()> {
    let length = match args.length {
        Some(length) => length,
        None => fs::metadata(&args.input)
            .with_context(|| format!("Failed to get metadata for: {}", args.input))?
            .len()
            .saturating_sub(args.start),
    };
    let window = Split::new(0, &args.input, args.start, length);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = extract::run_window(&window, &mut out)?;

    info!(
        pages = summary.pages,
        revisions = summary.revisions,
        skipped = summary.skipped_revisions,
        "Window complete"
    );
    Ok(())
}

fn run_splits(args: SplitsArgs) -> Result<()> {
    let splits = split::plan_splits(Path::new(&args.input), args.split_size)
        .with_context(|| format!("Failed to plan splits for: {}", args.input))?;

    for split in &splits {
        println!("{}\t{}\t{}", split.index, split.start, split.length);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // stdout carries window output, so logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Window(args) => run_window(args),
        Commands::Splits(args) => run_splits(args),
        Commands::Merge(args) => wikisplit::merge::merge_shards(&args.output),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
