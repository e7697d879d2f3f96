use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use corpus_miner::{
    AggregateStore, Cancellation, ExternalTokenizer, MinerConfig, MiningWorker, SourceInput,
    SqliteAggregate, SqliteCorpus, SqliteQueue, TokenizeError, Tokenizer, WorkerStats,
    ingest_directory, vocabularize,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "corpus-miner",
    version,
    about = "Mine a source corpus for token vocabulary and literal codepoints"
)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database holding corpus, queues and counts
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Primary queue name
    #[arg(long, global = true)]
    queue: Option<String>,

    /// Parser program
    #[arg(long, global = true)]
    parser: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run mining workers until Ctrl-C
    Work {
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Store and enqueue every source file under a directory
    Ingest {
        dir: PathBuf,
        #[arg(long, default_value = "js")]
        extension: String,
    },
    /// Move error-channel entries back onto the primary queue
    ReplayErrors,
    /// Return in-flight items to pending after a crash
    Requeue,
    /// Queue depths, parse outcomes and the most frequent codepoints
    Stats {
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Print the canonical vocabulary of a file
    Vocab { file: PathBuf },
    /// Check that a file parses
    Check { file: PathBuf },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = MinerConfig::load_or_default(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(queue) = cli.queue {
        config.queue = queue;
    }
    if let Some(parser) = cli.parser {
        config.parser.program = parser;
    }

    match cli.command {
        Command::Work { workers } => {
            if let Some(workers) = workers {
                config.workers = workers;
            }
            work(&config)?;
        }
        Command::Ingest { dir, extension } => {
            let corpus = SqliteCorpus::open(&config.database)?;
            let queue = SqliteQueue::open(&config.database, &config.queue)?;
            let report = ingest_directory(&dir, &extension, &corpus, &queue)?;
            println!(
                "Ingested {} files ({} bytes), enqueued {}",
                report.files, report.total_bytes, report.enqueued
            );
        }
        Command::ReplayErrors => {
            let primary = SqliteQueue::open(&config.database, &config.queue)?;
            let errors = SqliteQueue::open(&config.database, config.error_queue())?;
            let moved = errors.drain_into(&primary)?;
            println!("Replayed {} items onto {}", moved, config.queue);
        }
        Command::Requeue => {
            let primary = SqliteQueue::open(&config.database, &config.queue)?;
            let moved = primary.requeue_in_flight()?;
            println!("Requeued {} in-flight items", moved);
        }
        Command::Stats { top } => stats(&config, top)?,
        Command::Vocab { file } => vocab(&config.tokenizer(), &file)?,
        Command::Check { file } => {
            let mut source =
                File::open(&file).context(format!("Failed to open {}", file.display()))?;
            if !config.tokenizer().check_syntax(SourceInput::Reader(&mut source))? {
                println!("{}: syntax error", file.display());
                return Ok(ExitCode::FAILURE);
            }
            println!("{}: ok", file.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Cancel `cancel` on the first Ctrl-C
fn cancel_on_ctrl_c(cancel: Cancellation) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal handler")?;

    thread::spawn(move || {
        runtime.block_on(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupted; stopping after in-flight items");
                    cancel.cancel();
                }
                Err(err) => error!(error = %err, "Failed to listen for Ctrl-C"),
            }
        });
    });
    Ok(())
}

/// Each worker gets its own connections to the shared database
fn open_worker(
    config: &MinerConfig,
    tokenizer: Arc<dyn Tokenizer>,
    cancel: Cancellation,
) -> Result<MiningWorker> {
    let queue = SqliteQueue::open(&config.database, &config.queue)?
        .poll_interval(config.poll_interval());
    let errors = SqliteQueue::open(&config.database, config.error_queue())?;
    let corpus = SqliteCorpus::open(&config.database)?;
    let aggregate = SqliteAggregate::open(&config.database)?;

    Ok(
        MiningWorker::new(queue, errors, corpus, aggregate, tokenizer, cancel)
            .fault_policy(config.fault_policy()),
    )
}

fn work(config: &MinerConfig) -> Result<()> {
    let cancel = Cancellation::new();
    cancel_on_ctrl_c(cancel.clone())?;

    let tokenizer: Arc<dyn Tokenizer> = Arc::new(config.tokenizer());
    let workers = config.workers.max(1);
    info!(
        parser = %config.parser.program.display(),
        queue = %config.queue,
        workers,
        "Parser listening on"
    );

    let results: Vec<Result<WorkerStats>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let tokenizer = Arc::clone(&tokenizer);
                let cancel = cancel.clone();
                scope.spawn(move || {
                    let result = open_worker(config, tokenizer, cancel.clone())
                        .and_then(|worker| Ok(worker.run()?));
                    if result.is_err() {
                        // One worker giving up stops the rest
                        cancel.cancel();
                    }
                    result
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("worker thread panicked"))
                    .and_then(|result| result)
            })
            .collect()
    });

    let mut total = WorkerStats::default();
    let mut failures = 0;
    for result in results {
        match result {
            Ok(stats) => {
                total.analyzed += stats.analyzed;
                total.syntax_errors += stats.syntax_errors;
                total.faults += stats.faults;
            }
            Err(err) => {
                error!(error = %err, "Worker failed");
                failures += 1;
            }
        }
    }

    println!(
        "Analyzed {}, syntax errors {}, faults {}",
        total.analyzed, total.syntax_errors, total.faults
    );
    if failures > 0 {
        bail!("{} of {} workers failed", failures, workers);
    }
    Ok(())
}

fn stats(config: &MinerConfig, top: usize) -> Result<()> {
    let corpus = SqliteCorpus::open(&config.database)?;
    let primary = SqliteQueue::open(&config.database, &config.queue)?;
    let errors = SqliteQueue::open(&config.database, config.error_queue())?;
    let aggregate = SqliteAggregate::open(&config.database)?;

    let corpus_stats = corpus.stats()?;
    let primary_depth = primary.depth()?;
    let error_depth = errors.depth()?;

    println!("=== Corpus ===");
    println!("Sources:              {}", corpus_stats.source_count);
    println!("Paths:                {}", corpus_stats.path_count);
    println!("Parsed:               {}", corpus_stats.parsed_count);
    println!("Syntax errors:        {}", corpus_stats.failed_count);

    println!("\n=== Queues ===");
    println!(
        "{:<21} {} pending, {} in flight",
        format!("{}:", primary.name()),
        primary_depth.pending,
        primary_depth.in_flight
    );
    println!(
        "{:<21} {} pending, {} in flight",
        format!("{}:", errors.name()),
        error_depth.pending,
        error_depth.in_flight
    );

    println!("\n=== Top codepoints ===");
    for (label, count) in aggregate.top(top)? {
        println!("{:<21} {}", label, count);
    }
    Ok(())
}

fn vocab(tokenizer: &ExternalTokenizer, file: &Path) -> Result<()> {
    let mut source = File::open(file).context(format!("Failed to open {}", file.display()))?;
    let parsed = match tokenizer.tokenize(SourceInput::Reader(&mut source)) {
        Ok(parsed) => parsed,
        Err(TokenizeError::Syntax { stderr, .. }) => {
            bail!("{}: syntax error: {}", file.display(), stderr.trim())
        }
        Err(err) => return Err(err.into()),
    };

    for entry in vocabularize(&parsed.tokens) {
        let (location, symbol) = entry?;
        println!("{} {}", location.start, symbol);
    }
    Ok(())
}
