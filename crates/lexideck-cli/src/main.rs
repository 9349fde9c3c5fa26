//! lexideck command-line front end.
//!
//! Loads the config, sets up logging and drives the library: one-shot
//! lookups, word list normalization and queue runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer};

use lexideck::config::{default_config_path, load_config, Config};
use lexideck::db::card_repo::phrases_with_state;
use lexideck::normalize::load_lemmatizer;
use lexideck::queue::PhraseStatus;
use lexideck::{
    import_words, CardStore, Database, FetchPipeline, ImportFormat, MemoryStore,
    NormalizeOutcome, Normalizer, PhraseStateMap, QueueState, SearchTerm, WorkQueue,
};

#[derive(Parser, Debug)]
#[command(name = "lexideck")]
#[command(about = "Collects dictionary data for flashcards from several web sources")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.lexideck/config.json when present)
    #[arg(short, long, global = true, env = "LEXIDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Keep cards in memory instead of the database
    #[arg(long, global = true)]
    memory: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one phrase and print its record as JSON
    Fetch { phrase: String },

    /// Import a word list and print the normalization outcome
    Normalize {
        file: PathBuf,
        /// txt, kindle or kobo (detected from the extension by default)
        #[arg(long, value_parser = parse_format)]
        format: Option<ImportFormat>,
    },

    /// Import, normalize and fetch a word list through the work queue
    Queue {
        file: Option<PathBuf>,
        #[arg(long, value_parser = parse_format)]
        format: Option<ImportFormat>,
        /// Also re-queue phrases left queued in the database
        #[arg(long)]
        resume: bool,
        /// Give up waiting for the worker after this many seconds
        #[arg(long, default_value = "3600")]
        timeout_secs: u64,
    },
}

fn parse_format(name: &str) -> Result<ImportFormat, String> {
    ImportFormat::parse(name).ok_or_else(|| format!("unknown format '{}'", name))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let config = resolve_config(cli.config.as_deref())?;
    let database = open_database(&config, cli.memory)?;
    let store: Arc<dyn CardStore> = match &database {
        Some(db) => Arc::new(db.clone()),
        None => Arc::new(MemoryStore::new()),
    };

    match cli.command {
        Command::Fetch { phrase } => run_fetch(&config, store, &phrase),
        Command::Normalize { file, format } => {
            let outcome = normalize_file(&config, &file, format)?;
            print_json(&outcome)
        }
        Command::Queue {
            file,
            format,
            resume,
            timeout_secs,
        } => {
            let mut phrases = Vec::new();
            if let Some(file) = file {
                let outcome = normalize_file(&config, &file, format)?;
                // Lemma suggestions are accepted as is.
                phrases.extend(outcome.unchanged);
                phrases.extend(outcome.suggestions.into_values());
            }
            if resume {
                let Some(db) = &database else {
                    bail!("--resume needs the database");
                };
                let queued = phrases_with_state(db, QueueState::Queued)?;
                phrases.extend(queued.into_iter().map(|p| p.to_string()));
            }
            if phrases.is_empty() {
                bail!("Nothing to queue: pass a word list or --resume");
            }
            run_queue(&config, store, phrases, Duration::from_secs(timeout_secs))
        }
    }
}

fn init_logging(json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexideck=info"));
    let fmt_layer = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };
    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    // The storage layer logs through the `log` facade.
    tracing_log::LogTracer::init().context("Failed to bridge log records")?;
    Ok(())
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }
    match default_config_path() {
        Some(path) if path.exists() => load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        _ => {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

fn open_database(config: &Config, memory: bool) -> Result<Option<Database>> {
    if memory {
        return Ok(None);
    }
    let Some(path) = config.database_path() else {
        warn!("Could not determine a database path, keeping cards in memory");
        return Ok(None);
    };
    let db = Database::open(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    info!("Using card database at {}", path.display());
    Ok(Some(db))
}

fn normalizer(config: &Config) -> Arc<Normalizer> {
    let lemmatizer = load_lemmatizer(config.lemma_table_path().as_deref());
    Arc::new(Normalizer::new(config.normalize, lemmatizer))
}

fn pipeline(config: &Config, store: Arc<dyn CardStore>) -> Result<FetchPipeline> {
    let pipeline = FetchPipeline::from_config(config, store)?;
    Ok(if config.highlight_examples {
        pipeline.with_normalizer(normalizer(config))
    } else {
        pipeline
    })
}

fn normalize_file(
    config: &Config,
    file: &Path,
    format: Option<ImportFormat>,
) -> Result<NormalizeOutcome> {
    let format = match format {
        Some(format) => format,
        None => ImportFormat::from_path(file)?,
    };
    let words = import_words(file, format)?;
    let outcome = normalizer(config).normalize(&words);
    if outcome.degraded {
        warn!("No lemma table loaded, words were not lemmatized");
    }
    Ok(outcome)
}

fn run_fetch(config: &Config, store: Arc<dyn CardStore>, phrase: &str) -> Result<()> {
    let pipeline = pipeline(config, store)?;
    let term = SearchTerm::new(phrase);
    match pipeline.run(&term) {
        Ok(record) => print_json(&record),
        Err(e) => {
            if !e.suggestions().is_empty() {
                eprintln!("Did you mean: {}", e.suggestions().join(", "));
            }
            Err(e).with_context(|| format!("Failed to fetch '{}'", term))
        }
    }
}

fn run_queue(
    config: &Config,
    store: Arc<dyn CardStore>,
    phrases: Vec<String>,
    timeout: Duration,
) -> Result<()> {
    let states = PhraseStateMap::default();
    let pipeline = pipeline(config, store.clone())?;
    let queue = WorkQueue::new(Arc::new(pipeline), Arc::new(states.clone()), store);

    let interrupted = queue.clone();
    ctrlc::set_handler(move || {
        let paused = interrupted.pause();
        warn!(paused, "Interrupted, finishing the current phrase");
    })
    .context("Failed to set Ctrl-C handler")?;

    let queued = queue.enqueue_all(phrases)?;
    info!(queued, "Queued phrases");

    if !queue.wait_idle(timeout) {
        warn!("Worker still busy after {}s", timeout.as_secs());
    }

    let statuses: BTreeMap<String, PhraseStatus> = states
        .snapshot()
        .into_iter()
        .map(|(phrase, status)| (phrase.to_string(), status))
        .collect();
    print_json(&statuses)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
