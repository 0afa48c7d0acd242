//! Quizflux CLI - Command-line interface for Scaffold Flux
//!
//! Commands:
//! - sample: Draw a random question set from the bank
//! - replay: Replay a captured event stream into records and features
//! - aggregate: Compute features from an already-captured session log
//! - export: Render stored submissions as researcher CSV

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use scaffold_flux::config::{ConfigStore, FileConfigStore};
use scaffold_flux::events;
use scaffold_flux::export::write_csv;
use scaffold_flux::submission::NdjsonSubmissionStore;
use scaffold_flux::{
    aggregate, replay_session, submit_with_retry, PerQuestionRecord, Question, QuestionBank,
    QuizConfig, Submission, SubmissionStore, FLUX_VERSION,
};

/// Quizflux - Quiz telemetry capture and session feature extraction
#[derive(Parser)]
#[command(name = "quizflux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn quiz interaction logs into session features", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw a random question set from the bank
    Sample {
        /// Number of questions (defaults to the configured session length)
        #[arg(short, long)]
        count: Option<usize>,

        /// Seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,

        /// Question bank JSON file (defaults to the built-in bank)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Replay a captured event stream into records and features
    Replay {
        /// Session questions as a JSON array, in display order
        #[arg(short, long)]
        questions: PathBuf,

        /// Event stream file path (use - for stdin)
        #[arg(short, long)]
        events: PathBuf,

        /// Event stream format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Refuse to advance past unanswered questions
        #[arg(long)]
        no_skip: bool,

        /// Participant display name; with --store, the session is submitted
        #[arg(long)]
        name: Option<String>,

        /// Submission store (NDJSON file)
        #[arg(long, requires = "name")]
        store: Option<PathBuf>,
    },

    /// Compute features from an already-captured session log
    Aggregate {
        /// JSON array of per-question records (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Question ids whose hint was opened (comma separated)
        #[arg(long, value_delimiter = ',')]
        hinted: Vec<u32>,

        /// Session length (defaults to the number of records)
        #[arg(long)]
        length: Option<usize>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Render stored submissions as researcher CSV
    Export {
        /// Submission store (NDJSON file)
        #[arg(long)]
        store: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), QuizCliError> {
    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = config_store.load();
    config.validate()?;

    match cli.command {
        Commands::Sample {
            count,
            seed,
            bank,
            output,
        } => cmd_sample(&config, count, seed, bank.as_deref(), &output),

        Commands::Replay {
            questions,
            events,
            input_format,
            output,
            output_format,
            no_skip,
            name,
            store,
        } => {
            let config = QuizConfig {
                allow_skip: config.allow_skip && !no_skip,
                ..config
            };
            cmd_replay(
                &config,
                &questions,
                &events,
                input_format,
                &output,
                output_format,
                name.as_deref(),
                store.as_deref(),
            )
        }

        Commands::Aggregate {
            input,
            hinted,
            length,
            output_format,
        } => cmd_aggregate(&input, hinted, length, output_format),

        Commands::Export { store, output } => cmd_export(&store, &output),
    }
}

fn cmd_sample(
    config: &QuizConfig,
    count: Option<usize>,
    seed: Option<u64>,
    bank: Option<&Path>,
    output: &Path,
) -> Result<(), QuizCliError> {
    let bank = match bank {
        Some(path) => QuestionBank::from_json(&fs::read_to_string(path)?)?,
        None => QuestionBank::builtin()?,
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let questions = bank.sample(count.unwrap_or(config.session_length), &mut rng)?;

    write_output(output, &serde_json::to_string_pretty(&questions)?)
}

#[allow(clippy::too_many_arguments)]
fn cmd_replay(
    config: &QuizConfig,
    questions: &Path,
    events_path: &Path,
    input_format: InputFormat,
    output: &Path,
    output_format: OutputFormat,
    name: Option<&str>,
    store: Option<&Path>,
) -> Result<(), QuizCliError> {
    let questions: Vec<Question> = serde_json::from_str(&fs::read_to_string(questions)?)?;
    if questions.len() != config.session_length {
        warn!(
            "configured session length is {} but the question file holds {}; using {}",
            config.session_length,
            questions.len(),
            questions.len()
        );
    }
    let config = QuizConfig {
        session_length: questions.len(),
        ..config.clone()
    };
    let input_data = read_input(events_path)?;

    let events = match input_format {
        InputFormat::Ndjson => events::parse_ndjson(&input_data)?,
        InputFormat::Json => events::parse_array(&input_data)?,
    };

    if events.is_empty() {
        return Err(QuizCliError::NoEvents);
    }

    let outcome = replay_session(questions, &events, &config)?;

    if let (Some(name), Some(store_path)) = (name, store) {
        let submission = Submission::from_outcome(&outcome, name, Utc::now());
        let mut store = NdjsonSubmissionStore::new(store_path);
        submit_with_retry(&mut store, &submission, config.submission_attempts)?;
        info!(
            "submitted session {} to {}",
            submission.submission_key,
            store_path.display()
        );
    }

    write_output(output, &format_json(&outcome, &output_format)?)
}

fn cmd_aggregate(
    input: &Path,
    hinted: Vec<u32>,
    length: Option<usize>,
    output_format: OutputFormat,
) -> Result<(), QuizCliError> {
    let records: Vec<PerQuestionRecord> = serde_json::from_str(&read_input(input)?)?;
    let hinted: BTreeSet<u32> = hinted.into_iter().collect();
    let n = length.unwrap_or(records.len());

    let features = aggregate(&records, &hinted, n)?;
    write_output(Path::new("-"), &format_json(&features, &output_format)?)
}

fn cmd_export(store: &Path, output: &Path) -> Result<(), QuizCliError> {
    if !store.exists() {
        warn!("submission store {} does not exist", store.display());
    }
    let submissions = NdjsonSubmissionStore::new(store).list()?;

    if is_stdio(output) {
        write_csv(io::stdout().lock(), &submissions)?;
    } else {
        write_csv(fs::File::create(output)?, &submissions)?;
    }
    Ok(())
}

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(path: &Path) -> Result<String, QuizCliError> {
    if is_stdio(path) {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), QuizCliError> {
    if is_stdio(path) {
        println!("{}", data);
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

fn format_json<T: serde::Serialize>(
    value: &T,
    format: &OutputFormat,
) -> Result<String, QuizCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

#[derive(Debug)]
enum QuizCliError {
    Io(io::Error),
    Compute(scaffold_flux::ComputeError),
    Json(serde_json::Error),
    NoEvents,
}

impl From<io::Error> for QuizCliError {
    fn from(e: io::Error) -> Self {
        QuizCliError::Io(e)
    }
}

impl From<scaffold_flux::ComputeError> for QuizCliError {
    fn from(e: scaffold_flux::ComputeError) -> Self {
        QuizCliError::Compute(e)
    }
}

impl From<serde_json::Error> for QuizCliError {
    fn from(e: serde_json::Error) -> Self {
        QuizCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<QuizCliError> for CliError {
    fn from(e: QuizCliError) -> Self {
        use scaffold_flux::ComputeError;

        match e {
            QuizCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            QuizCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            QuizCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            QuizCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::ParseError(_) | ComputeError::JsonError(_) => {
                        ("PARSE_ERROR", "Check the input format")
                    }
                    ComputeError::EmptySession | ComputeError::IncompleteLog { .. } => (
                        "INCOMPLETE_SESSION",
                        "Every question must be displayed and advanced before aggregation",
                    ),
                    ComputeError::NoActiveQuestion
                    | ComputeError::QuestionAlreadyDisplayed(_)
                    | ComputeError::SessionComplete => (
                        "EVENT_ORDER",
                        "Each question needs a display event before its other events",
                    ),
                    ComputeError::SelectionRequired(_) => (
                        "SELECTION_REQUIRED",
                        "Select an answer before advancing, or allow skipping",
                    ),
                    ComputeError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Check the config file and command flags")
                    }
                    ComputeError::Persistence(_) => {
                        ("PERSISTENCE_ERROR", "Check the submission store path")
                    }
                    ComputeError::ExportError(_) => ("EXPORT_ERROR", "Check the output path"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
        }
    }
}
