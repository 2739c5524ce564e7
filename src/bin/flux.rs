//! Flux CLI - Command-line interface for Writing Flux
//!
//! Commands:
//! - extract: Extract features from one writing record
//! - batch: Extract features from stored records (batch mode)
//! - validate: Check a record's timestamps and edits without aggregating
//! - doctor: Diagnose configuration and environment
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use writing_flux::writing::adapter::{
    capture_to_record, parse_capture_log, parse_record, parse_stored_array, parse_stored_ndjson,
    validate_record,
};
use writing_flux::writing::types::{WritingRecord, UNSCORED};
use writing_flux::writing::{BatchExtractor, BatchReport, FeatureExtractor};
use writing_flux::{
    BatchConfig, ConfigOverrides, ExtractError, SameSnapshotPolicy, FLUX_VERSION, PRODUCER_NAME,
};

/// Flux - Writing-process feature extraction from keystroke logs
#[derive(Parser)]
#[command(name = "flux")]
#[command(version = FLUX_VERSION)]
#[command(about = "Turn keystroke logs into writing-process features", long_about = None)]
struct Cli {
    /// Batch configuration file (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Gap (ms) that closes a typing burst, overriding the config file
    #[arg(long, global = true, value_name = "MS")]
    long_pause_ms: Option<i64>,

    /// Handling of unchanged snapshots, overriding the config file
    #[arg(long, global = true, value_enum)]
    same_snapshot: Option<SameSnapshotArg>,

    /// Skip stored records whose user starts with this prefix (repeatable)
    #[arg(long, global = true, value_name = "PREFIX")]
    skip_user_prefix: Vec<String>,

    /// Increase verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract features from a single record
    Extract {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "record")]
        input_format: RecordFormat,

        /// Submitted article for capture logs (defaults to the last snapshot)
        #[arg(long)]
        article: Option<PathBuf>,

        /// Score attached to a capture log
        #[arg(long, default_value_t = UNSCORED, allow_hyphen_values = true)]
        score: i64,

        /// Pretty-print the feature set
        #[arg(long)]
        pretty: bool,
    },

    /// Extract features from stored records (batch mode)
    Batch {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Emit the full run report instead of features only
        #[arg(long)]
        report: bool,
    },

    /// Check a record's timestamps and edits without extracting
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "record")]
        input_format: RecordFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SameSnapshotArg {
    /// Fail the record
    Reject,
    /// Ignore the event
    Skip,
}

impl From<SameSnapshotArg> for SameSnapshotPolicy {
    fn from(arg: SameSnapshotArg) -> Self {
        match arg {
            SameSnapshotArg::Reject => SameSnapshotPolicy::Reject,
            SameSnapshotArg::Skip => SameSnapshotPolicy::Skip,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum RecordFormat {
    /// Canonical writing record
    Record,
    /// Capture page log (startTime, sequences, submitTime)
    Capture,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one stored record per line)
    Ndjson,
    /// JSON array of stored records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one feature set per line)
    Ndjson,
    /// JSON object keyed by record id
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (canonical writing record)
    Input,
    /// Output schema (feature set)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), FluxCliError> {
    let overrides = ConfigOverrides {
        long_pause_ms: cli.long_pause_ms,
        same_snapshot: cli.same_snapshot.map(SameSnapshotPolicy::from),
        skip_user_prefixes: cli.skip_user_prefix,
    };
    let config = load_config(cli.config.as_deref(), overrides)?;

    match cli.command {
        Commands::Extract {
            input,
            output,
            input_format,
            article,
            score,
            pretty,
        } => cmd_extract(
            &config,
            &input,
            &output,
            input_format,
            article.as_deref(),
            score,
            pretty,
        ),

        Commands::Batch {
            input,
            output,
            input_format,
            output_format,
            report,
        } => cmd_batch(config, &input, &output, input_format, output_format, report),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&config, &input, input_format, json),

        Commands::Doctor { json } => cmd_doctor(cli.config.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_extract(
    config: &BatchConfig,
    input: &Path,
    output: &Path,
    input_format: RecordFormat,
    article: Option<&Path>,
    score: i64,
    pretty: bool,
) -> Result<(), FluxCliError> {
    let input_data = read_input(input)?;
    let record = load_record(&input_data, input_format, article, score)?;

    let mut extractor = FeatureExtractor::with_config(config.extractor.clone());
    let features = extractor.extract(&record)?;

    let output_data = if pretty {
        serde_json::to_string_pretty(&features)?
    } else {
        serde_json::to_string(&features)?
    };
    write_output(output, &(output_data + "\n"))
}

fn cmd_batch(
    config: BatchConfig,
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    report: bool,
) -> Result<(), FluxCliError> {
    let input_data = read_input(input)?;

    let rows = match input_format {
        InputFormat::Ndjson => parse_stored_ndjson(&input_data)?,
        InputFormat::Json => parse_stored_array(&input_data)?,
    };

    if rows.is_empty() {
        return Err(FluxCliError::NoRecords);
    }

    let batch = BatchExtractor::new(config).run(&rows);
    for failure in &batch.failures {
        log::warn!("record {} not extracted: {}", failure.record_id, failure.message);
    }

    let output_data = if report {
        format_report(&batch, &output_format)?
    } else {
        format_features(&batch, &output_format)?
    };
    write_output(output, &output_data)
}

fn cmd_validate(
    config: &BatchConfig,
    input: &Path,
    input_format: RecordFormat,
    json: bool,
) -> Result<(), FluxCliError> {
    let input_data = read_input(input)?;
    let record = load_record(&input_data, input_format, None, UNSCORED)?;
    let problems = validate_record(&record, &config.extractor);

    let report = ValidationReport {
        total_events: record.events.len(),
        problem_count: problems.len(),
        problems,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events: {}", report.total_events);
        println!("Problems:     {}", report.problem_count);

        if !report.problems.is_empty() {
            println!("\nProblems:");
            for problem in &report.problems {
                println!("  - {}", problem);
            }
        }
    }

    if report.problem_count > 0 {
        Err(FluxCliError::ValidationFailed(report.problem_count))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), FluxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Flux version {}", FLUX_VERSION),
    });

    // Check config file if provided
    match config_path {
        Some(path) if !path.exists() => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        }),
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => match BatchConfig::from_json(&content) {
                Ok(config) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (long pause {} ms, {} skipped user prefixes)",
                        config.extractor.long_pause_ms,
                        config.skip_user_prefixes.len()
                    ),
                }),
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                }),
            },
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            }),
        },
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "No config file, using defaults".to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for --input -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Flux Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(FluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), FluxCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: writing record");
                println!();
                println!("- final_text: Submitted article");
                println!("- score: Grader score (-1 when unscored)");
                println!("- session_start_ms, submit_ms: Session bounds (ms since epoch)");
                println!("- events: Snapshots in capture order, each with");
                println!("  - timestamp_ms, snapshot");
                println!("  - input_type, data (informational)");
                println!();
                println!("Capture logs (--input-format capture) use startTime, sequences, submitTime.");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: feature set");
                println!();
                println!("- score, word_count");
                println!("- total_time_ms, planning_time_ms (null without events)");
                println!("- within_word/between_word/between_sentence/between_paragraph_pauses");
                println!("- deletion_lengths, deletion_times");
                println!("- insertion_chunk_count, insertion_chunk_lengths, insertion_chunk_times");
                println!("- jump_count, jump_lengths, jump_times");
            }
        }
    }

    Ok(())
}

// Helper functions

fn load_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<BatchConfig, FluxCliError> {
    let config = match path {
        Some(path) if path.exists() => {
            let config = BatchConfig::from_json(&fs::read_to_string(path)?)?;
            log::info!("Loaded config from {}", path.display());
            config
        }
        Some(path) => {
            log::warn!("Config file {} not found, using defaults", path.display());
            BatchConfig::default()
        }
        None => BatchConfig::default(),
    };
    Ok(config.with_overrides(overrides))
}

fn read_input(input: &Path) -> Result<String, FluxCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), FluxCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn load_record(
    input_data: &str,
    format: RecordFormat,
    article: Option<&Path>,
    score: i64,
) -> Result<WritingRecord, FluxCliError> {
    match format {
        RecordFormat::Record => Ok(parse_record(input_data)?),
        RecordFormat::Capture => {
            let log = parse_capture_log(input_data)?;
            let article = match article {
                Some(path) => fs::read_to_string(path)?,
                None => log
                    .sequences
                    .last()
                    .map(|entry| entry.article.clone())
                    .unwrap_or_default(),
            };
            Ok(capture_to_record(log, &article, score))
        }
    }
}

fn format_features(batch: &BatchReport, format: &OutputFormat) -> Result<String, FluxCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for (record_id, features) in &batch.features {
                lines.push(serde_json::to_string(&serde_json::json!({
                    "record_id": record_id,
                    "features": features,
                }))?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(&batch.features)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(&batch.features)? + "\n"),
    }
}

fn format_report(batch: &BatchReport, format: &OutputFormat) -> Result<String, FluxCliError> {
    match format {
        OutputFormat::Ndjson | OutputFormat::Json => Ok(serde_json::to_string(batch)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(batch)? + "\n"),
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "writing.record",
        "description": "Keystroke log of one writing session",
        "type": "object",
        "required": ["final_text", "session_start_ms", "submit_ms", "events"],
        "properties": {
            "final_text": { "type": "string" },
            "score": { "type": "integer", "default": UNSCORED },
            "session_start_ms": { "type": "integer" },
            "submit_ms": { "type": "integer" },
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["timestamp_ms", "snapshot"],
                    "properties": {
                        "timestamp_ms": { "type": "integer" },
                        "snapshot": { "type": "string" },
                        "input_type": { "type": "string" },
                        "data": { "type": ["string", "null"] }
                    }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let int_list = serde_json::json!({ "type": "array", "items": { "type": "integer" } });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "writing.features",
        "description": "Writing-process features of one record",
        "type": "object",
        "properties": {
            "score": { "type": "integer" },
            "total_time_ms": { "type": ["integer", "null"] },
            "planning_time_ms": { "type": ["integer", "null"] },
            "word_count": { "type": "integer" },
            "within_word_pauses": int_list.clone(),
            "between_word_pauses": int_list.clone(),
            "between_sentence_pauses": int_list.clone(),
            "between_paragraph_pauses": int_list.clone(),
            "deletion_lengths": int_list.clone(),
            "deletion_times": int_list.clone(),
            "insertion_chunk_count": { "type": "integer" },
            "insertion_chunk_lengths": int_list.clone(),
            "insertion_chunk_times": int_list.clone(),
            "jump_count": { "type": "integer" },
            "jump_times": int_list.clone(),
            "jump_lengths": int_list.clone()
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum FluxCliError {
    Io(io::Error),
    Extract(ExtractError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for FluxCliError {
    fn from(e: io::Error) -> Self {
        FluxCliError::Io(e)
    }
}

impl From<ExtractError> for FluxCliError {
    fn from(e: ExtractError) -> Self {
        FluxCliError::Extract(e)
    }
}

impl From<serde_json::Error> for FluxCliError {
    fn from(e: serde_json::Error) -> Self {
        FluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FluxCliError> for CliError {
    fn from(e: FluxCliError) -> Self {
        match e {
            FluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FluxCliError::Extract(e) => {
                let (code, hint) = match &e {
                    ExtractError::ParseError(_) | ExtractError::JsonError(_) => {
                        ("PARSE_ERROR", "Run 'flux schema input' for the expected layout")
                    }
                    ExtractError::MalformedDiff { .. } => {
                        ("MALFORMED_DIFF", "Run 'flux validate' to list every bad event")
                    }
                    ExtractError::UnsupportedOperation { .. } => (
                        "UNSUPPORTED_OPERATION",
                        "Pass --same-snapshot skip to ignore unchanged snapshots",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            FluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            FluxCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FluxCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} problems found", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            FluxCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    problem_count: usize,
    problems: Vec<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
