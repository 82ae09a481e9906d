//! Stress CLI - Command-line interface for Synheart Stress
//!
//! Commands:
//! - predict: Classify one record or an array of records
//! - evaluate: Measure accuracy over a labeled hold-out set
//! - inspect: Summarize a model artifact
//! - doctor: Diagnose model and environment health
//! - schema: Print input, model, or output schema

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_stress::classifier::DEFAULT_EVALUATION_LIMIT;
use synheart_stress::encoder::PredictionEncoder;
use synheart_stress::types::StressReport;
use synheart_stress::{
    Model, RawRecord, StressClassifier, StressError, K_NEIGHBORS, PRODUCER_NAME, STRESS_VERSION,
};

/// Stress - On-device stress level classification
#[derive(Parser)]
#[command(name = "stress")]
#[command(author = "Synheart AI Inc")]
#[command(version = STRESS_VERSION)]
#[command(about = "Classify lifestyle metrics into stress levels", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one record (JSON object) or several (JSON array)
    Predict {
        /// Model artifact path
        #[arg(short, long)]
        model: PathBuf,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Leave normalized features out of reports
        #[arg(long)]
        no_features: bool,
    },

    /// Measure accuracy over labeled, pre-normalized rows
    Evaluate {
        /// Model artifact path
        #[arg(short, long)]
        model: PathBuf,

        /// Test set path: JSON array of 12-component rows (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Maximum number of rows to evaluate
        #[arg(long, default_value_t = DEFAULT_EVALUATION_LIMIT)]
        limit: usize,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a model artifact
    Inspect {
        /// Model artifact path
        #[arg(short, long)]
        model: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose model and environment health
    Doctor {
        /// Check a model artifact
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one report per line)
    Ndjson,
    /// JSON array of reports
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Record input schema
    Input,
    /// Model artifact schema
    Model,
    /// Report output schema
    Output,
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

fn run(cli: Cli) -> Result<(), StressCliError> {
    match cli.command {
        Commands::Predict {
            model,
            input,
            output_format,
            no_features,
        } => cmd_predict(&model, &input, output_format, no_features),

        Commands::Evaluate {
            model,
            input,
            limit,
            json,
        } => cmd_evaluate(&model, &input, limit, json),

        Commands::Inspect { model, json } => cmd_inspect(&model, json),

        Commands::Doctor { model, json } => cmd_doctor(model.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn read_input(input: &Path) -> Result<String, StressCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_predict(
    model: &Path,
    input: &Path,
    output_format: OutputFormat,
    no_features: bool,
) -> Result<(), StressCliError> {
    // Load the model before reading any records
    let classifier = StressClassifier::from_path(model)?;
    let mut encoder = PredictionEncoder::new();
    if no_features {
        encoder = encoder.without_features();
    }

    let input_data = read_input(input)?;
    let value: serde_json::Value = serde_json::from_str(&input_data)?;
    let values = match value {
        serde_json::Value::Array(items) => items,
        single => vec![single],
    };

    if values.is_empty() {
        return Err(StressCliError::NoRecords);
    }

    let mut reports: Vec<StressReport> = Vec::with_capacity(values.len());
    for value in values {
        let record = RawRecord::from_value(value)?;
        let prediction = classifier.classify(&record)?;
        reports.push(encoder.encode(&prediction));
    }

    print!("{}", format_output(&reports, &output_format)?);
    Ok(())
}

fn cmd_evaluate(
    model: &Path,
    input: &Path,
    limit: usize,
    json: bool,
) -> Result<(), StressCliError> {
    let classifier = StressClassifier::from_path(model)?;

    let input_data = read_input(input)?;
    let rows: Vec<Vec<f64>> = serde_json::from_str(&input_data)?;

    let report = classifier.evaluate(&rows, Some(limit))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Evaluation Report (k={})", K_NEIGHBORS);
        println!("=========================");
        println!("Rows evaluated: {}", report.evaluated);
        println!("Correct:        {}", report.correct);
        println!("Accuracy:       {:.2}%", report.accuracy * 100.0);
        println!("\nConfusion (rows = actual, columns = predicted):");
        println!("{:>8} {:>8} {:>8} {:>8}", "", "low", "medium", "high");
        for (actual, counts) in ["low", "medium", "high"].iter().zip(report.confusion.iter()) {
            println!(
                "{:>8} {:>8} {:>8} {:>8}",
                actual, counts[0], counts[1], counts[2]
            );
        }
    }

    Ok(())
}

fn cmd_inspect(model: &Path, json: bool) -> Result<(), StressCliError> {
    let model = Model::from_path(model)?;
    let summary = model.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Model Summary");
        println!("=============");
        println!("Training rows: {}", summary.training_rows);
        for (level, count) in &summary.label_counts {
            println!("  {:<7} {}", level, count);
        }
        println!(
            "Genders: {:?}",
            model.categories().gender.names()
        );
        println!(
            "Occupations: {:?}",
            model.categories().occupation.names()
        );
        println!("Devices: {:?}", model.categories().device.names());
        println!("\nRanges:");
        let r = &summary.ranges;
        for (name, range) in [
            ("age", r.age),
            ("dailyPhone", r.daily_phone),
            ("socialMedia", r.social_media),
            ("productivity", r.productivity),
            ("sleep", r.sleep),
            ("apps", r.apps),
            ("caffeine", r.caffeine),
            ("weekendScreen", r.weekend_screen),
        ] {
            println!("  {:<14} [{}, {}]", name, range.min, range.max);
        }
    }

    Ok(())
}

fn cmd_doctor(model: Option<&Path>, json: bool) -> Result<(), StressCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "stress_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Stress version {}", STRESS_VERSION),
    });

    checks.push(DoctorCheck {
        name: "k_neighbors".to_string(),
        status: CheckStatus::Ok,
        message: format!("k = {}", K_NEIGHBORS),
    });

    if let Some(model_path) = model {
        if model_path.exists() {
            match Model::from_path(model_path) {
                Ok(model) if model.is_empty() => checks.push(DoctorCheck {
                    name: "model".to_string(),
                    status: CheckStatus::Error,
                    message: "Model loaded but its training set is empty".to_string(),
                }),
                Ok(model) => {
                    checks.push(DoctorCheck {
                        name: "model".to_string(),
                        status: CheckStatus::Ok,
                        message: format!("Model valid ({} training rows)", model.len()),
                    });
                    if model.len() < K_NEIGHBORS {
                        checks.push(DoctorCheck {
                            name: "training_set_size".to_string(),
                            status: CheckStatus::Warning,
                            message: format!(
                                "Fewer than {} training rows; all rows vote",
                                K_NEIGHBORS
                            ),
                        });
                    }
                }
                Err(e) => checks.push(DoctorCheck {
                    name: "model".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Error,
                message: "Model file does not exist".to_string(),
            });
        }
    } else {
        checks.push(DoctorCheck {
            name: "model".to_string(),
            status: CheckStatus::Warning,
            message: "No model given; predictions need --model".to_string(),
        });
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
            message: "stdin is a pipe (use --input - to read records)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: STRESS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Stress Doctor Report");
        println!("====================");
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
        Err(StressCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), StressCliError> {
    let schema = match schema_type {
        SchemaType::Input => input_json_schema(),
        SchemaType::Model => model_json_schema(),
        SchemaType::Output => output_json_schema(),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

// Helper functions

fn format_output(reports: &[StressReport], format: &OutputFormat) -> Result<String, StressCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for report in reports {
                lines.push(serde_json::to_string(report)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(reports)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(reports)? + "\n"),
    }
}

fn input_json_schema() -> serde_json::Value {
    let number_or_text = serde_json::json!({ "type": ["number", "string"] });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/stress.record.v1.json",
        "title": "stress.record.v1",
        "description": "Self-reported lifestyle record",
        "type": "object",
        "required": [
            "age", "gender", "occupation", "device", "dailyPhone", "socialMedia",
            "productivity", "sleep", "apps", "caffeine", "weekendScreen"
        ],
        "properties": {
            "age": number_or_text,
            "gender": { "type": "string" },
            "occupation": { "type": "string" },
            "device": { "type": "string" },
            "dailyPhone": number_or_text,
            "socialMedia": number_or_text,
            "productivity": number_or_text,
            "sleep": number_or_text,
            "apps": number_or_text,
            "caffeine": number_or_text,
            "weekendScreen": number_or_text
        }
    })
}

fn model_json_schema() -> serde_json::Value {
    let bound = serde_json::json!({ "type": "number" });
    let category_map = serde_json::json!({
        "type": "object",
        "additionalProperties": { "type": "integer", "minimum": 0 }
    });
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/stress.model.v1.json",
        "title": "stress.model.v1",
        "description": "KNN model artifact exported by the offline trainer",
        "type": "object",
        "required": ["ranges", "genderMap", "occupationMap", "deviceMap", "trainSet"],
        "properties": {
            "ranges": {
                "type": "object",
                "properties": {
                    "minAge": bound, "maxAge": bound,
                    "minPhone": bound, "maxPhone": bound,
                    "minSocial": bound, "maxSocial": bound,
                    "minProd": bound, "maxProd": bound,
                    "minSleep": bound, "maxSleep": bound,
                    "minApp": bound, "maxApp": bound,
                    "minCaff": bound, "maxCaff": bound,
                    "minScreen": bound, "maxScreen": bound
                }
            },
            "genderMap": category_map,
            "occupationMap": category_map,
            "deviceMap": category_map,
            "trainSet": {
                "type": "array",
                "items": {
                    "type": "array",
                    "items": { "type": "number" },
                    "minItems": 12,
                    "maxItems": 12
                }
            }
        }
    })
}

fn output_json_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/stress.report.v1.json",
        "title": "stress.report.v1",
        "description": "Synheart Stress prediction report",
        "type": "object",
        "required": ["report_version", "producer", "computed_at_utc", "prediction"],
        "properties": {
            "report_version": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instance_id": { "type": "string" }
                }
            },
            "computed_at_utc": { "type": "string", "format": "date-time" },
            "prediction": {
                "type": "object",
                "properties": {
                    "label": { "type": "integer", "enum": [0, 1, 2] },
                    "level": { "type": "string", "enum": ["low", "medium", "high"] },
                    "display_name": { "type": "string" },
                    "votes": { "type": "array", "items": { "type": "object" } },
                    "neighbors_considered": { "type": "integer" },
                    "nearest_distance": { "type": ["number", "null"] }
                }
            },
            "features": {
                "type": "object",
                "additionalProperties": { "type": "number" }
            }
        }
    })
}

// Error types

#[derive(Debug)]
enum StressCliError {
    Io(io::Error),
    Stress(StressError),
    Json(serde_json::Error),
    NoRecords,
    DoctorFailed,
}

impl From<io::Error> for StressCliError {
    fn from(e: io::Error) -> Self {
        StressCliError::Io(e)
    }
}

impl From<StressError> for StressCliError {
    fn from(e: StressError) -> Self {
        StressCliError::Stress(e)
    }
}

impl From<serde_json::Error> for StressCliError {
    fn from(e: serde_json::Error) -> Self {
        StressCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StressCliError> for CliError {
    fn from(e: StressCliError) -> Self {
        match e {
            StressCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StressCliError::Stress(e) => {
                let (code, hint) = match &e {
                    StressError::ModelLoadError(_) => (
                        "MODEL_LOAD_ERROR",
                        "Run 'stress schema model' and re-export the model",
                    ),
                    StressError::InvalidInputError(_) => (
                        "INVALID_INPUT",
                        "Run 'stress schema input' and correct the record",
                    ),
                    StressError::EmptyTrainingSetError => (
                        "EMPTY_TRAINING_SET",
                        "Re-export the model with at least one training row",
                    ),
                    StressError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            StressCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            StressCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure the input array is not empty".to_string()),
            },
            StressCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

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
