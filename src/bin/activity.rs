//! Activity CLI - Command-line interface for Synheart Activity
//!
//! Commands:
//! - report: Aggregate a day of records from a provider export
//! - windows: Print the day and hour windows for a date

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_activity::report::{render_session, DailyReport};
use synheart_activity::{
    ActivityError, ActivitySession, AggregatorConfig, DailyAggregator, FetchMode,
    InMemoryProvider, TimeWindow, ACTIVITY_VERSION,
};

/// Activity - Hourly and daily step and energy totals
#[derive(Parser)]
#[command(name = "activity")]
#[command(author = "Synheart AI Inc")]
#[command(version = ACTIVITY_VERSION)]
#[command(about = "Aggregate step and calorie records per hour and per day", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a day of records from a provider export
    Report {
        /// Record export path (use - for stdin)
        #[arg(short, long)]
        records: PathBuf,

        /// Local date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,

        /// Days to move from the date (negative goes back)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        shift: i64,

        /// UTC offset in minutes east of UTC, defaults to the host time zone
        #[arg(long, allow_hyphen_values = true)]
        offset_minutes: Option<i32>,

        /// Issue provider reads one at a time
        #[arg(long)]
        sequential: bool,

        /// Aggregator configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the day and hour windows for a date
    Windows {
        /// Local date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,

        /// UTC offset in minutes east of UTC, defaults to the host time zone
        #[arg(long, allow_hyphen_values = true)]
        offset_minutes: Option<i32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), ActivityCliError> {
    match cli.command {
        Commands::Report {
            records,
            date,
            shift,
            offset_minutes,
            sequential,
            config,
            format,
        } => {
            let mut aggregator_config = match config {
                Some(path) => AggregatorConfig::from_json(&fs::read_to_string(path)?)?,
                None => AggregatorConfig::default(),
            };
            if offset_minutes.is_some() {
                aggregator_config.utc_offset_minutes = offset_minutes;
            }
            if sequential {
                aggregator_config.fetch_mode = FetchMode::Sequential;
            }
            aggregator_config.validate()?;

            cmd_report(&records, parse_date(date.as_deref())?, shift, aggregator_config, format).await
        }

        Commands::Windows {
            date,
            offset_minutes,
            json,
        } => {
            let config = AggregatorConfig {
                utc_offset_minutes: offset_minutes,
                ..Default::default()
            };
            cmd_windows(parse_date(date.as_deref())?, &config, json)
        }
    }
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate, ActivityCliError> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| ActivityError::DateParseError(format!("{}: {}", s, e)).into()),
        None => Ok(Local::now().date_naive()),
    }
}

fn read_input(path: &Path) -> Result<String, ActivityCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

async fn cmd_report(
    records: &Path,
    date: NaiveDate,
    shift: i64,
    config: AggregatorConfig,
    format: OutputFormat,
) -> Result<(), ActivityCliError> {
    let provider = InMemoryProvider::from_json(&read_input(records)?)?;
    let aggregator = DailyAggregator::with_config(provider, config);

    let mut session = ActivitySession::new(date);
    if shift != 0 {
        session.navigate(shift);
    }
    session.refresh(&aggregator).await;

    match format {
        OutputFormat::Text => {
            let bars = atty::is(atty::Stream::Stdout);
            print!("{}", render_session(&session, bars));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            if let Some(result) = session.result() {
                let report = DailyReport::from(result);
                let output = match format {
                    OutputFormat::JsonPretty => report.to_json_pretty()?,
                    _ => report.to_json()?,
                };
                println!("{}", output);
            }
        }
    }

    if let Some(e) = session.permission_error() {
        return Err(ActivityCliError::Permission(e.to_string()));
    }
    if let Some(e) = session.fetch_error() {
        return Err(ActivityCliError::Fetch(e.to_string()));
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct WindowListing {
    date: NaiveDate,
    offset_minutes: i32,
    day: TimeWindow,
    hours: Vec<TimeWindow>,
}

fn cmd_windows(date: NaiveDate, config: &AggregatorConfig, json: bool) -> Result<(), ActivityCliError> {
    let builder = config.window_builder(date)?;
    let listing = WindowListing {
        date,
        offset_minutes: builder.offset_minutes(),
        day: builder.day_window(date),
        hours: builder.hourly_windows(date).to_vec(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        println!("Windows for {} (UTC offset {} min)", listing.date, listing.offset_minutes);
        println!("  day   {}", listing.day);
        for (hour, window) in listing.hours.iter().enumerate() {
            println!("  {:>2}:00 {}", hour, window);
        }
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum ActivityCliError {
    Io(io::Error),
    Activity(ActivityError),
    Json(serde_json::Error),
    Permission(String),
    Fetch(String),
}

impl From<io::Error> for ActivityCliError {
    fn from(e: io::Error) -> Self {
        ActivityCliError::Io(e)
    }
}

impl From<ActivityError> for ActivityCliError {
    fn from(e: ActivityError) -> Self {
        ActivityCliError::Activity(e)
    }
}

impl From<serde_json::Error> for ActivityCliError {
    fn from(e: serde_json::Error) -> Self {
        ActivityCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ActivityCliError> for CliError {
    fn from(e: ActivityCliError) -> Self {
        match e {
            ActivityCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ActivityCliError::Activity(ActivityError::DateParseError(msg)) => CliError {
                code: "DATE_ERROR".to_string(),
                message: msg,
                hint: Some("Use the YYYY-MM-DD format".to_string()),
            },
            ActivityCliError::Activity(ActivityError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("UTC offsets must be within +/-1439 minutes".to_string()),
            },
            ActivityCliError::Activity(e) => CliError {
                code: "INPUT_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the export maps Steps and TotalCaloriesBurned to record arrays".to_string()),
            },
            ActivityCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ActivityCliError::Permission(msg) => CliError {
                code: "PERMISSION_ERROR".to_string(),
                message: msg,
                hint: Some("Grant read access to Steps and TotalCaloriesBurned".to_string()),
            },
            ActivityCliError::Fetch(msg) => CliError {
                code: "FETCH_ERROR".to_string(),
                message: msg,
                hint: Some("Retry the report for this date".to_string()),
            },
        }
    }
}
