//! Logging setup and export logic used by the `run` command.

use crate::Result;
use crate::facts::{Fanout, LogContext};
use crate::metrics::MetricRecord;
use crate::reports::{generate_csv, generate_json};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use env_logger::Target;
use log::{Level, LevelFilter, Log};
use ohno::{EnrichableExt, IntoAppError};
use std::fs;
use std::io::{BufWriter, Write};

const FILE_PREFIX: &str = "github_metrics";

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Request-level detail, including every attempt
    #[value(name = "DEBUG")]
    Debug,

    /// Progress messages, warnings, and errors
    #[value(name = "INFO")]
    Info,

    /// Warnings and errors
    #[value(name = "WARNING", alias = "WARN")]
    Warning,

    /// Only errors
    #[value(name = "ERROR")]
    Error,
}

impl LogLevel {
    const fn filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::Debug,
            Self::Info => LevelFilter::Info,
            Self::Warning => LevelFilter::Warn,
            Self::Error => LevelFilter::Error,
        }
    }
}

/// Which export files to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    const fn includes_csv(self) -> bool {
        matches!(self, Self::Csv | Self::Both)
    }

    const fn includes_json(self) -> bool {
        matches!(self, Self::Json | Self::Both)
    }
}

/// File name stem shared by the log and export files of one run.
pub fn output_stem(started_at: DateTime<Local>) -> String {
    format!("{FILE_PREFIX}_{}", started_at.format("%Y%m%d_%H%M%S"))
}

/// Create a log context that writes to stderr and to `log_path`.
pub fn init_logging(level: LogLevel, log_path: &Utf8Path) -> Result<LogContext> {
    let file = fs::File::create(log_path).into_app_err_with(|| format!("creating log file {log_path}"))?;

    let loggers: Vec<Box<dyn Log>> = vec![
        Box::new(build_logger(level.filter(), Target::Stderr)),
        Box::new(build_logger(level.filter(), Target::Pipe(Box::new(file)))),
    ];

    Ok(LogContext::new(Fanout::new(loggers)))
}

fn build_logger(filter: LevelFilter, target: Target) -> env_logger::Logger {
    env_logger::Builder::new()
        .filter_level(filter)
        .target(target)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.target(),
                level_label(record.level()),
                record.args()
            )
        })
        .build()
}

const fn level_label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Write the record in the requested formats, returning the paths written.
pub fn export(record: &MetricRecord, output_dir: &Utf8Path, stem: &str, format: OutputFormat, log: &LogContext) -> Result<Vec<Utf8PathBuf>> {
    let mut written = Vec::with_capacity(2);

    if format.includes_csv() {
        let path = output_dir.join(format!("{stem}.csv"));
        let file = fs::File::create(&path).into_app_err_with(|| format!("creating CSV file {path}"))?;
        generate_csv(record, BufWriter::new(file)).map_err(|e| e.enrich_with(|| format!("writing CSV file {path}")))?;
        log.info(format_args!("Exported metrics to {path}"));
        written.push(path);
    }

    if format.includes_json() {
        let path = output_dir.join(format!("{stem}.json"));
        let mut json_output = String::new();
        generate_json(record, &mut json_output)?;
        fs::write(&path, json_output).into_app_err_with(|| format!("writing JSON file {path}"))?;
        log.info(format_args!("Exported metrics to {path}"));
        written.push(path);
    }

    Ok(written)
}
