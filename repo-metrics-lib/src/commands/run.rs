//! Command-line entry point for repo-metrics

use super::common::{LogLevel, OutputFormat, export, init_logging, output_stem};
use crate::facts::{
    Client, Collector, Credentials, DEFAULT_API_URL, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, ForkPages, LogContext, RetryPolicy, SystemClock,
};
use crate::{Host, Result};
use camino::Utf8PathBuf;
use chrono::Local;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{CommandFactory, Parser};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use std::fs;
use std::io::Write;

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "repo-metrics", author, version, long_about = None)]
#[command(about = "Fetch GitHub repository metrics and export them to CSV or JSON")]
#[command(styles = CLAP_STYLES)]
struct Args {
    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Owner (user or organization) of the repository
    #[arg(long, value_name = "OWNER", env = "GITHUB_OWNER")]
    owner: Option<String>,

    /// Name of the repository
    #[arg(long, value_name = "REPO", env = "GITHUB_REPO")]
    repo: Option<String>,

    /// Base URL of the GitHub REST API
    #[arg(long, value_name = "URL", env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Export format
    #[arg(long, value_name = "FORMAT", default_value = "csv", help_heading = "Output")]
    format: OutputFormat,

    /// Directory for the export and log files, created if missing
    #[arg(long, value_name = "PATH", default_value = ".", help_heading = "Output")]
    output_dir: Utf8PathBuf,

    /// Minimum level of log messages to record
    #[arg(long, value_name = "LEVEL", default_value = "INFO", ignore_case = true, help_heading = "Output")]
    log_level: LogLevel,

    /// Follow fork listing pages beyond the first (at most 10 pages)
    #[arg(long)]
    all_fork_pages: bool,

    /// Maximum attempts per request, including the first
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..), help_heading = "Retries")]
    max_attempts: u32,

    /// Base delay in seconds for exponential backoff between retries
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_BASE_DELAY.as_secs(), help_heading = "Retries")]
    retry_delay: u64,

    /// Use the exact backoff delays instead of randomizing them
    #[arg(long, help_heading = "Retries")]
    no_jitter: bool,
}

impl Args {
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_base_delay(Duration::from_secs(self.retry_delay))
            .with_jitter(!self.no_jitter)
    }

    const fn fork_pages(&self) -> ForkPages {
        if self.all_fork_pages { ForkPages::All } else { ForkPages::First }
    }
}

/// Parse the command line, collect the repository metrics, and export them.
///
/// Messages for the user go to the host's output and error streams; on failure the
/// host is asked to exit with a non-zero code (2 for usage errors, 1 otherwise).
///
/// # Errors
///
/// Returns an error if the arguments are invalid, the repository lookup fails, or
/// the export files cannot be written.
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            let _ = write!(host.error(), "{}", e.render());
            host.exit(e.exit_code());
            return Err(app_err!("invalid command line: {}", e.kind()));
        }
        Err(e) => {
            // --help and --version
            let _ = write!(host.output(), "{}", e.render());
            host.exit(e.exit_code());
            return Ok(());
        }
    };

    let credentials = match Credentials::new(
        args.token.clone().unwrap_or_default(),
        args.owner.as_deref().unwrap_or_default(),
        args.repo.as_deref().unwrap_or_default(),
    ) {
        Ok(credentials) => credentials,
        Err(e) => {
            let _ = writeln!(host.error(), "error: {e}\n\n{}", Args::command().render_usage());
            host.exit(2);
            return Err(e);
        }
    };

    match collect_and_export(&args, &credentials).await {
        Ok(written) => {
            for path in &written {
                let _ = writeln!(host.output(), "Wrote {path}");
            }
            Ok(())
        }
        Err(e) => {
            let _ = writeln!(host.error(), "error: {e:#}");
            host.exit(1);
            Err(e)
        }
    }
}

async fn collect_and_export(args: &Args, credentials: &Credentials) -> Result<Vec<Utf8PathBuf>> {
    fs::create_dir_all(&args.output_dir).into_app_err_with(|| format!("creating output directory {}", args.output_dir))?;

    let stem = output_stem(Local::now());
    let log = init_logging(args.log_level, &args.output_dir.join(format!("{stem}.log")))?;
    log.debug(format_args!("Using API at {} with {:?}", args.api_url, args.retry_policy()));

    let result = collect_with_log(args, credentials, &stem, &log).await;
    if let Err(e) = &result {
        log.error(format_args!("Run failed: {e:#}"));
    }

    log.flush();
    result
}

async fn collect_with_log(args: &Args, credentials: &Credentials, stem: &str, log: &LogContext) -> Result<Vec<Utf8PathBuf>> {
    let client = Client::new(credentials, &args.api_url, args.retry_policy(), SystemClock, log)?;
    let collector = Collector::new(client, log, args.fork_pages());

    let record = collector.collect(credentials).await?;
    export(&record, &args.output_dir, stem, args.format, log)
}
