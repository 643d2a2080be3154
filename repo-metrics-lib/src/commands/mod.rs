//! Command-line interface and orchestration for repo-metrics
//!
//! # Implementation Model
//!
//! The `run` function parses the command line with clap and drives one
//! collection run:
//!
//! 1. Validate the credentials (token, owner, repository)
//! 2. Create the output directory and the run's log file
//! 3. Collect the repository metrics through the facts module
//! 4. Export the record as CSV and/or JSON through the reports module
//!
//! All files of a run share the stem `github_metrics_<YYYYmmdd_HHMMSS>`. User-facing
//! messages go through the [`Host`] so the whole flow can run in-process under test.

mod common;
mod host;
mod run;

pub use host::Host;
pub use run::run;
