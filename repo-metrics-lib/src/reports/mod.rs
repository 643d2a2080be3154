//! Export of a collected metric record
//!
//! Two formats are produced from the same [`MetricRecord`](crate::metrics::MetricRecord):
//! - **CSV**: a summary row plus one row per fork, suitable for spreadsheets
//! - **JSON**: one object with a member per metric, forks nested as an array
//!
//! Both writers iterate the record in key order, so output is stable across runs.

mod csv;
mod json;

pub use csv::generate as generate_csv;
pub use json::{generate as generate_json, parse as parse_json};
